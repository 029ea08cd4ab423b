use std::path::Path;

use axum::extract::State;
use axum::response::Html;

use crate::error::AppError;
use crate::state::SharedState;

const EXPERIMENT_VIEW: &str = "experiment.html";
const FINISH_VIEW: &str = "finish.html";

pub async fn experiment(State(state): State<SharedState>) -> Result<Html<String>, AppError> {
    render(&state.config.views_dir, EXPERIMENT_VIEW).await
}

pub async fn finish(State(state): State<SharedState>) -> Result<Html<String>, AppError> {
    render(&state.config.views_dir, FINISH_VIEW).await
}

// Views are plain HTML read on every request, so an edited page is live
// without a restart. A missing view is a server fault, not a 404.
async fn render(views_dir: &Path, name: &str) -> Result<Html<String>, AppError> {
    let path = views_dir.join(name);
    tokio::fs::read_to_string(&path)
        .await
        .map(Html)
        .map_err(|e| AppError::Internal(format!("Failed to render {}: {e}", path.display())))
}
