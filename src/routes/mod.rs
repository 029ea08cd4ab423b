pub mod experiment_data;

use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

use crate::state::SharedState;

/// The submission endpoint. The body ceiling is enforced by the limit layer,
/// so axum's own default limit is switched off for this route.
pub fn submission_routes(max_body_size: usize) -> Router<SharedState> {
    Router::new()
        .route("/experiment-data", post(experiment_data::submit))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_size))
}
