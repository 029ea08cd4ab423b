use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};

use crate::error::AppError;
use crate::state::SharedState;
use crate::submission::{parser, pipeline};

/// `POST /experiment-data`: store the whole body as one entry, reply with an
/// empty 200. Oversized bodies never reach this handler.
pub async fn submit(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    let payload = parser::parse_body(content_type, &body).map_err(|e| {
        tracing::debug!("Rejected submission: {e}");
        AppError::BadRequest(e)
    })?;

    pipeline::run(&state, payload).await?;

    Ok(StatusCode::OK)
}
