use crate::config::SubmissionMode;
use crate::error::AppError;
use crate::state::SharedState;

/// Persist one parsed payload according to the configured submission mode.
pub async fn run(state: &SharedState, payload: serde_json::Value) -> Result<(), AppError> {
    match state.config.submission_mode {
        SubmissionMode::Acknowledged => {
            let entry = state.store.insert(payload).await?;
            tracing::debug!(entry_id = %entry.id, "Entry stored");
        }
        SubmissionMode::Detached => {
            // Waits here once the configured number of inserts is in flight
            let permit = state
                .detached_inserts
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| AppError::Internal(format!("Detached insert limiter closed: {e}")))?;
            let store = state.store.clone();
            tokio::spawn(async move {
                let _permit = permit;
                match store.insert(payload).await {
                    Ok(entry) => tracing::debug!(entry_id = %entry.id, "Entry stored"),
                    Err(e) => tracing::error!("Failed to store entry: {e}"),
                }
            });
        }
    }

    Ok(())
}
