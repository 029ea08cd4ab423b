//! JSON Lines export of stored entries.
//!
//! Each line is one entry serialized as `{"id", "data", "created_at"}`, which
//! is what the offline analysis scripts read back with one `json.loads` per line.

use futures_util::{Stream, TryStreamExt};
use sqlx::PgPool;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::db;
use crate::error::AppError;
use crate::models::Entry;

/// Write every entry in `pool`, oldest first. Returns the number written.
pub async fn export_entries<W>(pool: &PgPool, out: &mut W) -> Result<u64, AppError>
where
    W: AsyncWrite + Unpin,
{
    write_jsonl(db::entries::stream_all(pool), out).await
}

pub async fn write_jsonl<S, W>(entries: S, out: &mut W) -> Result<u64, AppError>
where
    S: Stream<Item = Result<Entry, sqlx::Error>>,
    W: AsyncWrite + Unpin,
{
    let mut entries = std::pin::pin!(entries);
    let mut written = 0u64;

    while let Some(entry) = entries.try_next().await? {
        let mut line = serde_json::to_vec(&entry)
            .map_err(|e| AppError::Internal(format!("Failed to serialize entry {}: {e}", entry.id)))?;
        line.push(b'\n');
        out.write_all(&line).await?;
        written += 1;
    }

    out.flush().await?;
    Ok(written)
}
