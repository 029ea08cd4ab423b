use futures_util::stream::BoxStream;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Entry;

/// The payload is sent as text and cast server-side, since a JSONB-typed
/// parameter cannot carry `\u0000`.
pub async fn create(pool: &PgPool, data: &serde_json::Value) -> Result<Entry, sqlx::Error> {
    sqlx::query_as::<_, Entry>(
        "INSERT INTO entries (id, data) VALUES ($1, $2::json) RETURNING id, data, created_at",
    )
    .bind(Uuid::now_v7())
    .bind(data.to_string())
    .fetch_one(pool)
    .await
}

pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM entries")
        .fetch_one(pool)
        .await
}

/// All entries, oldest first.
pub fn stream_all(pool: &PgPool) -> BoxStream<'_, Result<Entry, sqlx::Error>> {
    sqlx::query_as::<_, Entry>(
        "SELECT id, data, created_at FROM entries ORDER BY created_at ASC, id ASC",
    )
    .fetch(pool)
}
