use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::sync::OnceCell;

use crate::db;
use crate::models::Entry;

/// Where submitted payloads end up. Handlers only see this trait, so the
/// backing store is chosen once at startup and injected through the state.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Append `data` as a new entry. The store assigns id and timestamp.
    async fn insert(&self, data: serde_json::Value) -> Result<Entry, sqlx::Error>;
}

/// PostgreSQL-backed store. Each entry is one row with a JSON payload.
pub struct PgStore {
    pool: PgPool,
    schema: OnceCell<()>,
}

impl PgStore {
    /// Build the pool without touching the network. Only a malformed
    /// connection string fails here.
    pub fn connect_lazy(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect_lazy(database_url)?;

        Ok(PgStore {
            pool,
            schema: OnceCell::new(),
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Connect and apply migrations. Succeeds at most once; a failed attempt
    /// is retried by the next caller.
    pub async fn ready(&self) -> Result<(), sqlx::Error> {
        self.schema
            .get_or_try_init(|| async {
                sqlx::migrate!("./migrations").run(&self.pool).await?;
                Ok::<(), sqlx::Error>(())
            })
            .await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl EntryStore for PgStore {
    async fn insert(&self, data: serde_json::Value) -> Result<Entry, sqlx::Error> {
        self.ready().await?;
        db::entries::create(&self.pool, &data).await
    }
}
