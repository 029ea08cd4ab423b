use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::config::Config;
use crate::store::EntryStore;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub store: Arc<dyn EntryStore>,
    pub config: Config,
    /// Permits for detached inserts; each spawned insert holds one.
    pub detached_inserts: Arc<Semaphore>,
}
