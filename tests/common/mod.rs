#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use jspsych_collector::config::{Config, SubmissionMode};
use jspsych_collector::models::Entry;
use jspsych_collector::store::{EntryStore, PgStore};

/// Keeps entries in memory so tests can inspect exactly what was stored.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<Vec<Entry>>,
}

impl MemoryStore {
    pub fn entries(&self) -> Vec<Entry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

#[async_trait]
impl EntryStore for MemoryStore {
    async fn insert(&self, data: Value) -> Result<Entry, sqlx::Error> {
        let entry = Entry {
            id: Uuid::now_v7(),
            data,
            created_at: Utc::now(),
        };
        self.entries.lock().unwrap().push(entry.clone());
        Ok(entry)
    }
}

/// Behaves like a database that cannot be reached.
pub struct UnreachableStore;

#[async_trait]
impl EntryStore for UnreachableStore {
    async fn insert(&self, _data: Value) -> Result<Entry, sqlx::Error> {
        Err(sqlx::Error::PoolTimedOut)
    }
}

/// Holds every insert until the test opens the gate, then stores in memory.
pub struct GatedStore {
    gate: tokio::sync::Semaphore,
    pub inner: MemoryStore,
}

impl GatedStore {
    pub fn new() -> Self {
        GatedStore {
            gate: tokio::sync::Semaphore::new(0),
            inner: MemoryStore::default(),
        }
    }

    /// Let `count` more inserts through.
    pub fn release(&self, count: usize) {
        self.gate.add_permits(count);
    }
}

#[async_trait]
impl EntryStore for GatedStore {
    async fn insert(&self, data: Value) -> Result<Entry, sqlx::Error> {
        self.gate
            .acquire()
            .await
            .expect("gate closed")
            .forget();
        self.inner.insert(data).await
    }
}

/// A running server bound to an ephemeral port.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub assets_dir: PathBuf,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// POST a JSON payload to the submission endpoint, return (status, body text).
    pub async fn submit_json(&self, data: &Value) -> (StatusCode, String) {
        let resp = self
            .client
            .post(self.url("/experiment-data"))
            .json(data)
            .send()
            .await
            .expect("submit json failed");
        let status = resp.status();
        (status, resp.text().await.unwrap_or_default())
    }

    /// POST a raw body with the given content type.
    pub async fn submit_raw(&self, content_type: &str, body: impl Into<reqwest::Body>) -> (StatusCode, String) {
        let resp = self
            .client
            .post(self.url("/experiment-data"))
            .header("content-type", content_type)
            .body(body)
            .send()
            .await
            .expect("submit raw failed");
        let status = resp.status();
        (status, resp.text().await.unwrap_or_default())
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("get request failed")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.assets_dir);
    }
}

/// Config pointing at the repository's `public/` tree and throwaway vendored dirs.
pub fn test_config(assets_dir: &Path) -> Config {
    let public_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("public");
    Config {
        database_url: "postgres://localhost/unused".to_string(),
        max_connections: 1,
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        max_body_size: 50 * 1024 * 1024,
        views_dir: public_dir.join("views"),
        public_dir,
        jspsych_dir: assets_dir.join("jspsych"),
        jquery_csv_dir: assets_dir.join("jquery-csv"),
        submission_mode: SubmissionMode::Acknowledged,
        max_detached_inserts: 64,
        log_level: "warn".to_string(),
    }
}

/// Create a temp directory holding small stand-ins for the vendored libraries.
fn vendored_assets() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("collector_test_{}", Uuid::now_v7().simple()));
    std::fs::create_dir_all(dir.join("jspsych/plugins")).unwrap();
    std::fs::create_dir_all(dir.join("jquery-csv/src")).unwrap();
    std::fs::write(dir.join("jspsych/jspsych.js"), "window.jsPsych = {};\n").unwrap();
    std::fs::write(
        dir.join("jspsych/plugins/jspsych-html-keyboard-response.js"),
        "jsPsych.plugins = {};\n",
    )
    .unwrap();
    std::fs::write(dir.join("jquery-csv/src/jquery.csv.min.js"), "$.csv = {};\n").unwrap();
    dir
}

/// Spawn the app with an in-memory store and default settings.
pub async fn spawn_app() -> (TestApp, Arc<MemoryStore>) {
    spawn_app_with_config(|_| {}).await
}

/// Spawn the app with an in-memory store after adjusting the config.
pub async fn spawn_app_with_config(adjust: impl FnOnce(&mut Config)) -> (TestApp, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::default());
    let app = spawn_app_with(store.clone(), adjust).await;
    (app, store)
}

/// Spawn the app on a random port with the given store.
pub async fn spawn_app_with(store: Arc<dyn EntryStore>, adjust: impl FnOnce(&mut Config)) -> TestApp {
    let assets_dir = vendored_assets();
    let mut config = test_config(&assets_dir);
    adjust(&mut config);

    let app = jspsych_collector::build_app(store, config);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        addr,
        client,
        assets_dir,
    }
}

/// Poll until the store holds `count` entries or the timeout passes.
pub async fn wait_for_entries(store: &MemoryStore, count: usize) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if store.len() >= count {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    store.len() >= count
}

/// A PostgreSQL-backed store in a freshly created database.
pub struct PgTestStore {
    pub store: Arc<PgStore>,
    pub db_name: String,
    admin_url: String,
}

/// Create a unique test database. Returns `None` when `DATABASE_URL` is unset.
pub async fn spawn_pg_store() -> Option<PgTestStore> {
    let _ = dotenvy::dotenv();
    let base_url = std::env::var("DATABASE_URL").ok()?;

    let db_name = format!("collector_test_{}", Uuid::now_v7().simple());

    let admin_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.clone());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url)
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    let test_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.clone());

    let store = PgStore::connect_lazy(&test_url, 5).expect("Invalid test database URL");
    store.ready().await.expect("Failed to run migrations on test database");

    Some(PgTestStore {
        store: Arc::new(store),
        db_name,
        admin_url,
    })
}

/// Drop the test database.
pub async fn cleanup_pg(pg: PgTestStore) {
    pg.store.close().await;

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&pg.admin_url)
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{}\" WITH (FORCE)", pg.db_name))
        .execute(&admin_pool)
        .await;

    admin_pool.close().await;
}
