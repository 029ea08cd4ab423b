pub mod config;
pub mod error;
pub mod state;
pub mod db;
pub mod models;
pub mod store;
pub mod routes;
pub mod views;
pub mod submission;
pub mod export;

use std::future::Future;
use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::state::{AppState, SharedState};
use crate::store::{EntryStore, PgStore};

pub fn build_app(store: Arc<dyn EntryStore>, config: Config) -> Router {
    let public = ServeDir::new(&config.public_dir);
    let jspsych = ServeDir::new(&config.jspsych_dir);
    let jquery_csv = ServeDir::new(&config.jquery_csv_dir);
    let max_body_size = config.max_body_size;

    let detached_inserts = Arc::new(Semaphore::new(config.max_detached_inserts));
    let state: SharedState = Arc::new(AppState {
        store,
        config,
        detached_inserts,
    });

    // x-frame-options stays unset so experiments can be framed.
    let headers = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ));

    Router::new()
        .merge(views::view_routes())
        .merge(routes::submission_routes(max_body_size))
        .route("/health", axum::routing::get(health))
        .nest_service("/jspsych", jspsych)
        .nest_service("/jquery-csv", jquery_csv)
        .fallback_service(public)
        .layer(headers)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve `app` until `shutdown` resolves. The store's connection and schema
/// check runs beside the server, so static and view routes answer at once
/// even when the database is slow or down.
pub async fn serve<F>(
    listener: TcpListener,
    app: Router,
    store: Arc<PgStore>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        match store.ready().await {
            Ok(()) => tracing::info!("database opened"),
            Err(e) => tracing::error!("connection error: {e}"),
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

async fn health() -> &'static str {
    "ok"
}
