pub mod pages;

use axum::routing::get;
use axum::Router;

use crate::state::SharedState;

pub fn view_routes() -> Router<SharedState> {
    Router::new()
        .route("/", get(pages::experiment))
        .route("/experiment", get(pages::experiment))
        .route("/finish", get(pages::finish))
}
