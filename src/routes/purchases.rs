use axum::{routing::get, Router};
use crate::handlers::purchase::{get_purchase, submit_purchase};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/purchase", get(get_purchase).post(submit_purchase))
}
