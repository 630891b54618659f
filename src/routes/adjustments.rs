use axum::{routing::get, Router};
use crate::handlers::adjustment::{get_adjustment, submit_adjustment};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/adjustment", get(get_adjustment).post(submit_adjustment))
}
