use axum::{Router, routing::{post, get}};
use crate::state::AppState;
use crate::handlers::user::{login_user, get_me, change_password};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users/login", post(login_user))
}

/// Mounted behind `require_auth` by the caller.
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/users/me", get(get_me))
        .route("/users/change-password", post(change_password))
}
