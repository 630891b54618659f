pub mod adjustments;
pub mod customers;
pub mod products;
pub mod purchases;
pub mod users;

use axum::{middleware, Router};
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .merge(products::routes())
        .merge(customers::routes())
        .merge(adjustments::routes())
        .merge(purchases::routes())
        .merge(users::protected_routes())
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new()
        .merge(users::routes())
        .merge(protected)
}
