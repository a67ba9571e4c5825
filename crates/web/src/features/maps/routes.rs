use axum::{Router, middleware, routing::post};

use super::handlers::recompute_baseline;
use crate::middleware::auth::{ApiKeys, require_admin};
use crate::state::AppState;

pub fn routes(admin_keys: ApiKeys) -> Router<AppState> {
    Router::new()
        .route("/maps/:map_id/baseline", post(recompute_baseline))
        .route_layer(middleware::from_fn_with_state(admin_keys, require_admin))
}
