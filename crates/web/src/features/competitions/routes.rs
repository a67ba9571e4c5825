use axum::{Router, middleware, routing::post};

use super::handlers::submit_competition;
use crate::middleware::auth::{StreamerKeys, require_streamer};
use crate::state::AppState;

pub fn routes(streamer_keys: StreamerKeys) -> Router<AppState> {
    Router::new()
        .route("/", post(submit_competition))
        .route_layer(middleware::from_fn_with_state(streamer_keys, require_streamer))
}
