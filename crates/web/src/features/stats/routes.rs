use axum::{Router, routing::get};

use super::handlers::{get_metadata, get_viewer_stats};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/viewers", get(get_viewer_stats))
        .route("/meta", get(get_metadata))
}
