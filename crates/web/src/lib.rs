use std::time::Duration;

use axum::{
    Router,
    http::{HeaderName, Method, header},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod cache;
pub mod config;
pub mod error;
pub mod features;
pub mod middleware;
pub mod state;

pub use config::Config;
pub use state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        features::stats::handlers::get_viewer_stats,
        features::stats::handlers::get_metadata,
        features::competitions::handlers::submit_competition,
        features::maps::handlers::recompute_baseline,
    ),
    components(
        schemas(
            storage::dto::leaderboard::LeaderboardResponse,
            storage::dto::leaderboard::ViewerStatistics,
            storage::dto::metadata::MetadataResponse,
            storage::dto::metadata::StreamerSummary,
            storage::dto::metadata::MapSummary,
            storage::dto::submission::SubmitCompetitionRequest,
            storage::dto::submission::SubmittedResult,
            storage::dto::submission::SubmitCompetitionResponse,
            storage::models::ResultStatus,
            storage::query::SortKey,
            storage::query::SortDirection,
            storage::services::BaselineOutcome,
            storage::services::SkipReason,
            features::maps::handlers::MapBaselineResponse,
        )
    ),
    tags(
        (name = "stats", description = "Public viewer statistics"),
        (name = "competitions", description = "Streamer competition submissions"),
        (name = "admin", description = "Operator maintenance endpoints"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("API Key")
                        .build(),
                ),
            )
        }
    }
}

/// Allows any origin by echoing it back, so cached responses stay origin-specific.
fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([HeaderName::from_static(cache::X_CACHE)])
        .max_age(Duration::from_secs(3600))
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api/stats", features::stats::routes())
        .nest(
            "/api/competitions",
            features::competitions::routes(state.streamer_keys.clone()),
        )
        .nest("/api/admin", features::maps::routes(state.admin_keys.clone()))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors())
        .with_state(state)
}
