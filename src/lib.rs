pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod pipeline;
pub mod retrieval;
pub mod search;
pub mod state;
pub mod transform;

use axum::routing::get;
use axum::Router;
use utoipa::OpenApi;

use state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(title = "markdown-reader", description = "Web pages and search results as clean Markdown"),
    paths(
        handlers::retrieval::search_results,
        handlers::retrieval::read_url,
        handlers::system::health,
        handlers::system::readiness,
    ),
    components(schemas(
        models::SearchEntry,
        models::SearchResultItem,
        models::HealthResponse,
    )),
    tags(
        (name = "retrieval", description = "Search and single-page retrieval"),
        (name = "health", description = "Liveness and readiness"),
    )
)]
pub struct ApiDoc;

/// Build the application router with the given state.
/// Kept separate from `main()` so integration tests can drive the app
/// without binding a port.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Retrieval
        .route("/", get(handlers::search_results))
        .route("/r/{*url}", get(handlers::read_url))
        // Health
        .route("/api/health", get(handlers::health))
        .route("/api/health/ready", get(handlers::readiness))
        // Docs
        .route("/api/openapi.json", get(handlers::openapi_json))
        .with_state(state)
}
