use axum::{
    http::HeaderValue,
    routing::{get, patch, post, put},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::config::{config, AppConfig};
use crate::handlers::{categories, masks, namespaces, promos, recipes, reference, root};
use crate::state::AppState;

/// The full HTTP surface, configured from the process config.
pub fn app(state: AppState) -> Router {
    router(state, config())
}

pub fn router(state: AppState, config: &AppConfig) -> Router {
    let mut router = Router::new()
        // Public
        .route("/", get(root::root))
        .route("/health", get(root::health))
        .merge(mask_routes())
        .merge(reference_routes())
        .merge(namespace_routes())
        .merge(recipe_routes())
        .merge(admin_routes())
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(config.api.max_request_size_bytes));

    if config.security.enable_cors {
        router = router.layer(cors(&config.security.cors_origins));
    }
    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }
    router
}

fn cors(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
}

fn mask_routes() -> Router<AppState> {
    Router::new()
        .route("/api/masks/encode", post(masks::encode))
        .route("/api/masks/decode", get(masks::decode))
}

fn reference_routes() -> Router<AppState> {
    Router::new()
        .route("/api/reference/:table", get(reference::list).post(reference::create))
        .route("/api/reference/:table/:id", patch(reference::update).delete(reference::delete))
}

fn namespace_routes() -> Router<AppState> {
    Router::new()
        .route("/api/namespaces/:bit_index/ingredients", get(namespaces::ingredients))
        .route(
            "/api/namespaces/:bit_index/ingredients/:id",
            post(namespaces::add).delete(namespaces::remove),
        )
        .route("/api/ingredients/:id/exclude-children", post(namespaces::exclude_children))
}

fn recipe_routes() -> Router<AppState> {
    Router::new()
        .route("/api/recipes", get(recipes::list))
        .route("/api/recipes/stats/:table", get(recipes::stats))
        .route("/api/recipes/:id", get(recipes::get))
        .route("/api/recipes/:id/masks", put(recipes::update_masks))
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/categories", get(categories::list))
        .route("/api/categories/reorder", post(categories::reorder))
        .route("/api/promos", get(promos::list).post(promos::generate))
}
