use axum::http::Method;
use tower_http::cors::{Any, CorsLayer};

/// Dashboards read match data from other origins; only the verbs the
/// match routes use are allowed.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any)
}
