//! HTTP router for the memo API.
//!
//! Middleware stack (outermost → innermost):
//! 1. CORS → 2. Request logging → Handler

use axum::http::{header, HeaderValue, Method, Uri};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::api::endpoints;
use crate::api::error::ApiError;
use crate::api::middleware;
use crate::api::types::ApiContext;

/// Build the memo API router.
pub fn memo_api_router(ctx: ApiContext, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(endpoints::health::check))
        .route("/generate_memo", post(endpoints::memo::generate))
        .route("/schemas", get(endpoints::schemas::list))
        .fallback(not_found)
        .with_state(ctx)
        .layer(axum::middleware::from_fn(middleware::logging::log_request))
        .layer(cors_layer(cors_origins))
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("No route for {}", uri.path()))
}

/// `*` allows any origin; otherwise only the listed origins. Entries that
/// are not valid header values are skipped with a warning.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::HeaderName::from_static("x-request-id")])
}
