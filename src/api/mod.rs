//! HTTP API: routes, CORS, request tracing and inbound rate limiting.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::get;
use axum::{middleware, Router};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::Settings;
use crate::rate_limit::{limit_search_requests, RateLimiter};
use crate::SearchGateway;

pub mod handlers;
pub mod models;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<SearchGateway>,
    pub project_name: String,
}

pub fn create_router(gateway: Arc<SearchGateway>, settings: &Settings) -> Router {
    let state = AppState {
        gateway,
        project_name: settings.project_name.clone(),
    };
    let limiter = Arc::new(RateLimiter::new(
        settings.rate_limit_requests,
        settings.rate_limit_period,
    ));

    let search = Router::new()
        .route(
            "/search/simple-search",
            get(handlers::simple_search).post(handlers::simple_search_full),
        )
        .route(
            "/search/by-company-name",
            get(handlers::company_search).post(handlers::company_search_full),
        )
        .route(
            "/search/by-domain",
            get(handlers::domain_search).post(handlers::domain_search_full),
        )
        .route(
            "/search/full-search",
            get(handlers::full_search).post(handlers::full_search_full),
        )
        .route_layer(middleware::from_fn_with_state(limiter, limit_search_requests));
    let api = search.route("/engines", get(handlers::list_engines));

    let router = Router::new().route("/", get(handlers::health));
    let router = if settings.api_prefix.is_empty() {
        router.merge(api)
    } else {
        router.nest(&settings.api_prefix, api)
    };

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&settings.cors_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return cors.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(allowed))
}
