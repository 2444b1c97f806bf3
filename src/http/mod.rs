//! HTTP layer: router, shared state, and the JSON response shape.
//!
//! Matches the teacher's `proxy::server` / `proxy::api` module split: this
//! file owns router construction, `handlers` owns the per-route logic, and
//! `response` owns the envelope and error types.

pub mod handlers;
pub mod response;

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::cache::CacheMap;
use crate::config::Config;
use crate::store::{Pool, WriteQueue};

/// State shared across every HTTP handler: the in-memory cache, the
/// read-only connection pool, and the write-intent queue.
#[derive(Clone)]
pub struct AppState {
    pub cache: CacheMap,
    pub pool: Pool,
    pub queue: Arc<WriteQueue>,
}

pub fn router(state: AppState, config: &Config) -> Router {
    Router::new()
        .route("/cache/:key", get(handlers::get_cache).delete(handlers::delete_cache))
        .route("/cache", post(handlers::set_cache))
        .route("/cache/get-or-set", post(handlers::get_or_set_cache))
        .fallback(handlers::not_found)
        .layer(cors_layer(config))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins = if config.allow_cors.is_empty() {
        AllowOrigin::any()
    } else {
        let parsed: Vec<_> = config
            .allow_cors
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
            axum::http::Method::HEAD,
        ])
        .allow_headers(tower_http::cors::Any)
        .max_age(Duration::from_secs(config.cors_max_age))
}
