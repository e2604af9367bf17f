//! CORS policy.
//!
//! Only chains flagged for cross-origin use (the API chain) answer with CORS
//! headers; every other path gets none, so browsers refuse cross-origin calls.
//! Credentials are never allowed: authentication rides in the `Authorization`
//! header, not in cookies.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, request::Parts, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

use super::chain::ChainDispatcher;
use crate::config::CorsConfig;

pub fn layer(dispatcher: Arc<ChainDispatcher>, config: &CorsConfig) -> CorsLayer {
    let allowed: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    let allow_origin = AllowOrigin::predicate(move |origin: &HeaderValue, parts: &Parts| {
        dispatcher.allows_cross_origin(parts.uri.path())
            && (allowed.is_empty() || allowed.iter().any(|v| v == origin))
    });

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(60 * 10))
}
