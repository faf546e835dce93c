use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::AppConfig;

/// Whether a browser request from `origin` may be answered with CORS headers.
/// `None` means the request carried no `Origin` header (native apps, curl).
pub fn origin_allowed(config: &AppConfig, origin: Option<&str>) -> bool {
    let Some(origin) = origin else {
        return true;
    };
    if !config.is_production() {
        return true;
    }
    let origins = config.cors.origins();
    origins.iter().any(|allowed| allowed == "*" || allowed == origin)
}

pub fn build_cors_layer(config: &AppConfig) -> CorsLayer {
    if config.is_production() {
        tracing::info!("CORS restricted to {:?}", config.cors.origins());
    } else {
        tracing::warn!("Development mode: CORS allows every origin");
    }

    let config = Arc::new(config.clone());
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts| {
                let allowed = origin_allowed(&config, origin.to_str().ok());
                if !allowed {
                    tracing::warn!("Origin {:?} not allowed by CORS", origin);
                }
                allowed
            },
        ))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}
