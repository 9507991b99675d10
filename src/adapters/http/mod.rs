//! HTTP adapters - REST API implementations.
//!
//! `app_router` assembles the full service: health check, billing API and
//! webhooks, behind bearer-token auth and the tower-http middleware stack.

pub mod billing;
pub mod middleware;

use std::time::Duration;

use axum::routing::get;
use axum::Router;
use http::{header, HeaderName, HeaderValue, Method, Request};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub use billing::{billing_router, BillingAppState, BillingPorts, BillingSettings};
pub use middleware::{auth_middleware, AuthState, RequireAuth};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Cross-cutting HTTP settings.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub request_timeout: Duration,
    /// Allowed CORS origins; empty allows none.
    pub cors_origins: Vec<String>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            cors_origins: Vec::new(),
        }
    }
}

/// Builds the complete application router.
pub fn app_router(state: BillingAppState, validator: AuthState, settings: &HttpSettings) -> Router {
    let api = billing_router().layer(axum::middleware::from_fn_with_state(
        validator,
        auth_middleware,
    ));

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .route("/health", get(billing::handlers::health))
        .nest("/api", api)
        .with_state(state)
        .layer(CompressionLayer::new())
        .layer(cors_layer(&settings.cors_origins))
        .layer(TimeoutLayer::new(settings.request_timeout))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http-request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id
                )
            }),
        )
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}
