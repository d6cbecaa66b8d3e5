//! # Routes
//!
//! Axum router configuration for the paywall API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    body::Body,
    http::{header, HeaderValue, Method, Response, StatusCode},
    routing::{any, get, post},
    Router,
};
use paywall_core::CorsSettings;
use std::any::Any;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::error;

/// Create the main application router
///
/// Routes:
/// - GET  /health - Health check
///
/// - Checkout (CORS restricted to the configured origins):
///   - POST /api/stripe/create-pay-per-download
///   - POST /api/stripe/create-subscription-checkout
///   - GET  /api/stripe/verify-session?session_id=...
///
/// - Webhooks (no CORS, raw body):
///   - GET|POST /api/stripe/webhook
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.cors);

    let checkout_routes = Router::new()
        .route(
            "/api/stripe/create-pay-per-download",
            post(handlers::create_pay_per_download),
        )
        .route(
            "/api/stripe/create-subscription-checkout",
            post(handlers::create_subscription_checkout),
        )
        .route("/api/stripe/verify-session", get(handlers::verify_session))
        .method_not_allowed_fallback(handlers::checkout_method_not_allowed)
        .layer(cors);

    // Method checks happen in the handler so that every verb gets an answer
    let webhook_routes = Router::new().route("/api/stripe/webhook", any(handlers::stripe_webhook));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(checkout_routes)
        .merge(webhook_routes)
        // Middleware
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        // State
        .with_state(state)
}

/// CORS for the browser-facing endpoints: only listed origins are echoed
fn cors_layer(settings: &CorsSettings) -> CorsLayer {
    let settings = settings.clone();

    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            origin
                .to_str()
                .map(|origin| settings.is_allowed(origin))
                .unwrap_or(false)
        }))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// A panic anywhere below the router becomes a generic 500
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    error!("Request handler panicked: {}", detail);

    let mut response = Response::new(Body::from("Internal Server Error"));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    response
}
