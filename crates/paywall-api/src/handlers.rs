//! # Request Handlers
//!
//! Axum request handlers for the paywall API.
//! Checkout endpoints speak JSON to the browser; the webhook endpoint speaks
//! plain text to Stripe.

use crate::body::{read_raw_body, WEBHOOK_BODY_LIMIT};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Query, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use paywall_core::{CheckoutMode, CheckoutRequest, LineItem, PaymentError, SessionDetails};
use paywall_stripe::{dispatch_webhook_event, DispatchOutcome, SIGNATURE_HEADER};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{error, info, instrument, warn};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Pay-per-download checkout request
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayPerDownloadRequest {
    #[serde(default)]
    pub resource_id: Option<String>,
    /// Optional; sent to Stripe as an empty string when absent
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub success_url: Option<String>,
    #[serde(default)]
    pub cancel_url: Option<String>,
}

/// Subscription checkout request
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRequest {
    #[serde(default)]
    pub plan_type: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub success_url: Option<String>,
    #[serde(default)]
    pub cancel_url: Option<String>,
}

/// Create checkout response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutResponse {
    /// Checkout URL (redirect user here)
    pub url: String,
    pub session_id: String,
}

/// Query string of the verify-session endpoint
#[derive(Debug, Default, Deserialize)]
pub struct VerifySessionQuery {
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Normalized session for the frontend
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifySessionResponse {
    pub id: String,
    pub mode: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "payment_status")]
    pub payment_status: Option<String>,
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    pub customer_email: Option<String>,
    pub subscription_id: Option<String>,
    pub metadata: HashMap<String, String>,
    pub resource_id: Option<String>,
    pub user_id: Option<String>,
    pub plan_type: Option<String>,
}

impl From<SessionDetails> for VerifySessionResponse {
    fn from(session: SessionDetails) -> Self {
        let helper = |key: &str| {
            session
                .metadata_value(key)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let resource_id = helper("resourceId");
        let user_id = helper("userId");
        let plan_type = helper("planType");

        Self {
            id: session.id,
            mode: session.mode,
            status: session.status,
            payment_status: session.payment_status,
            amount_total: session.amount_total,
            currency: session.currency,
            customer_email: session.customer_email,
            subscription_id: session.subscription_id,
            metadata: session.metadata,
            resource_id,
            user_id,
            plan_type,
        }
    }
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Extra top-level fields (e.g. the expected plan types)
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Map<String, serde_json::Value>>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            error_type: None,
            code: None,
            details: None,
        }
    }

    pub fn with_detail(mut self, key: &str, value: serde_json::Value) -> Self {
        self.details
            .get_or_insert_with(serde_json::Map::new)
            .insert(key.to_string(), value);
        self
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn payment_error_to_response(err: PaymentError) -> ApiError {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if err.is_internal() {
        return (status, Json(ErrorResponse::new("Internal server error")));
    }

    let mut response = ErrorResponse::new(err.to_string());
    response.error_type = err.error_type().map(str::to_string);
    response.code = err.code().map(str::to_string);

    if let PaymentError::UnknownPlan { received, expected } = &err {
        response = response
            .with_detail("receivedPlanType", received.as_str().into())
            .with_detail("expectedPlanTypes", expected.clone().into());
    }

    (status, Json(response))
}

fn json_rejection_to_response(rejection: JsonRejection) -> ApiError {
    warn!("Rejected checkout body: {}", rejection.body_text());
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new(format!(
            "Invalid JSON body: {}",
            rejection.body_text()
        ))),
    )
}

/// A field counts as present when it is a non-empty string
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn missing_fields(fields: &[(&'static str, &Option<String>)]) -> Result<(), PaymentError> {
    let missing: Vec<&'static str> = fields
        .iter()
        .filter(|(_, value)| present(value).is_none())
        .map(|(name, _)| *name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(PaymentError::MissingFields(missing))
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "paywall",
        "version": env!("CARGO_PKG_VERSION"),
        "provider": state.provider.provider_name(),
        "plans": state.settings.plans.price_presence(),
    }))
}

/// Create a one-time checkout for a single resource download
#[instrument(skip(state, payload))]
pub async fn create_pay_per_download(
    State(state): State<AppState>,
    payload: Result<Json<PayPerDownloadRequest>, JsonRejection>,
) -> Result<Json<CreateCheckoutResponse>, ApiError> {
    let Json(request) = payload.map_err(json_rejection_to_response)?;

    missing_fields(&[
        ("resourceId", &request.resource_id),
        ("successUrl", &request.success_url),
        ("cancelUrl", &request.cancel_url),
    ])
    .map_err(payment_error_to_response)?;

    let resource_id = request.resource_id.unwrap_or_default();
    let pricing = &state.settings.download;

    let checkout = CheckoutRequest::new(
        CheckoutMode::Payment,
        request.success_url.unwrap_or_default(),
        request.cancel_url.unwrap_or_default(),
    )
    .with_item(LineItem::Inline {
        name: pricing.product_name(&resource_id),
        currency: pricing.currency,
        unit_amount: pricing.unit_amount,
        quantity: 1,
    })
    .with_payment_method("card")
    .with_metadata("resourceId", resource_id.as_str())
    .with_metadata("userId", request.user_id.unwrap_or_default());

    info!(
        "Creating pay-per-download checkout: resource={}, amount={} {}",
        resource_id, pricing.unit_amount, pricing.currency
    );

    create_session(&state, &checkout).await
}

/// Create a subscription checkout for one of the configured plans
#[instrument(skip(state, payload))]
pub async fn create_subscription_checkout(
    State(state): State<AppState>,
    payload: Result<Json<SubscriptionRequest>, JsonRejection>,
) -> Result<Json<CreateCheckoutResponse>, ApiError> {
    let Json(request) = payload.map_err(json_rejection_to_response)?;

    missing_fields(&[
        ("planType", &request.plan_type),
        ("userId", &request.user_id),
        ("email", &request.email),
        ("successUrl", &request.success_url),
        ("cancelUrl", &request.cancel_url),
    ])
    .map_err(payment_error_to_response)?;

    let plan_type = request.plan_type.unwrap_or_default();
    let price_id = state.settings.plans.price_for(&plan_type).map_err(|e| {
        warn!("Subscription checkout for unknown plan: {}", plan_type);
        let (status, Json(body)) = payment_error_to_response(e);
        let presence = serde_json::to_value(state.settings.plans.price_presence())
            .unwrap_or(serde_json::Value::Null);
        (status, Json(body.with_detail("priceConfigured", presence)))
    })?;

    let checkout = CheckoutRequest::new(
        CheckoutMode::Subscription,
        request.success_url.unwrap_or_default(),
        request.cancel_url.unwrap_or_default(),
    )
    .with_item(LineItem::Price {
        price_id: price_id.to_string(),
        quantity: 1,
    })
    .with_email(request.email.unwrap_or_default())
    .with_metadata("userId", request.user_id.unwrap_or_default())
    .with_metadata("planType", plan_type.as_str());

    info!("Creating subscription checkout: plan={}", plan_type);

    create_session(&state, &checkout).await
}

async fn create_session(
    state: &AppState,
    checkout: &CheckoutRequest,
) -> Result<Json<CreateCheckoutResponse>, ApiError> {
    let session = state
        .provider
        .create_checkout_session(checkout)
        .await
        .map_err(|e| {
            error!("Failed to create checkout: {}", e);
            payment_error_to_response(e)
        })?;

    info!("Created checkout session: {}", session.session_id);

    Ok(Json(CreateCheckoutResponse {
        url: session.checkout_url,
        session_id: session.session_id,
    }))
}

/// Wrong method on a checkout route. A bare `OPTIONS` (not a CORS preflight)
/// gets an empty 204; anything else a JSON 405.
pub async fn checkout_method_not_allowed(method: Method) -> Response {
    if method == Method::OPTIONS {
        return StatusCode::NO_CONTENT.into_response();
    }

    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ErrorResponse::new("Method not allowed")),
    )
        .into_response()
}

/// Retrieve a checkout session and normalize it for the frontend
#[instrument(skip(state, query))]
pub async fn verify_session(
    State(state): State<AppState>,
    Query(query): Query<VerifySessionQuery>,
) -> Result<Json<VerifySessionResponse>, ApiError> {
    let Some(session_id) = present(&query.session_id) else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Missing session_id")),
        ));
    };

    let session = state
        .provider
        .retrieve_checkout_session(session_id)
        .await
        .map_err(|e| {
            error!("Failed to retrieve session {}: {}", session_id, e);
            payment_error_to_response(e)
        })?;

    Ok(Json(session.into()))
}

/// Handle Stripe webhook
///
/// GET answers `OK` so the URL can be checked from a browser. POST requires
/// a signature header; the body is read whole and verified before anything
/// parses it.
#[instrument(skip_all, fields(method = %method))]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Body,
) -> Response {
    if method == Method::GET {
        return (StatusCode::OK, "OK").into_response();
    }

    if method != Method::POST {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            [(header::ALLOW, "GET, POST")],
            "Method Not Allowed",
        )
            .into_response();
    }

    // A header that is not visible ASCII cannot carry a valid signature
    let Some(signature) = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
    else {
        warn!("Webhook request without stripe-signature header");
        return (StatusCode::BAD_REQUEST, "Missing stripe-signature header").into_response();
    };

    let verified = match read_raw_body(body, WEBHOOK_BODY_LIMIT).await {
        Ok(raw) => state.verifier.verify(&raw, Some(signature)),
        Err(e) => Err(e),
    };

    let event = match verified {
        Ok(event) => event,
        Err(e) => {
            warn!("Webhook signature verification failed: {}", e);
            return (StatusCode::BAD_REQUEST, format!("Webhook Error: {}", e)).into_response();
        }
    };

    info!(
        "Received webhook: type={}, id={:?}",
        event.event_type(),
        event.id()
    );

    match dispatch_webhook_event(state.webhook_handler.as_ref(), &event).await {
        Ok(outcome) => {
            if let DispatchOutcome::CheckoutCompleted(session) = &outcome {
                info!("Checkout completed: session={:?}", session.id);
            }
            (
                StatusCode::OK,
                Json(serde_json::json!({ "received": true })),
            )
                .into_response()
        }
        Err(e) => {
            error!("Webhook handler error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}
