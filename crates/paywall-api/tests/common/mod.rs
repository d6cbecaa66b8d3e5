//! Shared fixtures for router tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{body::Body, http::Response, Router};
use paywall_api::{create_router, AppConfig, AppState};
use paywall_core::{
    CheckoutProvider, CheckoutRequest, CheckoutSession, PaymentError, PaymentResult, PlanCatalog,
    SessionDetails, Settings,
};
use paywall_stripe::{signature_header, CheckoutSessionSnapshot, WebhookHandler, WebhookVerifier};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

pub const WEBHOOK_SECRET: &str = "whsec_router_tests";
pub const ALLOWED_ORIGIN: &str = "https://vasoart.shop";

/// Records every checkout request; retrieval answers from a fixed map
#[derive(Default)]
pub struct FakeProvider {
    pub created: Mutex<Vec<CheckoutRequest>>,
    pub sessions: Mutex<Vec<SessionDetails>>,
}

impl FakeProvider {
    pub fn with_session(self, session: SessionDetails) -> Self {
        self.sessions.lock().unwrap().push(session);
        self
    }

    pub fn created(&self) -> Vec<CheckoutRequest> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl CheckoutProvider for FakeProvider {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> PaymentResult<CheckoutSession> {
        let mut created = self.created.lock().unwrap();
        created.push(request.clone());
        let id = format!("cs_test_{}", created.len());
        Ok(CheckoutSession {
            checkout_url: format!("https://checkout.stripe.com/c/pay/{}", id),
            session_id: id,
        })
    }

    async fn retrieve_checkout_session(&self, session_id: &str) -> PaymentResult<SessionDetails> {
        self.sessions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == session_id)
            .cloned()
            .ok_or_else(|| PaymentError::Provider {
                status: 404,
                message: format!("No such checkout.session: '{}'", session_id),
                error_type: Some("invalid_request_error".into()),
                code: Some("resource_missing".into()),
            })
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}

/// What the webhook handler should do when called
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HandlerMode {
    #[default]
    Record,
    Fail,
    Panic,
}

#[derive(Default)]
pub struct RecordingHandler {
    pub mode: HandlerMode,
    pub calls: AtomicUsize,
    pub sessions: Mutex<Vec<CheckoutSessionSnapshot>>,
}

impl RecordingHandler {
    pub fn new(mode: HandlerMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last(&self) -> Option<CheckoutSessionSnapshot> {
        self.sessions.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl WebhookHandler for RecordingHandler {
    async fn on_checkout_completed(&self, session: &CheckoutSessionSnapshot) -> PaymentResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            HandlerMode::Record => {
                self.sessions.lock().unwrap().push(session.clone());
                Ok(())
            }
            HandlerMode::Fail => Err(PaymentError::Internal("database unavailable".into())),
            HandlerMode::Panic => panic!("handler blew up"),
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub provider: Arc<FakeProvider>,
    pub handler: Arc<RecordingHandler>,
}

pub fn test_settings() -> Settings {
    Settings::default().with_plans(
        PlanCatalog::with_default_plans()
            .with_price("1_month", "price_month")
            .with_price("1_year", "price_year"),
    )
}

pub fn app() -> TestApp {
    app_with(FakeProvider::default(), HandlerMode::Record)
}

pub fn app_with(provider: FakeProvider, mode: HandlerMode) -> TestApp {
    let provider = Arc::new(provider);
    let handler = Arc::new(RecordingHandler::new(mode));

    let state = AppState::from_parts(
        provider.clone(),
        WebhookVerifier::new(WEBHOOK_SECRET),
        test_settings(),
        AppConfig::default(),
    )
    .with_webhook_handler(handler.clone());

    TestApp {
        router: create_router(state),
        provider,
        handler,
    }
}

pub fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

/// A valid `stripe-signature` header for `body` signed at `timestamp`
pub fn sign(body: &[u8], timestamp: i64) -> String {
    signature_header(WEBHOOK_SECRET, timestamp, body).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
