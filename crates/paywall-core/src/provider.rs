//! # Checkout Provider Trait
//!
//! Seam between the HTTP layer and the payment provider client.
//! The provider is built once at start-up and injected into the handlers,
//! so tests can swap in a fake.
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │          CheckoutProvider (trait)           │
//! │  ├── create_checkout_session()              │
//! │  ├── retrieve_checkout_session()            │
//! │  └── provider_name()                        │
//! └─────────────────────────────────────────────┘
//!                       ▲
//!               ┌───────┴───────┐
//!               │  StripeClient │
//!               └───────────────┘
//! ```

use crate::checkout::{CheckoutRequest, CheckoutSession, SessionDetails};
use crate::error::PaymentResult;
use async_trait::async_trait;
use std::sync::Arc;

/// Hosted-checkout provider operations
#[async_trait]
pub trait CheckoutProvider: Send + Sync {
    /// Create a hosted checkout session and return its redirect URL.
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> PaymentResult<CheckoutSession>;

    /// Fetch an existing session by id.
    async fn retrieve_checkout_session(&self, session_id: &str) -> PaymentResult<SessionDetails>;

    /// Provider name (for logging)
    fn provider_name(&self) -> &'static str;
}

/// Shared provider handle
pub type SharedCheckoutProvider = Arc<dyn CheckoutProvider>;
