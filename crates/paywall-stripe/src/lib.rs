//! # paywall-stripe
//!
//! Stripe integration for paywall-rs.
//!
//! - **StripeClient** - Checkout Sessions API (create, retrieve), implements
//!   `paywall_core::CheckoutProvider`
//! - **WebhookVerifier** - `Stripe-Signature` verification over raw bytes
//! - **dispatch_webhook_event** - routes verified events to a `WebhookHandler`
//!
//! ## Webhook Handling
//!
//! ```rust,ignore
//! use paywall_stripe::{dispatch_webhook_event, WebhookHandler, WebhookVerifier};
//!
//! struct Fulfilment;
//!
//! #[async_trait::async_trait]
//! impl WebhookHandler for Fulfilment {
//!     async fn on_checkout_completed(&self, session: &CheckoutSessionSnapshot) -> PaymentResult<()> {
//!         // Unlock the resource for session.user_id()
//!         Ok(())
//!     }
//! }
//!
//! let verifier = WebhookVerifier::new(config.webhook_secret.clone());
//! let event = verifier.verify(&raw_body, signature_header)?;
//! dispatch_webhook_event(&Fulfilment, &event).await?;
//! ```

pub mod client;
pub mod config;
pub mod event;
pub mod signature;
pub mod webhook;

// Re-exports
pub use client::StripeClient;
pub use config::StripeConfig;
pub use event::{CheckoutSessionSnapshot, WebhookEvent, WebhookEventType};
pub use signature::{
    compute_signature, signature_header, verify, WebhookVerifier, DEFAULT_TOLERANCE_SECS,
    SIGNATURE_HEADER,
};
pub use webhook::{dispatch_webhook_event, DispatchOutcome, LoggingWebhookHandler, WebhookHandler};
