//! # paywall-core
//!
//! Core types and traits for the paywall checkout gateway.
//!
//! This crate provides:
//! - `CheckoutProvider` trait implemented by payment provider clients
//! - `CheckoutRequest`, `CheckoutSession` and `SessionDetails` for the checkout flow
//! - `PlanCatalog` and `DownloadPricing` for what the storefront sells
//! - `Settings` for CORS origins and pricing in one place
//! - `PaymentError` and `WebhookError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use paywall_core::{CheckoutMode, CheckoutRequest, LineItem, Settings};
//!
//! let settings = Settings::default();
//! let price_id = settings.plans.price_for("1_month")?;
//!
//! let request = CheckoutRequest::new(CheckoutMode::Subscription, success_url, cancel_url)
//!     .with_item(LineItem::Price { price_id: price_id.to_string(), quantity: 1 })
//!     .with_email("reader@example.com")
//!     .with_metadata("planType", "1_month");
//!
//! let session = provider.create_checkout_session(&request).await?;
//! // Redirect the browser to session.checkout_url
//! ```

pub mod checkout;
pub mod error;
pub mod plan;
pub mod provider;
pub mod settings;

// Re-exports for convenience
pub use checkout::{
    CheckoutMode, CheckoutRequest, CheckoutSession, Currency, LineItem, SessionDetails,
};
pub use error::{PaymentError, PaymentResult, WebhookError};
pub use plan::{DownloadPricing, PlanCatalog, DEFAULT_PLANS};
pub use provider::{CheckoutProvider, SharedCheckoutProvider};
pub use settings::{CorsSettings, Settings};
