//! # Stripe Configuration
//!
//! Configuration management for Stripe integration.
//! All secrets are loaded from environment variables, once, at start-up.

use crate::signature::DEFAULT_TOLERANCE_SECS;
use paywall_core::PaymentError;
use std::env;

const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";
const DEFAULT_API_VERSION: &str = "2024-06-20";

/// Stripe API configuration
#[derive(Clone)]
pub struct StripeConfig {
    /// Secret API key (sk_test_... or sk_live_...)
    pub secret_key: String,

    /// Webhook signing secret (whsec_...)
    pub webhook_secret: String,

    /// Maximum accepted webhook age in seconds
    pub webhook_tolerance_secs: i64,

    /// API base URL (for testing/mocking)
    pub api_base_url: String,

    /// API version
    pub api_version: String,
}

impl StripeConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `STRIPE_SECRET_KEY`
    /// - `STRIPE_WEBHOOK_SECRET`
    ///
    /// Optional:
    /// - `STRIPE_WEBHOOK_TOLERANCE` (seconds, default 300)
    /// - `STRIPE_API_BASE_URL`
    pub fn from_env() -> Result<Self, PaymentError> {
        dotenvy::dotenv().ok();

        let secret_key = env::var("STRIPE_SECRET_KEY").map_err(|_| {
            PaymentError::Configuration("STRIPE_SECRET_KEY not set".to_string())
        })?;

        let webhook_secret = env::var("STRIPE_WEBHOOK_SECRET").map_err(|_| {
            PaymentError::Configuration("STRIPE_WEBHOOK_SECRET not set".to_string())
        })?;

        let webhook_tolerance_secs = match env::var("STRIPE_WEBHOOK_TOLERANCE") {
            Ok(raw) => raw.trim().parse().map_err(|_| {
                PaymentError::Configuration(format!(
                    "STRIPE_WEBHOOK_TOLERANCE must be an integer number of seconds, got {:?}",
                    raw
                ))
            })?,
            Err(_) => DEFAULT_TOLERANCE_SECS,
        };

        let config = Self {
            secret_key,
            webhook_secret,
            webhook_tolerance_secs,
            api_base_url: env::var("STRIPE_API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
            api_version: DEFAULT_API_VERSION.to_string(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Create config with explicit values (for testing)
    pub fn new(secret_key: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            webhook_secret: webhook_secret.into(),
            webhook_tolerance_secs: DEFAULT_TOLERANCE_SECS,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }

    /// Validate key formats
    pub fn validate(&self) -> Result<(), PaymentError> {
        if !self.secret_key.starts_with("sk_test_") && !self.secret_key.starts_with("sk_live_") {
            return Err(PaymentError::Configuration(
                "STRIPE_SECRET_KEY must start with sk_test_ or sk_live_".to_string(),
            ));
        }

        if !self.webhook_secret.starts_with("whsec_") {
            return Err(PaymentError::Configuration(
                "STRIPE_WEBHOOK_SECRET must start with whsec_".to_string(),
            ));
        }

        if self.webhook_tolerance_secs < 0 {
            return Err(PaymentError::Configuration(
                "STRIPE_WEBHOOK_TOLERANCE must not be negative".to_string(),
            ));
        }

        Ok(())
    }

    /// Check if using test keys
    pub fn is_test_mode(&self) -> bool {
        self.secret_key.starts_with("sk_test_")
    }

    /// Check if using live keys
    pub fn is_live_mode(&self) -> bool {
        self.secret_key.starts_with("sk_live_")
    }

    /// Get authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.secret_key)
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Builder: set webhook tolerance
    pub fn with_webhook_tolerance(mut self, secs: i64) -> Self {
        self.webhook_tolerance_secs = secs;
        self
    }
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"[redacted]")
            .field("webhook_secret", &"[redacted]")
            .field("webhook_tolerance_secs", &self.webhook_tolerance_secs)
            .field("api_base_url", &self.api_base_url)
            .field("api_version", &self.api_version)
            .finish()
    }
}
