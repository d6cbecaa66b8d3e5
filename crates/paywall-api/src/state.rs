//! # Application State
//!
//! Shared state for the Axum application, built once at start-up.
//! Contains the checkout provider, webhook verifier and handler, settings.

use paywall_core::{Settings, SharedCheckoutProvider};
use paywall_stripe::{LoggingWebhookHandler, StripeClient, StripeConfig, WebhookHandler, WebhookVerifier};
use std::sync::Arc;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid socket address {}:{}: {}", self.host, self.port, e))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            environment: "development".to_string(),
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Hosted checkout provider
    pub provider: SharedCheckoutProvider,
    /// Webhook signature verifier (holds the shared secret)
    pub verifier: Arc<WebhookVerifier>,
    /// Side effects for verified events
    pub webhook_handler: Arc<dyn WebhookHandler>,
    /// CORS origins, download price, plan catalog
    pub settings: Arc<Settings>,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Build state from the environment. Fails fast when Stripe secrets are missing.
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();
        let settings = load_settings()?;

        let stripe_config = StripeConfig::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize Stripe: {}", e))?;
        let verifier = WebhookVerifier::new(stripe_config.webhook_secret.clone())
            .with_tolerance(stripe_config.webhook_tolerance_secs);
        let client = StripeClient::new(stripe_config)
            .map_err(|e| anyhow::anyhow!("Failed to initialize Stripe: {}", e))?;

        let stripe = client.config();
        tracing::info!(
            "Stripe: mode={}, api_version={}, webhook tolerance={}s",
            if stripe.is_live_mode() { "live" } else { "test" },
            stripe.api_version,
            verifier.tolerance_secs()
        );
        if config.is_production() && stripe.is_test_mode() {
            tracing::warn!("Running in production with a Stripe test key");
        }

        Ok(Self::from_parts(Arc::new(client), verifier, settings, config))
    }

    /// Assemble state from explicit parts, with the logging webhook handler
    pub fn from_parts(
        provider: SharedCheckoutProvider,
        verifier: WebhookVerifier,
        settings: Settings,
        config: AppConfig,
    ) -> Self {
        Self {
            provider,
            verifier: Arc::new(verifier),
            webhook_handler: Arc::new(LoggingWebhookHandler),
            settings: Arc::new(settings),
            config,
        }
    }

    /// Builder: replace the webhook handler
    pub fn with_webhook_handler(mut self, handler: Arc<dyn WebhookHandler>) -> Self {
        self.webhook_handler = handler;
        self
    }
}

/// Load settings from `PAYWALL_CONFIG` or `config/paywall.toml`, then apply
/// plan prices from the environment
pub fn load_settings() -> anyhow::Result<Settings> {
    let explicit = std::env::var("PAYWALL_CONFIG").ok();
    let mut settings = match explicit {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path, e))?;
            let settings = Settings::from_toml_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
            tracing::info!("Loaded settings from {}", path);
            settings
        }
        None => load_settings_from_default_paths()?,
    };

    settings.plans.apply_env();
    Ok(settings)
}

fn load_settings_from_default_paths() -> anyhow::Result<Settings> {
    let config_paths = [
        "config/paywall.toml",
        "../config/paywall.toml",
        "../../config/paywall.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            let settings = Settings::from_toml_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
            tracing::info!("Loaded settings from {}", path);
            return Ok(settings);
        }
    }

    tracing::warn!("No settings file found, using defaults");
    Ok(Settings::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_defaults() {
        std::env::remove_var("HOST");
        std::env::remove_var("PORT");

        let config = AppConfig::from_env();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_socket_addr() {
        let config = AppConfig {
            host: "0.0.0.0".to_string(),
            port: 3000,
            environment: "test".to_string(),
        };

        let addr = config.socket_addr().unwrap();
        assert_eq!(addr.to_string(), "0.0.0.0:3000");
        assert!(!config.is_production());

        let bad = AppConfig {
            host: "not a host".to_string(),
            ..config
        };
        assert!(bad.socket_addr().is_err());
    }
}
