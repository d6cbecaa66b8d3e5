//! # Gateway Settings
//!
//! One configuration structure for everything the storefront tunes:
//! which browser origins may call the checkout endpoints, the download
//! price, and the subscription plan catalog.
//! Loaded from `config/paywall.toml` when present.

use crate::error::{PaymentError, PaymentResult};
use crate::plan::{DownloadPricing, PlanCatalog};
use serde::{Deserialize, Serialize};

/// Cross-origin policy for the browser-facing endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorsSettings {
    /// Origins allowed to call checkout endpoints
    #[serde(default = "default_origins")]
    pub allowed_origins: Vec<String>,
}

fn default_origins() -> Vec<String> {
    vec![
        "https://vasoart.shop".to_string(),
        "https://www.vasoart.shop".to_string(),
        "http://localhost:5173".to_string(),
    ]
}

impl Default for CorsSettings {
    fn default() -> Self {
        Self {
            allowed_origins: default_origins(),
        }
    }
}

impl CorsSettings {
    pub fn is_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|o| o == origin)
    }
}

/// Top-level settings file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub cors: CorsSettings,

    #[serde(default)]
    pub download: DownloadPricing,

    #[serde(default = "PlanCatalog::with_default_plans")]
    pub plans: PlanCatalog,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cors: CorsSettings::default(),
            download: DownloadPricing::default(),
            plans: PlanCatalog::with_default_plans(),
        }
    }
}

impl Settings {
    /// Parse settings from TOML text
    pub fn from_toml_str(content: &str) -> PaymentResult<Self> {
        toml::from_str(content)
            .map_err(|e| PaymentError::Configuration(format!("invalid settings: {}", e)))
    }

    /// Builder: replace the plan catalog
    pub fn with_plans(mut self, plans: PlanCatalog) -> Self {
        self.plans = plans;
        self
    }

    /// Builder: replace the allowed origins
    pub fn with_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cors.allowed_origins = origins.into_iter().map(Into::into).collect();
        self
    }
}
