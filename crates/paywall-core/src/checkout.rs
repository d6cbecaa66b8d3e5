//! # Checkout Types
//!
//! Provider-neutral checkout session types: what we ask the provider to
//! create, what it hands back, and the normalized view of a finished session.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Supported currencies (ISO 4217)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    #[default]
    EUR,
    USD,
    GBP,
    RON,
}

impl Currency {
    /// Returns the lowercase ISO 4217 code the provider expects
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::EUR => "eur",
            Currency::USD => "usd",
            Currency::GBP => "gbp",
            Currency::RON => "ron",
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

/// Checkout mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutMode {
    /// One-time payment
    #[default]
    Payment,
    /// Recurring subscription
    Subscription,
}

impl CheckoutMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutMode::Payment => "payment",
            CheckoutMode::Subscription => "subscription",
        }
    }

    /// Parse the provider's mode string; `None` for anything else (e.g. `setup`)
    pub fn parse(mode: &str) -> Option<Self> {
        match mode {
            "payment" => Some(CheckoutMode::Payment),
            "subscription" => Some(CheckoutMode::Subscription),
            _ => None,
        }
    }
}

/// A single line item in a checkout request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineItem {
    /// Inline price, product created on the fly
    Inline {
        name: String,
        currency: Currency,
        unit_amount: i64,
        quantity: u32,
    },
    /// Pre-configured provider price (`price_...`)
    Price { price_id: String, quantity: u32 },
}

/// Everything needed to open a hosted checkout session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub mode: CheckoutMode,
    pub line_items: Vec<LineItem>,
    pub customer_email: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: HashMap<String, String>,
    /// Restricts the methods offered on the hosted page; empty means the
    /// account defaults
    pub payment_method_types: Vec<String>,
}

impl CheckoutRequest {
    pub fn new(
        mode: CheckoutMode,
        success_url: impl Into<String>,
        cancel_url: impl Into<String>,
    ) -> Self {
        Self {
            mode,
            line_items: Vec::new(),
            customer_email: None,
            success_url: success_url.into(),
            cancel_url: cancel_url.into(),
            metadata: HashMap::new(),
            payment_method_types: Vec::new(),
        }
    }

    /// Builder: add a line item
    pub fn with_item(mut self, item: LineItem) -> Self {
        self.line_items.push(item);
        self
    }

    /// Builder: prefill the customer email
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.customer_email = Some(email.into());
        self
    }

    /// Builder: add metadata echoed back in later events
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Builder: allow a payment method type (e.g. `card`)
    pub fn with_payment_method(mut self, method: impl Into<String>) -> Self {
        self.payment_method_types.push(method.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.line_items.is_empty()
    }
}

/// A freshly created hosted checkout session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Provider's session ID (`cs_...`)
    pub session_id: String,
    /// URL to redirect the customer to
    pub checkout_url: String,
}

/// Normalized view of an existing checkout session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDetails {
    pub id: String,
    pub mode: Option<String>,
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    pub customer_email: Option<String>,
    pub subscription_id: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl SessionDetails {
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status.as_deref() == Some("paid")
    }
}
