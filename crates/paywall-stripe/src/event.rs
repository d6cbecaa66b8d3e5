//! # Webhook Events
//!
//! Typed view of a Stripe event envelope.
//!
//! `WebhookEvent` deliberately has no `Deserialize` impl and no public
//! constructor: the only way to obtain one is through
//! [`WebhookVerifier`](crate::signature::WebhookVerifier), which parses the
//! raw bytes it just authenticated.

use paywall_core::{CheckoutMode, WebhookError};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// Event types this gateway acts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEventType {
    /// `checkout.session.completed`
    CheckoutSessionCompleted,
    /// Anything else; acknowledged without action
    Unhandled(String),
}

impl WebhookEventType {
    pub fn parse(type_name: &str) -> Self {
        match type_name {
            "checkout.session.completed" => WebhookEventType::CheckoutSessionCompleted,
            other => WebhookEventType::Unhandled(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            WebhookEventType::CheckoutSessionCompleted => "checkout.session.completed",
            WebhookEventType::Unhandled(name) => name,
        }
    }
}

impl std::fmt::Display for WebhookEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A verified Stripe event
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookEvent {
    id: Option<String>,
    event_type: WebhookEventType,
    created: Option<i64>,
    livemode: bool,
    object: Value,
}

impl WebhookEvent {
    /// Parse authenticated bytes. Only the verifier calls this.
    pub(crate) fn from_verified_bytes(payload: &[u8]) -> Result<Self, WebhookError> {
        let envelope: EventEnvelope = serde_json::from_slice(payload)
            .map_err(|e| WebhookError::MalformedEvent(e.to_string()))?;

        Ok(Self {
            id: envelope.id,
            event_type: WebhookEventType::parse(&envelope.event_type),
            created: envelope.created,
            livemode: envelope.livemode,
            object: envelope.data.object,
        })
    }

    /// Provider event id (`evt_...`)
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn event_type(&self) -> &WebhookEventType {
        &self.event_type
    }

    /// Unix timestamp the provider created the event at
    pub fn created(&self) -> Option<i64> {
        self.created
    }

    pub fn livemode(&self) -> bool {
        self.livemode
    }

    /// The `data.object` payload
    pub fn object(&self) -> &Value {
        &self.object
    }

    /// Session snapshot, for `checkout.session.completed` events only
    pub fn checkout_session(&self) -> Option<CheckoutSessionSnapshot> {
        match self.event_type {
            WebhookEventType::CheckoutSessionCompleted => {
                Some(CheckoutSessionSnapshot::from_object(&self.object))
            }
            WebhookEventType::Unhandled(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct EventEnvelope {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    created: Option<i64>,
    #[serde(default)]
    livemode: bool,
    data: EventData,
}

#[derive(Deserialize)]
struct EventData {
    object: Value,
}

/// The `data.object` of a completed checkout session.
///
/// Every field tolerates absence: a missing or mistyped value becomes
/// `None` (or an empty map), never an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutSessionSnapshot {
    pub id: Option<String>,
    pub mode: Option<CheckoutMode>,
    pub customer_email: Option<String>,
    pub metadata: HashMap<String, String>,
    pub subscription_id: Option<String>,
    pub payment_status: Option<String>,
    pub amount_total: Option<i64>,
}

impl CheckoutSessionSnapshot {
    pub fn from_object(obj: &Value) -> Self {
        let str_field = |key: &str| obj.get(key).and_then(Value::as_str).map(String::from);

        let customer_email = obj
            .get("customer_details")
            .and_then(|cd| cd.get("email"))
            .and_then(Value::as_str)
            .map(String::from)
            .or_else(|| str_field("customer_email"));

        // Unexpanded subscriptions are ids, expanded ones are objects
        let subscription_id = match obj.get("subscription") {
            Some(Value::String(id)) => Some(id.clone()),
            Some(Value::Object(sub)) => sub.get("id").and_then(Value::as_str).map(String::from),
            _ => None,
        };

        let metadata = obj
            .get("metadata")
            .and_then(Value::as_object)
            .map(|m| {
                m.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            id: str_field("id"),
            mode: obj
                .get("mode")
                .and_then(Value::as_str)
                .and_then(CheckoutMode::parse),
            customer_email,
            metadata,
            subscription_id,
            payment_status: str_field("payment_status"),
            amount_total: obj.get("amount_total").and_then(Value::as_i64),
        }
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    pub fn user_id(&self) -> Option<&str> {
        self.metadata_value("userId")
    }

    pub fn plan_type(&self) -> Option<&str> {
        self.metadata_value("planType")
    }

    pub fn resource_id(&self) -> Option<&str> {
        self.metadata_value("resourceId")
    }
}
