//! # Error Types
//!
//! Typed error handling for the paywall gateway.
//! Checkout operations return `Result<T, PaymentError>`; the webhook path
//! reports its failures through `WebhookError`.

use thiserror::Error;

/// Failures on the inbound webhook path.
///
/// Every variant is a client-side rejection (HTTP 400). Messages never carry
/// the shared secret or the computed digest.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WebhookError {
    /// The request body stream failed before completion
    #[error("failed to read request body: {0}")]
    Transport(String),

    /// No signature header on the request
    #[error("missing stripe-signature header")]
    MissingSignature,

    /// Signature header present but not parseable
    #[error("unable to extract timestamp and signatures from header: {0}")]
    MalformedSignatureHeader(String),

    /// No candidate signature matched the computed digest
    #[error("no signatures found matching the expected signature for payload")]
    SignatureMismatch,

    /// Signature matched but the embedded timestamp is too old
    #[error("timestamp outside the tolerance zone ({age_secs}s old, tolerance {tolerance_secs}s)")]
    ExpiredTimestamp { age_secs: i64, tolerance_secs: i64 },

    /// Authentic bytes that are not a valid event envelope
    #[error("malformed event payload: {0}")]
    MalformedEvent(String),
}

/// Core error type for checkout and dispatch operations
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Required request fields were absent or empty
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    /// Plan type unknown or without a configured price
    #[error("Invalid planType OR missing Stripe price for that plan")]
    UnknownPlan {
        received: String,
        expected: Vec<String>,
    },

    /// Payment provider API error
    #[error("{message}")]
    Provider {
        status: u16,
        message: String,
        error_type: Option<String>,
        code: Option<String>,
    },

    /// Network/HTTP error communicating with provider
    #[error("Network error: {0}")]
    Network(String),

    /// Webhook rejected
    #[error(transparent)]
    Webhook(#[from] WebhookError),

    /// Internal error (side-effect hooks, unexpected state)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PaymentError {
    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            PaymentError::Configuration(_) => 500,
            PaymentError::InvalidRequest(_) => 400,
            PaymentError::MissingFields(_) => 400,
            PaymentError::UnknownPlan { .. } => 400,
            PaymentError::Provider { status, .. } => match *status {
                400..=599 => *status,
                _ => 502,
            },
            PaymentError::Network(_) => 503,
            PaymentError::Webhook(_) => 400,
            PaymentError::Internal(_) => 500,
            PaymentError::Serialization(_) => 500,
        }
    }

    /// Provider error type (e.g. `invalid_request_error`), if any
    pub fn error_type(&self) -> Option<&str> {
        match self {
            PaymentError::Provider { error_type, .. } => error_type.as_deref(),
            _ => None,
        }
    }

    /// Provider error code (e.g. `resource_missing`), if any
    pub fn code(&self) -> Option<&str> {
        match self {
            PaymentError::Provider { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// True for failures that must not leak detail to the client
    pub fn is_internal(&self) -> bool {
        self.status_code() >= 500 && !matches!(self, PaymentError::Provider { .. })
    }
}

/// Result type alias for payment operations
pub type PaymentResult<T> = Result<T, PaymentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(PaymentError::InvalidRequest("test".into()).status_code(), 400);
        assert_eq!(
            PaymentError::MissingFields(vec!["resourceId"]).status_code(),
            400
        );
        assert_eq!(PaymentError::Network("timeout".into()).status_code(), 503);
        assert_eq!(
            PaymentError::from(WebhookError::SignatureMismatch).status_code(),
            400
        );
        assert_eq!(PaymentError::Internal("boom".into()).status_code(), 500);
    }

    #[test]
    fn test_provider_status_passthrough() {
        let err = PaymentError::Provider {
            status: 404,
            message: "No such checkout.session: cs_missing".into(),
            error_type: Some("invalid_request_error".into()),
            code: Some("resource_missing".into()),
        };
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.error_type(), Some("invalid_request_error"));
        assert_eq!(err.code(), Some("resource_missing"));
        assert!(!err.is_internal());
        assert_eq!(err.to_string(), "No such checkout.session: cs_missing");

        let odd = PaymentError::Provider {
            status: 302,
            message: "redirect".into(),
            error_type: None,
            code: None,
        };
        assert_eq!(odd.status_code(), 502);
    }

    #[test]
    fn test_missing_fields_message() {
        let err = PaymentError::MissingFields(vec!["planType", "email"]);
        assert_eq!(err.to_string(), "Missing required fields: planType, email");
    }

    #[test]
    fn test_webhook_messages_do_not_leak_digest() {
        let err = WebhookError::ExpiredTimestamp {
            age_secs: 900,
            tolerance_secs: 300,
        };
        assert!(err.to_string().contains("900s old"));
        assert!(!WebhookError::SignatureMismatch.to_string().contains("whsec_"));
    }
}
