//! # Webhook Signature Verification
//!
//! Stripe signs each delivery with a `Stripe-Signature` header:
//!
//! ```text
//! Stripe-Signature: t=1700000000,v1=5257a869e7...,v0=6ffbb59b2300...
//! ```
//!
//! The `v1` digest is `HMAC-SHA256(secret, "{t}." || raw_body)`, hex encoded.
//! Verification runs over the bytes exactly as received; the body is never
//! decoded or re-serialized before the digest is checked.

use crate::event::WebhookEvent;
use chrono::Utc;
use hmac::{Hmac, Mac};
use paywall_core::WebhookError;
use sha2::Sha256;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the signature (lowercase, as `HeaderMap` stores it)
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Default replay window in seconds
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

const EXPECTED_SCHEME: &str = "v1";

/// Verifies signed webhook deliveries against the shared secret
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: String,
    tolerance_secs: i64,
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }

    /// Builder: set the replay window. Zero disables the age check.
    pub fn with_tolerance(mut self, secs: i64) -> Self {
        self.tolerance_secs = secs;
        self
    }

    pub fn tolerance_secs(&self) -> i64 {
        self.tolerance_secs
    }

    /// Verify against the current clock.
    pub fn verify(&self, payload: &[u8], header: Option<&str>) -> Result<WebhookEvent, WebhookError> {
        self.verify_at(payload, header, Utc::now().timestamp())
    }

    /// Verify as if the current unix time were `now`.
    pub fn verify_at(
        &self,
        payload: &[u8],
        header: Option<&str>,
        now: i64,
    ) -> Result<WebhookEvent, WebhookError> {
        let header = header
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or(WebhookError::MissingSignature)?;

        let parsed = parse_signature_header(header)?;

        let mac = signed_payload_mac(&self.secret, parsed.timestamp, payload)?;
        let matched = parsed
            .signatures
            .iter()
            .filter_map(|candidate| hex::decode(candidate).ok())
            .any(|candidate| mac.clone().verify_slice(&candidate).is_ok());

        if !matched {
            return Err(WebhookError::SignatureMismatch);
        }

        let age_secs = now.saturating_sub(parsed.timestamp);
        if self.tolerance_secs > 0 && age_secs > self.tolerance_secs {
            return Err(WebhookError::ExpiredTimestamp {
                age_secs,
                tolerance_secs: self.tolerance_secs,
            });
        }

        debug!(
            candidates = parsed.signatures.len(),
            age_secs, "webhook signature verified"
        );

        WebhookEvent::from_verified_bytes(payload)
    }
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("secret", &"[redacted]")
            .field("tolerance_secs", &self.tolerance_secs)
            .finish()
    }
}

/// Verify a delivery with the default tolerance.
pub fn verify(payload: &[u8], header: &str, secret: &str) -> Result<WebhookEvent, WebhookError> {
    WebhookVerifier::new(secret).verify(payload, Some(header))
}

/// Hex `v1` digest for a payload signed at `timestamp`
pub fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, WebhookError> {
    let mac = signed_payload_mac(secret, timestamp, payload)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// A complete `Stripe-Signature` header value, for tests and local tooling
pub fn signature_header(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, WebhookError> {
    Ok(format!(
        "t={},{}={}",
        timestamp,
        EXPECTED_SCHEME,
        compute_signature(secret, timestamp, payload)?
    ))
}

fn signed_payload_mac(secret: &str, timestamp: i64, payload: &[u8]) -> Result<HmacSha256, WebhookError> {
    // HMAC accepts keys of any length; this only fails on a broken hmac impl
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| WebhookError::SignatureMismatch)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

#[derive(Debug)]
struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<String>,
}

fn parse_signature_header(header: &str) -> Result<SignatureHeader, WebhookError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse::<i64>().ok(),
            EXPECTED_SCHEME => signatures.push(value.to_string()),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        WebhookError::MalformedSignatureHeader("missing or invalid timestamp".to_string())
    })?;

    if signatures.is_empty() {
        return Err(WebhookError::MalformedSignatureHeader(format!(
            "no signatures found with expected scheme {}",
            EXPECTED_SCHEME
        )));
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}
