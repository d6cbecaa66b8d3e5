//! # Stripe Checkout Client
//!
//! Thin client over the Checkout Sessions API: create a hosted session,
//! retrieve an existing one. Built once at start-up and shared.

use crate::config::StripeConfig;
use async_trait::async_trait;
use paywall_core::{
    CheckoutProvider, CheckoutRequest, CheckoutSession, LineItem, PaymentError, PaymentResult,
    SessionDetails,
};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, error, info, instrument};

/// Stripe Checkout Sessions client
pub struct StripeClient {
    config: StripeConfig,
    client: Client,
}

impl StripeClient {
    /// Create a new client
    pub fn new(config: StripeConfig) -> PaymentResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| {
                PaymentError::Configuration(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> PaymentResult<Self> {
        Self::new(StripeConfig::from_env()?)
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }

    /// Flatten a checkout request into Stripe's bracketed form encoding
    fn form_params(request: &CheckoutRequest) -> Vec<(String, String)> {
        let mut form_params: Vec<(String, String)> = vec![
            ("mode".to_string(), request.mode.as_str().to_string()),
            ("success_url".to_string(), request.success_url.clone()),
            ("cancel_url".to_string(), request.cancel_url.clone()),
        ];

        for (i, method) in request.payment_method_types.iter().enumerate() {
            form_params.push((format!("payment_method_types[{}]", i), method.clone()));
        }

        for (i, item) in request.line_items.iter().enumerate() {
            match item {
                LineItem::Inline {
                    name,
                    currency,
                    unit_amount,
                    quantity,
                } => {
                    form_params.push((
                        format!("line_items[{}][price_data][currency]", i),
                        currency.as_str().to_string(),
                    ));
                    form_params.push((
                        format!("line_items[{}][price_data][unit_amount]", i),
                        unit_amount.to_string(),
                    ));
                    form_params.push((
                        format!("line_items[{}][price_data][product_data][name]", i),
                        name.clone(),
                    ));
                    form_params.push((format!("line_items[{}][quantity]", i), quantity.to_string()));
                }
                LineItem::Price { price_id, quantity } => {
                    form_params.push((format!("line_items[{}][price]", i), price_id.clone()));
                    form_params.push((format!("line_items[{}][quantity]", i), quantity.to_string()));
                }
            }
        }

        if let Some(ref email) = request.customer_email {
            form_params.push(("customer_email".to_string(), email.clone()));
        }

        let mut keys: Vec<_> = request.metadata.keys().collect();
        keys.sort();
        for key in keys {
            form_params.push((format!("metadata[{}]", key), request.metadata[key].clone()));
        }

        form_params
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
    }

    /// Send a request and return the body of a successful response
    async fn send(&self, builder: RequestBuilder) -> PaymentResult<String> {
        let response = self
            .authorized(builder)
            .send()
            .await
            .map_err(|e| PaymentError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PaymentError::Network(e.to_string()))?;

        if !status.is_success() {
            error!("Stripe API error: status={}, body={}", status, body);

            if let Ok(error_response) = serde_json::from_str::<StripeErrorResponse>(&body) {
                return Err(PaymentError::Provider {
                    status: status.as_u16(),
                    message: error_response
                        .error
                        .message
                        .unwrap_or_else(|| "Stripe error".to_string()),
                    error_type: error_response.error.error_type,
                    code: error_response.error.code,
                });
            }

            return Err(PaymentError::Provider {
                status: status.as_u16(),
                message: format!("HTTP {}: {}", status, body),
                error_type: None,
                code: None,
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl CheckoutProvider for StripeClient {
    #[instrument(skip(self, request), fields(mode = request.mode.as_str(), items = request.line_items.len()))]
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> PaymentResult<CheckoutSession> {
        if request.is_empty() {
            return Err(PaymentError::InvalidRequest(
                "Checkout has no line items".to_string(),
            ));
        }

        let form_params = Self::form_params(request);
        debug!("Creating Stripe checkout session: {} params", form_params.len());

        let url = format!("{}/v1/checkout/sessions", self.config.api_base_url);
        let body = self.send(self.client.post(&url).form(&form_params)).await?;

        let session: StripeSessionObject = serde_json::from_str(&body).map_err(|e| {
            PaymentError::Serialization(format!("Failed to parse Stripe response: {}", e))
        })?;

        let checkout_url = session.url.ok_or_else(|| {
            PaymentError::Serialization("Stripe session has no checkout url".to_string())
        })?;

        info!("Created Stripe checkout session: id={}", session.id);

        Ok(CheckoutSession {
            session_id: session.id,
            checkout_url,
        })
    }

    #[instrument(skip(self))]
    async fn retrieve_checkout_session(&self, session_id: &str) -> PaymentResult<SessionDetails> {
        if session_id.is_empty()
            || !session_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(PaymentError::InvalidRequest(format!(
                "Invalid session id: {:?}",
                session_id
            )));
        }

        let url = format!(
            "{}/v1/checkout/sessions/{}",
            self.config.api_base_url, session_id
        );
        let body = self.send(self.client.get(&url)).await?;

        let session: StripeSessionObject = serde_json::from_str(&body).map_err(|e| {
            PaymentError::Serialization(format!("Failed to parse Stripe response: {}", e))
        })?;

        debug!("Retrieved Stripe checkout session: id={}", session.id);

        Ok(session.into())
    }

    fn provider_name(&self) -> &'static str {
        "stripe"
    }
}

// =============================================================================
// Stripe API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripeSessionObject {
    id: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    payment_status: Option<String>,
    #[serde(default)]
    amount_total: Option<i64>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    customer_email: Option<String>,
    #[serde(default)]
    customer_details: Option<StripeCustomerDetails>,
    #[serde(default)]
    subscription: Option<StripeExpandable>,
    #[serde(default)]
    metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct StripeCustomerDetails {
    #[serde(default)]
    email: Option<String>,
}

/// A field Stripe returns as an id or, when expanded, as an object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StripeExpandable {
    Id(String),
    Object { id: String },
}

impl StripeExpandable {
    fn into_id(self) -> String {
        match self {
            StripeExpandable::Id(id) => id,
            StripeExpandable::Object { id } => id,
        }
    }
}

impl From<StripeSessionObject> for SessionDetails {
    fn from(session: StripeSessionObject) -> Self {
        let customer_email = session
            .customer_details
            .and_then(|cd| cd.email)
            .or(session.customer_email);

        SessionDetails {
            id: session.id,
            mode: session.mode,
            status: session.status,
            payment_status: session.payment_status,
            amount_total: session.amount_total,
            currency: session.currency,
            customer_email,
            subscription_id: session.subscription.map(StripeExpandable::into_id),
            metadata: session.metadata.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "type")]
    error_type: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use paywall_core::{CheckoutMode, Currency};
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> StripeClient {
        let config = StripeConfig::new("sk_test_abc", "whsec_123").with_api_base_url(server.uri());
        StripeClient::new(config).unwrap()
    }

    fn download_request() -> CheckoutRequest {
        CheckoutRequest::new(CheckoutMode::Payment, "https://shop.test/ok", "https://shop.test/no")
            .with_item(LineItem::Inline {
                name: "Resource r1".into(),
                currency: Currency::EUR,
                unit_amount: 199,
                quantity: 1,
            })
            .with_payment_method("card")
            .with_metadata("resourceId", "r1")
            .with_metadata("userId", "")
    }

    #[test]
    fn test_form_params_inline_item() {
        let params = StripeClient::form_params(&download_request());
        let get = |k: &str| {
            params
                .iter()
                .find(|(key, _)| key == k)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(get("mode"), Some("payment"));
        assert_eq!(get("payment_method_types[0]"), Some("card"));
        assert_eq!(get("line_items[0][price_data][currency]"), Some("eur"));
        assert_eq!(get("line_items[0][price_data][unit_amount]"), Some("199"));
        assert_eq!(
            get("line_items[0][price_data][product_data][name]"),
            Some("Resource r1")
        );
        assert_eq!(get("line_items[0][quantity]"), Some("1"));
        assert_eq!(get("metadata[resourceId]"), Some("r1"));
        assert_eq!(get("metadata[userId]"), Some(""));
        assert_eq!(get("customer_email"), None);
    }

    #[test]
    fn test_form_params_price_item() {
        let request = CheckoutRequest::new(CheckoutMode::Subscription, "s", "c")
            .with_item(LineItem::Price {
                price_id: "price_m1".into(),
                quantity: 1,
            })
            .with_email("a@b.com");
        let params = StripeClient::form_params(&request);

        assert!(params.contains(&("line_items[0][price]".into(), "price_m1".into())));
        assert!(params.contains(&("customer_email".into(), "a@b.com".into())));
        assert!(params.contains(&("mode".into(), "subscription".into())));
        assert!(!params.iter().any(|(k, _)| k.starts_with("payment_method_types")));
    }

    #[tokio::test]
    async fn test_create_checkout_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .and(header("Authorization", "Bearer sk_test_abc"))
            .and(header("Stripe-Version", "2024-06-20"))
            .and(body_string_contains("mode=payment"))
            .and(body_string_contains("metadata%5BresourceId%5D=r1"))
            .and(body_string_contains("payment_method_types%5B0%5D=card"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cs_test_1",
                "object": "checkout.session",
                "url": "https://checkout.stripe.com/c/pay/cs_test_1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = client_for(&server)
            .create_checkout_session(&download_request())
            .await
            .unwrap();

        assert_eq!(session.session_id, "cs_test_1");
        assert_eq!(
            session.checkout_url,
            "https://checkout.stripe.com/c/pay/cs_test_1"
        );
    }

    #[tokio::test]
    async fn test_create_rejects_empty_request_without_calling_stripe() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let request = CheckoutRequest::new(CheckoutMode::Payment, "s", "c");
        let err = client_for(&server)
            .create_checkout_session(&request)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_provider_error_is_mapped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {
                    "message": "No such price: 'price_nope'",
                    "type": "invalid_request_error",
                    "code": "resource_missing",
                    "param": "line_items[0][price]"
                }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .create_checkout_session(&download_request())
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), 400);
        assert_eq!(err.to_string(), "No such price: 'price_nope'");
        assert_eq!(err.error_type(), Some("invalid_request_error"));
        assert_eq!(err.code(), Some("resource_missing"));
    }

    #[tokio::test]
    async fn test_retrieve_checkout_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/checkout/sessions/cs_test_9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cs_test_9",
                "mode": "subscription",
                "status": "complete",
                "payment_status": "paid",
                "amount_total": 999,
                "currency": "eur",
                "customer_email": null,
                "customer_details": {"email": "a@b.com"},
                "subscription": "sub_1",
                "metadata": {"userId": "u1", "planType": "1_month"}
            })))
            .mount(&server)
            .await;

        let details = client_for(&server)
            .retrieve_checkout_session("cs_test_9")
            .await
            .unwrap();

        assert_eq!(details.id, "cs_test_9");
        assert_eq!(details.mode.as_deref(), Some("subscription"));
        assert!(details.is_paid());
        assert_eq!(details.amount_total, Some(999));
        assert_eq!(details.customer_email.as_deref(), Some("a@b.com"));
        assert_eq!(details.subscription_id.as_deref(), Some("sub_1"));
        assert_eq!(details.metadata_value("planType"), Some("1_month"));
    }

    #[tokio::test]
    async fn test_retrieve_with_nulls() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/checkout/sessions/cs_test_2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cs_test_2",
                "mode": "payment",
                "amount_total": null,
                "customer_details": null,
                "subscription": null,
                "metadata": null
            })))
            .mount(&server)
            .await;

        let details = client_for(&server)
            .retrieve_checkout_session("cs_test_2")
            .await
            .unwrap();

        assert_eq!(details.amount_total, None);
        assert_eq!(details.customer_email, None);
        assert_eq!(details.subscription_id, None);
        assert!(details.metadata.is_empty());
    }

    #[tokio::test]
    async fn test_retrieve_rejects_path_injection() {
        let server = MockServer::start().await;
        let err = client_for(&server)
            .retrieve_checkout_session("../customers")
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }
}
