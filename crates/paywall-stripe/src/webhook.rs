//! # Webhook Dispatch
//!
//! Routes verified events to a [`WebhookHandler`].
//! Dispatch is total: any event type this gateway does not act on is
//! acknowledged, so Stripe never retries a delivery just because the type is
//! new to us.

use crate::event::{CheckoutSessionSnapshot, WebhookEvent, WebhookEventType};
use async_trait::async_trait;
use paywall_core::PaymentResult;
use tracing::{debug, info};

/// Side effects for verified events.
///
/// This is where fulfilment (granting the download, activating the plan)
/// plugs in. The default implementations only log.
#[async_trait]
pub trait WebhookHandler: Send + Sync {
    /// Called when a checkout session is completed
    async fn on_checkout_completed(&self, session: &CheckoutSessionSnapshot) -> PaymentResult<()> {
        info!(
            session_id = ?session.id,
            mode = ?session.mode,
            email = ?session.customer_email,
            metadata = ?session.metadata,
            subscription = ?session.subscription_id,
            "checkout.session.completed"
        );
        Ok(())
    }
}

/// Default handler: logs completed sessions, persists nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingWebhookHandler;

impl WebhookHandler for LoggingWebhookHandler {}

/// What dispatch did with an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The completed-session hook ran with this snapshot
    CheckoutCompleted(CheckoutSessionSnapshot),
    /// Event type not acted on; delivery still succeeds
    Acknowledged { event_type: String },
}

/// Dispatch a verified event to the appropriate handler method
pub async fn dispatch_webhook_event(
    handler: &dyn WebhookHandler,
    event: &WebhookEvent,
) -> PaymentResult<DispatchOutcome> {
    match event.event_type() {
        WebhookEventType::CheckoutSessionCompleted => {
            let session = CheckoutSessionSnapshot::from_object(event.object());
            handler.on_checkout_completed(&session).await?;
            Ok(DispatchOutcome::CheckoutCompleted(session))
        }
        WebhookEventType::Unhandled(name) => {
            debug!(event_type = %name, event_id = ?event.id(), "unhandled webhook event");
            Ok(DispatchOutcome::Acknowledged {
                event_type: name.clone(),
            })
        }
    }
}
