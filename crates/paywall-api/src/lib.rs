//! # paywall-api
//!
//! HTTP API layer for paywall-rs.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - Checkout endpoints for the storefront
//! - The Stripe webhook endpoint (raw body, signature verified)
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | POST | `/api/stripe/create-pay-per-download` | One-time checkout |
//! | POST | `/api/stripe/create-subscription-checkout` | Subscription checkout |
//! | GET | `/api/stripe/verify-session` | Normalized session |
//! | GET/POST | `/api/stripe/webhook` | Stripe webhook |

pub mod body;
pub mod handlers;
pub mod routes;
pub mod state;

pub use body::{read_raw_body, WEBHOOK_BODY_LIMIT};
pub use routes::create_router;
pub use state::{AppConfig, AppState};
