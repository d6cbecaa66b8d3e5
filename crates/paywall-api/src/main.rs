//! # Paywall RS
//!
//! Stripe checkout and webhook gateway for the storefront.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export STRIPE_SECRET_KEY=sk_test_...
//! export STRIPE_WEBHOOK_SECRET=whsec_...
//! export STRIPE_PRICE_1_MONTH=price_...
//!
//! # Run the server (LOG_FORMAT=json for structured logs)
//! paywall
//! ```

use paywall_api::{routes, state::AppState};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }

    // Print banner
    print_banner();

    // Initialize application state
    let state = AppState::new()?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Checkout provider: {}", state.provider.provider_name());
    info!("Plans configured: {:?}", state.settings.plans.price_presence());
    info!("Allowed origins: {:?}", state.settings.cors.allowed_origins);

    // Create router
    let app = routes::create_router(state);

    // Start server
    info!("Paywall starting on http://{}", addr);

    if !is_prod {
        info!("Health: http://{}/health", addr);
        info!("Checkout: POST http://{}/api/stripe/create-pay-per-download", addr);
        info!("Webhook: POST http://{}/api/stripe/webhook", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
  Paywall RS
  ━━━━━━━━━━━━━━━━━━━━━━━
  Stripe checkout & webhook gateway
  Version: {}

"#,
        env!("CARGO_PKG_VERSION")
    );
}
