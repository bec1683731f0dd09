//! Borica gateway server binary.
//!
//! Thin axum front over the `borica-gateway` library: parses HTTP, delegates
//! to the library, and maps library errors onto status codes.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tracing::info;

use borica_gateway::{
    borica::{CallbackProcessor, PaymentInitiator},
    config::AppConfig,
    financing::FinancingClient,
    store::WooCommerceStore,
};

mod handlers;

use handlers::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config_path =
        std::env::var("GATEWAY_CONFIG").unwrap_or_else(|_| "gateway.toml".to_owned());
    let config = AppConfig::load(&config_path)?;
    info!(path = %config_path, "configuration loaded");

    let store = Arc::new(WooCommerceStore::new(&config.store)?);
    let state = Arc::new(AppState {
        initiator: PaymentInitiator::new(&config.gateway)?,
        processor: CallbackProcessor::new(&config.gateway, Arc::clone(&store))?,
        store,
        financing: config.financing.as_ref().map(FinancingClient::new).transpose()?,
    });
    if state.financing.is_some() {
        info!("financing integration enabled");
    }

    let app = Router::new()
        .route("/api/payment/initiate", post(handlers::initiate_payment))
        .route(
            "/api/payment/callback",
            post(handlers::payment_notification).get(handlers::payment_return),
        )
        .route("/api/payment/result", get(handlers::payment_return))
        .route("/api/financing/register", post(handlers::register_financing))
        .route(
            "/api/financing/register-product",
            post(handlers::register_product_financing),
        )
        .route("/api/financing/quote", get(handlers::financing_quote))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.server.listen).await?;
    info!(listen = %config.server.listen, "server started");
    axum::serve(listener, app).await?;
    Ok(())
}
