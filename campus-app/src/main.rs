//! # Campus Registration Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Initialize the repository and gateway adapters
//! - Create the registration service
//! - Start the HTTP server

mod config;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use campus_gateway::{HttpGateway, MockGateway};
use campus_hex::{RegistrationService, inbound::HttpServer};
use campus_repo::build_repo;

use config::GatewayConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,campus_app=debug,campus_hex=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::from_env()?;

    tracing::info!("Starting registration server on port {}", config.port);
    tracing::info!("Using database: {}", config.database_url);

    // Build repository (handles connection and migration)
    let repo = build_repo(&config.database_url).await?;

    let addr = format!("0.0.0.0:{}", config.port);

    // The server is generic over the gateway, so each wiring gets its own arm.
    match config.gateway {
        GatewayConfig::Http {
            base_url,
            key_id,
            key_secret,
        } => {
            tracing::info!("Using HTTP payment gateway at {}", base_url);
            let gateway = HttpGateway::new(base_url, key_id, key_secret);
            let service = RegistrationService::new(repo, gateway);
            HttpServer::new(service).run(&addr).await?;
        }
        GatewayConfig::Mock { key_id, key_secret } => {
            tracing::warn!("GATEWAY_BASE_URL not set, using in-process mock gateway");
            let gateway = MockGateway::new(key_id, key_secret);
            let service = RegistrationService::new(repo, gateway);
            HttpServer::new(service).run(&addr).await?;
        }
    }

    Ok(())
}
