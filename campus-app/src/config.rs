//! Configuration loading from environment.

use std::env;

/// Application configuration.
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub gateway: GatewayConfig,
}

/// Payment gateway wiring.
///
/// Without `GATEWAY_BASE_URL` the server runs against the in-process mock
/// gateway, which is what local development and demos use.
pub enum GatewayConfig {
    Http {
        base_url: String,
        key_id: String,
        key_secret: String,
    },
    Mock {
        key_id: String,
        key_secret: String,
    },
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()?;

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let key_id = env::var("GATEWAY_KEY_ID").unwrap_or_else(|_| "rzp_test_key".to_string());
        let key_secret = env::var("GATEWAY_KEY_SECRET")
            .map_err(|_| anyhow::anyhow!("GATEWAY_KEY_SECRET environment variable is required"))?;

        let gateway = match env::var("GATEWAY_BASE_URL") {
            Ok(base_url) => GatewayConfig::Http {
                base_url,
                key_id,
                key_secret,
            },
            Err(_) => GatewayConfig::Mock { key_id, key_secret },
        };

        Ok(Self {
            port,
            database_url,
            gateway,
        })
    }
}
