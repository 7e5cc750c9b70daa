use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub pix_gateway: PixGatewayConfig,
    pub card_gateway: CardGatewayConfig,
    #[serde(default)]
    pub platform: PlatformConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_expires_in: i64, // seconds
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PixGatewayConfig {
    pub base_url: String,
    pub access_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardGatewayConfig {
    pub base_url: String,
    pub secret_key: String,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Username of the account that collects marketplace commission.
    pub account_username: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            account_username: "vibra".to_string(),
        }
    }
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        let config_str = std::fs::read_to_string(&config_path)
            .map_err(|e| format!("Failed to read config file {config_path}: {e}"))?;
        let mut config: Config =
            toml::from_str(&config_str).map_err(|e| format!("Failed to parse config file: {e}"))?;

        // Environment overrides take precedence over the file.
        if let Ok(v) = env::var("SERVER_HOST") {
            config.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            config.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            config.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            config.database.max_connections = mc;
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            config.auth.jwt_secret = v;
        }
        if let Ok(v) = env::var("JWT_ACCESS_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            config.auth.access_token_expires_in = n;
        }
        if let Ok(v) = env::var("PIX_GATEWAY_BASE_URL") {
            config.pix_gateway.base_url = v;
        }
        if let Ok(v) = env::var("PIX_GATEWAY_ACCESS_TOKEN") {
            config.pix_gateway.access_token = v;
        }
        if let Ok(v) = env::var("CARD_GATEWAY_BASE_URL") {
            config.card_gateway.base_url = v;
        }
        if let Ok(v) = env::var("CARD_GATEWAY_SECRET_KEY") {
            config.card_gateway.secret_key = v;
        }
        if let Ok(v) = env::var("CARD_GATEWAY_SUCCESS_URL") {
            config.card_gateway.success_url = v;
        }
        if let Ok(v) = env::var("CARD_GATEWAY_CANCEL_URL") {
            config.card_gateway.cancel_url = v;
        }
        if let Ok(v) = env::var("PLATFORM_ACCOUNT_USERNAME") {
            config.platform.account_username = v;
        }

        Ok(config)
    }
}
