use std::env;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_ADMIN_KEY: &str = "changeme";

/// Immutable server configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Shared secret expected in the `X-API-KEY` header of admin routes.
    pub admin_api_key: String,
}

impl ServerConfig {
    /// Reads `HOST`, `PORT` and `ADMIN_API_KEY`, with local defaults.
    pub fn from_env() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|port| port.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            admin_api_key: env::var("ADMIN_API_KEY")
                .unwrap_or_else(|_| DEFAULT_ADMIN_KEY.to_string()),
        }
    }
}
