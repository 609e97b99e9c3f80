// crates/trackd-daemon/src/config.rs
//
// Runtime configuration for the trackd daemon.
// Loaded from a TOML file or populated with sensible defaults.

use serde::Deserialize;
use std::fs;

/// Runtime configuration for the daemon.
#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthConfig,
}

/// Listener settings for both protocol faces.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind both listeners to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port for the RPC server.
    #[serde(default = "default_grpc_port")]
    pub grpc_port: u16,

    /// Port for the HTTP/JSON server.
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Seconds the HTTP server gets to drain in-flight requests on
    /// shutdown.
    #[serde(default = "default_http_grace_secs")]
    pub http_grace_secs: u64,
}

/// Token settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HS256 signing secret for both token kinds.
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,

    /// Access token validity window, in minutes.
    #[serde(default = "default_access_token_life")]
    pub access_token_life_minutes: u64,

    /// Refresh token validity window, in hours.
    #[serde(default = "default_refresh_token_life")]
    pub refresh_token_life_hours: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_grpc_port() -> u16 {
    9090
}

fn default_http_port() -> u16 {
    8089
}

fn default_http_grace_secs() -> u64 {
    5
}

fn default_jwt_secret() -> String {
    "this-is-for-test-dont-use-in-production".to_string()
}

fn default_access_token_life() -> u64 {
    15
}

fn default_refresh_token_life() -> u64 {
    170
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            grpc_port: default_grpc_port(),
            http_port: default_http_port(),
            http_grace_secs: default_http_grace_secs(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            access_token_life_minutes: default_access_token_life(),
            refresh_token_life_hours: default_refresh_token_life(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        let config: DaemonConfig = toml::from_str(&contents)?;
        Ok(config)
    }
}
