use std::{env, net::IpAddr, str::FromStr};

use dotenvy::dotenv;
use log::{debug, info, warn};
use serde::Deserialize;

use crate::errors::ConfigError;

// Server-specific configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub workers: usize,
}

// Application-specific configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub name: String,
    pub version: String,
    pub environment: Environment,
    pub log_level: String,
}

// Environment enum for different deployment environments
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Testing,
    Production,
}

// Implement FromStr trait for Environment enum to enable parsing from string
impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "testing" | "test" => Ok(Environment::Testing),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(format!(
                "Invalid environment: {}. Must be one of: development, testing, production",
                s
            )),
        }
    }
}

/// Fixed-window throttle settings
#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    pub requests_per_window: u32,
    pub window_ms: u64,
    /// Finish the response with the 429 instead of letting the handler run
    pub blocking: bool,
    /// Entries idle for `window_ms * evict_factor` are dropped
    pub evict_factor: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_window: 30,
            window_ms: 60 * 1000,
            blocking: false,
            evict_factor: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Sheets,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sheets" | "google" => Ok(StoreBackend::Sheets),
            "memory" | "mem" => Ok(StoreBackend::Memory),
            _ => Err(format!(
                "Invalid store backend: {}. Must be one of: sheets, memory",
                s
            )),
        }
    }
}

// Record store config
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub spreadsheet_id: Option<String>,
    pub sheet_name: String,
    pub api_base: String,
    pub access_token: Option<String>,
    pub timeout_seconds: u64,
}

// Config struct that matches our environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub app: AppConfig,
    pub rate_limit: RateLimitConfig,
    pub store: StoreConfig,
    pub short_code_length: usize,
}

// Result type for configuration functions
type ConfigResult<T> = Result<T, ConfigError>;

impl Config {
    // Load configuration from environment variables
    pub fn load() -> ConfigResult<Self> {
        // Load .env file if it exists
        match dotenv() {
            Ok(_) => debug!(".env file loaded successfully"),
            Err(e) => warn!("Could not load .env file: {}", e),
        }

        let server = ServerConfig {
            host: get_env_or_default("SERVER_HOST", "127.0.0.1")?,
            port: get_env_or_default("SERVER_PORT", "3000")?,
            workers: get_env_or_default("SERVER_WORKERS", "4")?,
        };

        // Get version from Cargo.toml or environment
        let version = option_env!("CARGO_PKG_VERSION")
            .unwrap_or("0.1.0")
            .to_string();

        let app = AppConfig {
            name: get_env_or_default("APP_NAME", "shortin")?,
            version: env::var("APP_VERSION").unwrap_or(version),
            environment: get_env_or_default("APP_ENVIRONMENT", "development")?,
            log_level: get_env_or_default("RUST_LOG", "info")?,
        };

        let rate_limit = RateLimitConfig {
            requests_per_window: get_env_or_default("RATE_LIMIT_REQUESTS", "30")?,
            window_ms: get_env_or_default("RATE_LIMIT_WINDOW_MS", "60000")?,
            blocking: get_env_or_default("RATE_LIMIT_BLOCKING", "false")?,
            evict_factor: get_env_or_default("RATE_LIMIT_EVICT_FACTOR", "10")?,
        };
        if rate_limit.requests_per_window == 0 || rate_limit.window_ms == 0 {
            return Err(ConfigError::ParseError(
                "RATE_LIMIT_REQUESTS and RATE_LIMIT_WINDOW_MS must be positive".to_string(),
            ));
        }

        let store = StoreConfig {
            backend: get_env_or_default("STORE_BACKEND", "sheets")?,
            spreadsheet_id: get_optional_env("SPREADSHEET_ID"),
            sheet_name: get_env_or_default("SHEET_NAME", "Sheet1")?,
            api_base: get_env_or_default("SHEETS_API_BASE", "https://sheets.googleapis.com")?,
            access_token: get_optional_env("GOOGLE_ACCESS_TOKEN"),
            timeout_seconds: get_env_or_default("SHEETS_TIMEOUT_SECONDS", "10")?,
        };

        let short_code_length: usize = get_env_or_default("SHORT_CODE_LENGTH", "6")?;
        if short_code_length == 0 {
            return Err(ConfigError::ParseError(
                "SHORT_CODE_LENGTH must be positive".to_string(),
            ));
        }

        let config = Config {
            server,
            app,
            rate_limit,
            store,
            short_code_length,
        };
        info!("Configuration loaded successfully");

        Ok(config)
    }
}

/// Helper function to get an env variable with a default value
fn get_env_or_default<T: FromStr>(key: &str, default: &str) -> ConfigResult<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|e| ConfigError::ParseError(format!("Could not parse {}: {}", key, e))),
        Err(env::VarError::NotPresent) => {
            debug!("{} not set, using default: {}", key, default);
            default.parse::<T>().map_err(|e| {
                ConfigError::ParseError(format!("Could not parse default for {}: {}", key, e))
            })
        }
        Err(e) => Err(ConfigError::EnvVarError(e)),
    }
}

// Secrets have no default and are never logged
fn get_optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
