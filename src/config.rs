use std::{env, fmt, str::FromStr};

use dotenvy::dotenv;
use thiserror::Error;
use validator::Validate;

pub const DEFAULT_CONTAINER: &str = "weez-file-webview";
pub const DEFAULT_SAS_TTL_SECS: i64 = 3600;
pub const DEFAULT_MAX_FILE_SIZE: u64 = 104_857_600;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Parse { name: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}

#[derive(Clone, Validate)]
pub struct Config {
    connection_string: String,
    #[validate(length(min = 3, max = 63))]
    pub container: String,
    #[validate(range(min = 1, max = 604800))] // Max 7 days
    pub sas_ttl_secs: i64,
    #[validate(range(min = 1, max = 1073741824))] // Max 1GiB
    pub max_file_size: u64,
    pub strict_keys: bool,
    pub host: String,
    pub port: u16,
}

impl Config {
    /// Configuration with defaults for everything but the storage secret.
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            container: DEFAULT_CONTAINER.to_string(),
            sas_ttl_secs: DEFAULT_SAS_TTL_SECS,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            strict_keys: true,
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load environment variables from `.env` file (if it exists)
        dotenv().ok();

        let connection_string = env::var("STORAGE_CONNECTION_STRING")
            .or_else(|_| env::var("AZURE_STORAGE_CONNECTION_STRING"))
            .map_err(|_| ConfigError::Missing("STORAGE_CONNECTION_STRING"))?;

        let mut config = Config::new(connection_string);
        if let Ok(container) = env::var("BLOB_CONTAINER_NAME") {
            config.container = container;
        }
        config.sas_ttl_secs = parse_var("SAS_TTL_SECS", config.sas_ttl_secs)?;
        config.max_file_size = parse_var("MAX_FILE_SIZE", config.max_file_size)?;
        config.strict_keys = parse_var("STRICT_BLOB_KEYS", config.strict_keys)?;
        if let Ok(host) = env::var("HOST") {
            config.host = host;
        }
        config.port = parse_var("PORT", config.port)?;

        // Validate configuration values (e.g. TTL range)
        config.validate()?;
        Ok(config)
    }

    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Parse { name, value }),
        Err(_) => Ok(default),
    }
}

// The connection string is a secret
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("connection_string", &"<redacted>")
            .field("container", &self.container)
            .field("sas_ttl_secs", &self.sas_ttl_secs)
            .field("max_file_size", &self.max_file_size)
            .field("strict_keys", &self.strict_keys)
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}
