use std::fmt;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConnectionStringError {
    #[error("Connection string is empty")]
    Empty,

    #[error("Malformed connection string segment: {0}")]
    MalformedSegment(String),

    #[error("Unknown storage provider: {0}")]
    UnknownProvider(String),

    #[error("Connection string is missing {0}")]
    MissingKey(&'static str),
}

/// Which storage service the connection string points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Provider {
    #[default]
    S3,
    Local,
}

/// Parsed `Key=Value;Key=Value` storage secret.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ConnectionString {
    pub provider: Provider,
    pub account_name: Option<String>,
    pub account_key: Option<String>,
    pub endpoint: Option<String>,
    pub region: Option<String>,
    pub root: Option<String>,
}

impl ConnectionString {
    pub fn parse(raw: &str) -> Result<Self, ConnectionStringError> {
        if raw.trim().is_empty() {
            return Err(ConnectionStringError::Empty);
        }

        let mut parsed = ConnectionString::default();

        for segment in raw.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            // Values (account keys in particular) may themselves contain '='
            let (key, value) = segment
                .split_once('=')
                .ok_or_else(|| ConnectionStringError::MalformedSegment(segment.to_string()))?;
            let value = value.trim().to_string();

            match key.trim().to_ascii_lowercase().as_str() {
                "provider" => {
                    parsed.provider = match value.to_ascii_lowercase().as_str() {
                        "s3" => Provider::S3,
                        "local" => Provider::Local,
                        _ => return Err(ConnectionStringError::UnknownProvider(value)),
                    }
                }
                "accountname" => parsed.account_name = Some(value),
                "accountkey" => parsed.account_key = Some(value),
                "endpoint" => parsed.endpoint = Some(value),
                "region" => parsed.region = Some(value),
                "root" => parsed.root = Some(value),
                _ => {}
            }
        }

        Ok(parsed)
    }

    pub fn require_account_key(&self) -> Result<&str, ConnectionStringError> {
        self.account_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(ConnectionStringError::MissingKey("AccountKey"))
    }
}

// Keep the account key out of logs
impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionString")
            .field("provider", &self.provider)
            .field("account_name", &self.account_name)
            .field("account_key", &self.account_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("root", &self.root)
            .finish()
    }
}
