// Submodules for connection string parsing, local file system storage and S3 storage
pub mod connection;
mod local;
mod s3;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;

pub use connection::{ConnectionString, ConnectionStringError, Provider};
pub use local::LocalStorage;
pub use s3::S3Storage;

use crate::config::Config;

// Storage error types
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Blob not found: {0}")]
    NotFound(String), // Returned when a blob cannot be found

    #[error("Blob already exists: {0}")]
    AlreadyExists(String), // Upload without overwrite hit an existing blob

    #[error("Io Error: {0}")]
    IoError(#[from] std::io::Error), // Wraps standard I/O errors

    #[error("Upload Error: {0}")]
    UploadError(String), // Errors during upload to storage

    #[error("Signing Error: {0}")]
    SigningError(String), // Errors while minting a signed URL

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("{0}")]
    Backend(String), // Any other failure reported by the storage service
}

/// Permissions granted by a signed URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlobPermissions {
    pub read: bool,
    pub write: bool,
    pub delete: bool,
}

impl BlobPermissions {
    pub const fn read_only() -> Self {
        Self {
            read: true,
            write: false,
            delete: false,
        }
    }

    /// Compact permission string in `rwd` order, e.g. `r` or `rw`.
    pub fn as_str(&self) -> String {
        let mut perms = String::with_capacity(3);
        if self.read {
            perms.push('r');
        }
        if self.write {
            perms.push('w');
        }
        if self.delete {
            perms.push('d');
        }
        perms
    }
}

// Async Storage trait
#[async_trait]
pub trait Storage: Send + Sync {
    /// Make sure the container exists, creating it when possible.
    async fn ensure_container(&self, container: &str) -> Result<(), StorageError>;

    /// Write `content` to `path` inside `container`.
    /// With `overwrite` set, an existing blob at that path is replaced.
    async fn upload(
        &self,
        container: &str,
        path: &str,
        content: Bytes,
        overwrite: bool,
    ) -> Result<(), StorageError>;

    /// Mint a URL granting `permissions` on `path` until `expiry`.
    async fn generate_signed_url(
        &self,
        container: &str,
        path: &str,
        permissions: BlobPermissions,
        expiry: DateTime<Utc>,
    ) -> Result<String, StorageError>;
}

// Enum to represent storage backends
#[derive(Clone)]
pub enum StorageBackend {
    Local(LocalStorage), // Local filesystem storage
    S3(S3Storage),       // AWS S3 or any S3-compatible service
}

// Delegates calls to the chosen backend
#[async_trait]
impl Storage for StorageBackend {
    async fn ensure_container(&self, container: &str) -> Result<(), StorageError> {
        match self {
            StorageBackend::Local(s) => s.ensure_container(container).await,
            StorageBackend::S3(s) => s.ensure_container(container).await,
        }
    }

    async fn upload(
        &self,
        container: &str,
        path: &str,
        content: Bytes,
        overwrite: bool,
    ) -> Result<(), StorageError> {
        match self {
            StorageBackend::Local(s) => s.upload(container, path, content, overwrite).await,
            StorageBackend::S3(s) => s.upload(container, path, content, overwrite).await,
        }
    }

    async fn generate_signed_url(
        &self,
        container: &str,
        path: &str,
        permissions: BlobPermissions,
        expiry: DateTime<Utc>,
    ) -> Result<String, StorageError> {
        match self {
            StorageBackend::Local(s) => {
                s.generate_signed_url(container, path, permissions, expiry)
                    .await
            }
            StorageBackend::S3(s) => {
                s.generate_signed_url(container, path, permissions, expiry)
                    .await
            }
        }
    }
}

/// Errors raised while building the storage client at startup.
#[derive(Debug, Error)]
pub enum InitError {
    #[error(transparent)]
    ConnectionString(#[from] ConnectionStringError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

// Initialize the storage backend from the connection string in config
pub async fn init_storage(config: &Config) -> Result<StorageBackend, InitError> {
    let connection = ConnectionString::parse(config.connection_string())?;

    let backend = match connection.provider {
        Provider::S3 => {
            info!("Initializing S3 storage");
            StorageBackend::S3(S3Storage::new(&connection).await)
        }
        Provider::Local => {
            info!("Initializing Local storage");
            StorageBackend::Local(LocalStorage::from_connection(&connection)?)
        }
    };

    backend.ensure_container(&config.container).await?;
    Ok(backend)
}
