use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tokio::{fs, io::AsyncWriteExt};
use uuid::Uuid;

use super::{BlobPermissions, ConnectionString, ConnectionStringError, Storage, StorageError};

type HmacSha256 = Hmac<Sha256>;

const DEFAULT_ROOT: &str = "uploads";
// Signed URLs point here; the relay itself does not serve blobs,
// so `Endpoint` should name whatever does (a static file server over `Root`).
const DEFAULT_ENDPOINT: &str = "http://localhost:8080";
const SIGNATURE_VERSION: &str = "1";

// Local filesystem storage
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,   // Base directory holding one subdirectory per container
    endpoint: String,     // Public base URL used when minting signed URLs
    signing_key: Vec<u8>, // HMAC key for signed URLs
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>, endpoint: &str, signing_key: &[u8]) -> Self {
        Self {
            base_path: base_path.into(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            signing_key: signing_key.to_vec(),
        }
    }

    pub fn from_connection(conn: &ConnectionString) -> Result<Self, ConnectionStringError> {
        let key = conn.require_account_key()?;
        Ok(Self::new(
            conn.root.as_deref().unwrap_or(DEFAULT_ROOT),
            conn.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT),
            key.as_bytes(),
        ))
    }

    /// Resolves a blob path to a file under the base directory.
    /// Paths that could step outside of it are refused.
    fn get_full_path(&self, container: &str, file_path: &str) -> Result<PathBuf, StorageError> {
        let mut full_path = self.base_path.clone();

        for part in [container, file_path] {
            for component in Path::new(part).components() {
                match component {
                    Component::Normal(segment) => full_path.push(segment),
                    Component::CurDir => {}
                    _ => {
                        return Err(StorageError::UploadError(format!(
                            "Refusing path outside of storage root: {}/{}",
                            container, file_path
                        )));
                    }
                }
            }
        }

        Ok(full_path)
    }

    fn sign(&self, string_to_sign: &str) -> Result<String, StorageError> {
        let mut mac = HmacSha256::new_from_slice(&self.signing_key)
            .map_err(|e| StorageError::SigningError(format!("HMAC error: {}", e)))?;
        mac.update(string_to_sign.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[async_trait]
impl Storage for LocalStorage {
    async fn ensure_container(&self, container: &str) -> Result<(), StorageError> {
        let dir = self.get_full_path(container, "")?;
        fs::create_dir_all(&dir).await?;
        tracing::info!("Local container ready at {:?}", dir);
        Ok(())
    }

    /// Writes content to a file on the local filesystem
    async fn upload(
        &self,
        container: &str,
        path: &str,
        content: Bytes,
        overwrite: bool,
    ) -> Result<(), StorageError> {
        let full_path = self.get_full_path(container, path)?;

        // Ensure parent directories exist
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        if overwrite {
            // Stage next to the target so the rename never crosses filesystems
            let staging = full_path.with_file_name(format!(".{}.part", Uuid::new_v4()));
            fs::write(&staging, &content).await?;
            if let Err(e) = fs::rename(&staging, &full_path).await {
                let _ = fs::remove_file(&staging).await;
                return Err(e.into());
            }
        } else {
            let mut file = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&full_path)
                .await
                .map_err(|e| match e.kind() {
                    ErrorKind::AlreadyExists => {
                        StorageError::AlreadyExists(format!("{}/{}", container, path))
                    }
                    _ => StorageError::IoError(e),
                })?;
            file.write_all(&content).await?;
            file.flush().await?;
        }

        tracing::info!("Saved blob at {:?} ({} bytes)", full_path, content.len());
        Ok(())
    }

    async fn generate_signed_url(
        &self,
        container: &str,
        path: &str,
        permissions: BlobPermissions,
        expiry: DateTime<Utc>,
    ) -> Result<String, StorageError> {
        // Validate the path the same way uploads do
        self.get_full_path(container, path)?;

        let sp = permissions.as_str();
        if sp.is_empty() {
            return Err(StorageError::SigningError(
                "At least one permission is required".to_string(),
            ));
        }

        let se = expiry.to_rfc3339_opts(SecondsFormat::Secs, true);
        let sig = self.sign(&format!("{}\n{}\n/{}/{}", sp, se, container, path))?;

        Ok(format!(
            "{}/{}/{}?sv={}&sp={}&se={}&sig={}",
            self.endpoint,
            urlencoding::encode(container),
            encode_path(path),
            SIGNATURE_VERSION,
            sp,
            urlencoding::encode(&se),
            sig
        ))
    }
}
