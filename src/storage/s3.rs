use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use aws_config::{BehaviorVersion, meta::region::RegionProviderChain};
use aws_credential_types::Credentials;
use aws_sdk_s3::{Client, presigning::PresigningConfig, primitives::ByteStream};
use aws_types::region::Region;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::info;

use super::{BlobPermissions, ConnectionString, Storage, StorageError};

const DEFAULT_REGION: &str = "us-east-1";

// AWS S3 Storage backend
#[derive(Clone)]
pub struct S3Storage {
    client: Client, // AWS S3 client
}

impl S3Storage {
    /// Build an S3 client from the parsed connection string
    pub async fn new(conn: &ConnectionString) -> Self {
        let region = conn.region.clone().unwrap_or_else(|| DEFAULT_REGION.to_string());
        let region_provider = RegionProviderChain::first_try(Region::new(region))
            .or_default_provider()
            .or_else(Region::new(DEFAULT_REGION));

        let mut aws_config_builder =
            aws_config::defaults(BehaviorVersion::latest()).region(region_provider);

        // Explicit credentials win over the default provider chain
        if let (Some(access_key), Some(secret_key)) = (&conn.account_name, &conn.account_key) {
            let credentials = Credentials::new(
                access_key.clone(),
                secret_key.clone(),
                None,
                None,
                "connection-string",
            );
            aws_config_builder = aws_config_builder.credentials_provider(credentials);
        }

        // Custom endpoint (e.g., for MinIO)
        if let Some(endpoint) = &conn.endpoint {
            aws_config_builder = aws_config_builder.endpoint_url(endpoint);
        }

        let aws_config = aws_config_builder.load().await;

        let client = Client::from_conf(
            aws_sdk_s3::config::Builder::from(&aws_config)
                .force_path_style(conn.endpoint.is_some()) // Required for MinIO
                .build(),
        );

        Self::from_client(client)
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Storage for S3Storage {
    /// Ensure the S3 bucket exists, or create it if possible
    async fn ensure_container(&self, bucket: &str) -> Result<(), StorageError> {
        // First try to create it directly
        let err = match self.client.create_bucket().bucket(bucket).send().await {
            Ok(_) => {
                info!("Bucket {} created successfully", bucket);
                return Ok(());
            }
            Err(e) => e,
        };

        if err.as_service_error().is_some_and(|service_err| {
            service_err.is_bucket_already_owned_by_you() || service_err.is_bucket_already_exists()
        }) {
            info!("Bucket {} already exists", bucket);
            return Ok(());
        }

        tracing::warn!(
            "Could not create bucket {}: {}",
            bucket,
            aws_sdk_s3::error::DisplayErrorContext(&err)
        );

        // Verify if the bucket exists anyway
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => {
                info!("Bucket {} exists (verified)", bucket);
                Ok(())
            }
            Err(check_err) => Err(StorageError::Backend(format!(
                "Bucket {} does not exist and cannot be created: {}",
                bucket,
                aws_sdk_s3::error::DisplayErrorContext(&check_err)
            ))),
        }
    }

    /// Uploads content to S3 bucket
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        content: Bytes,
        overwrite: bool,
    ) -> Result<(), StorageError> {
        let size = content.len();
        let mut request = self
            .client
            .put_object()
            .bucket(bucket)
            .key(path)
            .body(ByteStream::from(content));

        // Conditional write: fails with 412 when the key is already taken
        if !overwrite {
            request = request.if_none_match("*");
        }

        request.send().await.map_err(|e| {
            let msg = aws_sdk_s3::error::DisplayErrorContext(&e).to_string();
            if !overwrite && msg.contains("PreconditionFailed") {
                StorageError::AlreadyExists(format!("{}/{}", bucket, path))
            } else {
                StorageError::UploadError(msg)
            }
        })?;

        info!("Uploaded s3://{}/{} ({} bytes)", bucket, path, size);
        Ok(())
    }

    /// Presigns a GET for the object; S3 presigned URLs carry a single operation
    async fn generate_signed_url(
        &self,
        bucket: &str,
        path: &str,
        permissions: BlobPermissions,
        expiry: DateTime<Utc>,
    ) -> Result<String, StorageError> {
        if permissions != BlobPermissions::read_only() {
            return Err(StorageError::Unsupported(format!(
                "S3 signed URLs only support read-only access, got '{}'",
                permissions.as_str()
            )));
        }

        let now = Utc::now();
        let millis = (expiry - now).num_milliseconds();
        if millis <= 0 {
            return Err(StorageError::SigningError(
                "Expiry must be in the future".to_string(),
            ));
        }
        // Round up so the grant ends at (not before) the requested second
        let expires_in = Duration::from_secs((millis as u64).div_ceil(1000));

        let presigning = PresigningConfig::builder()
            .start_time(SystemTime::from(now))
            .expires_in(expires_in)
            .build()
            .map_err(|e| StorageError::SigningError(e.to_string()))?;

        let presigned = self
            .client
            .get_object()
            .bucket(bucket)
            .key(path)
            .presigned(presigning)
            .await
            .map_err(|e| {
                StorageError::SigningError(aws_sdk_s3::error::DisplayErrorContext(&e).to_string())
            })?;

        Ok(presigned.uri().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::config::{Credentials as AwsCredentials, retry::RetryConfig};

    fn storage_at(endpoint: &str) -> S3Storage {
        let creds = AwsCredentials::new("AKIDEXAMPLE", "secret", None, None, "test");
        let config = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(creds)
            .region(aws_sdk_s3::config::Region::new("us-east-1"))
            .endpoint_url(endpoint)
            .force_path_style(true)
            .retry_config(RetryConfig::disabled())
            .build();
        S3Storage::from_client(Client::from_conf(config))
    }

    fn offline_storage() -> S3Storage {
        storage_at("http://localhost:9000")
    }

    #[tokio::test]
    async fn test_ensure_container_fails_when_unreachable() {
        // Nothing listens on port 1, so both CreateBucket and HeadBucket fail
        let storage = storage_at("http://127.0.0.1:1");

        let result = storage.ensure_container("weez-file-webview").await;

        match result {
            Err(StorageError::Backend(msg)) => assert!(msg.contains("weez-file-webview")),
            other => panic!("expected backend error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_presigned_url_targets_object_and_expiry() {
        let storage = offline_storage();
        let expiry = Utc::now() + chrono::Duration::hours(1);

        let url = storage
            .generate_signed_url(
                "weez-file-webview",
                "alice/report.pdf",
                BlobPermissions::read_only(),
                expiry,
            )
            .await
            .unwrap();

        let (base, query) = url.split_once('?').unwrap();
        assert_eq!(base, "http://localhost:9000/weez-file-webview/alice/report.pdf");
        assert!(query.contains("X-Amz-Signature="));

        let expires: u64 = query
            .split('&')
            .find_map(|pair| pair.strip_prefix("X-Amz-Expires="))
            .unwrap()
            .parse()
            .unwrap();
        assert!((3599..=3600).contains(&expires), "got {}", expires);
    }

    #[tokio::test]
    async fn test_presign_rejects_write_permissions() {
        let storage = offline_storage();
        let perms = BlobPermissions {
            read: true,
            write: true,
            delete: false,
        };

        let result = storage
            .generate_signed_url("b", "k", perms, Utc::now() + chrono::Duration::hours(1))
            .await;
        assert!(matches!(result, Err(StorageError::Unsupported(_))));
    }

    #[tokio::test]
    async fn test_presign_rejects_past_expiry() {
        let storage = offline_storage();
        let result = storage
            .generate_signed_url(
                "b",
                "k",
                BlobPermissions::read_only(),
                Utc::now() - chrono::Duration::seconds(5),
            )
            .await;
        assert!(matches!(result, Err(StorageError::SigningError(_))));
    }
}
