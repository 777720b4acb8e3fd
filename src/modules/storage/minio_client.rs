//! MinIO/S3-compatible storage client
//!
//! Stores evaluation photos and report files and hands out presigned
//! download URLs. Objects are never public.
//!
//! Uses rust-s3 crate for lightweight S3 operations.

use std::time::Duration;

use async_trait::async_trait;
use s3::creds::Credentials;
use s3::{Bucket, BucketConfiguration, Region};
use tracing::{debug, info, warn};

use crate::core::config::MinIOConfig;
use crate::core::error::{AppError, Result};
use crate::modules::storage::BlobStore;

/// S3 rejects presigned URLs valid for more than seven days
const MAX_PRESIGN_SECS: u64 = 7 * 24 * 60 * 60;

/// MinIO/S3-compatible storage client
pub struct MinIOClient {
    bucket: Box<Bucket>,
    region: Region,
    credentials: Credentials,
    endpoint: String,
}

impl MinIOClient {
    /// Create a new MinIO client from configuration and make sure the bucket exists
    pub async fn new(config: MinIOConfig) -> Result<Self> {
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| AppError::Internal(format!("Failed to create MinIO credentials: {}", e)))?;

        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };

        let mut bucket = Bucket::new(&config.bucket, region.clone(), credentials.clone())
            .map_err(|e| AppError::Internal(format!("Failed to create MinIO bucket: {}", e)))?;

        // Use path-style URLs for MinIO (http://endpoint/bucket instead of http://bucket.endpoint)
        bucket.set_path_style();

        let client = Self {
            bucket,
            region,
            credentials,
            endpoint: config.endpoint,
        };

        client.ensure_bucket_exists().await?;

        info!(
            "MinIO client initialized for endpoint: {}, bucket: {}",
            client.endpoint,
            client.bucket.name()
        );

        Ok(client)
    }

    /// Ensure the bucket exists, create if not
    pub async fn ensure_bucket_exists(&self) -> Result<()> {
        match self.create_bucket().await {
            Ok(_) => {
                info!("Bucket '{}' created successfully", self.bucket.name());
                Ok(())
            }
            Err(e) => {
                let error_str = e.to_string();
                if error_str.contains("BucketAlreadyOwnedByYou")
                    || error_str.contains("BucketAlreadyExists")
                    || error_str.contains("already own it")
                {
                    debug!("Bucket '{}' already exists", self.bucket.name());
                } else {
                    warn!(
                        "Could not create bucket '{}': {}. Assuming it exists.",
                        self.bucket.name(),
                        e
                    );
                }
                Ok(())
            }
        }
    }

    async fn create_bucket(&self) -> Result<()> {
        Bucket::create_with_path_style(
            &self.bucket.name(),
            self.region.clone(),
            self.credentials.clone(),
            BucketConfiguration::default(),
        )
        .await
        .map_err(|e| {
            AppError::Storage(format!(
                "Failed to create bucket '{}': {}",
                self.bucket.name(),
                e
            ))
        })?;

        Ok(())
    }

    fn check_status(status: u16, action: &str, key: &str) -> Result<()> {
        if (200..300).contains(&status) {
            Ok(())
        } else {
            Err(AppError::Storage(format!(
                "Failed to {} '{}': storage responded with status {}",
                action, key, status
            )))
        }
    }

    fn presign_secs(ttl: Duration) -> u32 {
        // Both bounds fit in u32
        ttl.as_secs().clamp(1, MAX_PRESIGN_SECS) as u32
    }
}

#[async_trait]
impl BlobStore for MinIOClient {
    fn bucket_name(&self) -> String {
        self.bucket.name()
    }

    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<()> {
        let response = self
            .bucket
            .put_object_with_content_type(key, &data, content_type)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to upload file '{}': {}", key, e)))?;

        Self::check_status(response.status_code(), "upload file", key)?;

        debug!(
            "Uploaded file '{}' ({} bytes) to bucket '{}'",
            key,
            data.len(),
            self.bucket.name()
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let response = self
            .bucket
            .delete_object(key)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to delete file '{}': {}", key, e)))?;

        Self::check_status(response.status_code(), "delete file", key)?;

        debug!(
            "Deleted file '{}' from bucket '{}'",
            key,
            self.bucket.name()
        );
        Ok(())
    }

    async fn presign(&self, key: &str, ttl: Duration) -> Result<String> {
        self.bucket
            .presign_get(key, Self::presign_secs(ttl), None)
            .await
            .map_err(|e| {
                AppError::Storage(format!(
                    "Failed to generate presigned URL for '{}': {}",
                    key, e
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presign_secs_clamped() {
        assert_eq!(MinIOClient::presign_secs(Duration::from_secs(3600)), 3600);
        assert_eq!(MinIOClient::presign_secs(Duration::ZERO), 1);
        assert_eq!(
            MinIOClient::presign_secs(Duration::from_secs(30 * 24 * 3600)),
            MAX_PRESIGN_SECS as u32
        );
    }

    #[test]
    fn test_check_status() {
        assert!(MinIOClient::check_status(200, "upload file", "k").is_ok());
        assert!(MinIOClient::check_status(204, "delete file", "k").is_ok());
        assert!(matches!(
            MinIOClient::check_status(403, "upload file", "k"),
            Err(AppError::Storage(_))
        ));
    }
}
