use std::time::Duration;

use async_trait::async_trait;

use crate::core::error::Result;

/// Object storage used for attachment bytes.
///
/// Failures are reported as `AppError::Storage`. The store shares no
/// transaction with the metadata database.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Bucket that keys are written into
    fn bucket_name(&self) -> String;

    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Time-limited download URL for `key`
    async fn presign(&self, key: &str, ttl: Duration) -> Result<String>;
}
