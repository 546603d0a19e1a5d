#[cfg(feature = "storage-gcs")]
use crate::gcs;
#[cfg(feature = "storage-memory")]
use crate::memory;
use crate::service::CloudStorageService;
use crate::traits::{Bucket, FileService, StorageResult};
use bucketfile_core::{BucketConfiguration, FileServiceConfig, FileServiceResult, StorageBackend};
use std::sync::Arc;

/// Build the (public, private) bucket pair described by `config`.
///
/// In single-bucket mode both handles point at the same bucket.
pub fn build_buckets(
    config: &FileServiceConfig,
) -> StorageResult<(Arc<dyn Bucket>, Arc<dyn Bucket>)> {
    let connect = |name: &str| -> StorageResult<Arc<dyn Bucket>> {
        match config.backend {
            #[cfg(feature = "storage-gcs")]
            StorageBackend::Gcs => Ok(Arc::new(gcs::connect_bucket(
                name,
                config.credentials.as_ref(),
            )?)),

            #[cfg(not(feature = "storage-gcs"))]
            StorageBackend::Gcs => Err(crate::traits::StorageError::ConfigError(
                "GCS storage backend not available (storage-gcs feature not enabled)".to_string(),
            )),

            #[cfg(feature = "storage-memory")]
            StorageBackend::Memory => Ok(Arc::new(memory::in_memory_bucket(name))),

            #[cfg(not(feature = "storage-memory"))]
            StorageBackend::Memory => Err(crate::traits::StorageError::ConfigError(
                "Memory storage backend not available (storage-memory feature not enabled)"
                    .to_string(),
            )),
        }
    };

    match &config.buckets {
        BucketConfiguration::Single { bucket_name } => {
            let bucket = connect(bucket_name)?;
            Ok((bucket.clone(), bucket))
        }
        BucketConfiguration::Split {
            public_bucket_name,
            private_bucket_name,
        } => Ok((connect(public_bucket_name)?, connect(private_bucket_name)?)),
    }
}

/// Create a file service based on configuration
pub async fn create_file_service(
    config: FileServiceConfig,
) -> FileServiceResult<Arc<dyn FileService>> {
    let service = CloudStorageService::new(config).await?;
    Ok(Arc::new(service))
}

/// Create a file service for testing (uses in-memory buckets)
#[cfg(all(test, feature = "storage-memory"))]
pub async fn create_test_file_service() -> FileServiceResult<Arc<dyn FileService>> {
    let config = FileServiceConfig::split("test-public", "test-private")
        .with_backend(StorageBackend::Memory);
    create_file_service(config).await
}
