use crate::bucket::{ObjectStoreBucket, UrlSigner};
use crate::traits::{ObjectAcl, StorageError, StorageResult};
use async_trait::async_trait;
use bucketfile_core::StorageCredentials;
use http::header::{HeaderMap, HeaderValue};
use http::Method;
use object_store::gcp::{GoogleCloudStorage, GoogleCloudStorageBuilder};
use object_store::signer::Signer;
use object_store::ClientOptions;
use std::sync::Arc;
use std::time::Duration;

/// Base URL Google Cloud Storage serves public objects from
pub const GCS_PUBLIC_BASE_URL: &str = "https://storage.googleapis.com";

/// Header carrying the canned ACL on GCS XML API writes
const ACL_HEADER: &str = "x-goog-acl";

/// Signs V4 read URLs with the bucket's credentials
#[derive(Debug, Clone)]
pub struct GcsSigner {
    store: Arc<GoogleCloudStorage>,
}

#[async_trait]
impl UrlSigner for GcsSigner {
    async fn sign_read_url(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        let location = crate::keys::object_path(key)?;
        let url = self
            .store
            .signed_url(Method::GET, &location, expires_in)
            .await
            .map_err(|e| StorageError::SigningFailed(e.to_string()))?;

        Ok(url.to_string())
    }
}

fn build_store(
    bucket: &str,
    credentials: Option<&StorageCredentials>,
    acl: Option<ObjectAcl>,
) -> StorageResult<GoogleCloudStorage> {
    // Picks up GOOGLE_APPLICATION_CREDENTIALS and friends when no explicit
    // credentials are given.
    let mut builder = GoogleCloudStorageBuilder::from_env().with_bucket_name(bucket);

    if let Some(credentials) = credentials {
        builder = builder.with_service_account_key(credentials.to_service_account_json());
    }

    if let Some(acl) = acl {
        let mut headers = HeaderMap::new();
        headers.insert(ACL_HEADER, HeaderValue::from_static(acl.as_str()));
        builder = builder.with_client_options(ClientOptions::new().with_default_headers(headers));
    }

    builder
        .build()
        .map_err(|e| StorageError::ConfigError(e.to_string()))
}

/// Connect to a Google Cloud Storage bucket.
///
/// # Arguments
/// * `bucket` - GCS bucket name
/// * `credentials` - Explicit service-account credentials; `None` uses ambient credentials
pub fn connect_bucket(
    bucket: &str,
    credentials: Option<&StorageCredentials>,
) -> StorageResult<ObjectStoreBucket> {
    let store = Arc::new(build_store(bucket, credentials, None)?);
    let public_store = Arc::new(build_store(bucket, credentials, Some(ObjectAcl::PublicRead))?);
    let private_store = Arc::new(build_store(bucket, credentials, Some(ObjectAcl::Private))?);

    let signer = GcsSigner {
        store: store.clone(),
    };

    tracing::info!(
        bucket = %bucket,
        explicit_credentials = credentials.is_some(),
        "Connected GCS bucket"
    );

    Ok(ObjectStoreBucket::new(
        bucket,
        store,
        Arc::new(signer),
        format!("{}/{}/", GCS_PUBLIC_BASE_URL, bucket),
        "gs",
    )
    .with_acl_stores(public_store, private_store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Bucket;

    #[test]
    fn bucket_urls_follow_gcs_layout() {
        let bucket = connect_bucket("mock-bucket", None).unwrap();

        assert_eq!(bucket.name(), "mock-bucket");
        assert_eq!(
            bucket.public_url("uuid/test-file-1/test-file-1.txt"),
            "https://storage.googleapis.com/mock-bucket/uuid/test-file-1/test-file-1.txt"
        );
        assert_eq!(
            bucket.storage_uri("uuid/test-file-1/test-file-1.txt"),
            "gs://mock-bucket/uuid/test-file-1/test-file-1.txt"
        );
    }
}
