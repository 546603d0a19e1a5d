//! `Bucket` implementation on top of any `object_store::ObjectStore`.

use crate::keys::object_path;
use crate::traits::{Bucket, ByteStream, ObjectAcl, ObjectWriter, StorageError, StorageResult};
use async_trait::async_trait;
use futures::StreamExt;
use object_store::buffered::BufWriter;
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{Attribute, Attributes, ObjectStore, ObjectStoreExt};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Produces signed read URLs for objects of one bucket
#[async_trait]
pub trait UrlSigner: Send + Sync {
    async fn sign_read_url(&self, key: &str, expires_in: Duration) -> StorageResult<String>;
}

/// Bucket backed by `object_store`.
///
/// Writes go through a store per ACL so providers that take the ACL as a request
/// header (GCS `x-goog-acl`) can be served by pre-configured clients. Reads,
/// existence checks and deletes use the plain store.
#[derive(Clone)]
pub struct ObjectStoreBucket {
    name: String,
    store: Arc<dyn ObjectStore>,
    public_store: Arc<dyn ObjectStore>,
    private_store: Arc<dyn ObjectStore>,
    signer: Arc<dyn UrlSigner>,
    public_base_url: String,
    uri_scheme: String,
}

impl fmt::Debug for ObjectStoreBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStoreBucket")
            .field("name", &self.name)
            .field("public_base_url", &self.public_base_url)
            .field("uri_scheme", &self.uri_scheme)
            .finish()
    }
}

impl ObjectStoreBucket {
    /// Create a bucket that uses the same store for every ACL.
    ///
    /// # Arguments
    /// * `name` - Bucket name
    /// * `store` - Store scoped to the bucket
    /// * `signer` - Signer for read URLs
    /// * `public_base_url` - Base URL public objects are served from (e.g. "https://storage.googleapis.com/my-bucket/")
    /// * `uri_scheme` - Scheme of storage locators (e.g. "gs")
    pub fn new(
        name: impl Into<String>,
        store: Arc<dyn ObjectStore>,
        signer: Arc<dyn UrlSigner>,
        public_base_url: impl Into<String>,
        uri_scheme: impl Into<String>,
    ) -> Self {
        let mut public_base_url = public_base_url.into();
        if !public_base_url.ends_with('/') {
            public_base_url.push('/');
        }

        Self {
            name: name.into(),
            public_store: store.clone(),
            private_store: store.clone(),
            store,
            signer,
            public_base_url,
            uri_scheme: uri_scheme.into(),
        }
    }

    /// Use dedicated stores for public-read and private writes.
    pub fn with_acl_stores(
        mut self,
        public_store: Arc<dyn ObjectStore>,
        private_store: Arc<dyn ObjectStore>,
    ) -> Self {
        self.public_store = public_store;
        self.private_store = private_store;
        self
    }

    fn writer_store(&self, acl: ObjectAcl) -> Arc<dyn ObjectStore> {
        match acl {
            ObjectAcl::PublicRead => self.public_store.clone(),
            ObjectAcl::Private => self.private_store.clone(),
        }
    }

    fn writer(&self, location: Path, acl: ObjectAcl, content_type: Option<&str>) -> ObjectWriter {
        let writer = BufWriter::new(self.writer_store(acl), location);
        match content_type {
            Some(ct) => {
                let mut attributes = Attributes::new();
                attributes.insert(Attribute::ContentType, ct.to_string().into());
                writer.with_attributes(attributes)
            }
            None => writer,
        }
    }
}

#[async_trait]
impl Bucket for ObjectStoreBucket {
    fn name(&self) -> &str {
        &self.name
    }

    async fn upload_file(
        &self,
        local_path: &std::path::Path,
        key: &str,
        acl: ObjectAcl,
    ) -> StorageResult<()> {
        let location = object_path(key)?;
        let start = std::time::Instant::now();

        let mut file = tokio::fs::File::open(local_path).await.map_err(|e| {
            tracing::error!(
                error = %e,
                path = %local_path.display(),
                "Failed to open upload source"
            );
            StorageError::IoError(e)
        })?;

        let mut writer = self.writer(location, acl, None);
        let result = async {
            let size = tokio::io::copy(&mut file, &mut writer).await?;
            writer.shutdown().await?;
            Ok::<u64, std::io::Error>(size)
        }
        .await;

        let size = match result {
            Ok(size) => size,
            Err(e) => {
                if let Err(abort_err) = writer.abort().await {
                    tracing::warn!(error = %abort_err, key = %key, "Failed to abort upload");
                }
                tracing::error!(
                    error = %e,
                    bucket = %self.name,
                    key = %key,
                    acl = acl.as_str(),
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Object upload failed"
                );
                return Err(StorageError::UploadFailed(e.to_string()));
            }
        };

        tracing::info!(
            bucket = %self.name,
            key = %key,
            acl = acl.as_str(),
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Object upload successful"
        );

        Ok(())
    }

    fn open_write_stream(
        &self,
        key: &str,
        acl: ObjectAcl,
        content_type: Option<&str>,
    ) -> StorageResult<ObjectWriter> {
        let location = object_path(key)?;
        Ok(self.writer(location, acl, content_type))
    }

    async fn open_read_stream(&self, key: &str) -> StorageResult<ByteStream> {
        let location = object_path(key)?;
        let start = std::time::Instant::now();

        let result = self.store.get(&location).await.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(key.to_string()),
            other => {
                tracing::error!(
                    error = %other,
                    bucket = %self.name,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Object download failed"
                );
                StorageError::DownloadFailed(other.to_string())
            }
        })?;

        let bucket = self.name.clone();
        let key = key.to_string();

        let stream = result.into_stream().map(move |res| match res {
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Object stream download error"
                );
                Err(StorageError::DownloadFailed(e.to_string()))
            }
        });

        Ok(Box::pin(stream))
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let location = object_path(key)?;
        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let location = object_path(key)?;
        let start = std::time::Instant::now();

        self.store.delete(&location).await.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.name,
                key = %key,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Object delete failed"
            );
            StorageError::DeleteFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.name,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Object delete successful"
        );

        Ok(())
    }

    async fn signed_url(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        object_path(key)?;
        self.signer.sign_read_url(key, expires_in).await
    }

    fn public_base_url(&self) -> String {
        self.public_base_url.clone()
    }

    fn storage_uri(&self, key: &str) -> String {
        format!("{}://{}/{}", self.uri_scheme, self.name, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;

    struct StaticSigner;

    #[async_trait]
    impl UrlSigner for StaticSigner {
        async fn sign_read_url(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
            Ok(format!("https://signed.example/{}?ttl={}", key, expires_in.as_secs()))
        }
    }

    fn test_bucket() -> ObjectStoreBucket {
        ObjectStoreBucket::new(
            "test-bucket",
            Arc::new(InMemory::new()),
            Arc::new(StaticSigner),
            "https://storage.example/test-bucket",
            "gs",
        )
    }

    #[tokio::test]
    async fn upload_file_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("hello.txt");
        tokio::fs::write(&source, b"hello world").await.unwrap();

        let bucket = test_bucket();
        bucket
            .upload_file(&source, "id/hello/hello.txt", ObjectAcl::PublicRead)
            .await
            .unwrap();

        assert!(bucket.exists("id/hello/hello.txt").await.unwrap());

        let mut stream = bucket.open_read_stream("id/hello/hello.txt").await.unwrap();
        let mut downloaded = Vec::new();
        while let Some(chunk) = stream.next().await {
            downloaded.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(downloaded, b"hello world");
    }

    #[tokio::test]
    async fn reserved_characters_are_stored_verbatim() {
        let store = Arc::new(InMemory::new());
        let bucket = ObjectStoreBucket::new(
            "test-bucket",
            store.clone(),
            Arc::new(StaticSigner),
            "https://storage.example/test-bucket",
            "gs",
        );

        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("report.txt");
        tokio::fs::write(&source, b"q1").await.unwrap();

        let key = "id/report#1~[v2]/report#1~[v2].txt";
        bucket
            .upload_file(&source, key, ObjectAcl::PublicRead)
            .await
            .unwrap();

        let stored: Vec<String> = store
            .list(None)
            .map(|meta| meta.unwrap().location.to_string())
            .collect()
            .await;
        assert_eq!(stored, vec![key.to_string()]);

        let url = bucket.public_url(key);
        let encoded = url
            .strip_prefix("https://storage.example/test-bucket/")
            .unwrap();
        assert_eq!(urlencoding::decode(encoded).unwrap(), key);
        assert_eq!(bucket.storage_uri(key), format!("gs://test-bucket/{}", key));
    }

    #[tokio::test]
    async fn upload_missing_source_is_io_error() {
        let bucket = test_bucket();
        let result = bucket
            .upload_file(
                std::path::Path::new("/definitely/not/here.txt"),
                "id/here/here.txt",
                ObjectAcl::Private,
            )
            .await;
        assert!(matches!(result, Err(StorageError::IoError(_))));
        assert!(!bucket.exists("id/here/here.txt").await.unwrap());
    }

    #[tokio::test]
    async fn write_stream_commits_on_shutdown() {
        let bucket = test_bucket();
        let mut writer = bucket
            .open_write_stream("id/doc/doc.json", ObjectAcl::Private, Some("application/json"))
            .unwrap();
        writer.write_all(b"{\"a\":1}").await.unwrap();
        assert!(!bucket.exists("id/doc/doc.json").await.unwrap());

        writer.shutdown().await.unwrap();
        assert!(bucket.exists("id/doc/doc.json").await.unwrap());
    }

    #[tokio::test]
    async fn read_missing_object_is_not_found() {
        let bucket = test_bucket();
        let result = bucket.open_read_stream("id/none/none.txt").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_removes_object() {
        let bucket = test_bucket();
        let mut writer = bucket
            .open_write_stream("id/a/a.txt", ObjectAcl::PublicRead, None)
            .unwrap();
        writer.write_all(b"a").await.unwrap();
        writer.shutdown().await.unwrap();

        bucket.delete("id/a/a.txt").await.unwrap();
        assert!(!bucket.exists("id/a/a.txt").await.unwrap());
    }

    #[tokio::test]
    async fn invalid_keys_rejected() {
        let bucket = test_bucket();
        assert!(matches!(
            bucket.exists("../secret").await,
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            bucket.delete("/abs").await,
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            bucket.signed_url("", Duration::from_secs(60)).await,
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[test]
    fn urls_and_locators() {
        let bucket = test_bucket();
        assert_eq!(
            bucket.public_base_url(),
            "https://storage.example/test-bucket/"
        );
        assert_eq!(
            bucket.public_url("id/my file/my file.txt"),
            "https://storage.example/test-bucket/id/my%20file/my%20file.txt"
        );
        assert_eq!(
            bucket.storage_uri("id/a/a.txt"),
            "gs://test-bucket/id/a/a.txt"
        );
    }

    #[tokio::test]
    async fn signed_url_delegates_to_signer() {
        let bucket = test_bucket();
        let url = bucket
            .signed_url("id/a/a.txt", Duration::from_secs(900))
            .await
            .unwrap();
        assert_eq!(url, "https://signed.example/id/a/a.txt?ttl=900");
    }
}
