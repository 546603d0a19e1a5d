//! Storage-facade adapter.
//!
//! `CloudStorageService` turns the host's file operations into bucket calls. It
//! derives destination keys, picks the public or private bucket per call, and
//! wraps every provider failure into a single `FileServiceError`.

use crate::factory::build_buckets;
use crate::keys;
use crate::stream::{pipe_to_object, spawn_upload, UploadStreamDescriptor};
use crate::traits::{Bucket, DownloadStream, FileService, ObjectAcl, StorageError};
use async_trait::async_trait;
use bucketfile_core::{
    BufferUploadRequest, DeleteRequest, DownloadRequest, FileServiceConfig, FileServiceError,
    FileServiceResult, JsonUploadRequest, StreamUploadRequest, UploadRequest, UploadResult,
};
use bytes::Bytes;
use futures::StreamExt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Lifetime of signed read URLs
pub const SIGNED_URL_EXPIRY: Duration = Duration::from_secs(15 * 60);

/// File service backed by one bucket, or a public/private bucket pair.
#[derive(Clone)]
pub struct CloudStorageService {
    public_bucket: Arc<dyn Bucket>,
    private_bucket: Arc<dyn Bucket>,
    base_public_url: Option<String>,
}

impl CloudStorageService {
    /// Build the service and its bucket clients from validated configuration.
    pub async fn new(config: FileServiceConfig) -> FileServiceResult<Self> {
        config.validate()?;

        let (public_bucket, private_bucket) = build_buckets(&config)
            .map_err(|e| FileServiceError::InvalidConfig(e.to_string()))?;

        tracing::info!(
            backend = %config.backend,
            public_bucket = %public_bucket.name(),
            private_bucket = %private_bucket.name(),
            cdn_rewrite = config.base_public_url.is_some(),
            "Cloud storage file service initialized"
        );

        Ok(Self::with_buckets(
            public_bucket,
            private_bucket,
            config.base_public_url,
        ))
    }

    /// Build the service from bucket handles owned by the caller.
    ///
    /// Pass the same handle twice for single-bucket mode.
    pub fn with_buckets(
        public_bucket: Arc<dyn Bucket>,
        private_bucket: Arc<dyn Bucket>,
        base_public_url: Option<String>,
    ) -> Self {
        Self {
            public_bucket,
            private_bucket,
            base_public_url,
        }
    }

    fn bucket(&self, is_private: bool) -> &Arc<dyn Bucket> {
        if is_private {
            &self.private_bucket
        } else {
            &self.public_bucket
        }
    }

    /// Public URL of `key`, rewritten onto `base_public_url` when configured.
    fn public_url(&self, bucket: &dyn Bucket, key: &str) -> String {
        let url = bucket.public_url(key);
        match &self.base_public_url {
            Some(base) => rewrite_public_url(&url, &bucket.public_base_url(), base),
            None => url,
        }
    }

    /// URL returned for streamed uploads: public URL, or an opaque locator.
    fn resolve_url(&self, bucket: &dyn Bucket, key: &str, is_private: bool) -> String {
        if is_private {
            bucket.storage_uri(key)
        } else {
            self.public_url(bucket, key)
        }
    }

    async fn ensure_exists(
        &self,
        bucket: &dyn Bucket,
        key: &str,
        context: &str,
    ) -> FileServiceResult<()> {
        match bucket.exists(key).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                tracing::debug!(bucket = %bucket.name(), key = %key, "Object not found");
                Err(FileServiceError::not_found())
            }
            Err(e) => Err(provider_error(context, e)),
        }
    }

    async fn upload_local(
        &self,
        file: &UploadRequest,
        is_private: bool,
    ) -> FileServiceResult<UploadResult> {
        let context = if is_private {
            "Upload protected file error"
        } else {
            "Upload file error"
        };

        let id = keys::generate_object_id();
        let key = keys::upload_key(&id, &file.original_name)
            .ok_or_else(|| FileServiceError::InvalidData("File name is required".to_string()))?;

        let bucket = self.bucket(is_private);
        bucket
            .upload_file(&file.path, &key, ObjectAcl::for_privacy(is_private))
            .await
            .map_err(|e| provider_error(context, e))?;

        let url = if is_private {
            bucket
                .signed_url(&key, SIGNED_URL_EXPIRY)
                .await
                .map_err(|e| provider_error(context, e))?
        } else {
            self.public_url(bucket.as_ref(), &key)
        };

        Ok(UploadResult { url, key })
    }

    /// Write `data` to `key` through an upload stream session and wait for it.
    async fn write_object(
        &self,
        bucket: &dyn Bucket,
        key: &str,
        is_private: bool,
        content_type: Option<&str>,
        data: Bytes,
        context: &str,
    ) -> FileServiceResult<()> {
        let writer = bucket
            .open_write_stream(key, ObjectAcl::for_privacy(is_private), content_type)
            .map_err(|e| provider_error(context, e))?;

        spawn_upload(std::io::Cursor::new(data), writer, bucket.name(), key)
            .await
            .map(|_| ())
    }

    /// Serialize `file.data` to JSON and store it under `{id}/{stem}/{stem}.json`.
    ///
    /// Any extension on `file.name` is replaced by `.json`. Returns once the
    /// object is committed.
    #[tracing::instrument(skip(self, file), fields(name = %file.name))]
    pub async fn upload_stream_json(
        &self,
        file: JsonUploadRequest,
    ) -> FileServiceResult<UploadResult> {
        let is_private = file.is_private();
        let id = keys::generate_object_id();
        let key = keys::object_key(file.path.as_deref(), &id, &file.name, Some("json"))
            .ok_or_else(|| FileServiceError::InvalidData("File name is required".to_string()))?;

        let data = serde_json::to_vec(&file.data)
            .map_err(|e| FileServiceError::InvalidData(format!("Invalid JSON payload: {}", e)))?;

        let bucket = self.bucket(is_private);
        self.write_object(
            bucket.as_ref(),
            &key,
            is_private,
            Some("application/json"),
            Bytes::from(data),
            "Upload json file error",
        )
        .await?;

        let url = self.resolve_url(bucket.as_ref(), &key, is_private);
        Ok(UploadResult { url, key })
    }

    /// Store an in-memory buffer under `{id}/{stem}/{stem}.{ext}`.
    ///
    /// Fails with `InvalidData` before touching the bucket when neither `file.ext`
    /// nor `file.name` provides an extension. Returns once the object is committed.
    #[tracing::instrument(skip(self, file), fields(name = %file.name, size_bytes = file.data.len()))]
    pub async fn upload_stream(
        &self,
        file: BufferUploadRequest,
    ) -> FileServiceResult<UploadResult> {
        let ext = file
            .ext
            .as_deref()
            .and_then(keys::normalize_extension)
            .or_else(|| keys::file_extension(&file.name))
            .ok_or_else(|| {
                FileServiceError::InvalidData("File extension is required".to_string())
            })?;

        let is_private = file.is_private();
        let id = keys::generate_object_id();
        let key = keys::object_key(file.path.as_deref(), &id, &file.name, Some(&ext))
            .ok_or_else(|| FileServiceError::InvalidData("File name is required".to_string()))?;

        let bucket = self.bucket(is_private);
        self.write_object(
            bucket.as_ref(),
            &key,
            is_private,
            None,
            file.data,
            "Upload file stream error",
        )
        .await?;

        let url = self.resolve_url(bucket.as_ref(), &key, is_private);
        Ok(UploadResult { url, key })
    }
}

/// Replace the provider's public base URL with `base_public_url`.
///
/// URLs that do not start with `canonical_base` are returned unchanged.
pub fn rewrite_public_url(url: &str, canonical_base: &str, base_public_url: &str) -> String {
    match url.strip_prefix(canonical_base) {
        Some(rest) => format!(
            "{}/{}",
            base_public_url.trim_end_matches('/'),
            rest.trim_start_matches('/')
        ),
        None => url.to_string(),
    }
}

/// Wrap a provider failure. Malformed keys surface as `InvalidData`.
fn provider_error(context: &str, err: StorageError) -> FileServiceError {
    match err {
        StorageError::InvalidKey(msg) => FileServiceError::InvalidData(msg),
        other => FileServiceError::unexpected(context, other),
    }
}

async fn remove_temp_file(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "Removed upload source"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            error = %e,
            path = %path.display(),
            "Failed to remove upload source"
        ),
    }
}

#[async_trait]
impl FileService for CloudStorageService {
    #[tracing::instrument(skip(self, file), fields(original_name = %file.original_name))]
    async fn upload(&self, file: UploadRequest) -> FileServiceResult<UploadResult> {
        let result = self.upload_local(&file, false).await;
        remove_temp_file(&file.path).await;
        result
    }

    #[tracing::instrument(skip(self, file), fields(original_name = %file.original_name))]
    async fn upload_protected(&self, file: UploadRequest) -> FileServiceResult<UploadResult> {
        let result = self.upload_local(&file, true).await;
        remove_temp_file(&file.path).await;
        result
    }

    #[tracing::instrument(skip(self, file), fields(key = %file.file_key, is_private = file.is_private()))]
    async fn delete(&self, file: DeleteRequest) -> FileServiceResult<()> {
        let bucket = self.bucket(file.is_private());
        self.ensure_exists(bucket.as_ref(), &file.file_key, "Delete file error")
            .await?;

        bucket
            .delete(&file.file_key)
            .await
            .map_err(|e| provider_error("Delete file error", e))
    }

    #[tracing::instrument(skip(self, file), fields(name = %file.name, is_private = file.is_private()))]
    async fn get_upload_stream_descriptor(
        &self,
        file: StreamUploadRequest,
    ) -> FileServiceResult<UploadStreamDescriptor> {
        let is_private = file.is_private();
        let ext = file
            .ext
            .as_deref()
            .and_then(keys::normalize_extension)
            .or_else(|| keys::file_extension(&file.name));

        let id = keys::generate_object_id();
        let key = keys::object_key(file.path.as_deref(), &id, &file.name, ext.as_deref())
            .ok_or_else(|| FileServiceError::InvalidData("File name is required".to_string()))?;

        let bucket = self.bucket(is_private);
        let writer = bucket
            .open_write_stream(&key, ObjectAcl::for_privacy(is_private), None)
            .map_err(|e| provider_error("Upload file stream error", e))?;

        let (writer, completion) = pipe_to_object(writer, bucket.name(), &key);

        // resolved before the upload completes; callers await `completion`
        let url = self.resolve_url(bucket.as_ref(), &key, is_private);

        Ok(UploadStreamDescriptor {
            writer,
            completion,
            url,
            key,
        })
    }

    #[tracing::instrument(skip(self, file), fields(key = %file.file_key, is_private = file.is_private()))]
    async fn get_download_stream(
        &self,
        file: DownloadRequest,
    ) -> FileServiceResult<DownloadStream> {
        let bucket = self.bucket(file.is_private());
        self.ensure_exists(bucket.as_ref(), &file.file_key, "Download stream file error")
            .await?;

        let stream = bucket
            .open_read_stream(&file.file_key)
            .await
            .map_err(|e| match e {
                StorageError::NotFound(_) => FileServiceError::not_found(),
                other => provider_error("Download stream file error", other),
            })?;

        Ok(Box::pin(stream.map(|chunk| {
            chunk.map_err(|e| provider_error("Download stream file error", e))
        })))
    }

    #[tracing::instrument(skip(self, file), fields(key = %file.file_key))]
    async fn get_presigned_download_url(
        &self,
        file: DownloadRequest,
    ) -> FileServiceResult<String> {
        // presigned URLs are only offered for private storage
        let bucket = self.bucket(true);
        self.ensure_exists(bucket.as_ref(), &file.file_key, "Download presigned url error")
            .await?;

        bucket
            .signed_url(&file.file_key, SIGNED_URL_EXPIRY)
            .await
            .map_err(|e| provider_error("Download presigned url error", e))
    }
}
