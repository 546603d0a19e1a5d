//! Storage abstraction traits
//!
//! `Bucket` is the capability the adapter needs from the object-storage provider.
//! `FileService` is the contract the host framework calls into.

use async_trait::async_trait;
use bucketfile_core::{
    DeleteRequest, DownloadRequest, FileServiceError, FileServiceResult, StreamUploadRequest,
    UploadRequest, UploadResult,
};
use bytes::Bytes;
use futures::Stream;
use object_store::buffered::BufWriter;
use std::path::Path;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

use crate::stream::UploadStreamDescriptor;

/// Provider-level errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Access control applied to a newly written object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectAcl {
    /// Anyone may read the object through its public URL
    PublicRead,
    /// Only authenticated principals (or signed URLs) may read the object
    Private,
}

impl ObjectAcl {
    pub fn for_privacy(is_private: bool) -> Self {
        if is_private {
            ObjectAcl::Private
        } else {
            ObjectAcl::PublicRead
        }
    }

    /// Canned ACL name understood by the provider
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectAcl::PublicRead => "public-read",
            ObjectAcl::Private => "private",
        }
    }
}

/// Stream of object bytes, as returned by `Bucket::open_read_stream`
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// Stream handed to the host by `FileService::get_download_stream`
pub type DownloadStream = Pin<Box<dyn Stream<Item = Result<Bytes, FileServiceError>> + Send>>;

/// Write channel to a single object. The object is committed on `shutdown`.
pub type ObjectWriter = BufWriter;

/// A named bucket in the object-storage provider.
///
/// Keys are full object paths (`{id}/{stem}/{file}`); implementations must reject
/// keys that are empty, absolute, or contain `..` segments with `InvalidKey`.
#[async_trait]
pub trait Bucket: Send + Sync {
    /// Bucket name as known by the provider
    fn name(&self) -> &str;

    /// Upload a local file to `key`
    async fn upload_file(&self, local_path: &Path, key: &str, acl: ObjectAcl)
        -> StorageResult<()>;

    /// Open a write channel to `key`
    fn open_write_stream(
        &self,
        key: &str,
        acl: ObjectAcl,
        content_type: Option<&str>,
    ) -> StorageResult<ObjectWriter>;

    /// Open a read stream over the bytes stored at `key`
    async fn open_read_stream(&self, key: &str) -> StorageResult<ByteStream>;

    /// Check if an object exists
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Delete the object at `key`
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Generate a V4 signed URL granting read access for `expires_in`
    async fn signed_url(&self, key: &str, expires_in: Duration) -> StorageResult<String>;

    /// Provider base URL under which public objects are served, ending in `/`
    fn public_base_url(&self) -> String;

    /// Opaque storage locator, e.g. `gs://bucket/key`
    fn storage_uri(&self, key: &str) -> String;

    /// Public URL of `key`
    fn public_url(&self, key: &str) -> String {
        format!("{}{}", self.public_base_url(), crate::keys::encode_key(key))
    }
}

/// File-service contract invoked by the host framework.
///
/// The host holds an `Arc<dyn FileService>` and calls these six operations;
/// every failure surfaces as a single `FileServiceError`.
#[async_trait]
pub trait FileService: Send + Sync {
    /// Upload a local file with public-read access
    async fn upload(&self, file: UploadRequest) -> FileServiceResult<UploadResult>;

    /// Upload a local file with private access; the url is a signed URL
    async fn upload_protected(&self, file: UploadRequest) -> FileServiceResult<UploadResult>;

    /// Delete an object after checking that it exists
    async fn delete(&self, file: DeleteRequest) -> FileServiceResult<()>;

    /// Open a writable stream to a freshly keyed object
    async fn get_upload_stream_descriptor(
        &self,
        file: StreamUploadRequest,
    ) -> FileServiceResult<UploadStreamDescriptor>;

    /// Open a read stream over an existing object
    async fn get_download_stream(
        &self,
        file: DownloadRequest,
    ) -> FileServiceResult<DownloadStream>;

    /// Sign a read URL for an existing private object
    async fn get_presigned_download_url(
        &self,
        file: DownloadRequest,
    ) -> FileServiceResult<String>;
}
