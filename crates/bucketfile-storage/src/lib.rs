//! Bucketfile Storage Library
//!
//! This crate adapts a host's file operations onto object-storage buckets. It
//! includes the `Bucket` capability, the `FileService` contract and the
//! `CloudStorageService` adapter, with Google Cloud Storage and in-memory backends.
//!
//! # Object key format
//!
//! Every write gets a fresh UUID v4 as its first path segment:
//!
//! - **Uploads of local files**: `{id}/{stem}/{file_name}`
//! - **Streamed content**: `[{path}/]{id}/{stem}/{stem}.{ext}`
//!
//! Keys must not contain `..` or a leading `/`. Key generation is centralized in the
//! `keys` module so all operations stay consistent.

pub mod bucket;
pub mod factory;
#[cfg(feature = "storage-gcs")]
pub mod gcs;
pub(crate) mod keys;
#[cfg(feature = "storage-memory")]
pub mod memory;
pub mod service;
pub mod stream;
pub mod traits;

// Re-export commonly used types
pub use bucket::{ObjectStoreBucket, UrlSigner};
pub use bucketfile_core::StorageBackend;
pub use factory::{build_buckets, create_file_service};
#[cfg(feature = "storage-gcs")]
pub use gcs::GcsSigner;
#[cfg(feature = "storage-memory")]
pub use memory::{in_memory_bucket, LocalSigner};
pub use service::{CloudStorageService, SIGNED_URL_EXPIRY};
pub use stream::{UploadCompletion, UploadStreamDescriptor};
pub use traits::{
    Bucket, ByteStream, DownloadStream, FileService, ObjectAcl, StorageError, StorageResult,
};
