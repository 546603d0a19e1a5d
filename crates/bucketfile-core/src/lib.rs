//! Bucketfile Core Library
//!
//! This crate provides the configuration, request/result types and error taxonomy
//! shared by the file-service adapter and its hosts.

pub mod config;
pub mod error;
pub mod storage_types;
pub mod telemetry;
pub mod types;

// Re-export commonly used types
pub use config::{BucketConfiguration, FileServiceConfig, FileServiceOptions, StorageCredentials};
pub use error::{ErrorKind, FileServiceError, FileServiceResult};
pub use storage_types::StorageBackend;
pub use types::{
    BufferUploadRequest, DeleteRequest, DownloadRequest, JsonUploadRequest, StreamUploadRequest,
    UploadRequest, UploadResult,
};
