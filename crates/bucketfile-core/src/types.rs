//! Request and result types exchanged between the host and the file service.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A file already written to local disk by the host's upload middleware.
///
/// The file at `path` is treated as a temporary: it is removed once the
/// upload attempt finishes, whatever the outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub path: PathBuf,
    #[serde(alias = "originalname")]
    pub original_name: String,
}

impl UploadRequest {
    pub fn new(path: impl Into<PathBuf>, original_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            original_name: original_name.into(),
        }
    }
}

/// Outcome of a successful upload.
///
/// `url` is a public (or CDN) URL for public objects, and a signed URL or an
/// opaque `gs://` locator for private ones. `key` addresses the object in
/// later delete/download/sign calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    pub url: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    pub file_key: String,
    #[serde(default)]
    pub is_private: Option<bool>,
}

impl DeleteRequest {
    pub fn new(file_key: impl Into<String>) -> Self {
        Self {
            file_key: file_key.into(),
            is_private: None,
        }
    }

    pub fn public(mut self) -> Self {
        self.is_private = Some(false);
        self
    }

    /// Deletes target the private bucket unless told otherwise.
    pub fn is_private(&self) -> bool {
        self.is_private.unwrap_or(true)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    pub file_key: String,
    #[serde(default)]
    pub is_private: Option<bool>,
}

impl DownloadRequest {
    pub fn new(file_key: impl Into<String>) -> Self {
        Self {
            file_key: file_key.into(),
            is_private: None,
        }
    }

    pub fn public(mut self) -> Self {
        self.is_private = Some(false);
        self
    }

    pub fn is_private(&self) -> bool {
        self.is_private.unwrap_or(true)
    }
}

/// Request for a writable upload stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamUploadRequest {
    pub name: String,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub is_private: Option<bool>,
    /// Optional logical sub-path prepended to the generated key
    #[serde(default)]
    pub path: Option<String>,
}

impl StreamUploadRequest {
    pub fn is_private(&self) -> bool {
        self.is_private.unwrap_or(false)
    }
}

/// A JSON document to store under `{id}/{stem}/{stem}.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonUploadRequest {
    pub data: serde_json::Value,
    #[serde(default)]
    pub path: Option<String>,
    pub name: String,
    #[serde(default)]
    pub is_private: Option<bool>,
}

impl JsonUploadRequest {
    pub fn is_private(&self) -> bool {
        self.is_private.unwrap_or(false)
    }
}

/// An in-memory buffer to store under `{id}/{stem}/{stem}.{ext}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferUploadRequest {
    pub data: Bytes,
    pub path: Option<String>,
    pub name: String,
    pub ext: Option<String>,
    pub is_private: Option<bool>,
}

impl BufferUploadRequest {
    pub fn is_private(&self) -> bool {
        self.is_private.unwrap_or(false)
    }
}
