//! In-process buckets for tests and local development.
//!
//! Objects live in an `object_store::memory::InMemory` store. Signed URLs are
//! HMAC-SHA256 tokens over the bucket, key and expiry, and can be checked with
//! [`LocalSigner::verify`].

use crate::bucket::{ObjectStoreBucket, UrlSigner};
use crate::keys::encode_key;
use crate::traits::{StorageError, StorageResult};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use object_store::memory::InMemory;
use sha2::Sha256;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Base URL used for public objects of in-memory buckets
pub const MEMORY_PUBLIC_BASE_URL: &str = "http://localhost/storage";

/// Signs read URLs with a per-bucket secret
#[derive(Clone)]
pub struct LocalSigner {
    bucket: String,
    base_url: String,
    secret: Vec<u8>,
}

impl LocalSigner {
    pub fn new(bucket: impl Into<String>, base_url: impl Into<String>, secret: Vec<u8>) -> Self {
        Self {
            bucket: bucket.into(),
            base_url: base_url.into(),
            secret,
        }
    }

    fn signature(&self, key: &str, expires_at: u64) -> StorageResult<String> {
        let message = format!("GET\n{}\n{}\n{}", self.bucket, key, expires_at);
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| StorageError::SigningFailed(e.to_string()))?;
        mac.update(message.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Check a signature issued by this signer against the current time.
    pub fn verify(&self, key: &str, expires_at: u64, signature: &str) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(u64::MAX);
        if expires_at < now {
            tracing::debug!(key = %key, "Signed URL expired");
            return false;
        }

        match self.signature(key, expires_at) {
            Ok(expected) => expected.as_bytes().ct_eq(signature.as_bytes()).into(),
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Signed URL verification failed");
                false
            }
        }
    }
}

#[async_trait]
impl UrlSigner for LocalSigner {
    async fn sign_read_url(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let expires_at = now + expires_in.as_secs();

        let signature = self.signature(key, expires_at)?;

        Ok(format!(
            "{}/{}?expires={}&signature={}",
            self.base_url.trim_end_matches('/'),
            encode_key(key),
            expires_at,
            signature
        ))
    }
}

/// Create an empty in-memory bucket with a random signing secret.
pub fn in_memory_bucket(name: &str) -> ObjectStoreBucket {
    let secret = Uuid::new_v4().as_bytes().to_vec();
    in_memory_bucket_with_signer(name, secret).0
}

/// Create an empty in-memory bucket and return its signer for verification.
pub fn in_memory_bucket_with_signer(
    name: &str,
    secret: Vec<u8>,
) -> (ObjectStoreBucket, LocalSigner) {
    let base_url = format!("{}/{}/", MEMORY_PUBLIC_BASE_URL, name);
    let signer = LocalSigner::new(name, base_url.clone(), secret);

    let bucket = ObjectStoreBucket::new(
        name,
        Arc::new(InMemory::new()),
        Arc::new(signer.clone()),
        base_url,
        "memory",
    );

    (bucket, signer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Bucket;

    fn query_param<'a>(url: &'a str, name: &str) -> &'a str {
        url.split(['?', '&'])
            .find_map(|part| part.strip_prefix(&format!("{}=", name)))
            .unwrap()
    }

    #[tokio::test]
    async fn signed_url_verifies() {
        let (bucket, signer) = in_memory_bucket_with_signer("priv", b"secret".to_vec());

        let url = bucket
            .signed_url("id/a/a.txt", Duration::from_secs(900))
            .await
            .unwrap();
        assert!(url.starts_with("http://localhost/storage/priv/id/a/a.txt?expires="));

        let expires_at: u64 = query_param(&url, "expires").parse().unwrap();
        let signature = query_param(&url, "signature");
        assert!(signer.verify("id/a/a.txt", expires_at, signature));
        assert!(!signer.verify("id/b/b.txt", expires_at, signature));
    }

    #[tokio::test]
    async fn expired_signature_rejected() {
        let (_, signer) = in_memory_bucket_with_signer("priv", b"secret".to_vec());
        let signature = signer.signature("id/a/a.txt", 1).unwrap();
        assert!(!signer.verify("id/a/a.txt", 1, &signature));
    }

    #[test]
    fn in_memory_locators() {
        let bucket = in_memory_bucket("pub");
        assert_eq!(
            bucket.public_url("id/a/a.txt"),
            "http://localhost/storage/pub/id/a/a.txt"
        );
        assert_eq!(bucket.storage_uri("id/a/a.txt"), "memory://pub/id/a/a.txt");
    }
}
