//! Upload stream sessions.
//!
//! A session pipes bytes from a local reader into an object write channel on a
//! spawned task. Its outcome is delivered once through [`UploadCompletion`]:
//! success after the object is committed, failure on the first read or provider
//! error.

use bucketfile_core::{FileServiceError, FileServiceResult};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWriteExt, DuplexStream};
use tokio::sync::oneshot;

use crate::traits::{ObjectWriter, StorageError, StorageResult};

/// Capacity of the in-process pipe between the caller and the upload task
pub const STREAM_BUFFER_SIZE: usize = 64 * 1024;

/// Writable upload stream returned to the host.
///
/// Write the object bytes into `writer`, then shut it down (or drop it) to
/// signal end of input. `completion` resolves once the provider has committed
/// the object.
#[derive(Debug)]
pub struct UploadStreamDescriptor {
    pub writer: DuplexStream,
    pub completion: UploadCompletion,
    pub url: String,
    pub key: String,
}

/// Resolves exactly once with the number of bytes stored, or the first error.
#[derive(Debug)]
pub struct UploadCompletion {
    rx: oneshot::Receiver<StorageResult<u64>>,
}

impl Future for UploadCompletion {
    type Output = FileServiceResult<u64>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(Ok(size))) => Poll::Ready(Ok(size)),
            Poll::Ready(Ok(Err(e))) => {
                Poll::Ready(Err(FileServiceError::unexpected("Upload file stream error", e)))
            }
            Poll::Ready(Err(_)) => Poll::Ready(Err(FileServiceError::UnexpectedState(
                "Upload file stream error: upload task ended without a result".to_string(),
            ))),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Open an in-process pipe and start copying its read half into `writer`.
pub(crate) fn pipe_to_object(
    writer: ObjectWriter,
    bucket: &str,
    key: &str,
) -> (DuplexStream, UploadCompletion) {
    let (local, remote) = tokio::io::duplex(STREAM_BUFFER_SIZE);
    let completion = spawn_upload(remote, writer, bucket, key);
    (local, completion)
}

/// Copy `reader` into `writer` on a spawned task and commit the object.
pub(crate) fn spawn_upload<R>(
    mut reader: R,
    mut writer: ObjectWriter,
    bucket: &str,
    key: &str,
) -> UploadCompletion
where
    R: AsyncRead + Send + Unpin + 'static,
{
    let (tx, rx) = oneshot::channel();
    let bucket = bucket.to_string();
    let key = key.to_string();

    tokio::spawn(async move {
        let start = std::time::Instant::now();
        let result = async {
            let size = tokio::io::copy(&mut reader, &mut writer).await?;
            writer.shutdown().await?;
            Ok::<u64, std::io::Error>(size)
        }
        .await;

        let outcome = match result {
            Ok(size) => {
                tracing::info!(
                    bucket = %bucket,
                    key = %key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Object stream upload successful"
                );
                Ok(size)
            }
            Err(e) => {
                if let Err(abort_err) = writer.abort().await {
                    tracing::warn!(error = %abort_err, key = %key, "Failed to abort stream upload");
                }
                tracing::error!(
                    error = %e,
                    bucket = %bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Object stream upload failed"
                );
                Err(StorageError::UploadFailed(e.to_string()))
            }
        };

        // the caller may have dropped the completion future
        let _ = tx.send(outcome);
    });

    UploadCompletion { rx }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bucketfile_core::ErrorKind;
    use object_store::buffered::BufWriter;
    use object_store::memory::InMemory;
    use object_store::path::Path;
    use object_store::{ObjectStore, ObjectStoreExt};
    use std::sync::Arc;
    use tokio::io::ReadBuf;

    struct FailingReader;

    impl AsyncRead for FailingReader {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            Poll::Ready(Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "source closed",
            )))
        }
    }

    fn writer_for(store: &Arc<InMemory>, key: &str) -> ObjectWriter {
        let store: Arc<dyn ObjectStore> = store.clone();
        BufWriter::new(store, Path::from(key))
    }

    #[tokio::test]
    async fn pipe_commits_after_writer_shutdown() {
        let store = Arc::new(InMemory::new());
        let (mut local, completion) =
            pipe_to_object(writer_for(&store, "id/a/a.txt"), "bucket", "id/a/a.txt");

        local.write_all(b"piped bytes").await.unwrap();
        local.shutdown().await.unwrap();
        drop(local);

        let size = completion.await.unwrap();
        assert_eq!(size, 11);

        let stored = store
            .get(&Path::from("id/a/a.txt"))
            .await
            .unwrap()
            .bytes()
            .await
            .unwrap();
        assert_eq!(&stored[..], b"piped bytes");
    }

    #[tokio::test]
    async fn reader_error_fails_completion() {
        let store = Arc::new(InMemory::new());
        let completion = spawn_upload(
            FailingReader,
            writer_for(&store, "id/b/b.txt"),
            "bucket",
            "id/b/b.txt",
        );

        let err = completion.await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedState);
        assert!(err.to_string().starts_with("Upload file stream error"));
        assert!(store.head(&Path::from("id/b/b.txt")).await.is_err());
    }

    #[tokio::test]
    async fn in_memory_source_uploads() {
        let store = Arc::new(InMemory::new());
        let completion = spawn_upload(
            std::io::Cursor::new(bytes::Bytes::from_static(b"{}")),
            writer_for(&store, "id/c/c.json"),
            "bucket",
            "id/c/c.json",
        );
        assert_eq!(completion.await.unwrap(), 2);
    }
}
