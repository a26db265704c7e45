use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::PipelineError;

/// Destination of one upload.
///
/// Appends chunks in the order received. A sink that is dropped without
/// [`finalize`](Self::finalize) leaves whatever was written so far on disk.
pub struct UploadSink<W = File> {
    writer: W,
    path: PathBuf,
    written: u64,
}

impl UploadSink<File> {
    /// Creates (or truncates) the file at `path`.
    ///
    /// Fails if the parent directory does not exist; intermediate
    /// directories are never created.
    pub async fn open(path: &Path) -> Result<Self, PipelineError> {
        let file = File::create(path)
            .await
            .map_err(|source| PipelineError::SinkOpen {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::from_writer(file, path))
    }
}

impl<W: AsyncWrite + Unpin> UploadSink<W> {
    /// Wraps an already open writer. `path` is only used for reporting.
    pub fn from_writer(writer: W, path: impl Into<PathBuf>) -> Self {
        Self {
            writer,
            path: path.into(),
            written: 0,
        }
    }

    /// Appends `chunk`, waiting until the writer accepted all of it.
    ///
    /// `tokio::fs::File` hands writes to a background thread and reports a
    /// failed write on the next operation, so an error on the last chunk
    /// surfaces from [`finalize`](Self::finalize) as `SinkClose`.
    pub async fn write(&mut self, chunk: &[u8]) -> Result<(), PipelineError> {
        self.writer
            .write_all(chunk)
            .await
            .map_err(PipelineError::SinkWrite)?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    /// Flushes and closes the writer, returning the bytes written.
    ///
    /// Also reports a deferred error from the last [`write`](Self::write).
    pub async fn finalize(mut self) -> Result<u64, PipelineError> {
        self.writer.flush().await.map_err(PipelineError::SinkClose)?;
        self.writer
            .shutdown()
            .await
            .map_err(PipelineError::SinkClose)?;
        Ok(self.written)
    }

    /// Best-effort flush of a sink whose pipeline failed.
    ///
    /// The partial file stays in place.
    pub async fn abandon(mut self) {
        if let Err(e) = self.writer.flush().await {
            tracing::debug!(path = %self.path.display(), "flush of partial file failed: {e}");
        }
        tracing::warn!(
            path = %self.path.display(),
            written = self.written,
            "partial file left on disk"
        );
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tempfile::TempDir;

    /// Writer that accepts `limit` bytes and then fails like a full disk.
    struct FullDisk {
        limit: usize,
        taken: usize,
    }

    impl AsyncWrite for FullDisk {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            if self.taken >= self.limit {
                return Poll::Ready(Err(std::io::Error::other("no space left on device")));
            }
            let n = buf.len().min(self.limit - self.taken);
            self.taken += n;
            Poll::Ready(Ok(n))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn writes_chunks_in_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.bin");

        let mut sink = UploadSink::open(&path).await.unwrap();
        sink.write(b"Hello").await.unwrap();
        sink.write(b" World").await.unwrap();
        assert_eq!(sink.written(), 11);
        assert_eq!(sink.finalize().await.unwrap(), 11);

        let content = std::fs::read(&path).unwrap();
        assert_eq!(&content, b"Hello World");
    }

    #[tokio::test]
    async fn open_truncates_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.bin");
        std::fs::write(&path, b"old content that is longer").unwrap();

        let mut sink = UploadSink::open(&path).await.unwrap();
        sink.write(b"new").await.unwrap();
        sink.finalize().await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"new");
    }

    #[tokio::test]
    async fn open_fails_for_missing_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("out.bin");

        let err = UploadSink::open(&path).await.err().unwrap();
        assert!(matches!(err, PipelineError::SinkOpen { .. }));
        assert!(!dir.path().join("missing").exists());
    }

    #[tokio::test]
    async fn write_error_propagates() {
        let mut sink = UploadSink::from_writer(FullDisk { limit: 4, taken: 0 }, "full.bin");
        let err = sink.write(b"too much data").await.unwrap_err();
        assert!(matches!(err, PipelineError::SinkWrite(_)));
        assert_eq!(sink.written(), 0);
    }

    #[tokio::test]
    async fn abandoned_sink_keeps_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("partial.bin");

        let mut sink = UploadSink::open(&path).await.unwrap();
        sink.write(b"half").await.unwrap();
        sink.abandon().await;

        assert_eq!(std::fs::read(&path).unwrap(), b"half");
    }
}
