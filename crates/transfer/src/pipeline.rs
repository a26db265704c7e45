//! One in-flight file transfer.
//!
//! The pipeline is a single demand-driven loop: a chunk is pulled from the
//! source only after the previous one was fully accepted by the sink, so a
//! slow disk throttles the network read and at most one chunk is in flight.

use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use drivestream_protocol::TransferStatus;
use futures_util::{Stream, StreamExt};
use tokio::io::AsyncWrite;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::PipelineError;
use crate::progress::ProgressTap;
use crate::sink::UploadSink;

/// Streams one byte source through a [`ProgressTap`] into an [`UploadSink`].
///
/// [`run`](Self::run) consumes the pipeline, so it resolves exactly once.
pub struct UploadPipeline<S> {
    source: S,
    tap: ProgressTap,
    destination: PathBuf,
    state: watch::Sender<TransferStatus>,
    cancel: CancellationToken,
}

impl<S> UploadPipeline<S>
where
    S: Stream<Item = io::Result<Bytes>> + Unpin,
{
    pub fn new(source: S, tap: ProgressTap, destination: PathBuf) -> Self {
        let (state, _) = watch::channel(TransferStatus::Pending);
        Self {
            source,
            tap,
            destination,
            state,
            cancel: CancellationToken::new(),
        }
    }

    /// Aborts the transfer when `cancel` fires (e.g. the connection dropped).
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<TransferStatus> {
        self.state.subscribe()
    }

    pub fn status(&self) -> TransferStatus {
        *self.state.borrow()
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Opens the destination file and streams the source into it.
    ///
    /// Returns the total number of bytes persisted.
    pub async fn run(self) -> Result<u64, PipelineError> {
        match UploadSink::open(&self.destination).await {
            Ok(sink) => self.run_with_sink(sink).await,
            Err(e) => {
                self.transition(TransferStatus::Failed)?;
                tracing::warn!(path = %self.destination.display(), "upload failed: {e}");
                Err(e)
            }
        }
    }

    /// Streams the source into an already open sink.
    pub async fn run_with_sink<W>(mut self, mut sink: UploadSink<W>) -> Result<u64, PipelineError>
    where
        W: AsyncWrite + Unpin,
    {
        match self.pump(&mut sink).await {
            Ok(()) => match sink.finalize().await {
                Ok(written) => {
                    self.transition(TransferStatus::Completed)?;
                    tracing::info!(
                        filename = %self.tap.filename(),
                        bytes = written,
                        "upload finished"
                    );
                    Ok(written)
                }
                Err(e) => self.fail(e),
            },
            Err(e) => {
                sink.abandon().await;
                self.fail(e)
            }
        }
    }

    async fn pump<W>(&mut self, sink: &mut UploadSink<W>) -> Result<(), PipelineError>
    where
        W: AsyncWrite + Unpin,
    {
        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(PipelineError::Cancelled),
                next = self.source.next() => next,
            };

            if *self.state.borrow() == TransferStatus::Pending {
                self.transition(TransferStatus::Streaming)?;
            }

            match next {
                Some(Ok(chunk)) => {
                    let chunk = self.tap.process(chunk);
                    sink.write(&chunk).await?;
                }
                Some(Err(e)) => return Err(PipelineError::SourceRead(e)),
                None => return Ok(()),
            }
        }
    }

    fn fail(&self, err: PipelineError) -> Result<u64, PipelineError> {
        self.transition(TransferStatus::Failed)?;
        tracing::warn!(
            filename = %self.tap.filename(),
            processed = self.tap.processed(),
            "upload failed: {err}"
        );
        Err(err)
    }

    fn transition(&self, next: TransferStatus) -> Result<(), PipelineError> {
        let from = *self.state.borrow();
        if !from.can_transition_to(next) {
            return Err(PipelineError::IllegalTransition { from, to: next });
        }
        self.state.send_replace(next);
        Ok(())
    }
}
