//! Upload sessions: one request's worth of concurrently streaming fields.

use std::fmt::Display;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use drivestream_protocol::constants::DEFAULT_MESSAGE_DELAY;
use drivestream_protocol::{FieldFailure, TransferStatus, UploadReply};
use futures_util::stream::BoxStream;
use futures_util::{Stream, StreamExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::notify::Notifier;
use crate::pipeline::UploadPipeline;
use crate::progress::ProgressTap;
use crate::validation::validate_filename;
use crate::{PipelineError, SessionError};

/// Byte stream of one uploaded field, as produced by a multipart decoder.
pub type ByteSource = BoxStream<'static, io::Result<Bytes>>;

/// One field discovered by the decoder.
pub struct UploadField {
    pub field_name: String,
    pub filename: String,
    pub source: ByteSource,
}

impl UploadField {
    pub fn new<S>(field_name: impl Into<String>, filename: impl Into<String>, source: S) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Self {
            field_name: field_name.into(),
            filename: filename.into(),
            source: source.boxed(),
        }
    }
}

/// Session configuration supplied by the router.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Directory uploads are written to. Must already exist.
    pub upload_dir: PathBuf,
    /// Identity notifications are addressed to.
    pub subscriber: String,
    /// Minimum spacing between progress events of one file.
    pub message_delay: Duration,
    /// Maximum number of fields accepted (`None` = unlimited).
    pub max_fields: Option<usize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            subscriber: String::new(),
            message_delay: DEFAULT_MESSAGE_DELAY,
            max_fields: None,
        }
    }
}

/// Caller-side view of a running pipeline.
#[derive(Debug, Clone)]
pub struct PipelineHandle {
    pub field_name: String,
    pub filename: String,
    pub path: PathBuf,
    state: watch::Receiver<TransferStatus>,
}

impl PipelineHandle {
    pub fn status(&self) -> TransferStatus {
        *self.state.borrow()
    }

    /// Waits until the pipeline reached `Completed` or `Failed`.
    pub async fn wait_terminal(&mut self) -> TransferStatus {
        match self.state.wait_for(|s| s.is_terminal()).await {
            Ok(s) => *s,
            // Sender dropped without a terminal state: the task died.
            Err(_) => TransferStatus::Failed,
        }
    }
}

/// Final state of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub field_name: String,
    pub filename: String,
    pub path: PathBuf,
    pub status: TransferStatus,
    pub bytes_written: u64,
    pub error: Option<String>,
}

/// Aggregate result of a session, in the order fields were accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadSummary {
    pub session_id: String,
    pub outcomes: Vec<FileOutcome>,
}

impl UploadSummary {
    pub fn completed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == TransferStatus::Completed)
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.completed_count()
    }

    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }

    /// Bytes persisted by completed fields.
    pub fn total_bytes(&self) -> u64 {
        self.outcomes
            .iter()
            .filter(|o| o.status == TransferStatus::Completed)
            .map(|o| o.bytes_written)
            .sum()
    }

    /// Router reply for this summary.
    pub fn to_reply(&self) -> UploadReply {
        if self.is_success() {
            return UploadReply::success();
        }
        let failures = self
            .outcomes
            .iter()
            .filter(|o| o.status != TransferStatus::Completed)
            .map(|o| FieldFailure {
                field: o.field_name.clone(),
                filename: o.filename.clone(),
                reason: o.error.clone().unwrap_or_default(),
            })
            .collect();
        UploadReply::partial_failure(failures)
    }
}

impl SessionError {
    /// Router reply for a failed session.
    pub fn to_reply(&self) -> UploadReply {
        match self {
            SessionError::PartialFailure(summary) => summary.to_reply(),
            SessionError::InvalidFilename(_) | SessionError::TooManyFields(_) => {
                UploadReply::bad_request(self.to_string())
            }
            SessionError::Decoder(_) => UploadReply::bad_request(self.to_string()),
        }
    }
}

struct Registered {
    handle: PipelineHandle,
    task: JoinHandle<Result<u64, PipelineError>>,
}

/// Runs one [`UploadPipeline`] per accepted field and aggregates outcomes.
///
/// Pipelines are independent: one failing never stops its siblings, and
/// files that completed are never rolled back.
pub struct UploadSession {
    id: Uuid,
    config: SessionConfig,
    notifier: Arc<dyn Notifier>,
    pipelines: Vec<Registered>,
    cancel: CancellationToken,
}

impl UploadSession {
    pub fn new(config: SessionConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            id: Uuid::new_v4(),
            config,
            notifier,
            pipelines: Vec::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Number of fields accepted so far.
    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    /// Validates the filename and starts streaming `source` to
    /// `<upload_dir>/<filename>` on the tokio runtime.
    ///
    /// Must be called from within a tokio runtime.
    pub fn accept<S>(
        &mut self,
        field_name: impl Into<String>,
        source: S,
        filename: impl Into<String>,
    ) -> Result<PipelineHandle, SessionError>
    where
        S: Stream<Item = io::Result<Bytes>> + Send + Unpin + 'static,
    {
        let field_name = field_name.into();
        let filename = filename.into();

        validate_filename(&filename)?;
        let cap = self.config.max_fields;
        if let Some(max) = cap.filter(|&max| self.pipelines.len() >= max) {
            return Err(SessionError::TooManyFields(max));
        }

        let path = self.config.upload_dir.join(&filename);
        let tap = ProgressTap::new(
            self.config.subscriber.clone(),
            filename.clone(),
            self.config.message_delay,
            Arc::clone(&self.notifier),
        );
        let pipeline = UploadPipeline::new(source, tap, path.clone())
            .with_cancellation(self.cancel.child_token());

        let handle = PipelineHandle {
            field_name: field_name.clone(),
            filename: filename.clone(),
            path,
            state: pipeline.subscribe(),
        };

        let span = tracing::info_span!(
            "upload",
            session = %self.id,
            field = %field_name,
            filename = %filename
        );
        let task = tokio::spawn(pipeline.run().instrument(span));

        tracing::debug!(session = %self.id, field = %field_name, "field accepted");
        self.pipelines.push(Registered {
            handle: handle.clone(),
            task,
        });
        Ok(handle)
    }

    /// Accepts every field the decoder yields until it is exhausted.
    ///
    /// Stops at the first decoder error or rejected field; fields accepted
    /// before that keep streaming and still show up in
    /// [`await_all`](Self::await_all).
    pub async fn ingest<D, E>(&mut self, mut fields: D) -> Result<usize, SessionError>
    where
        D: Stream<Item = Result<UploadField, E>> + Unpin,
        E: Display,
    {
        let mut accepted = 0;
        while let Some(field) = fields.next().await {
            let field = field.map_err(|e| SessionError::Decoder(e.to_string()))?;
            self.accept(field.field_name, field.source, field.filename)?;
            accepted += 1;
        }
        tracing::debug!(session = %self.id, accepted, "all fields parsed");
        Ok(accepted)
    }

    /// Token that aborts this session's pipelines when cancelled.
    ///
    /// Lets the caller cancel while [`await_all`](Self::await_all) owns the
    /// session.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Aborts every in-flight pipeline, as if the connection dropped.
    ///
    /// Partial files stay on disk.
    pub fn cancel(&self) {
        tracing::info!(session = %self.id, "cancelling uploads");
        self.cancel.cancel();
    }

    /// Waits for every pipeline to settle.
    ///
    /// Succeeds only if all of them completed; otherwise returns
    /// [`SessionError::PartialFailure`] carrying every outcome.
    pub async fn await_all(self) -> Result<UploadSummary, SessionError> {
        let mut summary = UploadSummary {
            session_id: self.id.to_string(),
            outcomes: Vec::with_capacity(self.pipelines.len()),
        };

        for Registered { handle, task } in self.pipelines {
            let (status, bytes_written, error) = match task.await {
                Ok(Ok(written)) => (TransferStatus::Completed, written, None),
                Ok(Err(e)) => (TransferStatus::Failed, 0, Some(e.to_string())),
                Err(e) => (
                    TransferStatus::Failed,
                    0,
                    Some(format!("upload task aborted: {e}")),
                ),
            };
            summary.outcomes.push(FileOutcome {
                field_name: handle.field_name,
                filename: handle.filename,
                path: handle.path,
                status,
                bytes_written,
                error,
            });
        }

        tracing::info!(
            session = %summary.session_id,
            completed = summary.completed_count(),
            failed = summary.failed_count(),
            bytes = summary.total_bytes(),
            "session settled"
        );

        if summary.is_success() {
            Ok(summary)
        } else {
            Err(SessionError::PartialFailure(summary))
        }
    }
}
