//! Streaming upload pipeline with throttled progress notifications.
//!
//! Each uploaded field flows through a single pull chain:
//! byte source -> [`ProgressTap`] -> [`UploadSink`]. The tap counts bytes
//! and, gated by a [`ThrottleGate`], emits `file-upload` events through a
//! [`Notifier`]. An [`UploadSession`] runs one [`UploadPipeline`] per field
//! and aggregates their outcomes.

mod notify;
mod pipeline;
mod progress;
mod session;
mod sink;
mod throttle;
mod validation;

use std::path::PathBuf;

pub use notify::{ChannelNotifier, LogNotifier, Notifier, NotifyError};
pub use pipeline::UploadPipeline;
pub use progress::{ProgressEvent, ProgressTap};
pub use session::{
    ByteSource, FileOutcome, PipelineHandle, SessionConfig, UploadField, UploadSession,
    UploadSummary,
};
pub use sink::UploadSink;
pub use throttle::ThrottleGate;
pub use validation::validate_filename;

pub use drivestream_protocol::TransferStatus;

/// Capacity of the notification channel handed out by [`ChannelNotifier::channel`].
///
/// Progress is throttled per file, so even many concurrent fields stay far
/// below this. When it does fill up, events are dropped, never awaited.
pub const NOTIFY_BUFFER_SIZE: usize = 256;

/// Errors that end a single pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("cannot open {path}: {source}")]
    SinkOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("write failed: {0}")]
    SinkWrite(#[source] std::io::Error),

    #[error("flush/close failed: {0}")]
    SinkClose(#[source] std::io::Error),

    #[error("source read failed: {0}")]
    SourceRead(#[source] std::io::Error),

    #[error("upload cancelled")]
    Cancelled,

    #[error("illegal state transition: {from:?} -> {to:?}")]
    IllegalTransition {
        from: TransferStatus,
        to: TransferStatus,
    },
}

/// Errors produced by an [`UploadSession`].
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid filename: {0}")]
    InvalidFilename(String),

    #[error("too many fields: limit is {0}")]
    TooManyFields(usize),

    #[error("decoder error: {0}")]
    Decoder(String),

    #[error("{} of {} uploads failed", .0.failed_count(), .0.outcomes.len())]
    PartialFailure(UploadSummary),
}
