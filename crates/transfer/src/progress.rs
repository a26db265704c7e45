use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use drivestream_protocol::{FILE_UPLOAD_EVENT, ProgressPayload};

use crate::notify::Notifier;
use crate::throttle::ThrottleGate;

/// A single progress notification. Built, dispatched, dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub subscriber: String,
    pub filename: String,
    pub processed_already: u64,
}

impl ProgressEvent {
    /// Wire payload of the event (the subscriber travels separately).
    pub fn payload(&self) -> ProgressPayload {
        ProgressPayload {
            filename: self.filename.clone(),
            processed_already: self.processed_already,
        }
    }
}

/// Pass-through stage that counts bytes and reports throttled progress.
///
/// Chunks leave [`process`](Self::process) exactly as they came in.
/// Notifier failures are logged and otherwise ignored.
pub struct ProgressTap {
    subscriber: String,
    filename: String,
    processed: u64,
    gate: ThrottleGate,
    notifier: Arc<dyn Notifier>,
}

impl ProgressTap {
    /// Creates a tap whose throttle window starts now.
    pub fn new(
        subscriber: impl Into<String>,
        filename: impl Into<String>,
        interval: Duration,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            subscriber: subscriber.into(),
            filename: filename.into(),
            processed: 0,
            gate: ThrottleGate::new(interval),
            notifier,
        }
    }

    /// Counts `chunk` and returns it unchanged.
    ///
    /// If the gate permits, dispatches a progress event carrying the new
    /// cumulative count before returning.
    pub fn process(&mut self, chunk: Bytes) -> Bytes {
        self.processed += chunk.len() as u64;

        if self.gate.permit() {
            self.emit();
        }

        chunk
    }

    /// Total bytes seen so far.
    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    fn emit(&self) {
        let event = ProgressEvent {
            subscriber: self.subscriber.clone(),
            filename: self.filename.clone(),
            processed_already: self.processed,
        };

        let payload = match serde_json::to_value(event.payload()) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(filename = %event.filename, "cannot encode progress: {e}");
                return;
            }
        };

        match self
            .notifier
            .send(&event.subscriber, FILE_UPLOAD_EVENT, &payload)
        {
            Ok(()) => tracing::debug!(
                filename = %event.filename,
                subscriber = %event.subscriber,
                processed = event.processed_already,
                "progress sent"
            ),
            Err(e) => tracing::warn!(
                filename = %event.filename,
                subscriber = %event.subscriber,
                "progress dropped: {e}"
            ),
        }
    }
}
