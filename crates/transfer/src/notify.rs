//! Notification capability used by the progress tap.
//!
//! A [`Notifier`] addresses one subscriber at a time and must never block:
//! the tap calls it inline on the data path.

use drivestream_protocol::Notification;
use tokio::sync::mpsc;

use crate::NOTIFY_BUFFER_SIZE;

/// Error returned when a notification could not be handed off.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("subscriber channel closed")]
    Closed,

    #[error("notification buffer full")]
    Full,

    #[error("cannot encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Fire-and-forget delivery of events to a subscriber.
///
/// Implementations are shared by every pipeline of a session, so they must
/// tolerate concurrent calls and return without waiting on delivery.
pub trait Notifier: Send + Sync {
    fn send(
        &self,
        subscriber: &str,
        event: &str,
        payload: &serde_json::Value,
    ) -> Result<(), NotifyError>;
}

/// Notifier backed by a bounded channel.
///
/// The receiving half is typically drained by a socket write pump.
/// Cloneable and cheap: wraps an `mpsc::Sender`.
#[derive(Clone)]
pub struct ChannelNotifier {
    tx: mpsc::Sender<Notification>,
}

impl ChannelNotifier {
    pub fn new(tx: mpsc::Sender<Notification>) -> Self {
        Self { tx }
    }

    /// Creates a notifier together with the receiver that drains it.
    pub fn channel() -> (Self, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(NOTIFY_BUFFER_SIZE);
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn send(
        &self,
        subscriber: &str,
        event: &str,
        payload: &serde_json::Value,
    ) -> Result<(), NotifyError> {
        let msg = Notification::new(subscriber, event, payload)?;
        self.tx.try_send(msg).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => NotifyError::Full,
            mpsc::error::TrySendError::Closed(_) => NotifyError::Closed,
        })
    }
}

/// Notifier that only writes events to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(
        &self,
        subscriber: &str,
        event: &str,
        payload: &serde_json::Value,
    ) -> Result<(), NotifyError> {
        tracing::info!(subscriber, event, %payload, "notification");
        Ok(())
    }
}
