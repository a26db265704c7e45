//! Wire types shared between the upload core and its collaborators.
//!
//! Covers the progress notification payload, the outbound envelope a
//! socket emitter consumes, and the JSON bodies the router replies with.

pub mod constants;
pub mod envelope;
pub mod reply;
pub mod types;

// Re-export primary types for convenience.
pub use constants::{FILE_UPLOAD_EVENT, UPLOAD_SUCCESS_MESSAGE};
pub use envelope::Notification;
pub use reply::{FieldFailure, ReplyBody, UploadReply};
pub use types::{ProgressPayload, TransferStatus};
