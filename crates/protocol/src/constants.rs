use std::time::Duration;

/// Event name under which upload progress is emitted.
pub const FILE_UPLOAD_EVENT: &str = "file-upload";

/// Body of a successful upload reply.
pub const UPLOAD_SUCCESS_MESSAGE: &str = "Files uploaded with success!";

/// Default minimum spacing between two progress notifications of one file.
pub const DEFAULT_MESSAGE_DELAY: Duration = Duration::from_millis(200);

/// HTTP status codes used by upload replies.
pub mod status {
    pub const OK: u16 = 200;
    pub const BAD_REQUEST: u16 = 400;
    pub const INTERNAL_ERROR: u16 = 500;
}
