use serde::{Deserialize, Serialize};

use crate::constants::{UPLOAD_SUCCESS_MESSAGE, status};

/// One field that did not make it to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldFailure {
    pub field: String,
    pub filename: String,
    pub reason: String,
}

/// JSON body of an upload reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReplyBody {
    Success {
        result: String,
    },
    Failure {
        error: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        failures: Vec<FieldFailure>,
    },
}

/// Status code and body the router answers an upload request with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReply {
    pub status: u16,
    pub body: ReplyBody,
}

impl UploadReply {
    /// Every field was persisted.
    pub fn success() -> Self {
        Self {
            status: status::OK,
            body: ReplyBody::Success {
                result: UPLOAD_SUCCESS_MESSAGE.into(),
            },
        }
    }

    /// At least one field failed while streaming.
    pub fn partial_failure(failures: Vec<FieldFailure>) -> Self {
        Self {
            status: status::INTERNAL_ERROR,
            body: ReplyBody::Failure {
                error: format!("{} file(s) failed to upload", failures.len()),
                failures,
            },
        }
    }

    /// The request was rejected before any file was written.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: status::BAD_REQUEST,
            body: ReplyBody::Failure {
                error: message.into(),
                failures: Vec::new(),
            },
        }
    }

    /// Returns `true` for a 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Serializes the body to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_body_is_fixed() {
        let reply = UploadReply::success();
        assert_eq!(reply.status, 200);
        assert!(reply.is_success());
        assert_eq!(
            reply.to_json().unwrap(),
            r#"{"result":"Files uploaded with success!"}"#
        );
    }

    #[test]
    fn partial_failure_names_fields() {
        let reply = UploadReply::partial_failure(vec![FieldFailure {
            field: "file2".into(),
            filename: "b.bin".into(),
            reason: "source read error".into(),
        }]);
        assert_eq!(reply.status, 500);
        assert!(!reply.is_success());

        let json = reply.to_json().unwrap();
        assert!(json.contains("\"field\":\"file2\""));
        assert!(json.contains("1 file(s) failed"));
    }

    #[test]
    fn bad_request_omits_empty_failures() {
        let reply = UploadReply::bad_request("invalid filename");
        assert_eq!(reply.status, 400);
        let json = reply.to_json().unwrap();
        assert_eq!(json, r#"{"error":"invalid filename"}"#);
    }

    #[test]
    fn untagged_body_parses_back() {
        let body: ReplyBody =
            serde_json::from_str(r#"{"result":"Files uploaded with success!"}"#).unwrap();
        assert_eq!(body, UploadReply::success().body);
    }
}
