//! The JSON reply envelope carried by every `/db` response.
//!
//! Success: `{"error": false, "body": <value>}`
//! Failure: `{"error": true, "code": <n>, "message": "<text>"}`

use serde::Serialize;
use serde_json::Value;

/// One `/db` reply, ready to be serialized into a response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Success { error: bool, body: Value },
    Failure { error: bool, code: u8, message: String },
}

impl Reply {
    pub fn success(body: impl Into<Value>) -> Self {
        Reply::Success {
            error: false,
            body: body.into(),
        }
    }

    pub fn failure(code: u8, message: impl Into<String>) -> Self {
        Reply::Failure {
            error: true,
            code,
            message: message.into(),
        }
    }

    /// Serialized envelope bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("reply envelope is always serializable")
    }
}
