//! Response definitions
//!
//! A serialized reply: `{"action_type": <str>, "payload": <any>}`. Failures
//! of any kind render as an ERROR response carrying
//! `{"code", "message", "ref_data"}` so a single malformed request never
//! costs the client its connection.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{DbError, Result};

use super::action::ActionType;

/// A response to send to a client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub action_type: String,
    pub payload: Value,
}

impl Response {
    /// Create a response for a completed action
    pub fn new(action_type: ActionType, payload: Value) -> Self {
        Self {
            action_type: action_type.as_str().to_string(),
            payload,
        }
    }

    /// Create an ERROR response from a typed failure
    pub fn from_error(err: &DbError) -> Self {
        Self::new(
            ActionType::Error,
            json!({
                "code": err.code(),
                "message": err.to_string(),
                "ref_data": err.ref_data(),
            }),
        )
    }

    /// Serialize to the wire JSON
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}
