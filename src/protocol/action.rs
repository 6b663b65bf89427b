//! Action definitions
//!
//! A decoded client request. Missing optional fields default to empty so the
//! dispatcher never deals with absent structure.

use serde::Deserialize;

use crate::error::Result;
use crate::query::Record;

/// The action vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionType {
    Ping,
    Login,
    CreateDatabase,
    CreateTable,
    DropTable,
    Create,
    Select,
    Update,
    Delete,
    Error,
}

impl ActionType {
    /// Wire name of this action type
    pub fn as_str(self) -> &'static str {
        match self {
            ActionType::Ping => "PING",
            ActionType::Login => "LOGIN",
            ActionType::CreateDatabase => "CREATE_DATABASE",
            ActionType::CreateTable => "CREATE_TABLE",
            ActionType::DropTable => "DROP_TABLE",
            ActionType::Create => "CREATE",
            ActionType::Select => "SELECT",
            ActionType::Update => "UPDATE",
            ActionType::Delete => "DELETE",
            ActionType::Error => "ERROR",
        }
    }

    /// Parse a request action name. `ERROR` is response-only, so it does not
    /// parse; any unrecognized name yields `None` and is reported back to the
    /// client by the dispatcher.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "PING" => Some(ActionType::Ping),
            "LOGIN" => Some(ActionType::Login),
            "CREATE_DATABASE" => Some(ActionType::CreateDatabase),
            "CREATE_TABLE" => Some(ActionType::CreateTable),
            "DROP_TABLE" => Some(ActionType::DropTable),
            "CREATE" => Some(ActionType::Create),
            "SELECT" => Some(ActionType::Select),
            "UPDATE" => Some(ActionType::Update),
            "DELETE" => Some(ActionType::Delete),
            _ => None,
        }
    }
}

/// Authentication metadata on a request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Auth {
    #[serde(default)]
    pub token: Option<String>,
}

/// A decoded client request
#[derive(Debug, Clone, Deserialize)]
pub struct Action {
    /// Raw action name; unknown values are kept so the dispatcher can name
    /// them in its ERROR response
    pub action: String,

    #[serde(default)]
    pub table: Option<String>,

    #[serde(default)]
    pub query: Option<Record>,

    #[serde(default)]
    pub payload: Option<Record>,

    #[serde(default)]
    pub auth: Auth,
}

impl Action {
    /// Decode a JSON payload into an action
    pub fn decode(payload: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(payload)?)
    }

    /// The query filter, empty when omitted
    pub fn query_or_empty(&self) -> Record {
        self.query.clone().unwrap_or_default()
    }

    /// The payload object, empty when omitted
    pub fn payload_or_empty(&self) -> Record {
        self.payload.clone().unwrap_or_default()
    }
}
