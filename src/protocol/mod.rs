//! Protocol Module
//!
//! The wire protocol is symmetric for requests and responses: a text header
//! carrying the payload byte-length, then exactly that many bytes of UTF-8
//! JSON.
//!
//! ```text
//! QUERY_LENGTH: <decimal-byte-count>\r\n\r\n{...json payload...}
//! ```
//!
//! Request JSON:
//! `{"action": str, "table"?: str, "query"?: object, "payload"?: object,
//!   "auth"?: {"token": str}}`
//!
//! Response JSON:
//! `{"action_type": str, "payload": any}`

mod action;
mod framing;
mod response;

pub use action::{Action, ActionType, Auth};
pub use framing::{read_frame, write_frame, MAX_PAYLOAD_SIZE};
pub use response::Response;
