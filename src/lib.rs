//! # flatdb
//!
//! A networked flat-file record store with:
//! - Length-prefixed JSON wire protocol (`QUERY_LENGTH` framing)
//! - Token-based authentication per database
//! - Schema-validated storage with uniqueness enforcement
//! - Mongo-style query matching
//! - Thread-per-connection TCP server with per-table write serialization
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │                (Thread per Connection)                       │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │              Framer → Action Codec → Dispatcher              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │Authenticator│          │   Storage   │
//!   │ (Token Map) │          │   Engine    │
//!   └─────────────┘          └──────┬──────┘
//!                                   │
//!                      ┌────────────┴────────────┐
//!                      ▼                         ▼
//!               ┌─────────────┐          ┌─────────────┐
//!               │   Schema    │          │    Query    │
//!               │  Registry   │          │   Matcher   │
//!               └─────────────┘          └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod query;
pub mod schema;
pub mod storage;
pub mod auth;
pub mod protocol;
pub mod dispatch;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{DbError, Result};
pub use config::Config;
pub use auth::Authenticator;
pub use dispatch::Dispatcher;
pub use storage::StorageEngine;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of flatdb
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
