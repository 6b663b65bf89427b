//! Error types for flatdb
//!
//! Provides a unified error type for all operations. Every variant carries a
//! stable machine-readable code and structured reference data so the
//! connection layer can render `{code, message, ref_data}` ERROR frames.

use std::collections::BTreeMap;

use serde_json::{json, Value};
use thiserror::Error;

/// Result type alias using DbError
pub type Result<T> = std::result::Result<T, DbError>;

/// Unified error type for flatdb operations
#[derive(Debug, Error)]
pub enum DbError {
    // -------------------------------------------------------------------------
    // I/O and Serialization Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration file not found ({file_path})")]
    ConfigFileNotFound { file_path: String },

    #[error("Invalid JSON format in the configuration file ({file_path})")]
    InvalidConfigFile { file_path: String },

    // -------------------------------------------------------------------------
    // Authentication Errors
    // -------------------------------------------------------------------------
    #[error("Authentication failed")]
    AuthenticationFailed,

    // -------------------------------------------------------------------------
    // Database / Table Errors
    // -------------------------------------------------------------------------
    #[error("Database '{name}' already exists")]
    DatabaseAlreadyExists { name: String },

    #[error("Database '{name}' does not exist")]
    DatabaseNotExist { name: String },

    #[error("Table '{table}' already exists")]
    TableAlreadyExists { table: String },

    #[error("Table '{table}' does not exist")]
    TableDoesNotExist { table: String },

    #[error("Schema for table '{table}' does not exist")]
    TableSchemaNotExist { table: String },

    #[error("Table not provided for action '{action}'")]
    TableNotProvided { action: String },

    // -------------------------------------------------------------------------
    // Record Validation Errors
    // -------------------------------------------------------------------------
    #[error("Data is not valid")]
    DataInvalid { errors: BTreeMap<String, Vec<String>> },

    #[error("Unique constraint violated on field '{field}'")]
    UniqueConstraintViolated { field: String, value: Value },

    #[error("Updating the primary key is not allowed")]
    UpdateNotAllowedOnPrimaryKey { database: String, table: String },

    // -------------------------------------------------------------------------
    // Query Errors
    // -------------------------------------------------------------------------
    #[error("Unsupported query operator: {operator}")]
    UnknownOperator { operator: String },

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Missing query length")]
    MissingQueryLength,

    #[error("Invalid query length")]
    InvalidQueryLength,

    // -------------------------------------------------------------------------
    // Concurrency Errors
    // -------------------------------------------------------------------------
    #[error("Token collision detected")]
    TokenCollision,
}

impl DbError {
    /// Stable machine-readable error code sent to clients.
    pub fn code(&self) -> &'static str {
        match self {
            DbError::Io(_) | DbError::Serialization(_) => "UNKNOWN_EXCEPTION",
            DbError::ConfigFileNotFound { .. } => "CONFIG_FILE_NOT_FOUND",
            DbError::InvalidConfigFile { .. } => "INVALID_CONFIG_JSON_FILE",
            DbError::AuthenticationFailed => "AUTHENTICATION_FAILED",
            DbError::DatabaseAlreadyExists { .. } => "DATABASE_ALREADY_EXIST",
            DbError::DatabaseNotExist { .. } => "DATABASE_DOES_NOT_EXIST",
            DbError::TableAlreadyExists { .. } => "TABLE_ALREADY_EXIST",
            DbError::TableDoesNotExist { .. } => "TABLE_DOES_NOT_EXIST",
            DbError::TableSchemaNotExist { .. } => "TABLE_SCHEMA_NOT_EXIST",
            DbError::TableNotProvided { .. } => "TABLE_NOT_PROVIDED",
            DbError::DataInvalid { .. } => "INVALID_DATA",
            DbError::UniqueConstraintViolated { .. } => "UNIQUE_VALUE_FOUND",
            DbError::UpdateNotAllowedOnPrimaryKey { .. } => "UPDATE_NOT_ALLOWED_ON_PK",
            DbError::UnknownOperator { .. } => "UNKNOWN_OPERATOR",
            DbError::MissingQueryLength => "MISSING_QUERY_LENGTH",
            DbError::InvalidQueryLength => "INVALID_QUERY_LENGTH",
            DbError::TokenCollision => "TOKEN_COLLISION",
        }
    }

    /// Structured reference data attached to the ERROR response payload.
    pub fn ref_data(&self) -> Value {
        match self {
            DbError::ConfigFileNotFound { file_path }
            | DbError::InvalidConfigFile { file_path } => json!({ "file_path": file_path }),
            DbError::DatabaseAlreadyExists { name } | DbError::DatabaseNotExist { name } => {
                json!({ "db_name": name })
            }
            DbError::TableAlreadyExists { table }
            | DbError::TableDoesNotExist { table }
            | DbError::TableSchemaNotExist { table } => json!({ "table": table }),
            DbError::TableNotProvided { action } => json!({ "action": action }),
            DbError::DataInvalid { errors } => json!(errors),
            DbError::UniqueConstraintViolated { field, value } => {
                json!({ "field": field, "value": value })
            }
            DbError::UpdateNotAllowedOnPrimaryKey { database, table } => {
                json!({ "database": database, "table": table })
            }
            DbError::UnknownOperator { operator } => json!({ "operator": operator }),
            _ => Value::Null,
        }
    }
}
