//! Dispatcher
//!
//! Stateless routing from a decoded [`Action`] to the storage engine and
//! authenticator. Every action except PING and LOGIN must first resolve a
//! token to a database config; that config's `NAME` is the active database
//! for the call. An unrecognized action name is not an error path: it yields
//! an ERROR response naming the invalid action.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::auth::Authenticator;
use crate::error::{DbError, Result};
use crate::protocol::{Action, ActionType, Response};
use crate::query::Record;
use crate::storage::StorageEngine;

/// Routes decoded requests to storage and auth operations
#[derive(Clone)]
pub struct Dispatcher {
    storage: Arc<StorageEngine>,
    auth: Arc<Authenticator>,
}

impl Dispatcher {
    pub fn new(storage: Arc<StorageEngine>, auth: Arc<Authenticator>) -> Self {
        Self { storage, auth }
    }

    /// Execute one action. Typed failures propagate to the connection layer,
    /// which renders them as ERROR response frames.
    pub fn dispatch(&self, action: &Action) -> Result<Response> {
        tracing::trace!(action = %action.action, table = ?action.table, "dispatching");

        let action_type = match ActionType::parse(&action.action) {
            Some(t) => t,
            None => {
                return Ok(Response::new(
                    ActionType::Error,
                    json!({ "message": format!("'{}' invalid action.", action.action) }),
                ))
            }
        };

        // PING bypasses authentication entirely
        if action_type == ActionType::Ping {
            return Ok(Response::new(ActionType::Ping, json!({"message": "PONG"})));
        }

        let db_config = self.auth.is_authenticated(action)?;

        match action_type {
            ActionType::Login => self.login(action),
            ActionType::CreateDatabase => self.create_database(action),
            ActionType::CreateTable => self.create_table(action, &db_config),
            ActionType::DropTable => self.drop_table(action, &db_config),
            ActionType::Create => self.create(action, &db_config),
            ActionType::Select => self.select(action, &db_config),
            ActionType::Update => self.update(action, &db_config),
            ActionType::Delete => self.delete(action, &db_config),
            ActionType::Ping | ActionType::Error => unreachable!("handled above"),
        }
    }

    // =========================================================================
    // Action Handlers
    // =========================================================================

    /// Validate credentials against the target database's stored config and
    /// issue a token. A mismatch on either user or password fails identically.
    fn login(&self, action: &Action) -> Result<Response> {
        let payload = action.payload_or_empty();
        let database = payload
            .get("database")
            .and_then(Value::as_str)
            .ok_or(DbError::AuthenticationFailed)?;

        let config = self.storage.read_database_config(database)?;

        if config.get("USER") != payload.get("user") {
            return Err(DbError::AuthenticationFailed);
        }
        if config.get("PASSWORD") != payload.get("password") {
            return Err(DbError::AuthenticationFailed);
        }

        let token = self.auth.create_token(config)?;
        tracing::debug!(database, "login succeeded, token issued");

        Ok(Response::new(ActionType::Login, json!({ "token": token })))
    }

    /// Forward the payload verbatim as the new database's config; echo it
    /// back on success.
    fn create_database(&self, action: &Action) -> Result<Response> {
        let payload = action.payload_or_empty();
        self.storage.create_database(&payload, false)?;
        Ok(Response::new(
            ActionType::CreateDatabase,
            Value::Object(payload),
        ))
    }

    fn create_table(&self, action: &Action, db_config: &Option<Record>) -> Result<Response> {
        let database = Self::active_database(db_config)?;
        let table = Self::table_required(action)?;
        let path = self
            .storage
            .create_table(&database, table, &action.payload_or_empty())?;
        Ok(Response::new(
            ActionType::CreateTable,
            Value::String(path.display().to_string()),
        ))
    }

    fn drop_table(&self, action: &Action, db_config: &Option<Record>) -> Result<Response> {
        let database = Self::active_database(db_config)?;
        let table = Self::table_required(action)?;
        self.storage.drop_table(&database, table)?;
        Ok(Response::new(ActionType::DropTable, json!({})))
    }

    fn create(&self, action: &Action, db_config: &Option<Record>) -> Result<Response> {
        let database = Self::active_database(db_config)?;
        let table = Self::table_required(action)?;
        let record = self
            .storage
            .insert(&database, table, &action.payload_or_empty())?;
        Ok(Response::new(
            ActionType::Create,
            json!({ "data": record, "table": table }),
        ))
    }

    fn select(&self, action: &Action, db_config: &Option<Record>) -> Result<Response> {
        let database = Self::active_database(db_config)?;
        let table = Self::table_required(action)?;
        let results = self
            .storage
            .read(&database, table, &action.query_or_empty())?;
        Ok(Response::new(ActionType::Select, json!(results)))
    }

    fn update(&self, action: &Action, db_config: &Option<Record>) -> Result<Response> {
        let database = Self::active_database(db_config)?;
        let table = Self::table_required(action)?;
        let count = self.storage.update(
            &database,
            table,
            &action.query_or_empty(),
            &action.payload_or_empty(),
        )?;
        Ok(Response::new(ActionType::Update, json!({ "count": count })))
    }

    /// The returned count is the number of rows REMAINING after deletion
    /// (see StorageEngine::delete).
    fn delete(&self, action: &Action, db_config: &Option<Record>) -> Result<Response> {
        let database = Self::active_database(db_config)?;
        let table = Self::table_required(action)?;
        let count = self
            .storage
            .delete(&database, table, &action.query_or_empty())?;
        Ok(Response::new(ActionType::Delete, json!({ "count": count })))
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    /// The authenticated database name for this call
    fn active_database(db_config: &Option<Record>) -> Result<String> {
        db_config
            .as_ref()
            .and_then(|config| config.get("NAME"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(DbError::AuthenticationFailed)
    }

    fn table_required(action: &Action) -> Result<&str> {
        action
            .table
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| DbError::TableNotProvided {
                action: action.action.clone(),
            })
    }
}
