//! Authenticator
//!
//! Issues and validates the opaque tokens that gate every non-excluded
//! action. A token is a 128-bit random value rendered as 32 uppercase hex
//! characters, mapped 1:1 to a database's full config. Tokens live only in
//! process memory; they never expire and cannot be revoked.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::{DbError, Result};
use crate::protocol::Action;
use crate::query::Record;

/// Token-based authentication gate
pub struct Authenticator {
    /// token → database config, guarded for concurrent connection threads
    tokens: RwLock<HashMap<String, Record>>,

    /// Action names that bypass authentication, fixed at construction
    excluded: HashSet<String>,
}

impl Default for Authenticator {
    fn default() -> Self {
        Self::new()
    }
}

impl Authenticator {
    /// Create an authenticator with PING and LOGIN excluded from the
    /// token requirement
    pub fn new() -> Self {
        let excluded = ["PING", "LOGIN"]
            .into_iter()
            .map(str::to_string)
            .collect();
        Self {
            tokens: RwLock::new(HashMap::new()),
            excluded,
        }
    }

    /// Resolve the database config behind an action's token.
    ///
    /// Excluded actions pass with no config. Everything else must carry a
    /// token already present in the map, or it fails with
    /// `AuthenticationFailed`.
    pub fn is_authenticated(&self, action: &Action) -> Result<Option<Record>> {
        if self.excluded.contains(&action.action) {
            return Ok(None);
        }

        let token = action
            .auth
            .token
            .as_deref()
            .ok_or(DbError::AuthenticationFailed)?;

        let tokens = self.tokens.read();
        match tokens.get(token) {
            Some(config) => Ok(Some(config.clone())),
            None => Err(DbError::AuthenticationFailed),
        }
    }

    /// Generate a fresh token for a database config and store the mapping.
    ///
    /// A collision in the 128-bit space is practically unreachable; if one
    /// ever occurs it is a hard error rather than a silent overwrite.
    pub fn create_token(&self, db_config: Record) -> Result<String> {
        let token = Uuid::new_v4().simple().to_string().to_uppercase();

        let mut tokens = self.tokens.write();
        if tokens.contains_key(&token) {
            return Err(DbError::TokenCollision);
        }
        tokens.insert(token.clone(), db_config);

        Ok(token)
    }
}
