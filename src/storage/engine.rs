//! Storage Engine
//!
//! File-backed CRUD over databases, tables, and records, with schema
//! validation and uniqueness enforcement on the way in and the query matcher
//! on the way out.
//!
//! ## Concurrency
//!
//! Every table has its own `RwLock` in a lazily-populated map. Mutating
//! operations (insert, update, delete, create/drop table) hold the write
//! lock across their full scan-then-mutate sequence; reads hold the read
//! lock, so they run concurrently with each other but never observe a
//! half-rewritten file. Rewrites go through a temp file + rename.
//!
//! All queries, uniqueness checks, and updates are full scans by design;
//! the operation interface hides that so an index-backed engine could be
//! substituted without touching dispatch or protocol code.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};

use crate::error::{DbError, Result};
use crate::query::{self, Record};
use crate::schema::{Schema, SchemaRegistry, ValidationMode, PK_FIELD};

/// Filename of the per-database config artifact
const DB_CONF_FILENAME: &str = "db_conf.json";

/// Extension of record files
const DATA_EXT: &str = ".data";

/// Config keys every database must carry
const REQUIRED_CONF_KEYS: [&str; 3] = ["NAME", "USER", "PASSWORD"];

/// Filesystem-backed storage for databases, tables, and records
pub struct StorageEngine {
    data_dir: PathBuf,

    /// One lock per (database, table), created on first touch
    table_locks: Mutex<HashMap<(String, String), Arc<RwLock<()>>>>,
}

impl StorageEngine {
    /// Create an engine rooted at the given data directory
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            table_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Root data directory
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    // =========================================================================
    // Database Operations
    // =========================================================================

    /// Create a database directory and write its config file.
    ///
    /// With `exist_ok`, an existing database is returned untouched; otherwise
    /// it fails with `DatabaseAlreadyExists`.
    pub fn create_database(&self, config: &Record, exist_ok: bool) -> Result<PathBuf> {
        let name = Self::validate_db_config(config)?;

        fs::create_dir_all(&self.data_dir)?;

        let db_path = self.db_path(&name);
        if db_path.exists() {
            if exist_ok {
                return Ok(db_path);
            }
            return Err(DbError::DatabaseAlreadyExists { name });
        }

        // Two racing creates both pass the exists() check; mkdir settles it
        fs::create_dir(&db_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                DbError::DatabaseAlreadyExists { name: name.clone() }
            } else {
                DbError::Io(e)
            }
        })?;
        let serialized = serde_json::to_string_pretty(config)?;
        fs::write(db_path.join(DB_CONF_FILENAME), serialized)?;

        tracing::debug!(database = %name, "database created");
        Ok(db_path)
    }

    /// Load a database's stored config, credentials included
    pub fn read_database_config(&self, name: &str) -> Result<Record> {
        let db_path = self.ensure_database(name)?;
        let raw = fs::read_to_string(db_path.join(DB_CONF_FILENAME))?;
        Ok(serde_json::from_str(&raw)?)
    }

    // =========================================================================
    // Table Operations
    // =========================================================================

    /// Create an empty record file and register the schema (augmented with
    /// the synthetic `pk` field). Returns the record-file path.
    pub fn create_table(
        &self,
        database: &str,
        table: &str,
        schema_def: &Map<String, Value>,
    ) -> Result<PathBuf> {
        let lock = self.table_lock(database, table);
        let _guard = lock.write();

        let db_path = self.ensure_database(database)?;

        let table_path = Self::table_path(&db_path, table);
        if table_path.exists() {
            return Err(DbError::TableAlreadyExists {
                table: table.to_string(),
            });
        }

        let schema = Schema::from_definition(schema_def)?;
        File::create(&table_path)?;
        SchemaRegistry::save(&db_path, table, &schema)?;

        tracing::debug!(database, table, "table created");
        Ok(table_path)
    }

    /// Delete a table's record file and its schema artifact
    pub fn drop_table(&self, database: &str, table: &str) -> Result<()> {
        let lock = self.table_lock(database, table);
        let _guard = lock.write();

        let db_path = self.ensure_database(database)?;
        let table_path = Self::ensure_table(&db_path, table)?;

        fs::remove_file(table_path)?;
        SchemaRegistry::remove(&db_path, table)?;

        tracing::debug!(database, table, "table dropped");
        Ok(())
    }

    // =========================================================================
    // Record Operations
    // =========================================================================

    /// Validate and append one record.
    ///
    /// The record is validated against the full schema (defaults and the
    /// generated `pk` applied), then every unique-flagged field is scanned
    /// against existing rows before the append. Returns the stored record.
    pub fn insert(&self, database: &str, table: &str, data: &Record) -> Result<Record> {
        let lock = self.table_lock(database, table);
        let _guard = lock.write();

        let db_path = self.ensure_database(database)?;
        let table_path = Self::ensure_table(&db_path, table)?;

        let schema = SchemaRegistry::load(&db_path, table)?;
        let record = schema.validate(data, ValidationMode::Full)?;

        for field in schema.get_unique() {
            let value = match record.get(&field) {
                Some(v) => v,
                None => continue,
            };
            let mut probe = Map::new();
            probe.insert(field.clone(), value.clone());
            if !Self::scan(&table_path, &probe)?.is_empty() {
                return Err(DbError::UniqueConstraintViolated {
                    field,
                    value: value.clone(),
                });
            }
        }

        let mut file = OpenOptions::new().append(true).open(&table_path)?;
        writeln!(file, "{}", serde_json::to_string(&record)?)?;

        Ok(record)
    }

    /// Return every record matching the query, in file (= insertion) order
    pub fn read(&self, database: &str, table: &str, query: &Record) -> Result<Vec<Record>> {
        let lock = self.table_lock(database, table);
        let _guard = lock.read();

        let db_path = self.ensure_database(database)?;
        let table_path = Self::ensure_table(&db_path, table)?;

        Self::scan(&table_path, query)
    }

    /// Merge `patch` into every record matching `query`, re-validating and
    /// rewriting in place. Returns the number of rows updated.
    ///
    /// The whole scan must succeed before anything is written; a validation
    /// or uniqueness failure partway through leaves the file untouched.
    /// Uniqueness of patched values is checked against the pre-update
    /// snapshot, excluding the record being patched itself.
    pub fn update(
        &self,
        database: &str,
        table: &str,
        query: &Record,
        patch: &Record,
    ) -> Result<usize> {
        let lock = self.table_lock(database, table);
        let _guard = lock.write();

        let db_path = self.ensure_database(database)?;
        let table_path = Self::ensure_table(&db_path, table)?;

        if patch.contains_key(PK_FIELD) {
            return Err(DbError::UpdateNotAllowedOnPrimaryKey {
                database: database.to_string(),
                table: table.to_string(),
            });
        }

        let schema = SchemaRegistry::load(&db_path, table)?;
        let unique_in_patch: Vec<String> = schema
            .get_unique()
            .into_iter()
            .filter(|field| patch.contains_key(field))
            .collect();

        let mut lines = Self::read_lines(&table_path)?;
        let snapshot: Vec<Record> = lines
            .iter()
            .map(|line| serde_json::from_str(line))
            .collect::<std::result::Result<_, _>>()?;

        let mut updated = 0;
        for index in 0..lines.len() {
            let record = &snapshot[index];
            if !query::matches(record, query)? {
                continue;
            }

            for field in &unique_in_patch {
                let mut probe = Map::new();
                probe.insert(field.clone(), patch[field].clone());
                for other in &snapshot {
                    if other.get(PK_FIELD) == record.get(PK_FIELD) {
                        continue;
                    }
                    if query::matches(other, &probe)? {
                        return Err(DbError::UniqueConstraintViolated {
                            field: field.clone(),
                            value: patch[field].clone(),
                        });
                    }
                }
            }

            let mut merged = record.clone();
            for (key, value) in patch {
                merged.insert(key.clone(), value.clone());
            }
            schema.validate(&merged, ValidationMode::Partial)?;

            lines[index] = serde_json::to_string(&merged)?;
            updated += 1;
        }

        if updated > 0 {
            Self::rewrite(&table_path, &lines)?;
        }

        Ok(updated)
    }

    /// Remove every record matching `query` and rewrite the file with the
    /// kept subset.
    ///
    /// Returns the number of rows REMAINING after deletion, asymmetric with
    /// update's rows-affected count. The rewrite also happens when nothing
    /// remains, so deleting the last rows actually truncates the file.
    pub fn delete(&self, database: &str, table: &str, query: &Record) -> Result<usize> {
        let lock = self.table_lock(database, table);
        let _guard = lock.write();

        let db_path = self.ensure_database(database)?;
        let table_path = Self::ensure_table(&db_path, table)?;

        let lines = Self::read_lines(&table_path)?;
        let mut kept = Vec::with_capacity(lines.len());
        for line in lines {
            let record: Record = serde_json::from_str(&line)?;
            if query::matches(&record, query)? {
                continue;
            }
            kept.push(line);
        }

        Self::rewrite(&table_path, &kept)?;
        Ok(kept.len())
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    fn db_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }

    fn table_path(db_path: &Path, table: &str) -> PathBuf {
        db_path.join(format!("{table}{DATA_EXT}"))
    }

    fn ensure_database(&self, name: &str) -> Result<PathBuf> {
        let db_path = self.db_path(name);
        if !db_path.exists() {
            return Err(DbError::DatabaseNotExist {
                name: name.to_string(),
            });
        }
        Ok(db_path)
    }

    fn ensure_table(db_path: &Path, table: &str) -> Result<PathBuf> {
        let table_path = Self::table_path(db_path, table);
        if !table_path.exists() {
            return Err(DbError::TableDoesNotExist {
                table: table.to_string(),
            });
        }
        Ok(table_path)
    }

    /// One lock per table, shared across every connection thread
    fn table_lock(&self, database: &str, table: &str) -> Arc<RwLock<()>> {
        let mut locks = self.table_locks.lock();
        locks
            .entry((database.to_string(), table.to_string()))
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone()
    }

    /// All non-empty lines of a record file
    fn read_lines(table_path: &Path) -> Result<Vec<String>> {
        let reader = BufReader::new(File::open(table_path)?);
        let mut lines = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            lines.push(line);
        }
        Ok(lines)
    }

    /// Full scan through the query matcher, file order preserved
    fn scan(table_path: &Path, query: &Record) -> Result<Vec<Record>> {
        let mut results = Vec::new();
        for line in Self::read_lines(table_path)? {
            let record: Record = serde_json::from_str(&line)?;
            if query::matches(&record, query)? {
                results.push(record);
            }
        }
        Ok(results)
    }

    /// Atomically replace a record file's contents via temp file + rename
    fn rewrite(table_path: &Path, lines: &[String]) -> Result<()> {
        let tmp_path = table_path.with_extension("data.tmp");
        {
            let mut tmp = File::create(&tmp_path)?;
            for line in lines {
                writeln!(tmp, "{line}")?;
            }
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, table_path)?;
        Ok(())
    }

    /// A database config must carry string NAME, USER, and PASSWORD keys.
    /// Returns the database name.
    fn validate_db_config(config: &Record) -> Result<String> {
        let mut errors: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for key in REQUIRED_CONF_KEYS {
            match config.get(key) {
                Some(Value::String(s)) if !s.is_empty() => {}
                Some(_) => errors
                    .entry(key.to_string())
                    .or_default()
                    .push("Not a valid string.".to_string()),
                None => errors
                    .entry(key.to_string())
                    .or_default()
                    .push("Missing data for required field.".to_string()),
            }
        }
        if !errors.is_empty() {
            return Err(DbError::DataInvalid { errors });
        }
        // NAME was just checked to be a non-empty string
        Ok(config["NAME"].as_str().unwrap_or_default().to_string())
    }
}
