//! Schema storage and record validation
//!
//! A [`Schema`] is an ordered list of named field specs, persisted as
//! `{table}.schema.json` inside the database directory. Every schema gains a
//! synthetic `pk` field: uuid, unique, auto-generated, immutable after
//! creation.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DbError, Result};
use crate::query::Record;

use super::field::{FieldSpec, FieldType};

/// Name of the synthetic primary-key field
pub const PK_FIELD: &str = "pk";

/// Whether validation enforces the full schema or only supplied fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Insert: required fields enforced, defaults and generators applied
    Full,
    /// Update: only supplied fields checked, nothing filled in
    Partial,
}

/// One named field of a schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    #[serde(flatten)]
    pub spec: FieldSpec,
}

/// Ordered field definitions for one table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<SchemaField>,
}

impl Schema {
    /// Build a schema from a client-supplied definition object, augmenting it
    /// with the synthetic `pk` field. A user-supplied `pk` definition is
    /// replaced, never honored.
    pub fn from_definition(definition: &Map<String, Value>) -> Result<Self> {
        let mut fields = Vec::with_capacity(definition.len() + 1);
        let mut errors: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for (name, raw_spec) in definition {
            if name == PK_FIELD {
                continue;
            }
            match serde_json::from_value::<FieldSpec>(raw_spec.clone()) {
                Ok(spec) => fields.push(SchemaField {
                    name: name.clone(),
                    spec,
                }),
                Err(e) => {
                    errors
                        .entry(name.clone())
                        .or_default()
                        .push(format!("Invalid field specification: {e}."));
                }
            }
        }

        if !errors.is_empty() {
            return Err(DbError::DataInvalid { errors });
        }

        let mut pk_spec = FieldSpec::new(FieldType::Uuid).unique();
        pk_spec.auto_generate = true;
        fields.push(SchemaField {
            name: PK_FIELD.to_string(),
            spec: pk_spec,
        });

        Ok(Self { fields })
    }

    /// Look up the spec of a named field
    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| &f.spec)
    }

    /// Names of all unique-flagged fields, `pk` included
    pub fn get_unique(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| f.spec.unique)
            .map(|f| f.name.clone())
            .collect()
    }

    /// Validate a candidate record, reporting all field-level violations
    /// together as a field → messages mapping.
    ///
    /// In [`ValidationMode::Full`] the returned record carries the schema's
    /// field order, with defaults and generators applied to absent optional
    /// fields. In [`ValidationMode::Partial`] only the supplied fields are
    /// checked and returned.
    pub fn validate(&self, data: &Record, mode: ValidationMode) -> Result<Record> {
        let mut errors: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut validated = Map::new();

        // Fields the schema knows nothing about are rejected outright.
        for key in data.keys() {
            if self.get(key).is_none() {
                errors
                    .entry(key.clone())
                    .or_default()
                    .push("Unknown field.".to_string());
            }
        }

        match mode {
            ValidationMode::Full => {
                for field in &self.fields {
                    match data.get(&field.name) {
                        Some(Value::Null) => {
                            if field.spec.allow_none {
                                validated.insert(field.name.clone(), Value::Null);
                            } else {
                                errors
                                    .entry(field.name.clone())
                                    .or_default()
                                    .push("Field may not be null.".to_string());
                            }
                        }
                        Some(value) => {
                            let field_errors = field.spec.check_value(value);
                            if field_errors.is_empty() {
                                validated.insert(field.name.clone(), value.clone());
                            } else {
                                errors
                                    .entry(field.name.clone())
                                    .or_default()
                                    .extend(field_errors);
                            }
                        }
                        None => match field.spec.generate_default() {
                            Some(default) => {
                                validated.insert(field.name.clone(), default);
                            }
                            None if field.spec.required => {
                                errors
                                    .entry(field.name.clone())
                                    .or_default()
                                    .push("Missing data for required field.".to_string());
                            }
                            None => {}
                        },
                    }
                }
            }
            ValidationMode::Partial => {
                for (key, value) in data {
                    let spec = match self.get(key) {
                        Some(spec) => spec,
                        None => continue, // already reported as unknown
                    };
                    if value.is_null() {
                        if spec.allow_none {
                            validated.insert(key.clone(), Value::Null);
                        } else {
                            errors
                                .entry(key.clone())
                                .or_default()
                                .push("Field may not be null.".to_string());
                        }
                        continue;
                    }
                    let field_errors = spec.check_value(value);
                    if field_errors.is_empty() {
                        validated.insert(key.clone(), value.clone());
                    } else {
                        errors.entry(key.clone()).or_default().extend(field_errors);
                    }
                }
            }
        }

        if !errors.is_empty() {
            return Err(DbError::DataInvalid { errors });
        }

        Ok(validated)
    }
}

/// Persists schemas as JSON files beside their table's record file.
pub struct SchemaRegistry;

impl SchemaRegistry {
    const SCHEMA_EXT: &'static str = ".schema.json";

    /// Path of the schema artifact for a table
    pub fn schema_path(db_path: &Path, table: &str) -> PathBuf {
        db_path.join(format!("{table}{}", Self::SCHEMA_EXT))
    }

    /// Write a schema artifact, replacing any existing one
    pub fn save(db_path: &Path, table: &str, schema: &Schema) -> Result<()> {
        let path = Self::schema_path(db_path, table);
        let serialized = serde_json::to_string_pretty(schema)?;
        fs::write(path, serialized)?;
        Ok(())
    }

    /// Load the schema for a table
    pub fn load(db_path: &Path, table: &str) -> Result<Schema> {
        let path = Self::schema_path(db_path, table);
        if !path.exists() {
            return Err(DbError::TableSchemaNotExist {
                table: table.to_string(),
            });
        }
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Delete the schema artifact for a table
    pub fn remove(db_path: &Path, table: &str) -> Result<()> {
        let path = Self::schema_path(db_path, table);
        if !path.exists() {
            return Err(DbError::TableSchemaNotExist {
                table: table.to_string(),
            });
        }
        fs::remove_file(path)?;
        Ok(())
    }
}
