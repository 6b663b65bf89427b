//! Field definitions
//!
//! A [`FieldSpec`] describes one column of a table: its type, whether it is
//! required, nullable, or unique, an optional default (or uuid generator),
//! and the type-specific validators (length/range/regex/enum/format).

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Supported field types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    Date,
    DateTime,
    Uuid,
}

impl FieldType {
    /// Human-readable type name used in validation messages
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::DateTime => "datetime",
            FieldType::Uuid => "uuid",
        }
    }
}

/// Specification of a single schema field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(rename = "type")]
    pub field_type: FieldType,

    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub allow_none: bool,

    #[serde(default)]
    pub unique: bool,

    /// Literal default applied when the field is absent on insert
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Generate a fresh uuid when the field is absent on insert
    #[serde(default)]
    pub auto_generate: bool,

    // --- string validators ---
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    // --- numeric validators ---
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    // --- string/numeric enum membership ---
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,

    // --- date/datetime parse format, default "iso" ---
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl FieldSpec {
    /// A bare spec of the given type with no constraints
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
            allow_none: false,
            unique: false,
            default: None,
            auto_generate: false,
            min_length: None,
            max_length: None,
            pattern: None,
            min: None,
            max: None,
            enum_values: None,
            format: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Produce the value used to fill this field when it is absent.
    pub fn generate_default(&self) -> Option<Value> {
        if self.auto_generate {
            return Some(Value::String(Uuid::new_v4().to_string()));
        }
        self.default.clone()
    }

    /// Validate a present, non-null value against this spec.
    ///
    /// Returns every violation, not just the first.
    pub fn check_value(&self, value: &Value) -> Vec<String> {
        let mut errors = Vec::new();

        match self.field_type {
            FieldType::String => match value.as_str() {
                Some(s) => {
                    let len = s.chars().count();
                    if let Some(min) = self.min_length {
                        if len < min {
                            errors.push(format!("Shorter than minimum length {min}."));
                        }
                    }
                    if let Some(max) = self.max_length {
                        if len > max {
                            errors.push(format!("Longer than maximum length {max}."));
                        }
                    }
                    if let Some(pattern) = &self.pattern {
                        match Regex::new(pattern) {
                            Ok(re) => {
                                if !re.is_match(s) {
                                    errors.push(
                                        "String does not match expected pattern.".to_string(),
                                    );
                                }
                            }
                            Err(_) => {
                                errors.push(format!("Invalid pattern '{pattern}' in schema."))
                            }
                        }
                    }
                    self.check_enum(value, &mut errors);
                }
                None => errors.push("Not a valid string.".to_string()),
            },

            FieldType::Integer => {
                if value.as_i64().is_some() || value.as_u64().is_some() {
                    self.check_range(value, &mut errors);
                    self.check_enum(value, &mut errors);
                } else {
                    errors.push("Not a valid integer.".to_string());
                }
            }

            FieldType::Float => {
                if value.is_number() {
                    self.check_range(value, &mut errors);
                    self.check_enum(value, &mut errors);
                } else {
                    errors.push("Not a valid number.".to_string());
                }
            }

            FieldType::Boolean => {
                if !value.is_boolean() {
                    errors.push("Not a valid boolean.".to_string());
                }
            }

            FieldType::Date => match value.as_str() {
                Some(s) => {
                    if !self.parse_date(s) {
                        errors.push("Not a valid date.".to_string());
                    }
                }
                None => errors.push("Not a valid date.".to_string()),
            },

            FieldType::DateTime => match value.as_str() {
                Some(s) => {
                    if !self.parse_datetime(s) {
                        errors.push("Not a valid datetime.".to_string());
                    }
                }
                None => errors.push("Not a valid datetime.".to_string()),
            },

            FieldType::Uuid => match value.as_str() {
                Some(s) => {
                    if Uuid::parse_str(s).is_err() {
                        errors.push("Not a valid UUID.".to_string());
                    }
                }
                None => errors.push("Not a valid UUID.".to_string()),
            },
        }

        errors
    }

    fn check_range(&self, value: &Value, errors: &mut Vec<String>) {
        // as_f64 holds for every JSON number representation
        let n = value.as_f64().unwrap_or_default();
        if let Some(min) = self.min {
            if n < min {
                errors.push(format!("Must be greater than or equal to {min}."));
            }
        }
        if let Some(max) = self.max {
            if n > max {
                errors.push(format!("Must be less than or equal to {max}."));
            }
        }
    }

    fn check_enum(&self, value: &Value, errors: &mut Vec<String>) {
        if let Some(allowed) = &self.enum_values {
            if !allowed.contains(value) {
                let options: Vec<String> = allowed.iter().map(|v| v.to_string()).collect();
                errors.push(format!("Must be one of: {}.", options.join(", ")));
            }
        }
    }

    fn parse_date(&self, s: &str) -> bool {
        match self.format.as_deref() {
            None | Some("iso") => NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok(),
            Some(fmt) => NaiveDate::parse_from_str(s, fmt).is_ok(),
        }
    }

    fn parse_datetime(&self, s: &str) -> bool {
        match self.format.as_deref() {
            None | Some("iso") => {
                DateTime::parse_from_rfc3339(s).is_ok()
                    || NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
            }
            Some(fmt) => NaiveDateTime::parse_from_str(s, fmt).is_ok(),
        }
    }
}
