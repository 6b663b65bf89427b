//! Schema Module
//!
//! Declarative per-table field definitions, validation, and uniqueness
//! metadata. A schema is pure data: it is persisted as a JSON artifact next
//! to its table's record file and interpreted by a generic validator, so no
//! code generation or dynamic loading is involved.

mod field;
mod registry;

pub use field::{FieldSpec, FieldType};
pub use registry::{Schema, SchemaRegistry, ValidationMode, PK_FIELD};
