//! Storage Module
//!
//! Filesystem-backed database/table/record CRUD.
//!
//! ## On-disk layout
//!
//! ```text
//! {data_dir}/
//!   └── {database}/
//!         ├── db_conf.json          (database config incl. credentials)
//!         ├── {table}.data          (newline-delimited JSON records)
//!         └── {table}.schema.json   (schema artifact)
//! ```

mod engine;

pub use engine::StorageEngine;
