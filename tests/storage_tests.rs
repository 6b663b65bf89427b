//! Storage Engine Tests
//!
//! File-backed CRUD, schema validation, uniqueness enforcement, and the
//! rewrite-in-place behaviors.

use std::fs;

use serde_json::{json, Map, Value};
use tempfile::TempDir;

use flatdb::StorageEngine;

// =============================================================================
// Helpers
// =============================================================================

fn obj(value: Value) -> Map<String, Value> {
    value.as_object().unwrap().clone()
}

fn engine() -> (TempDir, StorageEngine) {
    let dir = tempfile::tempdir().unwrap();
    let engine = StorageEngine::new(dir.path());
    (dir, engine)
}

fn db_conf(name: &str) -> Map<String, Value> {
    obj(json!({"NAME": name, "USER": "admin", "PASSWORD": "secret"}))
}

fn people_schema() -> Map<String, Value> {
    obj(json!({
        "first_name": {"type": "string", "required": true, "unique": true,
                       "min_length": 2, "max_length": 20},
        "age": {"type": "integer", "required": true, "unique": true,
                "min": 18, "max": 99}
    }))
}

/// Engine with database `appdb` and table `people` already in place
fn engine_with_table() -> (TempDir, StorageEngine) {
    let (dir, engine) = engine();
    engine.create_database(&db_conf("appdb"), false).unwrap();
    engine
        .create_table("appdb", "people", &people_schema())
        .unwrap();
    (dir, engine)
}

fn table_file(dir: &TempDir) -> std::path::PathBuf {
    dir.path().join("appdb").join("people.data")
}

// =============================================================================
// Database Tests
// =============================================================================

#[test]
fn create_database_writes_config() {
    let (_dir, engine) = engine();
    engine.create_database(&db_conf("appdb"), false).unwrap();

    let config = engine.read_database_config("appdb").unwrap();
    assert_eq!(config["NAME"], json!("appdb"));
    assert_eq!(config["USER"], json!("admin"));
    assert_eq!(config["PASSWORD"], json!("secret"));
}

#[test]
fn create_database_conflict_and_exist_ok() {
    let (_dir, engine) = engine();
    engine.create_database(&db_conf("appdb"), false).unwrap();

    let err = engine.create_database(&db_conf("appdb"), false).unwrap_err();
    assert_eq!(err.code(), "DATABASE_ALREADY_EXIST");

    // exist_ok returns the existing path without modification
    let path = engine.create_database(&db_conf("appdb"), true).unwrap();
    assert!(path.ends_with("appdb"));
    let config = engine.read_database_config("appdb").unwrap();
    assert_eq!(config["USER"], json!("admin"));
}

#[test]
fn create_database_requires_credentials() {
    let (_dir, engine) = engine();
    let err = engine
        .create_database(&obj(json!({"NAME": "appdb"})), false)
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_DATA");
}

#[test]
fn read_missing_database_config_fails() {
    let (_dir, engine) = engine();
    let err = engine.read_database_config("ghost").unwrap_err();
    assert_eq!(err.code(), "DATABASE_DOES_NOT_EXIST");
}

// =============================================================================
// Table Tests
// =============================================================================

#[test]
fn create_table_requires_database() {
    let (_dir, engine) = engine();
    let err = engine
        .create_table("ghost", "people", &people_schema())
        .unwrap_err();
    assert_eq!(err.code(), "DATABASE_DOES_NOT_EXIST");
}

#[test]
fn create_table_conflict() {
    let (_dir, engine) = engine_with_table();
    let err = engine
        .create_table("appdb", "people", &people_schema())
        .unwrap_err();
    assert_eq!(err.code(), "TABLE_ALREADY_EXIST");
}

#[test]
fn drop_table_removes_records_and_schema() {
    let (dir, engine) = engine_with_table();
    engine.drop_table("appdb", "people").unwrap();

    assert!(!table_file(&dir).exists());
    assert!(!dir.path().join("appdb").join("people.schema.json").exists());

    let err = engine.read("appdb", "people", &Map::new()).unwrap_err();
    assert_eq!(err.code(), "TABLE_DOES_NOT_EXIST");
}

// =============================================================================
// Insert / Select Tests
// =============================================================================

#[test]
fn insert_select_round_trip_on_pk() {
    let (_dir, engine) = engine_with_table();
    let stored = engine
        .insert("appdb", "people", &obj(json!({"first_name": "Ann", "age": 30})))
        .unwrap();

    let pk = stored["pk"].as_str().unwrap().to_string();
    let results = engine
        .read("appdb", "people", &obj(json!({ "pk": pk })))
        .unwrap();
    assert_eq!(results, vec![stored]);
}

#[test]
fn duplicate_unique_value_rejected() {
    let (_dir, engine) = engine_with_table();
    engine
        .insert("appdb", "people", &obj(json!({"first_name": "Ann", "age": 30})))
        .unwrap();

    // first_name is the first unique field in schema order
    let err = engine
        .insert("appdb", "people", &obj(json!({"first_name": "Ann", "age": 30})))
        .unwrap_err();
    assert_eq!(err.code(), "UNIQUE_VALUE_FOUND");
    assert_eq!(err.ref_data(), json!({"field": "first_name", "value": "Ann"}));
}

#[test]
fn invalid_record_reports_all_field_errors() {
    let (_dir, engine) = engine_with_table();
    let err = engine
        .insert("appdb", "people", &obj(json!({"first_name": "A", "age": 7})))
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_DATA");
    let ref_data = err.ref_data();
    assert!(ref_data.get("first_name").is_some());
    assert!(ref_data.get("age").is_some());
}

#[test]
fn select_returns_insertion_order() {
    let (_dir, engine) = engine_with_table();
    let names = ["Ann", "Bob", "Cleo", "Dina"];
    for (i, name) in names.iter().enumerate() {
        engine
            .insert(
                "appdb",
                "people",
                &obj(json!({"first_name": name, "age": 20 + i as i64})),
            )
            .unwrap();
    }

    let all = engine.read("appdb", "people", &Map::new()).unwrap();
    assert_eq!(all.len(), names.len());
    for (record, name) in all.iter().zip(names) {
        assert_eq!(record["first_name"], json!(name));
    }
}

#[test]
fn select_with_operator_query() {
    let (_dir, engine) = engine_with_table();
    for (name, age) in [("Ann", 25), ("Bob", 40), ("Cleo", 60)] {
        engine
            .insert("appdb", "people", &obj(json!({"first_name": name, "age": age})))
            .unwrap();
    }

    let adults = engine
        .read("appdb", "people", &obj(json!({"age": {"$gte": 40}})))
        .unwrap();
    assert_eq!(adults.len(), 2);
    assert_eq!(adults[0]["first_name"], json!("Bob"));
}

// =============================================================================
// Update Tests
// =============================================================================

#[test]
fn update_on_pk_fails_and_leaves_file_unchanged() {
    let (dir, engine) = engine_with_table();
    engine
        .insert("appdb", "people", &obj(json!({"first_name": "Ann", "age": 30})))
        .unwrap();

    let before = fs::read(table_file(&dir)).unwrap();
    let err = engine
        .update(
            "appdb",
            "people",
            &Map::new(),
            &obj(json!({"pk": "00000000-0000-0000-0000-000000000000"})),
        )
        .unwrap_err();
    assert_eq!(err.code(), "UPDATE_NOT_ALLOWED_ON_PK");

    let after = fs::read(table_file(&dir)).unwrap();
    assert_eq!(before, after);
}

#[test]
fn update_merges_and_counts_affected_rows() {
    let (_dir, engine) = engine_with_table();
    for (name, age) in [("Ann", 25), ("Bob", 40)] {
        engine
            .insert("appdb", "people", &obj(json!({"first_name": name, "age": age})))
            .unwrap();
    }

    let count = engine
        .update(
            "appdb",
            "people",
            &obj(json!({"first_name": "Ann"})),
            &obj(json!({"age": 26})),
        )
        .unwrap();
    assert_eq!(count, 1);

    let all = engine.read("appdb", "people", &Map::new()).unwrap();
    // file position preserved: Ann is still first
    assert_eq!(all[0]["first_name"], json!("Ann"));
    assert_eq!(all[0]["age"], json!(26));
    assert_eq!(all[1]["age"], json!(40));
}

#[test]
fn update_unique_conflict_aborts_without_modification() {
    let (dir, engine) = engine_with_table();
    engine
        .insert("appdb", "people", &obj(json!({"first_name": "Ann", "age": 30})))
        .unwrap();
    engine
        .insert("appdb", "people", &obj(json!({"first_name": "Bob", "age": 40})))
        .unwrap();

    let before = fs::read(table_file(&dir)).unwrap();
    let err = engine
        .update(
            "appdb",
            "people",
            &obj(json!({"first_name": "Ann"})),
            &obj(json!({"age": 40})),
        )
        .unwrap_err();
    assert_eq!(err.code(), "UNIQUE_VALUE_FOUND");
    assert_eq!(fs::read(table_file(&dir)).unwrap(), before);
}

#[test]
fn update_invalid_patch_aborts_without_modification() {
    let (dir, engine) = engine_with_table();
    engine
        .insert("appdb", "people", &obj(json!({"first_name": "Ann", "age": 30})))
        .unwrap();

    let before = fs::read(table_file(&dir)).unwrap();
    let err = engine
        .update(
            "appdb",
            "people",
            &obj(json!({"first_name": "Ann"})),
            &obj(json!({"age": 150})),
        )
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_DATA");
    assert_eq!(fs::read(table_file(&dir)).unwrap(), before);
}

#[test]
fn update_with_no_match_touches_nothing() {
    let (_dir, engine) = engine_with_table();
    engine
        .insert("appdb", "people", &obj(json!({"first_name": "Ann", "age": 30})))
        .unwrap();
    let count = engine
        .update(
            "appdb",
            "people",
            &obj(json!({"first_name": "Zoe"})),
            &obj(json!({"age": 50})),
        )
        .unwrap();
    assert_eq!(count, 0);
}

// =============================================================================
// Delete Tests
// =============================================================================

#[test]
fn delete_returns_remaining_rows() {
    let (_dir, engine) = engine_with_table();
    for (name, age) in [("Ann", 25), ("Bob", 40), ("Cleo", 60)] {
        engine
            .insert("appdb", "people", &obj(json!({"first_name": name, "age": age})))
            .unwrap();
    }

    // count of rows REMAINING, not rows removed
    let remaining = engine
        .delete("appdb", "people", &obj(json!({"first_name": "Ann"})))
        .unwrap();
    assert_eq!(remaining, 2);

    let gone = engine
        .read("appdb", "people", &obj(json!({"first_name": "Ann"})))
        .unwrap();
    assert!(gone.is_empty());
}

#[test]
fn delete_everything_truncates_the_file() {
    let (dir, engine) = engine_with_table();
    engine
        .insert("appdb", "people", &obj(json!({"first_name": "Ann", "age": 30})))
        .unwrap();

    let remaining = engine.delete("appdb", "people", &Map::new()).unwrap();
    assert_eq!(remaining, 0);
    assert_eq!(fs::read_to_string(table_file(&dir)).unwrap(), "");
    assert!(engine.read("appdb", "people", &Map::new()).unwrap().is_empty());
}
