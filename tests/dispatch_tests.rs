//! Dispatcher Tests
//!
//! Action routing, the authentication gate, and response payload shapes.

use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;

use flatdb::protocol::Action;
use flatdb::{Authenticator, Dispatcher, StorageEngine};

// =============================================================================
// Helpers
// =============================================================================

fn setup() -> (TempDir, Dispatcher, Arc<StorageEngine>, Arc<Authenticator>) {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(StorageEngine::new(dir.path()));
    let auth = Arc::new(Authenticator::new());
    let dispatcher = Dispatcher::new(Arc::clone(&storage), Arc::clone(&auth));

    // Bootstrap one database directly through the engine; LOGIN needs it
    let conf = json!({"NAME": "appdb", "USER": "admin", "PASSWORD": "secret"});
    storage
        .create_database(conf.as_object().unwrap(), false)
        .unwrap();

    (dir, dispatcher, storage, auth)
}

fn act(raw: Value) -> Action {
    serde_json::from_value(raw).unwrap()
}

fn login(dispatcher: &Dispatcher) -> String {
    let response = dispatcher
        .dispatch(&act(json!({
            "action": "LOGIN",
            "payload": {"database": "appdb", "user": "admin", "password": "secret"}
        })))
        .unwrap();
    response.payload["token"].as_str().unwrap().to_string()
}

fn create_people_table(dispatcher: &Dispatcher, token: &str) {
    dispatcher
        .dispatch(&act(json!({
            "action": "CREATE_TABLE",
            "table": "people",
            "payload": {
                "first_name": {"type": "string", "required": true, "unique": true,
                               "min_length": 2, "max_length": 20},
                "age": {"type": "integer", "required": true, "min": 18, "max": 99}
            },
            "auth": {"token": token}
        })))
        .unwrap();
}

// =============================================================================
// Auth Gate Tests
// =============================================================================

#[test]
fn ping_succeeds_without_token() {
    let (_dir, dispatcher, _, _) = setup();
    let response = dispatcher.dispatch(&act(json!({"action": "PING"}))).unwrap();
    assert_eq!(response.action_type, "PING");
    assert_eq!(response.payload, json!({"message": "PONG"}));
}

#[test]
fn actions_without_token_fail() {
    let (_dir, dispatcher, _, _) = setup();
    for action in ["CREATE_DATABASE", "CREATE_TABLE", "DROP_TABLE", "CREATE", "SELECT", "UPDATE", "DELETE"] {
        let err = dispatcher
            .dispatch(&act(json!({"action": action, "table": "people"})))
            .unwrap_err();
        assert_eq!(err.code(), "AUTHENTICATION_FAILED", "action {action}");
    }
}

#[test]
fn login_with_wrong_credentials_fails_and_issues_no_token() {
    let (_dir, dispatcher, _, auth) = setup();

    for payload in [
        json!({"database": "appdb", "user": "admin", "password": "wrong"}),
        json!({"database": "appdb", "user": "intruder", "password": "secret"}),
    ] {
        let err = dispatcher
            .dispatch(&act(json!({"action": "LOGIN", "payload": payload})))
            .unwrap_err();
        assert_eq!(err.code(), "AUTHENTICATION_FAILED");
    }

    // No token was stored along the way
    let probe = act(json!({"action": "SELECT", "table": "people",
                           "auth": {"token": "0123456789ABCDEF0123456789ABCDEF"}}));
    assert!(auth.is_authenticated(&probe).is_err());
}

#[test]
fn login_against_missing_database_fails() {
    let (_dir, dispatcher, _, _) = setup();
    let err = dispatcher
        .dispatch(&act(json!({
            "action": "LOGIN",
            "payload": {"database": "ghost", "user": "admin", "password": "secret"}
        })))
        .unwrap_err();
    assert_eq!(err.code(), "DATABASE_DOES_NOT_EXIST");
}

#[test]
fn issued_token_authorizes_subsequent_actions() {
    let (_dir, dispatcher, _, _) = setup();
    let token = login(&dispatcher);
    create_people_table(&dispatcher, &token);

    let response = dispatcher
        .dispatch(&act(json!({
            "action": "SELECT", "table": "people", "auth": {"token": token}
        })))
        .unwrap();
    assert_eq!(response.action_type, "SELECT");
    assert_eq!(response.payload, json!([]));
}

// =============================================================================
// Routing Tests
// =============================================================================

#[test]
fn unknown_action_yields_error_response_not_failure() {
    let (_dir, dispatcher, _, _) = setup();
    let response = dispatcher.dispatch(&act(json!({"action": "FLY"}))).unwrap();
    assert_eq!(response.action_type, "ERROR");
    assert_eq!(
        response.payload["message"],
        json!("'FLY' invalid action.")
    );
}

#[test]
fn create_without_table_fails_with_table_not_provided() {
    let (_dir, dispatcher, _, _) = setup();
    let token = login(&dispatcher);
    let err = dispatcher
        .dispatch(&act(json!({
            "action": "CREATE",
            "payload": {"first_name": "Ann", "age": 30},
            "auth": {"token": token}
        })))
        .unwrap_err();
    assert_eq!(err.code(), "TABLE_NOT_PROVIDED");
}

#[test]
fn create_database_echoes_payload() {
    let (_dir, dispatcher, _, _) = setup();
    let token = login(&dispatcher);
    let conf = json!({"NAME": "analytics", "USER": "bi", "PASSWORD": "pw", "REGION": "eu"});
    let response = dispatcher
        .dispatch(&act(json!({
            "action": "CREATE_DATABASE",
            "payload": conf.clone(),
            "auth": {"token": token}
        })))
        .unwrap();
    assert_eq!(response.action_type, "CREATE_DATABASE");
    assert_eq!(response.payload, conf);
}

#[test]
fn full_crud_flow() {
    let (_dir, dispatcher, _, _) = setup();
    let token = login(&dispatcher);
    create_people_table(&dispatcher, &token);
    let token = token.as_str();

    // CREATE returns the stored record (with generated pk) and the table
    let response = dispatcher
        .dispatch(&act(json!({
            "action": "CREATE", "table": "people",
            "payload": {"first_name": "Ann", "age": 30},
            "auth": {"token": token}
        })))
        .unwrap();
    assert_eq!(response.payload["table"], json!("people"));
    assert_eq!(response.payload["data"]["first_name"], json!("Ann"));
    let pk = response.payload["data"]["pk"].as_str().unwrap().to_string();

    dispatcher
        .dispatch(&act(json!({
            "action": "CREATE", "table": "people",
            "payload": {"first_name": "Bob", "age": 40},
            "auth": {"token": token}
        })))
        .unwrap();

    // SELECT by pk returns exactly the inserted record
    let response = dispatcher
        .dispatch(&act(json!({
            "action": "SELECT", "table": "people",
            "query": {"pk": pk},
            "auth": {"token": token}
        })))
        .unwrap();
    assert_eq!(response.payload.as_array().unwrap().len(), 1);

    // UPDATE counts rows affected
    let response = dispatcher
        .dispatch(&act(json!({
            "action": "UPDATE", "table": "people",
            "query": {"first_name": "Ann"},
            "payload": {"age": 31},
            "auth": {"token": token}
        })))
        .unwrap();
    assert_eq!(response.payload, json!({"count": 1}));

    // DELETE counts rows remaining
    let response = dispatcher
        .dispatch(&act(json!({
            "action": "DELETE", "table": "people",
            "query": {"first_name": "Ann"},
            "auth": {"token": token}
        })))
        .unwrap();
    assert_eq!(response.payload, json!({"count": 1}));

    // DELETE followed by SELECT with the same filter finds nothing
    let response = dispatcher
        .dispatch(&act(json!({
            "action": "SELECT", "table": "people",
            "query": {"first_name": "Ann"},
            "auth": {"token": token}
        })))
        .unwrap();
    assert_eq!(response.payload, json!([]));

    // DROP_TABLE responds with an empty payload
    let response = dispatcher
        .dispatch(&act(json!({
            "action": "DROP_TABLE", "table": "people",
            "auth": {"token": token}
        })))
        .unwrap();
    assert_eq!(response.payload, json!({}));
}
