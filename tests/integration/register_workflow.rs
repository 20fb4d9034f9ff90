//! Integration tests for the resource registration workflow.

use crate::common::backends::ScriptedBackend;
use crate::common::fixtures::{RESOURCE_SET_PATH, registry};
use crate::common::{init_logging, reply};
use proptest::prelude::*;
use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use uma_resource_server::{
    Backend, InMemoryDocumentStore, Operation, OperationState, OperationType,
    REGISTER_HANDLER_ID,
};

fn store() -> Arc<dyn Backend> {
    Arc::new(InMemoryDocumentStore::new())
}

#[tokio::test]
async fn test_create_returns_registration_id() {
    init_logging();
    let authz = ScriptedBackend::new(|op| {
        reply(
            op.kind(),
            OperationState::Success,
            json!({"_id": "abc", "user_access_policy_uri": "https://as/policy"}),
        )
    });
    let registry = registry(authz.clone(), store());

    let output = registry
        .process(
            REGISTER_HANDLER_ID,
            Operation::create(json!({
                "data": {"name": "Photo Album", "type": "x", "resource_scopes": ["view"]},
                "access_token": "T"
            })),
        )
        .await;

    assert_eq!(output.state(), OperationState::Success);
    assert_eq!(output.payload(), &json!({"uid": "abc"}));

    let calls = authz.calls();
    assert_eq!(calls.len(), 1);
    let request = calls[0].payload();
    assert_eq!(calls[0].kind(), OperationType::Create);
    assert_eq!(request["path"], RESOURCE_SET_PATH);
    assert_eq!(request["headers"]["Authorization"], "Bearer T");
    assert_eq!(request["headers"]["Content-Type"], "application/json");
    assert_eq!(request["data"]["name"], "Photo Album");
}

#[tokio::test]
async fn test_create_backend_failure_carries_status() {
    let authz = ScriptedBackend::new(|op| {
        let mut output = reply(op.kind(), OperationState::Error, json!({"code": 400}));
        output.set_status("400 Bad Request");
        output
    });
    let registry = registry(authz, store());

    let output = registry
        .process(
            REGISTER_HANDLER_ID,
            Operation::create(json!({"data": {"name": "x"}, "access_token": "T"})),
        )
        .await;

    assert_eq!(output.state(), OperationState::Error);
    assert!(output.status_or_empty().contains("400 Bad Request"));
}

#[tokio::test]
async fn test_create_without_data_never_calls_backend() {
    let authz =
        ScriptedBackend::new(|op| reply(op.kind(), OperationState::Success, json!({"_id": "abc"})));
    let registry = registry(authz.clone(), store());

    let output = registry
        .process(
            REGISTER_HANDLER_ID,
            Operation::create(json!({"access_token": "T", "data": {}})),
        )
        .await;

    assert!(output.is_error());
    assert!(output.status_or_empty().contains("data"));
    assert_eq!(authz.call_count(), 0);
}

#[tokio::test]
async fn test_read_outcomes() {
    let authz = ScriptedBackend::new(|op| match op.payload()["uid"].as_str() {
        Some("found") => reply(
            op.kind(),
            OperationState::Success,
            json!({"_id": "found", "name": "Album"}),
        ),
        Some("empty") => reply(op.kind(), OperationState::Success, json!({})),
        _ => reply(op.kind(), OperationState::NotExist, json!({})),
    });
    let registry = registry(authz, store());

    let read = |uid: &str| Operation::read(json!({"access_token": "T", "uid": uid}));

    let found = registry.process(REGISTER_HANDLER_ID, read("found")).await;
    assert_eq!(found.state(), OperationState::Success);
    assert_eq!(found.payload()["data"]["name"], "Album");

    let missing = registry.process(REGISTER_HANDLER_ID, read("missing")).await;
    assert_eq!(missing.state(), OperationState::NotExist);
    assert!(!missing.is_error());
    assert_eq!(missing.payload(), &Value::Null);

    let empty = registry.process(REGISTER_HANDLER_ID, read("empty")).await;
    assert_eq!(empty.state(), OperationState::Error);
    assert!(empty.status_or_empty().contains("empty"));
}

#[tokio::test]
async fn test_search_not_exist_is_empty_collection() {
    let authz = ScriptedBackend::new(|op| reply(op.kind(), OperationState::NotExist, json!({})));
    let registry = registry(authz, store());

    let output = registry
        .process(
            REGISTER_HANDLER_ID,
            Operation::search(json!({"query": {"operator": "equal", "value": "T"}})),
        )
        .await;

    assert!(!output.is_error());
    assert_eq!(output.state(), OperationState::Success);
    assert_eq!(output.payload(), &json!({"results": [], "quantity": 0}));
}

#[tokio::test]
async fn test_search_normalises_bare_array() {
    let authz = ScriptedBackend::new(|op| {
        reply(op.kind(), OperationState::Success, json!(["reg-1", "reg-2"]))
    });
    let registry = registry(authz.clone(), store());

    let output = registry
        .process(
            REGISTER_HANDLER_ID,
            Operation::search(json!({"query": {"value": "T"}})),
        )
        .await;

    assert_eq!(output.payload(), &json!({"results": ["reg-1", "reg-2"], "quantity": 2}));
    assert_eq!(authz.calls()[0].payload()["headers"]["Authorization"], "Bearer T");
}

#[tokio::test]
async fn test_search_without_query_value_is_failed() {
    let authz = ScriptedBackend::new(|op| reply(op.kind(), OperationState::Success, json!([])));
    let registry = registry(authz.clone(), store());

    let output = registry
        .process(
            REGISTER_HANDLER_ID,
            Operation::search(json!({"query": {"operator": "none"}})),
        )
        .await;

    assert_eq!(output.state(), OperationState::Failed);
    assert_eq!(authz.call_count(), 0);
}

#[tokio::test]
async fn test_replace_merges_over_stored_record() {
    let authz = ScriptedBackend::new(|op| match op.kind() {
        OperationType::Read => reply(op.kind(), OperationState::Success, json!({"a": 1, "b": 2})),
        _ => reply(op.kind(), OperationState::Success, json!({"_id": "reg-1"})),
    });
    let registry = registry(authz.clone(), store());

    let output = registry
        .process(
            REGISTER_HANDLER_ID,
            Operation::replace(json!({
                "access_token": "T",
                "uid": "reg-1",
                "data": {"b": 3, "c": 4}
            })),
        )
        .await;

    assert_eq!(output.state(), OperationState::Success);
    let calls = authz.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].kind(), OperationType::Replace);
    assert_eq!(calls[1].payload()["data"], json!({"a": 1, "b": 3, "c": 4}));
    assert_eq!(calls[1].payload()["uid"], "reg-1");
}

#[tokio::test]
async fn test_replace_of_missing_registration_is_error() {
    let authz = ScriptedBackend::new(|op| reply(op.kind(), OperationState::NotExist, json!({})));
    let registry = registry(authz.clone(), store());

    let output = registry
        .process(
            REGISTER_HANDLER_ID,
            Operation::replace(json!({"access_token": "T", "uid": "ghost", "data": {"b": 3}})),
        )
        .await;

    assert_eq!(output.state(), OperationState::Error);
    // No update after the failed read
    assert_eq!(authz.call_count(), 1);
}

#[tokio::test]
async fn test_delete_twice_is_success_then_not_exist() {
    let existing = Arc::new(Mutex::new(HashSet::from(["reg-1".to_string()])));
    let authz = {
        let existing = Arc::clone(&existing);
        ScriptedBackend::new(move |op| {
            let uid = op.payload()["uid"].as_str().unwrap_or_default().to_string();
            if existing.lock().unwrap().remove(&uid) {
                reply(op.kind(), OperationState::Success, json!({}))
            } else {
                reply(op.kind(), OperationState::NotExist, json!({}))
            }
        })
    };
    let registry = registry(authz, store());
    let delete = || Operation::delete(json!({"access_token": "T", "uid": "reg-1"}));

    let first = registry.process(REGISTER_HANDLER_ID, delete()).await;
    let second = registry.process(REGISTER_HANDLER_ID, delete()).await;

    assert_eq!(first.state(), OperationState::Success);
    assert_eq!(second.state(), OperationState::NotExist);
    assert!(!first.is_error());
    assert!(!second.is_error());
}

#[tokio::test]
async fn test_delete_failure_reports_backend_details() {
    let authz = ScriptedBackend::new(|op| {
        reply(op.kind(), OperationState::Error, json!({"reason": "locked"}))
    });
    let registry = registry(authz, store());

    let output = registry
        .process(
            REGISTER_HANDLER_ID,
            Operation::delete(json!({"access_token": "T", "uid": "reg-1"})),
        )
        .await;

    assert_eq!(output.state(), OperationState::Error);
    let status = output.status_or_empty();
    assert!(status.contains("ERROR"));
    assert!(status.contains("500 Internal Server Error"));
    assert!(status.contains("locked"));
}

fn kind_requiring_uid() -> impl Strategy<Value = OperationType> {
    prop_oneof![
        Just(OperationType::Read),
        Just(OperationType::Replace),
        Just(OperationType::Delete),
    ]
}

proptest! {
    #[test]
    fn prop_missing_uid_never_reaches_backend(
        kind in kind_requiring_uid(),
        extra in prop::collection::btree_map("[a-t]{1,8}", "[a-z0-9]{0,8}", 0..4),
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let authz =
            ScriptedBackend::new(|op| reply(op.kind(), OperationState::Success, json!({"a": 1})));
        let registry = registry(authz.clone(), store());

        let mut payload = json!({"access_token": "T", "data": {"a": 2}});
        for (key, value) in &extra {
            payload[key.as_str()] = json!(value);
        }
        let output = runtime.block_on(
            registry.process(REGISTER_HANDLER_ID, Operation::with_payload(kind, payload)),
        );

        prop_assert!(matches!(output.state(), OperationState::Error | OperationState::Failed));
        prop_assert_eq!(authz.call_count(), 0);
    }
}
