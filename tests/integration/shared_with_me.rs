//! Integration tests for the "shared with me" aggregation.

use crate::common::backends::{ScriptedBackend, SpyBackend};
use crate::common::fixtures::{
    ADMIN_TOKEN, AUTHENTICATE_PATH, COOKIE, RS_ID, registry, shared_entry, store_resource,
};
use crate::common::{init_logging, path_of, reply};
use serde_json::{Value, json};
use std::sync::Arc;
use uma_resource_server::{
    InMemoryDocumentStore, Operation, OperationState, OperationType,
    SHARED_WITH_ME_HANDLER_ID,
};

const SUBJECT: &str = "aadams";

/// Authorization Server answering authentication, the shared-with search
/// and policy reads.
fn authz_with(entries: Vec<Value>) -> Arc<ScriptedBackend> {
    ScriptedBackend::new(move |op| {
        let path = path_of(op);
        match op.kind() {
            OperationType::Create if path == AUTHENTICATE_PATH => {
                reply(
                    op.kind(),
                    OperationState::Success,
                    json!({"tokenId": ADMIN_TOKEN, "realm": "/"}),
                )
            }
            OperationType::Search if path.ends_with("/oauth2/resources/sets") => reply(
                op.kind(),
                OperationState::Success,
                json!({"result": entries.clone(), "resultCount": entries.len()}),
            ),
            OperationType::Read if path.contains("/uma/policies") => reply(
                op.kind(),
                OperationState::Success,
                json!({
                    "_id": op.payload()["uid"],
                    "permissions": [
                        {"subject": "AAdams", "scopes": ["view"]},
                        {"subject": "bjensen", "scopes": ["view", "markup"]}
                    ]
                }),
            ),
            _ => Operation::error(op.kind(), "unexpected call"),
        }
    })
}

fn shared_with(subject: &str) -> Operation {
    Operation::search(json!({"subject": subject, "sso_token": "rqp-session"}))
}

#[tokio::test]
async fn test_shared_resource_is_projected() {
    init_logging();
    let store = InMemoryDocumentStore::new();
    store_resource(&store, "res-1", "reg-1", true).await;
    let authz = authz_with(vec![shared_entry("reg-1", "bjensen", RS_ID)]);
    let registry = registry(authz.clone(), Arc::new(store));

    let output = registry.process(SHARED_WITH_ME_HANDLER_ID, shared_with(SUBJECT)).await;

    assert_eq!(output.state(), OperationState::Success);
    assert_eq!(output.payload()["quantity"], 1);
    let record = &output.payload()["results"][0];
    assert_eq!(record["id"], "res-1");
    assert_eq!(record["label"], "Label reg-1");
    assert_eq!(record["description"], "Description reg-1");
    assert_eq!(record["owner"], "bjensen");
    assert_eq!(record["type"], "healthcare-report");
    assert_eq!(record["policy"], json!(["view"]));
    assert_eq!(record["scopes"], json!(["view", "meta", "markup"]));
    for dropped in ["_id", "_rev", "resourceServer", "labels", "resourceOwnerId"] {
        assert!(record.get(dropped).is_none(), "{} should be dropped", dropped);
    }
}

#[tokio::test]
async fn test_requests_sent_to_authorization_server() {
    let store = InMemoryDocumentStore::new();
    store_resource(&store, "res-1", "reg-1", false).await;
    let authz = authz_with(vec![shared_entry("reg-1", "bjensen", RS_ID)]);
    let registry = registry(authz.clone(), Arc::new(store));

    registry.process(SHARED_WITH_ME_HANDLER_ID, shared_with(SUBJECT)).await;

    let searches = authz.calls_to("oauth2/resources/sets");
    assert_eq!(searches.len(), 1);
    let search = searches[0].payload();
    assert_eq!(search["path"], "json/realms/root/users/aadams/oauth2/resources/sets");
    assert_eq!(search["headers"]["Accept-API-Version"], "protocol=1.0,resource=1.0");
    assert_eq!(search["headers"][COOKIE], "rqp-session");
    assert_eq!(search["query_params"]["_sortKeys"], "name");
    assert_eq!(search["query_params"]["_queryFilter"], "! resourceOwnerId eq \"aadams\"");

    let policies = authz.calls_to("/uma/policies");
    assert_eq!(policies.len(), 1);
    let policy = policies[0].payload();
    assert_eq!(policy["path"], "json/realms/root/users/bjensen/uma/policies");
    assert_eq!(policy["uid"], "reg-1");
    assert_eq!(policy["headers"][COOKIE], ADMIN_TOKEN);
}

#[tokio::test]
async fn test_failed_secondary_lookup_drops_only_that_entry() {
    let store = InMemoryDocumentStore::new();
    for (uid, reg) in [("res-1", "reg-1"), ("res-2", "reg-2"), ("res-3", "reg-3")] {
        store_resource(&store, uid, reg, false).await;
    }
    let store = SpyBackend::poisoned(Arc::new(store), "reg-2");
    let authz = authz_with(vec![
        shared_entry("reg-1", "bjensen", RS_ID),
        shared_entry("reg-2", "bjensen", RS_ID),
        shared_entry("reg-3", "bjensen", RS_ID),
    ]);
    let registry = registry(authz, store.clone());

    let output = registry.process(SHARED_WITH_ME_HANDLER_ID, shared_with(SUBJECT)).await;

    assert_eq!(output.state(), OperationState::Success);
    assert_eq!(output.payload()["quantity"], 2);
    let ids: Vec<&str> = output.payload()["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["res-1", "res-3"]);
    assert_eq!(store.call_count(), 3);
}

#[tokio::test]
async fn test_entry_without_resource_record_is_skipped() {
    let store = InMemoryDocumentStore::new();
    store_resource(&store, "res-1", "reg-1", false).await;
    let authz = authz_with(vec![
        shared_entry("reg-1", "bjensen", RS_ID),
        shared_entry("reg-orphan", "bjensen", RS_ID),
    ]);
    let registry = registry(authz.clone(), Arc::new(store));

    let output = registry.process(SHARED_WITH_ME_HANDLER_ID, shared_with(SUBJECT)).await;

    assert_eq!(output.state(), OperationState::Success);
    assert_eq!(output.payload()["quantity"], 1);
    // No policy lookup for the orphan
    assert_eq!(authz.calls_to("/uma/policies").len(), 1);
}

#[tokio::test]
async fn test_cross_tenant_entries_are_excluded() {
    let store = InMemoryDocumentStore::new();
    store_resource(&store, "res-1", "reg-1", true).await;
    store_resource(&store, "res-2", "reg-2", true).await;
    store_resource(&store, "res-3", "reg-3", true).await;
    let authz = authz_with(vec![
        shared_entry("reg-1", "bjensen", "Another-Resource-Server"),
        shared_entry("reg-2", "bjensen", &RS_ID.to_lowercase()),
        json!({"_id": "reg-3", "resourceOwnerId": "bjensen", "name": "no origin"}),
    ]);
    let registry = registry(authz, Arc::new(store));

    let output = registry.process(SHARED_WITH_ME_HANDLER_ID, shared_with(SUBJECT)).await;

    assert_eq!(output.payload()["quantity"], 1);
    assert_eq!(output.payload()["results"][0]["id"], "res-2");
}

#[tokio::test]
async fn test_scopes_present_only_for_discoverable_resources() {
    let store = InMemoryDocumentStore::new();
    store_resource(&store, "res-1", "reg-1", true).await;
    store_resource(&store, "res-2", "reg-2", false).await;
    let authz = authz_with(vec![
        shared_entry("reg-1", "bjensen", RS_ID),
        shared_entry("reg-2", "bjensen", RS_ID),
    ]);
    let registry = registry(authz, Arc::new(store));

    let output = registry.process(SHARED_WITH_ME_HANDLER_ID, shared_with(SUBJECT)).await;

    let results = output.payload()["results"].as_array().unwrap();
    let by_id = |id: &str| results.iter().find(|r| r["id"] == id).unwrap();
    assert!(by_id("res-1").get("scopes").is_some());
    assert!(by_id("res-2").get("scopes").is_none());
    assert_eq!(by_id("res-2")["policy"], json!(["view"]));
}

#[tokio::test]
async fn test_subject_without_permission_gets_empty_policy() {
    let store = InMemoryDocumentStore::new();
    store_resource(&store, "res-1", "reg-1", false).await;
    let authz = authz_with(vec![shared_entry("reg-1", "bjensen", RS_ID)]);
    let registry = registry(authz, Arc::new(store));

    let output = registry
        .process(SHARED_WITH_ME_HANDLER_ID, shared_with("charlie"))
        .await;

    assert_eq!(output.payload()["quantity"], 1);
    assert_eq!(output.payload()["results"][0]["policy"], json!([]));
}

#[tokio::test]
async fn test_caller_filter_runs_before_secondary_lookups() {
    let store = InMemoryDocumentStore::new();
    store_resource(&store, "res-1", "reg-1", false).await;
    store_resource(&store, "res-2", "reg-2", false).await;
    let store = SpyBackend::new(Arc::new(store));

    let mut other = shared_entry("reg-2", "bjensen", RS_ID);
    other["type"] = json!("photo-album");
    let authz = authz_with(vec![shared_entry("reg-1", "bjensen", RS_ID), other]);
    let registry = registry(authz, store.clone());

    let output = registry
        .process(
            SHARED_WITH_ME_HANDLER_ID,
            Operation::search(json!({
                "subject": SUBJECT,
                "sso_token": "rqp-session",
                "query": {"operator": "equal", "attribute": "type", "value": "Photo-Album"}
            })),
        )
        .await;

    assert_eq!(output.payload()["quantity"], 1);
    assert_eq!(output.payload()["results"][0]["id"], "res-2");
    assert_eq!(store.call_count(), 1);
}

#[tokio::test]
async fn test_incomplete_caller_filter_drops_every_entry() {
    let store = InMemoryDocumentStore::new();
    store_resource(&store, "res-1", "reg-1", false).await;
    let store = SpyBackend::new(Arc::new(store));
    let authz = authz_with(vec![shared_entry("reg-1", "bjensen", RS_ID)]);
    let registry = registry(authz, store.clone());

    let output = registry
        .process(
            SHARED_WITH_ME_HANDLER_ID,
            Operation::search(json!({
                "subject": SUBJECT,
                "sso_token": "rqp-session",
                "query": {"operator": "equal", "attribute": "type", "value": ""}
            })),
        )
        .await;

    assert_eq!(output.state(), OperationState::Success);
    assert_eq!(output.payload(), &json!({"results": [], "quantity": 0}));
    assert_eq!(store.call_count(), 0);
}

#[tokio::test]
async fn test_proxy_admin_failure_aborts() {
    let authz = ScriptedBackend::new(|op| {
        reply(op.kind(), OperationState::Error, json!({"reason": "Authentication Failed"}))
    });
    let registry = registry(authz.clone(), Arc::new(InMemoryDocumentStore::new()));

    let output = registry.process(SHARED_WITH_ME_HANDLER_ID, shared_with(SUBJECT)).await;

    assert_eq!(output.state(), OperationState::Error);
    assert!(output.status_or_empty().contains("proxy admin"));
    assert!(authz.calls_to("oauth2/resources/sets").is_empty());
}

#[tokio::test]
async fn test_primary_search_failure_yields_empty_collection() {
    for primary_state in [OperationState::Error, OperationState::NotExist] {
        let authz = ScriptedBackend::new(move |op| {
            if path_of(op) == AUTHENTICATE_PATH {
                reply(op.kind(), OperationState::Success, json!({"tokenId": ADMIN_TOKEN}))
            } else {
                reply(op.kind(), primary_state, json!({}))
            }
        });
        let registry = registry(authz, Arc::new(InMemoryDocumentStore::new()));

        let output = registry.process(SHARED_WITH_ME_HANDLER_ID, shared_with(SUBJECT)).await;

        assert_eq!(output.state(), primary_state);
        assert_eq!(output.payload(), &json!({"results": [], "quantity": 0}));
    }
}

#[tokio::test]
async fn test_missing_subject_is_failed() {
    let authz = authz_with(vec![]);
    let registry = registry(authz.clone(), Arc::new(InMemoryDocumentStore::new()));

    let output = registry
        .process(
            SHARED_WITH_ME_HANDLER_ID,
            Operation::search(json!({"sso_token": "rqp-session"})),
        )
        .await;

    assert_eq!(output.state(), OperationState::Failed);
    assert!(output.status_or_empty().contains("subject"));
    assert_eq!(authz.call_count(), 0);
}

#[tokio::test]
async fn test_only_search_is_supported() {
    let authz = authz_with(vec![]);
    let registry = registry(authz, Arc::new(InMemoryDocumentStore::new()));

    let output = registry
        .process(
            SHARED_WITH_ME_HANDLER_ID,
            Operation::read(json!({"uid": "x", "subject": SUBJECT})),
        )
        .await;

    assert_eq!(output.state(), OperationState::Error);
    assert!(output.status_or_empty().contains("Unsupported operation type"));
}
