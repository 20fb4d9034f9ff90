//! Resource metadata handler.
//!
//! Resource-server side records describing each protected resource. A
//! record is `{uid, data}`; `data.register` links it to its registration on
//! the Authorization Server and `data.meta` holds the display metadata
//! (`label`, `description`, `discoverable`).

use super::{RESOURCES_HANDLER_ID, result_items, search_output};
use crate::backend::Backend;
use crate::error::{UmaError, UmaResult};
use crate::handler::{Handler, Readiness, RequestContext, errors::error_operation};
use crate::json_path;
use crate::keys;
use crate::operation::{Operation, OperationState, OperationType};
use async_trait::async_trait;
use log::{debug, info};
use serde_json::{Map, Value, json};
use std::sync::Arc;

/// CRUD and search over resource metadata records.
pub struct ResourcesHandler {
    store: Arc<dyn Backend>,
    readiness: Readiness,
}

impl ResourcesHandler {
    pub fn new(store: Arc<dyn Backend>) -> Self {
        Self {
            store,
            readiness: Readiness::Ready,
        }
    }

    async fn create_record(&self, payload: &Value) -> UmaResult<String> {
        let data = json_path::require_object(payload, keys::DATA)?;
        let output = self
            .store
            .execute(Operation::create(json!({ "data": data })))
            .await;

        match output.state() {
            OperationState::Success => json_path::get_str(output.payload(), keys::UID)
                .filter(|uid| !uid.is_empty())
                .map(str::to_string)
                .ok_or_else(|| UmaError::internal("store returned no uid")),
            state => Err(UmaError::backend(state, output.status_or_empty())),
        }
    }

    async fn fetch(&self, uid: &str) -> UmaResult<Option<Value>> {
        let output = self
            .store
            .execute(Operation::read(json!({ "uid": uid })))
            .await;

        match output.state() {
            OperationState::Success if output.payload_is_empty() => Err(UmaError::internal(
                format!("store returned an empty record for '{}'", uid),
            )),
            OperationState::Success => Ok(Some(output.into_payload())),
            OperationState::NotExist => Ok(None),
            state => Err(UmaError::backend(state, output.status_or_empty())),
        }
    }

    async fn search_records(&self, payload: &Value) -> UmaResult<Vec<Value>> {
        let query = json_path::require_object(payload, keys::QUERY)?;
        let output = self
            .store
            .execute(Operation::search(json!({ "query": query })))
            .await;

        match output.state() {
            OperationState::Success => Ok(result_items(output.into_payload())),
            OperationState::NotExist => Ok(Vec::new()),
            state => Err(UmaError::backend(state, output.status_or_empty())),
        }
    }

    async fn replace_record(&self, payload: &Value) -> UmaResult<String> {
        let uid = json_path::require_str(payload, keys::UID)?;
        let data = json_path::require_object(payload, keys::DATA)?;

        let stored = self.fetch(uid).await?.ok_or_else(|| {
            UmaError::backend(OperationState::NotExist, format!("record '{}' not found", uid))
        })?;
        let mut merged: Map<String, Value> = json_path::get_object(&stored, keys::DATA)
            .cloned()
            .unwrap_or_default();
        json_path::merge_shallow(&mut merged, data);

        let output = self
            .store
            .execute(Operation::replace(json!({ "uid": uid, "data": merged })))
            .await;
        match output.state() {
            OperationState::Success => Ok(uid.to_string()),
            state => Err(UmaError::backend(state, output.status_or_empty())),
        }
    }

    async fn delete_record(&self, payload: &Value) -> UmaResult<OperationState> {
        let uid = json_path::require_str(payload, keys::UID)?;
        let output = self
            .store
            .execute(Operation::delete(json!({ "uid": uid })))
            .await;

        match output.state() {
            state @ (OperationState::Success | OperationState::NotExist) => Ok(state),
            state => Err(UmaError::backend(state, output.status_or_empty())),
        }
    }
}

#[async_trait]
impl Handler for ResourcesHandler {
    fn id(&self) -> &str {
        RESOURCES_HANDLER_ID
    }

    fn readiness(&self) -> &Readiness {
        &self.readiness
    }

    async fn create(&self, input: Operation, ctx: &RequestContext<'_>) -> Operation {
        match self.create_record(input.payload()).await {
            Ok(uid) => {
                info!("Created resource record '{}' (request: '{}')", uid, ctx.request_id);
                Operation::success(OperationType::Create, json!({ "uid": uid }))
            }
            Err(e) => error_operation(OperationType::Create, "create", e),
        }
    }

    async fn read(&self, input: Operation, _ctx: &RequestContext<'_>) -> Operation {
        let result = match json_path::require_str(input.payload(), keys::UID) {
            Ok(uid) => self.fetch(uid).await,
            Err(e) => Err(e.into()),
        };
        match result {
            Ok(Some(record)) => Operation::success(OperationType::Read, record),
            Ok(None) => Operation::not_exist(OperationType::Read, "Missing entry"),
            Err(e) => error_operation(OperationType::Read, "read", e),
        }
    }

    async fn search(&self, input: Operation, ctx: &RequestContext<'_>) -> Operation {
        match self.search_records(input.payload()).await {
            Ok(results) => {
                debug!(
                    "Found {} resource records (request: '{}')",
                    results.len(),
                    ctx.request_id
                );
                Operation::success(OperationType::Search, search_output(results))
            }
            Err(e) => error_operation(OperationType::Search, "search", e),
        }
    }

    async fn replace(&self, input: Operation, _ctx: &RequestContext<'_>) -> Operation {
        match self.replace_record(input.payload()).await {
            Ok(uid) => Operation::success(OperationType::Replace, json!({ "uid": uid })),
            Err(e) => error_operation(OperationType::Replace, "replace", e),
        }
    }

    async fn delete(&self, input: Operation, _ctx: &RequestContext<'_>) -> Operation {
        match self.delete_record(input.payload()).await {
            Ok(OperationState::NotExist) => {
                Operation::not_exist(OperationType::Delete, "Missing entry")
            }
            Ok(_) => Operation::success(OperationType::Delete, json!({})),
            Err(e) => error_operation(OperationType::Delete, "delete", e),
        }
    }
}
