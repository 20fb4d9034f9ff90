//! In-memory document store backend.
//!
//! Thread-safe implementation of [`Backend`] holding documents shaped
//! `{ "uid": "...", "data": { ... } }`, keyed by generated identifiers. It
//! stands in for the resource/metadata collection the resource server keeps
//! next to the Authorization Server, and is what tests and demos run against.
//!
//! # Supported operations
//!
//! * `CREATE` `{data}` → `{uid}`
//! * `READ` `{uid}` → `{uid, data}` or `NOTEXIST`
//! * `SEARCH` `{query: {operator, attribute, value}}` → `{results, quantity}`;
//!   `NOTEXIST` with an empty collection when nothing matches
//! * `REPLACE` `{uid, data}` → `{uid}` or `NOTEXIST`
//! * `DELETE` `{uid}` → `{}` or `NOTEXIST`
//!
//! # Example Usage
//!
//! ```rust
//! use uma_resource_server::backend::{Backend, InMemoryDocumentStore};
//! use uma_resource_server::operation::{Operation, OperationState};
//! use serde_json::json;
//!
//! # async fn example() {
//! let store = InMemoryDocumentStore::new();
//! let created = store
//!     .execute(Operation::create(json!({"data": {"register": "reg-1"}})))
//!     .await;
//! assert_eq!(created.state(), OperationState::Success);
//!
//! let found = store
//!     .execute(Operation::search(json!({
//!         "query": {"operator": "equal", "attribute": "data.register", "value": "reg-1"}
//!     })))
//!     .await;
//! assert_eq!(found.payload()["quantity"], 1);
//! # }
//! ```

use super::Backend;
use crate::error::{UmaResult, ValidationError};
use crate::json_path;
use crate::keys;
use crate::operation::{Operation, OperationState, OperationType};
use async_trait::async_trait;
use log::debug;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Thread-safe in-memory document collection.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    // uid -> data
    documents: Arc<RwLock<HashMap<String, Value>>>,
}

impl InMemoryDocumentStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    /// Clear all data (useful for testing).
    pub async fn clear(&self) {
        self.documents.write().await.clear();
    }

    /// Insert a document under a caller-chosen uid, replacing any previous one.
    pub async fn insert(&self, uid: impl Into<String>, data: Value) {
        self.documents.write().await.insert(uid.into(), data);
    }

    /// Extract a nested attribute value as a string for equality matching.
    fn extract_attribute_value(document: &Value, attribute_path: &str) -> Option<String> {
        match json_path::get(document, attribute_path)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    fn document(uid: &str, data: &Value) -> Value {
        json!({ "uid": uid, "data": data })
    }

    async fn create(&self, payload: &Value) -> UmaResult<Operation> {
        let data = json_path::require_object(payload, keys::DATA)?;
        let uid = Uuid::new_v4().to_string();

        self.documents
            .write()
            .await
            .insert(uid.clone(), Value::Object(data.clone()));

        debug!("document store created '{}'", uid);
        Ok(Operation::success(
            OperationType::Create,
            json!({ "uid": uid }),
        ))
    }

    async fn read(&self, payload: &Value) -> UmaResult<Operation> {
        let uid = json_path::require_str(payload, keys::UID)?;
        let guard = self.documents.read().await;

        Ok(match guard.get(uid) {
            Some(data) => Operation::success(OperationType::Read, Self::document(uid, data)),
            None => Operation::not_exist(OperationType::Read, format!("'{}' not found", uid)),
        })
    }

    async fn search(&self, payload: &Value) -> UmaResult<Operation> {
        let query = json_path::get_object(payload, keys::QUERY)
            .ok_or_else(|| ValidationError::missing_required(keys::QUERY))?;
        let operator = query
            .get(keys::OPERATOR)
            .and_then(Value::as_str)
            .unwrap_or(keys::OPERATOR_EQUAL);

        let guard = self.documents.read().await;
        let mut matches: Vec<Value> = match operator {
            keys::OPERATOR_NONE | keys::OPERATOR_ALL => guard
                .iter()
                .map(|(uid, data)| Self::document(uid, data))
                .collect(),
            keys::OPERATOR_EQUAL | keys::OPERATOR_EQ => {
                let attribute = query
                    .get(keys::ATTRIBUTE)
                    .and_then(Value::as_str)
                    .filter(|a| !a.is_empty())
                    .ok_or_else(|| ValidationError::missing_required("query.attribute"))?;
                let value = match query.get(keys::VALUE) {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Null) | None => {
                        return Err(ValidationError::missing_required("query.value").into());
                    }
                    Some(other) => other.to_string(),
                };
                guard
                    .iter()
                    .map(|(uid, data)| Self::document(uid, data))
                    .filter(|doc| {
                        Self::extract_attribute_value(doc, attribute).as_deref()
                            == Some(value.as_str())
                    })
                    .collect()
            }
            other => {
                return Err(ValidationError::custom(format!(
                    "unsupported query operator '{}'",
                    other
                ))
                .into());
            }
        };
        drop(guard);

        // Consistent ordering across calls
        matches.sort_by(|a, b| {
            json_path::get_str(a, keys::UID).cmp(&json_path::get_str(b, keys::UID))
        });

        let quantity = matches.len();
        let mut output = Operation::success(
            OperationType::Search,
            json!({ "results": matches, "quantity": quantity }),
        );
        if quantity == 0 {
            output.set_state(OperationState::NotExist);
            output.set_status("No matching documents");
        }
        Ok(output)
    }

    async fn replace(&self, payload: &Value) -> UmaResult<Operation> {
        let uid = json_path::require_str(payload, keys::UID)?;
        let data = json_path::require_object(payload, keys::DATA)?;
        let mut guard = self.documents.write().await;

        Ok(match guard.get_mut(uid) {
            Some(slot) => {
                *slot = Value::Object(data.clone());
                Operation::success(OperationType::Replace, json!({ "uid": uid }))
            }
            None => Operation::not_exist(OperationType::Replace, format!("'{}' not found", uid)),
        })
    }

    async fn delete(&self, payload: &Value) -> UmaResult<Operation> {
        let uid = json_path::require_str(payload, keys::UID)?;
        let existed = self.documents.write().await.remove(uid).is_some();

        Ok(if existed {
            Operation::success(OperationType::Delete, json!({}))
        } else {
            Operation::not_exist(OperationType::Delete, format!("'{}' not found", uid))
        })
    }
}

#[async_trait]
impl Backend for InMemoryDocumentStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn execute(&self, operation: Operation) -> Operation {
        let kind = operation.kind();
        let payload = operation.payload();
        let result = match kind {
            OperationType::Create => self.create(payload).await,
            OperationType::Read => self.read(payload).await,
            OperationType::Search => self.search(payload).await,
            OperationType::Replace => self.replace(payload).await,
            OperationType::Delete => self.delete(payload).await,
        };
        result.unwrap_or_else(|e| Operation::error(kind, e.to_string()))
    }
}
