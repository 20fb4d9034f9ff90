//! Convenience constructors for input operations.

use super::core::{Operation, OperationType};
use serde_json::Value;

impl Operation {
    /// Create a new create operation.
    pub fn create(payload: Value) -> Self {
        Self::with_payload(OperationType::Create, payload)
    }

    /// Create a new read operation.
    pub fn read(payload: Value) -> Self {
        Self::with_payload(OperationType::Read, payload)
    }

    /// Create a new search operation.
    pub fn search(payload: Value) -> Self {
        Self::with_payload(OperationType::Search, payload)
    }

    /// Create a new replace operation.
    pub fn replace(payload: Value) -> Self {
        Self::with_payload(OperationType::Replace, payload)
    }

    /// Create a new delete operation.
    pub fn delete(payload: Value) -> Self {
        Self::with_payload(OperationType::Delete, payload)
    }
}
