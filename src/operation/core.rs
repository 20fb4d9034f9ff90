//! Core envelope types and their state machine.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Kind of work an operation asks for. Fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationType {
    /// Create a new entity
    Create,
    /// Read one entity by identifier
    Read,
    /// Search a collection
    Search,
    /// Replace (merge) an existing entity
    Replace,
    /// Delete an entity
    Delete,
}

impl OperationType {
    /// Whether this kind addresses one entity and therefore needs a `uid`.
    pub fn requires_uid(self) -> bool {
        matches!(self, Self::Read | Self::Replace | Self::Delete)
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "CREATE",
            Self::Read => "READ",
            Self::Search => "SEARCH",
            Self::Replace => "REPLACE",
            Self::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// Outcome of an operation.
///
/// `Init` and `Ready` are pre-terminal. A handler always returns one of the
/// terminal states: `Success`, `NotExist`, `Error` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationState {
    Init,
    Ready,
    Success,
    /// Executed correctly, nothing found. Not a failure.
    #[serde(rename = "NOTEXIST")]
    NotExist,
    Error,
    /// The workflow explicitly rejected its input
    Failed,
}

impl OperationState {
    /// `true` for `Error` and `Failed`.
    pub fn is_error(self) -> bool {
        matches!(self, Self::Error | Self::Failed)
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Init | Self::Ready)
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "INIT",
            Self::Ready => "READY",
            Self::Success => "SUCCESS",
            Self::NotExist => "NOTEXIST",
            Self::Error => "ERROR",
            Self::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Request/response envelope.
///
/// The error flag is derived from the state, so `is_error()` holds exactly
/// when the state is `Error` or `Failed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    kind: OperationType,
    payload: Value,
    state: OperationState,
    status: Option<String>,
}

impl Operation {
    /// Create an operation in state `Init` with a null payload.
    pub fn new(kind: OperationType) -> Self {
        Self {
            kind,
            payload: Value::Null,
            state: OperationState::Init,
            status: None,
        }
    }

    /// Create an operation in state `Init` carrying a payload.
    pub fn with_payload(kind: OperationType, payload: Value) -> Self {
        Self {
            payload,
            ..Self::new(kind)
        }
    }

    /// Terminal success carrying `payload`.
    pub fn success(kind: OperationType, payload: Value) -> Self {
        Self {
            kind,
            payload,
            state: OperationState::Success,
            status: None,
        }
    }

    /// Terminal "nothing found" with a null payload.
    pub fn not_exist(kind: OperationType, status: impl Into<String>) -> Self {
        Self {
            kind,
            payload: Value::Null,
            state: OperationState::NotExist,
            status: Some(status.into()),
        }
    }

    /// Terminal `Error` with a diagnostic status.
    pub fn error(kind: OperationType, status: impl Into<String>) -> Self {
        Self {
            kind,
            payload: Value::Null,
            state: OperationState::Error,
            status: Some(status.into()),
        }
    }

    /// Terminal `Failed` with a diagnostic status.
    pub fn failed(kind: OperationType, status: impl Into<String>) -> Self {
        Self {
            kind,
            payload: Value::Null,
            state: OperationState::Failed,
            status: Some(status.into()),
        }
    }

    pub fn kind(&self) -> OperationType {
        self.kind
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut Value {
        &mut self.payload
    }

    /// Consume the operation, keeping only the payload.
    pub fn into_payload(self) -> Value {
        self.payload
    }

    pub fn set_payload(&mut self, payload: Value) {
        self.payload = payload;
    }

    pub fn state(&self) -> OperationState {
        self.state
    }

    pub fn set_state(&mut self, state: OperationState) {
        self.state = state;
    }

    pub fn is_error(&self) -> bool {
        self.state.is_error()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Status text, or an empty string when none was set.
    pub fn status_or_empty(&self) -> &str {
        self.status.as_deref().unwrap_or_default()
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    /// Whether the payload is absent, an empty object or an empty array.
    pub fn payload_is_empty(&self) -> bool {
        match &self.payload {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            Value::Array(items) => items.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.kind, self.state)?;
        if let Some(status) = &self.status {
            write!(f, ": {}", status)?;
        }
        Ok(())
    }
}
