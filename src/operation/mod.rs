//! Operation envelope exchanged with every handler and backend.
//!
//! An [`Operation`] carries a fixed [`OperationType`], a JSON payload and a
//! terminal [`OperationState`]. Handlers never hand their input back as
//! output; each one builds a fresh `Operation` for the caller.
//!
//! # Examples
//!
//! ```rust
//! use uma_resource_server::operation::{Operation, OperationState, OperationType};
//! use serde_json::json;
//!
//! let input = Operation::create(json!({
//!     "data": { "name": "Photo Album", "resource_scopes": ["view"] },
//!     "access_token": "T"
//! }));
//! assert_eq!(input.kind(), OperationType::Create);
//! assert_eq!(input.state(), OperationState::Init);
//!
//! let output = Operation::success(OperationType::Create, json!({ "uid": "abc" }));
//! assert!(!output.is_error());
//! ```

mod builders;
mod core;

pub use core::{Operation, OperationState, OperationType};
