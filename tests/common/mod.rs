//! Shared test utilities.
//!
//! - `backends` - scripted and spying [`Backend`](uma_resource_server::Backend)
//!   implementations that record every call
//! - `fixtures` - configuration and Authorization Server record builders

use uma_resource_server::{Operation, OperationState, OperationType};
use serde_json::Value;

pub mod backends;
pub mod fixtures;

/// Route log output through the test harness. Safe to call repeatedly.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Backend reply with the given state and payload.
pub fn reply(kind: OperationType, state: OperationState, payload: Value) -> Operation {
    let mut output = Operation::with_payload(kind, payload);
    output.set_state(state);
    output.set_status(match state {
        OperationState::Success => "200 OK",
        OperationState::NotExist => "404 Not Found",
        _ => "500 Internal Server Error",
    });
    output
}

/// Path the request was addressed to.
pub fn path_of(operation: &Operation) -> &str {
    operation.payload()["path"].as_str().unwrap_or_default()
}
