//! Concrete handlers.
//!
//! | id                 | handler                  | operations                     |
//! |--------------------|--------------------------|--------------------------------|
//! | `uma_register`     | [`RegisterHandler`]      | create, read, search, replace, delete |
//! | `resources`        | [`ResourcesHandler`]     | create, read, search, replace, delete |
//! | `amproxyadm`       | [`ProxyAdminHandler`]    | read                           |
//! | `uma_sharedwithme` | [`SharedWithMeHandler`]  | search                         |

pub mod proxy_admin;
pub mod register;
pub mod resources;
pub mod shared_with_me;

pub use proxy_admin::ProxyAdminHandler;
pub use register::RegisterHandler;
pub use resources::ResourcesHandler;
pub use shared_with_me::SharedWithMeHandler;

use crate::keys;
use serde_json::{Map, Value, json};

/// Handler id of the resource registration workflow.
pub const REGISTER_HANDLER_ID: &str = "uma_register";
/// Handler id of the resource metadata store.
pub const RESOURCES_HANDLER_ID: &str = "resources";
/// Handler id of the proxy-admin session provider.
pub const PROXY_ADMIN_HANDLER_ID: &str = "amproxyadm";
/// Handler id of the "shared with me" aggregation.
pub const SHARED_WITH_ME_HANDLER_ID: &str = "uma_sharedwithme";

/// Request headers carrying a bearer credential.
pub(crate) fn bearer_headers(token: &str, with_body: bool) -> Value {
    let mut headers = Map::new();
    if with_body {
        headers.insert(
            keys::CONTENT_TYPE.to_string(),
            Value::from(keys::APPLICATION_JSON),
        );
    }
    headers.insert(
        keys::AUTHORIZATION.to_string(),
        Value::String(format!("Bearer {}", token)),
    );
    Value::Object(headers)
}

/// Collection output shape shared by every search.
pub(crate) fn search_output(results: Vec<Value>) -> Value {
    let quantity = results.len();
    json!({ "results": results, "quantity": quantity })
}

/// Items of a backend search reply.
///
/// Accepts a bare array or an object carrying `results` or `result`.
pub(crate) fn result_items(payload: Value) -> Vec<Value> {
    match payload {
        Value::Array(items) => items,
        Value::Object(mut map) => match map
            .remove(keys::RESULTS)
            .or_else(|| map.remove(keys::RESULT))
        {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}
