//! UMA resource registration workflow.
//!
//! Bridges caller input to the Authorization Server's resource-set
//! endpoint. Every call carries the caller's bearer credential
//! (`access_token`, or `query.value` for searches).
//!
//! | kind    | input                             | output                        |
//! |---------|-----------------------------------|-------------------------------|
//! | CREATE  | `{access_token, data}`            | `{uid}`                       |
//! | READ    | `{access_token, uid}`             | `{data}` or `NOTEXIST`        |
//! | SEARCH  | `{query: {value}}`                | `{results, quantity}`         |
//! | REPLACE | `{access_token, uid, data}`       | `{uid}`                       |
//! | DELETE  | `{access_token, uid}`             | `{}` or `NOTEXIST`            |

use super::{REGISTER_HANDLER_ID, bearer_headers, result_items, search_output};
use crate::backend::Backend;
use crate::config::ServerConfig;
use crate::error::{BuildResult, UmaError, UmaResult};
use crate::handler::{Handler, Readiness, RequestContext, errors::error_operation};
use crate::json_path;
use crate::keys::{self, registration};
use crate::operation::{Operation, OperationState, OperationType};
use async_trait::async_trait;
use log::{debug, error, info, trace};
use serde_json::{Value, json};
use std::sync::Arc;

struct Connection {
    backend: Arc<dyn Backend>,
    path: String,
}

/// CRUD and search over UMA resource registrations.
pub struct RegisterHandler {
    connection: Option<Connection>,
    readiness: Readiness,
}

impl RegisterHandler {
    /// Bind to the Authorization Server backend.
    ///
    /// A missing `as.uma.resource_set.path` or a failed backend setup leaves
    /// the handler in [`Readiness::Error`].
    pub fn new(config: &ServerConfig, authz: BuildResult<Arc<dyn Backend>>) -> Self {
        let setup = authz.and_then(|backend| {
            let path = config.resource_set_path()?.to_string();
            Ok(Connection { backend, path })
        });

        match setup {
            Ok(connection) => Self {
                connection: Some(connection),
                readiness: Readiness::Ready,
            },
            Err(e) => {
                error!("Handler '{}' setup failed: {}", REGISTER_HANDLER_ID, e);
                Self {
                    connection: None,
                    readiness: Readiness::Error(e.to_string()),
                }
            }
        }
    }

    fn connection(&self) -> UmaResult<&Connection> {
        self.connection
            .as_ref()
            .ok_or_else(|| UmaError::internal("no Authorization Server connection"))
    }

    async fn register(&self, payload: &Value) -> UmaResult<String> {
        let connection = self.connection()?;
        let token = json_path::require_str(payload, keys::ACCESS_TOKEN)?;
        let data = json_path::require_object(payload, keys::DATA)?;

        trace!("Registration data: {}", Value::Object(data.clone()));

        let request = Operation::create(json!({
            "headers": bearer_headers(token, true),
            "data": data,
            "path": connection.path,
        }));
        let output = connection.backend.execute(request).await;

        match output.state() {
            OperationState::Success => json_path::get_str(output.payload(), registration::ID)
                .or_else(|| json_path::get_str(output.payload(), keys::UID))
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .ok_or_else(|| {
                    UmaError::internal("Authorization Server returned no registration id")
                }),
            state => Err(UmaError::backend(state, output.status_or_empty())),
        }
    }

    /// Stored registration, `None` when the Authorization Server has none.
    async fn fetch(&self, token: &str, uid: &str) -> UmaResult<Option<Value>> {
        let connection = self.connection()?;
        let request = Operation::read(json!({
            "headers": bearer_headers(token, false),
            "uid": uid,
            "path": connection.path,
        }));
        let output = connection.backend.execute(request).await;

        match output.state() {
            OperationState::Success if output.payload_is_empty() => Err(UmaError::internal(
                format!("Authorization Server returned an empty registration for '{}'", uid),
            )),
            OperationState::Success => Ok(Some(output.into_payload())),
            OperationState::NotExist => {
                debug!("Registration '{}' not found", uid);
                Ok(None)
            }
            state => Err(UmaError::backend(state, output.status_or_empty())),
        }
    }

    async fn read_registration(&self, payload: &Value) -> UmaResult<Option<Value>> {
        let token = json_path::require_str(payload, keys::ACCESS_TOKEN)?;
        let uid = json_path::require_str(payload, keys::UID)?;
        self.fetch(token, uid).await
    }

    async fn search_registrations(&self, payload: &Value) -> UmaResult<Vec<Value>> {
        let connection = self.connection()?;
        // The query value is the credential the registrations are listed for
        let token = json_path::require_str(payload, "query.value")?;

        let request = Operation::search(json!({
            "headers": bearer_headers(token, false),
            "path": connection.path,
        }));
        let output = connection.backend.execute(request).await;

        match output.state() {
            OperationState::Success => Ok(result_items(output.into_payload())),
            OperationState::NotExist => Ok(Vec::new()),
            state => Err(UmaError::backend(state, output.status_or_empty())),
        }
    }

    async fn replace_registration(&self, payload: &Value) -> UmaResult<String> {
        let connection = self.connection()?;
        let token = json_path::require_str(payload, keys::ACCESS_TOKEN)?;
        let uid = json_path::require_str(payload, keys::UID)?;
        let data = json_path::require_object(payload, keys::DATA)?;

        // Merge onto the stored record so unmentioned attributes survive
        let stored = self.fetch(token, uid).await?.ok_or_else(|| {
            UmaError::backend(
                OperationState::NotExist,
                format!("registration '{}' not found", uid),
            )
        })?;
        let mut merged = match stored {
            Value::Object(map) => map,
            _ => {
                return Err(UmaError::internal(format!(
                    "stored registration '{}' is not an object",
                    uid
                )));
            }
        };
        json_path::merge_shallow(&mut merged, data);

        let request = Operation::replace(json!({
            "headers": bearer_headers(token, true),
            "uid": uid,
            "data": merged,
            "path": connection.path,
        }));
        let output = connection.backend.execute(request).await;

        if output.is_error() {
            return Err(UmaError::backend(output.state(), output.status_or_empty()));
        }
        Ok(uid.to_string())
    }

    /// Backend outcome of the delete; `SUCCESS` and `NOTEXIST` are both fine.
    async fn delete_registration(&self, payload: &Value) -> UmaResult<OperationState> {
        let connection = self.connection()?;
        let token = json_path::require_str(payload, keys::ACCESS_TOKEN)?;
        let uid = json_path::require_str(payload, keys::UID)?;

        let request = Operation::delete(json!({
            "headers": bearer_headers(token, false),
            "uid": uid,
            "path": connection.path,
        }));
        let output = connection.backend.execute(request).await;

        match output.state() {
            state @ (OperationState::Success | OperationState::NotExist) => Ok(state),
            state => Err(UmaError::backend(
                state,
                format!("{}: {}", output.status_or_empty(), output.payload()),
            )),
        }
    }
}

#[async_trait]
impl Handler for RegisterHandler {
    fn id(&self) -> &str {
        REGISTER_HANDLER_ID
    }

    fn readiness(&self) -> &Readiness {
        &self.readiness
    }

    async fn create(&self, input: Operation, ctx: &RequestContext<'_>) -> Operation {
        match self.register(input.payload()).await {
            Ok(uid) => {
                info!("Registered resource '{}' (request: '{}')", uid, ctx.request_id);
                let mut output = Operation::success(OperationType::Create, json!({ "uid": uid }));
                output.set_status("Created registration");
                output
            }
            Err(e) => error_operation(OperationType::Create, "create", e),
        }
    }

    async fn read(&self, input: Operation, _ctx: &RequestContext<'_>) -> Operation {
        match self.read_registration(input.payload()).await {
            Ok(Some(data)) => {
                let mut output = Operation::success(OperationType::Read, json!({ "data": data }));
                output.set_status("Found registration");
                output
            }
            Ok(None) => Operation::not_exist(OperationType::Read, "Missing entry"),
            Err(e) => error_operation(OperationType::Read, "read", e),
        }
    }

    async fn search(&self, input: Operation, ctx: &RequestContext<'_>) -> Operation {
        match self.search_registrations(input.payload()).await {
            Ok(results) => {
                debug!(
                    "Found {} registrations (request: '{}')",
                    results.len(),
                    ctx.request_id
                );
                Operation::success(OperationType::Search, search_output(results))
            }
            Err(e) => error_operation(OperationType::Search, "search", e),
        }
    }

    async fn replace(&self, input: Operation, ctx: &RequestContext<'_>) -> Operation {
        match self.replace_registration(input.payload()).await {
            Ok(uid) => {
                info!("Replaced registration '{}' (request: '{}')", uid, ctx.request_id);
                let mut output = Operation::success(OperationType::Replace, json!({ "uid": uid }));
                output.set_status("Replaced registration");
                output
            }
            Err(e) => error_operation(OperationType::Replace, "replace", e),
        }
    }

    async fn delete(&self, input: Operation, ctx: &RequestContext<'_>) -> Operation {
        match self.delete_registration(input.payload()).await {
            Ok(OperationState::NotExist) => {
                Operation::not_exist(OperationType::Delete, "Missing entry")
            }
            Ok(_) => {
                info!("Deleted registration (request: '{}')", ctx.request_id);
                Operation::success(OperationType::Delete, json!({}))
            }
            Err(e) => error_operation(OperationType::Delete, "delete", e),
        }
    }
}
