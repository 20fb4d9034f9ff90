//! Privileged session provider.
//!
//! Authenticates the configured proxy-admin account against the
//! Authorization Server and hands out the resulting session token as
//! `{data: {tokenId, ...}}`. Other handlers use it for lookups the end user
//! is not entitled to make, such as reading another owner's policies.

use super::PROXY_ADMIN_HANDLER_ID;
use crate::backend::Backend;
use crate::config::ServerConfig;
use crate::error::{BuildResult, UmaError, UmaResult};
use crate::handler::{Handler, Readiness, RequestContext, errors::error_operation};
use crate::json_path;
use crate::keys;
use crate::operation::{Operation, OperationState, OperationType};
use async_trait::async_trait;
use log::{debug, error};
use serde_json::{Map, Value, json};
use std::sync::Arc;

pub const USERNAME_HEADER: &str = "X-OpenAM-Username";
pub const PASSWORD_HEADER: &str = "X-OpenAM-Password";
const AUTHENTICATE_API_VERSION: &str = "resource=2.0, protocol=1.0";

struct Credentials {
    backend: Arc<dyn Backend>,
    user: String,
    password: String,
    path: String,
}

/// Obtains a proxy-admin session token. Supports `READ` only.
pub struct ProxyAdminHandler {
    credentials: Option<Credentials>,
    readiness: Readiness,
}

impl ProxyAdminHandler {
    pub fn new(config: &ServerConfig, authz: BuildResult<Arc<dyn Backend>>) -> Self {
        let setup = authz.and_then(|backend| {
            let admin = config.admin()?;
            Ok(Credentials {
                backend,
                user: admin.user.clone(),
                password: admin.password.clone(),
                path: admin.authenticate_path.clone(),
            })
        });

        match setup {
            Ok(credentials) => Self {
                credentials: Some(credentials),
                readiness: Readiness::Ready,
            },
            Err(e) => {
                error!("Handler '{}' setup failed: {}", PROXY_ADMIN_HANDLER_ID, e);
                Self {
                    credentials: None,
                    readiness: Readiness::Error(e.to_string()),
                }
            }
        }
    }

    async fn authenticate(&self) -> UmaResult<Value> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or_else(|| UmaError::internal("no proxy-admin credentials"))?;

        let mut headers = Map::new();
        for (name, value) in [
            (USERNAME_HEADER, credentials.user.as_str()),
            (PASSWORD_HEADER, credentials.password.as_str()),
            (keys::CONTENT_TYPE, keys::APPLICATION_JSON),
            (keys::ACCEPT_API_VERSION, AUTHENTICATE_API_VERSION),
        ] {
            headers.insert(name.to_string(), Value::from(value));
        }

        let request = Operation::create(json!({
            "headers": headers,
            "data": {},
            "path": credentials.path,
        }));
        let output = credentials.backend.execute(request).await;

        if output.state() != OperationState::Success {
            return Err(UmaError::backend(output.state(), output.status_or_empty()));
        }
        if json_path::get_str(output.payload(), keys::TOKEN_ID).is_none_or(str::is_empty) {
            return Err(UmaError::internal("authentication returned no tokenId"));
        }
        debug!("Proxy admin '{}' authenticated", credentials.user);
        Ok(output.into_payload())
    }
}

#[async_trait]
impl Handler for ProxyAdminHandler {
    fn id(&self) -> &str {
        PROXY_ADMIN_HANDLER_ID
    }

    fn readiness(&self) -> &Readiness {
        &self.readiness
    }

    /// Takes no input; only the operation kind is checked.
    fn validate(&self, input: &Operation) -> UmaResult<()> {
        match input.kind() {
            OperationType::Read => Ok(()),
            kind => Err(UmaError::unsupported(PROXY_ADMIN_HANDLER_ID, kind)),
        }
    }

    async fn read(&self, _input: Operation, _ctx: &RequestContext<'_>) -> Operation {
        match self.authenticate().await {
            Ok(session) => Operation::success(OperationType::Read, json!({ "data": session })),
            Err(e) => error_operation(OperationType::Read, "read", e),
        }
    }
}
