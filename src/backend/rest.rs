//! REST backend for the Authorization Server.
//!
//! Maps the operation kind onto an HTTP verb and the payload onto a request:
//!
//! * `CREATE` → `POST {base_url}/{path}` with `data` as JSON body
//! * `READ` → `GET {base_url}/{path}[/{uid}]`
//! * `SEARCH` → `GET {base_url}/{path}?{query_params}`
//! * `REPLACE` → `PUT {base_url}/{path}/{uid}` with `data` as JSON body
//! * `DELETE` → `DELETE {base_url}/{path}/{uid}`
//!
//! Every entry of the `headers` object becomes a request header.

use super::Backend;
use crate::config::ConnectSettings;
use crate::error::{BuildError, BuildResult, UmaError, UmaResult};
use crate::json_path;
use crate::keys;
use crate::operation::{Operation, OperationState, OperationType};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Method, StatusCode};
use serde_json::{Value, json};
use url::Url;

/// HTTP client bound to one Authorization Server deployment.
#[derive(Debug, Clone)]
pub struct RestBackend {
    client: reqwest::Client,
    base_url: Url,
}

impl RestBackend {
    /// Build a client from connection settings.
    ///
    /// Fails when the base URL does not parse or the TLS stack cannot be set up.
    pub fn new(settings: &ConnectSettings) -> BuildResult<Self> {
        let mut base_url = Url::parse(settings.base_url.trim()).map_err(|e| {
            BuildError::backend_setup(format!("invalid base_url '{}': {}", settings.base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(BuildError::backend_setup(format!(
                "base_url '{}' cannot be a base",
                settings.base_url
            )));
        }
        // Url::join drops the last segment unless the path ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = settings.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| BuildError::backend_setup(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn method_for(kind: OperationType) -> Method {
        match kind {
            OperationType::Create => Method::POST,
            OperationType::Read | OperationType::Search => Method::GET,
            OperationType::Replace => Method::PUT,
            OperationType::Delete => Method::DELETE,
        }
    }

    /// Resolve `path`, `uid` and `query_params` against the base URL.
    pub(crate) fn url_for(&self, payload: &Value) -> UmaResult<Url> {
        let path = json_path::require_str(payload, keys::PATH)?;
        let mut url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| UmaError::internal(format!("invalid path '{}': {}", path, e)))?;

        if let Some(uid) = json_path::get_str(payload, keys::UID).filter(|uid| !uid.is_empty()) {
            url.path_segments_mut()
                .map_err(|_| UmaError::internal(format!("cannot append uid to '{}'", path)))?
                .pop_if_empty()
                .push(uid);
        }

        if let Some(params) = json_path::get_object(payload, keys::QUERY_PARAMS) {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in params {
                match value {
                    Value::String(s) => pairs.append_pair(name, s),
                    Value::Null => continue,
                    other => pairs.append_pair(name, &other.to_string()),
                };
            }
        }

        Ok(url)
    }

    async fn send(&self, operation: &Operation) -> UmaResult<Operation> {
        let kind = operation.kind();
        let payload = operation.payload();
        let method = Self::method_for(kind);
        let url = self.url_for(payload)?;

        let mut request = self.client.request(method.clone(), url.clone());
        if let Some(headers) = json_path::get_object(payload, keys::HEADERS) {
            for (name, value) in headers {
                if let Some(value) = value.as_str() {
                    request = request.header(name.as_str(), value);
                }
            }
        }
        if matches!(kind, OperationType::Create | OperationType::Replace) {
            if let Some(data) = json_path::get(payload, keys::DATA) {
                request = request.json(data);
            }
        }

        debug!("{} {}", method, url);

        let response = request.send().await.map_err(|e| {
            UmaError::backend(OperationState::Error, format!("{} {}: {}", method, url, e))
        })?;
        let code = response.status();
        let body = response.text().await.map_err(|e| {
            UmaError::backend(OperationState::Error, format!("{} {}: {}", method, url, e))
        })?;

        debug!("{} {} -> {}", method, url, code);

        Ok(Self::to_operation(kind, code, &body))
    }

    pub(crate) fn to_operation(kind: OperationType, code: StatusCode, body: &str) -> Operation {
        let payload = if body.trim().is_empty() {
            json!({})
        } else {
            serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
        };

        let status = format!(
            "{} {}",
            code.as_u16(),
            code.canonical_reason().unwrap_or_default()
        );

        let state = if code.is_success() {
            OperationState::Success
        } else if code == StatusCode::NOT_FOUND {
            OperationState::NotExist
        } else {
            warn!("Authorization Server replied {} to {}", status, kind);
            OperationState::Error
        };

        let mut output = Operation::with_payload(kind, payload);
        output.set_state(state);
        output.set_status(status.trim_end());
        output
    }
}

#[async_trait]
impl Backend for RestBackend {
    fn name(&self) -> &str {
        "rest"
    }

    async fn execute(&self, operation: Operation) -> Operation {
        let kind = operation.kind();
        match self.send(&operation).await {
            Ok(output) => output,
            Err(e) => {
                warn!("REST backend call failed: {}", e);
                Operation::error(kind, e.to_string())
            }
        }
    }
}
