//! "Shared with me" aggregation.
//!
//! Answers which resources a requesting party can currently access by
//! correlating three sources:
//!
//! 1. the Authorization Server's list of registrations shared with the
//!    subject (primary search, templated with the subject),
//! 2. the resource store record linked to each registration
//!    (`data.register`), and
//! 3. the owner's policy for the registration, which names the scopes the
//!    subject holds.
//!
//! A proxy-admin session is obtained first; without it the call aborts.
//! After that, a failure while enriching one entry drops only that entry.
//! The overall state mirrors the primary search.
//!
//! Input: `{subject, sso_token, query?: {attribute, value}}`.
//! Output: `{results: [...], quantity}`.

use super::{
    PROXY_ADMIN_HANDLER_ID, RESOURCES_HANDLER_ID, SHARED_WITH_ME_HANDLER_ID, result_items,
    search_output,
};
use crate::backend::Backend;
use crate::config::{ServerConfig, SharedWithMeSettings, substitute_owner};
use crate::error::{BuildResult, UmaError, UmaResult};
use crate::handler::{
    Handler, Readiness, RequestContext, errors::error_operation, require_payload,
};
use crate::json_path;
use crate::keys::{self, params, paths, registration};
use crate::operation::{Operation, OperationState, OperationType};
use async_trait::async_trait;
use log::{debug, error, info, warn};
use serde_json::{Map, Value, json};
use std::sync::Arc;

struct Settings {
    backend: Arc<dyn Backend>,
    rs_id: String,
    cookie: String,
    search: SharedWithMeSettings,
    policies_path: String,
}

/// Aggregates the resources shared with a requesting party. `SEARCH` only.
pub struct SharedWithMeHandler {
    settings: Option<Settings>,
    readiness: Readiness,
}

impl SharedWithMeHandler {
    pub fn new(config: &ServerConfig, authz: BuildResult<Arc<dyn Backend>>) -> Self {
        let setup = authz.and_then(|backend| {
            Ok(Settings {
                backend,
                rs_id: config.rs_id()?.to_string(),
                cookie: config.cookie_name()?.to_string(),
                search: config.sharedwithme()?.clone(),
                policies_path: config.policies_path()?.to_string(),
            })
        });

        match setup {
            Ok(settings) => Self {
                settings: Some(settings),
                readiness: Readiness::Ready,
            },
            Err(e) => {
                error!("Handler '{}' setup failed: {}", SHARED_WITH_ME_HANDLER_ID, e);
                Self {
                    settings: None,
                    readiness: Readiness::Error(e.to_string()),
                }
            }
        }
    }

    fn settings(&self) -> UmaResult<&Settings> {
        self.settings
            .as_ref()
            .ok_or_else(|| UmaError::internal("no Authorization Server settings"))
    }

    async fn admin_token(&self, ctx: &RequestContext<'_>) -> UmaResult<String> {
        let output = ctx
            .call(PROXY_ADMIN_HANDLER_ID, Operation::new(OperationType::Read))
            .await?;

        if output.state() != OperationState::Success {
            return Err(UmaError::backend(
                output.state(),
                format!("proxy admin: {}", output.status_or_empty()),
            ));
        }
        json_path::get_str(output.payload(), paths::TOKEN_ID)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .ok_or_else(|| UmaError::internal("proxy admin session token is empty"))
    }

    /// Primary search. Returns the backend's reply as is.
    async fn shared_registrations(
        &self,
        settings: &Settings,
        subject: &str,
        sso_token: Option<&str>,
    ) -> Operation {
        let mut headers = Map::new();
        if !settings.search.accept.is_empty() {
            headers.insert(
                keys::ACCEPT_API_VERSION.to_string(),
                Value::String(settings.search.accept.clone()),
            );
        }
        if let Some(token) = sso_token {
            headers.insert(settings.cookie.clone(), Value::String(token.to_string()));
        }

        let mut query_params = Map::new();
        if !settings.search.sortkeys.is_empty() {
            query_params.insert(
                params::SORT_KEYS.to_string(),
                Value::String(settings.search.sortkeys.clone()),
            );
        }
        query_params.insert(
            params::QUERY_FILTER.to_string(),
            Value::String(substitute_owner(&settings.search.queryfilter, subject)),
        );

        let request = Operation::search(json!({
            "headers": headers,
            "query_params": query_params,
            "path": substitute_owner(&settings.search.path, subject),
        }));
        settings.backend.execute(request).await
    }

    /// Resource store record linked to a registration.
    async fn resource_record(
        &self,
        ctx: &RequestContext<'_>,
        register_id: &str,
    ) -> UmaResult<Option<Value>> {
        let request = Operation::search(json!({
            "query": {
                "operator": keys::OPERATOR_EQUAL,
                "attribute": paths::REGISTER,
                "value": register_id,
            }
        }));
        let output = ctx.call(RESOURCES_HANDLER_ID, request).await?;

        match output.state() {
            OperationState::Success => Ok(result_items(output.into_payload())
                .into_iter()
                .next()
                .filter(|record| record.as_object().is_some_and(|map| !map.is_empty()))),
            OperationState::NotExist => Ok(None),
            state => Err(UmaError::backend(state, output.status_or_empty())),
        }
    }

    /// Scopes `subject` holds on the owner's policy for `register_id`.
    ///
    /// An unreadable policy yields no scopes.
    async fn policy_scopes(
        &self,
        settings: &Settings,
        owner: &str,
        subject: &str,
        register_id: &str,
        admin_token: &str,
    ) -> UmaResult<Vec<Value>> {
        let mut headers = Map::new();
        headers.insert(settings.cookie.clone(), Value::String(admin_token.to_string()));

        let request = Operation::read(json!({
            "headers": headers,
            "uid": register_id,
            "path": substitute_owner(&settings.policies_path, owner),
        }));
        let output = settings.backend.execute(request).await;

        if output.state() != OperationState::Success {
            warn!(
                "Policy for '{}' owned by '{}' unavailable: {}",
                register_id,
                owner,
                output.status_or_empty()
            );
            return Ok(Vec::new());
        }
        if output.payload_is_empty() {
            return Err(UmaError::internal(format!(
                "policy for '{}' is empty",
                register_id
            )));
        }

        let scopes = json_path::get_array(output.payload(), keys::PERMISSIONS)
            .into_iter()
            .flatten()
            .filter(|permission| {
                json_path::get_str(permission, keys::SUBJECT)
                    .is_some_and(|s| s.eq_ignore_ascii_case(subject))
            })
            .filter_map(|permission| json_path::get_array(permission, keys::SCOPES))
            .last()
            .cloned()
            .unwrap_or_default();
        Ok(scopes)
    }

    /// Enrich one primary entry. `None` drops it from the output.
    async fn share_entry(
        &self,
        ctx: &RequestContext<'_>,
        settings: &Settings,
        entry: Value,
        subject: &str,
        admin_token: &str,
    ) -> UmaResult<Option<Value>> {
        let register_id = match json_path::get_str(&entry, registration::ID) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                debug!("Skipping shared entry without '{}'", registration::ID);
                return Ok(None);
            }
        };

        let same_server = json_path::get_str(&entry, registration::RESOURCE_SERVER)
            .is_some_and(|rs| rs.eq_ignore_ascii_case(&settings.rs_id));
        if !same_server {
            debug!("Skipping registration '{}' of another resource server", register_id);
            return Ok(None);
        }

        let resource = match self.resource_record(ctx, &register_id).await? {
            Some(resource) => resource,
            None => {
                debug!("No resource record for registration '{}'", register_id);
                return Ok(None);
            }
        };

        let owner = json_path::require_str(&entry, registration::RESOURCE_OWNER_ID)?.to_string();
        let scopes = self
            .policy_scopes(settings, &owner, subject, &register_id, admin_token)
            .await?;

        Ok(Some(project(entry, &resource, scopes)))
    }

    async fn shared_with(&self, payload: &Value, ctx: &RequestContext<'_>) -> UmaResult<Operation> {
        let settings = self.settings()?;
        let subject = json_path::require_str(payload, keys::SUBJECT)?;
        let sso_token = json_path::get_str(payload, keys::SSO_TOKEN);

        // No partial result without the privileged session
        let admin_token = self.admin_token(ctx).await?;

        let primary = self.shared_registrations(settings, subject, sso_token).await;
        let state = primary.state();
        let status = primary.status().map(str::to_string);
        let entries = if state == OperationState::Success {
            result_items(primary.into_payload())
        } else {
            warn!(
                "Shared registrations for '{}' unavailable: {} (request: '{}')",
                subject,
                status.as_deref().unwrap_or_default(),
                ctx.request_id
            );
            Vec::new()
        };

        let filter = json_path::get_object(payload, keys::QUERY);
        let mut results = Vec::new();
        for entry in entries.into_iter().filter(|e| matches_filter(e, filter)) {
            match self
                .share_entry(ctx, settings, entry, subject, &admin_token)
                .await
            {
                Ok(Some(record)) => results.push(record),
                Ok(None) => {}
                Err(e) => warn!("Dropping shared entry: {} (request: '{}')", e, ctx.request_id),
            }
        }

        info!(
            "{} resources shared with '{}' (request: '{}')",
            results.len(),
            subject,
            ctx.request_id
        );

        let mut output = Operation::success(OperationType::Search, search_output(results));
        output.set_state(state);
        if let Some(status) = status {
            output.set_status(status);
        }
        Ok(output)
    }
}

#[async_trait]
impl Handler for SharedWithMeHandler {
    fn id(&self) -> &str {
        SHARED_WITH_ME_HANDLER_ID
    }

    fn readiness(&self) -> &Readiness {
        &self.readiness
    }

    fn validate(&self, input: &Operation) -> UmaResult<()> {
        require_payload(input)?;
        match input.kind() {
            OperationType::Search => Ok(()),
            kind => Err(UmaError::unsupported(SHARED_WITH_ME_HANDLER_ID, kind)),
        }
    }

    async fn search(&self, input: Operation, ctx: &RequestContext<'_>) -> Operation {
        match self.shared_with(input.payload(), ctx).await {
            Ok(output) => output,
            Err(e) => error_operation(OperationType::Search, "search", e),
        }
    }
}

/// Caller-supplied `{attribute, value}` equality, ignoring case.
///
/// Without a filter every entry matches. A filter missing either half
/// matches nothing. Array attributes match when any element does.
pub(crate) fn matches_filter(entry: &Value, filter: Option<&Map<String, Value>>) -> bool {
    let Some(filter) = filter else {
        return true;
    };
    let attribute = filter.get(keys::ATTRIBUTE).and_then(Value::as_str);
    let expected = filter.get(keys::VALUE).and_then(Value::as_str);
    let (Some(attribute), Some(expected)) = (attribute, expected) else {
        return false;
    };
    if attribute.is_empty() || expected.is_empty() {
        return false;
    }

    let scalar_matches = |value: &Value| match value {
        Value::String(s) => s.eq_ignore_ascii_case(expected),
        Value::Number(n) => n.to_string() == expected,
        Value::Bool(b) => b.to_string().eq_ignore_ascii_case(expected),
        _ => false,
    };
    match json_path::get(entry, attribute) {
        Some(Value::Array(items)) => items.iter().any(scalar_matches),
        Some(value) => scalar_matches(value),
        None => false,
    }
}

/// Public shape of a shared resource.
///
/// Keeps the registration's descriptive fields, takes identity and display
/// metadata from the resource record, and drops registration bookkeeping.
/// `scopes` survives only for discoverable resources.
pub(crate) fn project(entry: Value, resource: &Value, scopes: Vec<Value>) -> Value {
    let mut record = match entry {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    let owner = record
        .remove(registration::RESOURCE_OWNER_ID)
        .unwrap_or(Value::Null);
    for key in [
        registration::ID,
        registration::REV,
        registration::RESOURCE_SERVER,
        registration::LABELS,
    ] {
        record.remove(key);
    }
    if !json_path::get_bool(resource, paths::DISCOVERABLE).unwrap_or(false) {
        record.remove(keys::SCOPES);
    }

    let lookup = |path: &str| json_path::get(resource, path).cloned().unwrap_or(Value::Null);
    record.insert(keys::ID.to_string(), lookup(keys::UID));
    record.insert(keys::LABEL.to_string(), lookup(paths::LABEL));
    record.insert(keys::DESCRIPTION.to_string(), lookup(paths::DESCRIPTION));
    record.insert(keys::OWNER.to_string(), owner);
    record.insert(keys::POLICY.to_string(), Value::Array(scopes));

    Value::Object(record)
}
