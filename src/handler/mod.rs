//! Handler contract and dispatch.
//!
//! Every workflow implements [`Handler`]. Callers only ever use
//! [`Handler::process`], which:
//!
//! 1. fails fast with `ERROR` when the handler is not [`Readiness::Ready`],
//! 2. runs [`Handler::validate`] and turns a failure into `ERROR`,
//! 3. dispatches to exactly one of `create`/`read`/`search`/`replace`/`delete`.
//!
//! The typed methods convert their own failures into terminal operations
//! (see [`errors::error_operation`]), so failure context stays with the step
//! that failed. Methods a handler does not override answer with an
//! "unsupported operation type" error.

mod context;
pub mod errors;

pub use context::RequestContext;

use crate::error::{UmaResult, ValidationError};
use crate::keys;
use crate::operation::{Operation, OperationType};
use async_trait::async_trait;
use log::{debug, info, warn};

/// Construction outcome of a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Init,
    Ready,
    /// Setup failed; the handler refuses every call
    Error(String),
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Diagnostic text for a handler that is not ready.
    pub fn status(&self) -> &str {
        match self {
            Self::Init => "handler was never initialised",
            Self::Ready => "ready",
            Self::Error(status) => status,
        }
    }
}

/// A workflow bound to zero or more backends.
///
/// Implementations must be safe to invoke concurrently: they hold no
/// per-call mutable state.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Stable key used for registry lookup.
    fn id(&self) -> &str;

    fn readiness(&self) -> &Readiness;

    /// Structural preconditions for the operation kind.
    ///
    /// The default requires a non-empty payload and, for kinds that address
    /// one entity, a `uid`.
    fn validate(&self, input: &Operation) -> UmaResult<()> {
        require_payload(input)?;
        if input.kind().requires_uid() {
            require_uid(input)?;
        }
        Ok(())
    }

    async fn create(&self, input: Operation, _ctx: &RequestContext<'_>) -> Operation {
        errors::unsupported(self.id(), input.kind())
    }

    async fn read(&self, input: Operation, _ctx: &RequestContext<'_>) -> Operation {
        errors::unsupported(self.id(), input.kind())
    }

    async fn search(&self, input: Operation, _ctx: &RequestContext<'_>) -> Operation {
        errors::unsupported(self.id(), input.kind())
    }

    async fn replace(&self, input: Operation, _ctx: &RequestContext<'_>) -> Operation {
        errors::unsupported(self.id(), input.kind())
    }

    async fn delete(&self, input: Operation, _ctx: &RequestContext<'_>) -> Operation {
        errors::unsupported(self.id(), input.kind())
    }

    /// Validate, dispatch by kind and return a terminal operation.
    async fn process(&self, input: Operation, ctx: &RequestContext<'_>) -> Operation {
        let kind = input.kind();

        info!(
            "Handler '{}' processing {} (request: '{}')",
            self.id(),
            kind,
            ctx.request_id
        );

        if !self.readiness().is_ready() {
            warn!(
                "Handler '{}' is not ready: {} (request: '{}')",
                self.id(),
                self.readiness().status(),
                ctx.request_id
            );
            return errors::not_ready(self.id(), kind, self.readiness());
        }

        if let Err(e) = self.validate(&input) {
            warn!(
                "Handler '{}' rejected {}: {} (request: '{}')",
                self.id(),
                kind,
                e,
                ctx.request_id
            );
            return errors::validation_failure(kind, e);
        }

        let output = match kind {
            OperationType::Create => self.create(input, ctx).await,
            OperationType::Read => self.read(input, ctx).await,
            OperationType::Search => self.search(input, ctx).await,
            OperationType::Replace => self.replace(input, ctx).await,
            OperationType::Delete => self.delete(input, ctx).await,
        };

        if !output.state().is_terminal() {
            warn!(
                "Handler '{}' returned non-terminal state {} (request: '{}')",
                self.id(),
                output.state(),
                ctx.request_id
            );
            return Operation::error(
                kind,
                format!("handler '{}' returned state {}", self.id(), output.state()),
            );
        }

        debug!(
            "Handler '{}' completed {} (request: '{}')",
            self.id(),
            output,
            ctx.request_id
        );
        output
    }
}

/// The payload must be a non-empty object.
pub fn require_payload(input: &Operation) -> Result<(), ValidationError> {
    match input.payload().as_object() {
        Some(map) if !map.is_empty() => Ok(()),
        _ => Err(ValidationError::EmptyInput),
    }
}

/// The payload must carry a non-empty `uid`.
pub fn require_uid(input: &Operation) -> Result<(), ValidationError> {
    crate::json_path::require_str(input.payload(), keys::UID).map(|_| ())
}
