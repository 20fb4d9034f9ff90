//! Per-request context handed to every typed handler method.

use crate::error::UmaResult;
use crate::operation::Operation;
use crate::registry::HandlerRegistry;
use uuid::Uuid;

/// Request tracking plus access to the registry the request runs against.
#[derive(Clone, Copy)]
pub struct RequestContext<'a> {
    /// Identifier for log correlation
    pub request_id: &'a str,
    registry: &'a HandlerRegistry,
}

impl<'a> RequestContext<'a> {
    pub fn new(registry: &'a HandlerRegistry, request_id: &'a str) -> Self {
        Self {
            request_id,
            registry,
        }
    }

    pub fn registry(&self) -> &'a HandlerRegistry {
        self.registry
    }

    /// Generate a request id for callers that did not supply one.
    pub fn generate_request_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Run `input` through another registered handler within this request.
    ///
    /// Fails when the handler is unknown or not ready.
    pub async fn call(&self, handler_id: &str, input: Operation) -> UmaResult<Operation> {
        let handler = self.registry.get_handler(handler_id)?;
        Ok(handler.process(input, self).await)
    }
}

impl std::fmt::Debug for RequestContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.request_id)
            .finish()
    }
}
