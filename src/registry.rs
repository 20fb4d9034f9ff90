//! Handler registry.
//!
//! Maps handler identifiers to shared handler instances. Handlers look each
//! other up through the registry at call time (via
//! [`RequestContext::call`](crate::handler::RequestContext::call)), so a
//! composite workflow never owns its collaborators.
//!
//! A [`SharedRegistry`] gives a process exactly one registry, initialised on
//! first use.

use crate::error::{BuildError, BuildResult, UmaError, UmaResult};
use crate::handler::{Handler, RequestContext};
use crate::operation::{Operation, OperationType};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

/// Immutable map of handler id to handler.
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder::default()
    }

    /// Handler registered under `id`, in any readiness.
    pub fn lookup(&self, id: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(id).cloned()
    }

    /// Handler registered under `id`, only if it is ready.
    pub fn get_handler(&self, id: &str) -> UmaResult<Arc<dyn Handler>> {
        let handler = self
            .lookup(id)
            .ok_or_else(|| UmaError::HandlerNotFound(id.to_string()))?;
        if !handler.readiness().is_ready() {
            return Err(UmaError::HandlerNotReady {
                handler: id.to_string(),
                status: handler.readiness().status().to_string(),
            });
        }
        Ok(handler)
    }

    /// Registered ids in sorted order.
    pub fn handler_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run `input` through the handler registered under `id`.
    ///
    /// Always returns a terminal operation; an unknown id yields `ERROR`.
    pub async fn process(&self, id: &str, input: Operation) -> Operation {
        let request_id = RequestContext::generate_request_id();
        self.process_with_request_id(id, input, &request_id).await
    }

    /// Like [`process`](Self::process) with a caller-supplied request id.
    pub async fn process_with_request_id(
        &self,
        id: &str,
        input: Operation,
        request_id: &str,
    ) -> Operation {
        let kind: OperationType = input.kind();
        match self.lookup(id) {
            Some(handler) => {
                let ctx = RequestContext::new(self, request_id);
                handler.process(input, &ctx).await
            }
            None => {
                warn!("No handler registered as '{}' (request: '{}')", id, request_id);
                Operation::error(kind, UmaError::HandlerNotFound(id.to_string()).to_string())
            }
        }
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.handler_ids())
            .finish()
    }
}

/// Collects handlers; rejects duplicate ids on [`build`](Self::build).
#[derive(Default)]
pub struct HandlerRegistryBuilder {
    handlers: HashMap<String, Arc<dyn Handler>>,
    duplicates: Vec<String>,
}

impl HandlerRegistryBuilder {
    pub fn register<H: Handler + 'static>(self, handler: H) -> Self {
        self.register_shared(Arc::new(handler))
    }

    pub fn register_shared(mut self, handler: Arc<dyn Handler>) -> Self {
        let id = handler.id().to_string();
        if !handler.readiness().is_ready() {
            warn!(
                "Registering handler '{}' that is not ready: {}",
                id,
                handler.readiness().status()
            );
        }
        if self.handlers.insert(id.clone(), handler).is_some() {
            self.duplicates.push(id);
        }
        self
    }

    pub fn build(self) -> BuildResult<HandlerRegistry> {
        if !self.duplicates.is_empty() {
            return Err(BuildError::InvalidConfiguration {
                message: format!("handler ids registered twice: {}", self.duplicates.join(", ")),
            });
        }
        let registry = HandlerRegistry {
            handlers: self.handlers,
        };
        info!("Handler registry built with {:?}", registry.handler_ids());
        Ok(registry)
    }
}

/// Process-wide registry, built at most once.
///
/// Concurrent first callers block until the single initialisation finishes;
/// a failed initialisation leaves the cell empty so a later call may retry.
#[derive(Default)]
pub struct SharedRegistry {
    cell: OnceLock<Arc<HandlerRegistry>>,
    init: Mutex<()>,
}

impl SharedRegistry {
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
            init: Mutex::new(()),
        }
    }

    pub fn get(&self) -> Option<Arc<HandlerRegistry>> {
        self.cell.get().cloned()
    }

    /// Registry, building it with `init` on first use.
    pub fn get_or_init<F>(&self, init: F) -> Arc<HandlerRegistry>
    where
        F: FnOnce() -> HandlerRegistry,
    {
        Arc::clone(self.cell.get_or_init(|| Arc::new(init())))
    }

    /// Like [`get_or_init`](Self::get_or_init) for fallible construction.
    pub fn get_or_try_init<F>(&self, init: F) -> BuildResult<Arc<HandlerRegistry>>
    where
        F: FnOnce() -> BuildResult<HandlerRegistry>,
    {
        if let Some(registry) = self.cell.get() {
            return Ok(Arc::clone(registry));
        }

        let _guard = self
            .init
            .lock()
            .map_err(|_| BuildError::InvalidConfiguration {
                message: "registry initialisation lock poisoned".to_string(),
            })?;

        if let Some(registry) = self.cell.get() {
            return Ok(Arc::clone(registry));
        }

        debug!("Initialising shared handler registry");
        let registry = init()?;
        Ok(Arc::clone(self.cell.get_or_init(|| Arc::new(registry))))
    }
}
