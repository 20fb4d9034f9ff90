//! Test backends.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use uma_resource_server::{Backend, Operation};

type Route = Box<dyn Fn(&Operation) -> Operation + Send + Sync>;

/// Answers each call through a routing closure and records the request.
pub struct ScriptedBackend {
    route: Route,
    calls: Mutex<Vec<Operation>>,
}

impl ScriptedBackend {
    pub fn new<F>(route: F) -> Arc<Self>
    where
        F: Fn(&Operation) -> Operation + Send + Sync + 'static,
    {
        Arc::new(Self {
            route: Box::new(route),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<Operation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Recorded calls whose `path` contains `fragment`.
    pub fn calls_to(&self, fragment: &str) -> Vec<Operation> {
        self.calls()
            .into_iter()
            .filter(|op| super::path_of(op).contains(fragment))
            .collect()
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn execute(&self, operation: Operation) -> Operation {
        let output = (self.route)(&operation);
        self.calls.lock().unwrap().push(operation);
        output
    }
}

/// Delegates to another backend, failing calls whose payload mentions `poison`.
pub struct SpyBackend {
    inner: Arc<dyn Backend>,
    poison: Option<String>,
    calls: Mutex<Vec<Operation>>,
}

impl SpyBackend {
    pub fn new(inner: Arc<dyn Backend>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            poison: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn poisoned(inner: Arc<dyn Backend>, poison: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            poison: Some(poison.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Backend for SpyBackend {
    fn name(&self) -> &str {
        "spy"
    }

    async fn execute(&self, operation: Operation) -> Operation {
        self.calls.lock().unwrap().push(operation.clone());
        let poisoned = self
            .poison
            .as_deref()
            .is_some_and(|poison| operation.payload().to_string().contains(poison));
        if poisoned {
            return Operation::error(operation.kind(), "store unavailable");
        }
        self.inner.execute(operation).await
    }
}
