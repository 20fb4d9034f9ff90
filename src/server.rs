//! Builder wiring the default handlers into a registry.
//!
//! The Authorization Server backend is built from `as.connect` unless one is
//! supplied; the resource store defaults to an [`InMemoryDocumentStore`].
//! Handlers whose configuration is incomplete are still registered but stay
//! not ready, so they fail fast on every call instead of failing startup.
//!
//! ```rust,no_run
//! use uma_resource_server::{ResourceServerBuilder, ServerConfig, Operation};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::from_json_str(&std::fs::read_to_string("rs-config.json")?)?;
//! let registry = ResourceServerBuilder::new(config).build()?;
//!
//! let output = registry
//!     .process(
//!         "uma_sharedwithme",
//!         Operation::search(json!({"subject": "aadams", "sso_token": "..."})),
//!     )
//!     .await;
//! println!("{}", output);
//! # Ok(())
//! # }
//! ```

use crate::backend::{Backend, InMemoryDocumentStore, RestBackend};
use crate::config::ServerConfig;
use crate::error::BuildResult;
use crate::handlers::{ProxyAdminHandler, RegisterHandler, ResourcesHandler, SharedWithMeHandler};
use crate::registry::{HandlerRegistry, SharedRegistry};
use log::{info, warn};
use std::sync::Arc;

/// Configures backends and produces a [`HandlerRegistry`].
pub struct ResourceServerBuilder {
    config: ServerConfig,
    authz: Option<Arc<dyn Backend>>,
    store: Option<Arc<dyn Backend>>,
}

impl ResourceServerBuilder {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            authz: None,
            store: None,
        }
    }

    /// Use `backend` for Authorization Server calls instead of a REST client.
    pub fn with_authz_backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.authz = Some(backend);
        self
    }

    /// Use `backend` as the resource store.
    pub fn with_store_backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.store = Some(backend);
        self
    }

    fn authz_backend(&self) -> BuildResult<Arc<dyn Backend>> {
        if let Some(backend) = &self.authz {
            return Ok(Arc::clone(backend));
        }
        let backend = RestBackend::new(self.config.connect()?)?;
        info!("Authorization Server at {}", backend.base_url());
        Ok(Arc::new(backend))
    }

    /// Build the registry with every default handler.
    ///
    /// # Errors
    ///
    /// Only a duplicate handler id fails the build; configuration problems
    /// surface as not-ready handlers.
    pub fn build(self) -> BuildResult<HandlerRegistry> {
        let authz = self.authz_backend();
        if let Err(e) = &authz {
            warn!("Authorization Server backend unavailable: {}", e);
        }
        let store = self
            .store
            .clone()
            .unwrap_or_else(|| Arc::new(InMemoryDocumentStore::new()));

        HandlerRegistry::builder()
            .register(RegisterHandler::new(&self.config, authz.clone()))
            .register(ResourcesHandler::new(store))
            .register(ProxyAdminHandler::new(&self.config, authz.clone()))
            .register(SharedWithMeHandler::new(&self.config, authz))
            .build()
    }

    /// Build into `shared` unless it already holds a registry.
    pub fn build_shared(self, shared: &SharedRegistry) -> BuildResult<Arc<HandlerRegistry>> {
        shared.get_or_try_init(|| self.build())
    }
}
