//! UMA 2.0 resource server adapter for Rust.
//!
//! Sequences calls between a caller, an UMA Authorization Server and a
//! resource metadata store. Every request is an [`Operation`] envelope whose
//! [`OperationState`] is the single source of truth for the outcome.
//!
//! # Core Components
//!
//! - [`Operation`] - Request/response envelope with an explicit state machine
//! - [`Handler`] - Trait every workflow implements; [`Handler::process`]
//!   validates and dispatches
//! - [`HandlerRegistry`] - Lookup of handlers by id, shared across requests
//! - [`Backend`] - Collaborator contract for the REST client and the store
//! - [`ResourceServerBuilder`] - Wires the default handlers from a [`ServerConfig`]
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use uma_resource_server::{Operation, ResourceServerBuilder, ServerConfig};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::from_json_str(r#"{
//!     "as": {
//!         "connect": { "base_url": "https://as.example.com/openam" },
//!         "uma": { "resource_set": { "path": "uma/realms/root/resource_set" } }
//!     }
//! }"#)?;
//! let registry = ResourceServerBuilder::new(config).build()?;
//!
//! let output = registry
//!     .process(
//!         "uma_register",
//!         Operation::create(json!({
//!             "access_token": "...",
//!             "data": { "name": "Photo Album", "resource_scopes": ["view"] }
//!         })),
//!     )
//!     .await;
//! println!("{} -> {}", output, output.payload());
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod handler;
pub mod handlers;
pub mod json_path;
pub mod keys;
pub mod operation;
pub mod registry;
pub mod server;

// Re-export commonly used types for convenience
pub use backend::{Backend, InMemoryDocumentStore, RestBackend};
pub use config::ServerConfig;
pub use error::{BuildError, BuildResult, UmaError, UmaResult, ValidationError};
pub use handler::{Handler, Readiness, RequestContext};
pub use handlers::{
    PROXY_ADMIN_HANDLER_ID, ProxyAdminHandler, REGISTER_HANDLER_ID, RESOURCES_HANDLER_ID,
    RegisterHandler, ResourcesHandler, SHARED_WITH_ME_HANDLER_ID, SharedWithMeHandler,
};
pub use operation::{Operation, OperationState, OperationType};
pub use registry::{HandlerRegistry, SharedRegistry};
pub use server::ResourceServerBuilder;
