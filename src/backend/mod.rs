//! Backend collaborators.
//!
//! A [`Backend`] executes one [`Operation`] against a remote system and
//! reports the outcome through the returned operation's state:
//!
//! | Outcome                  | State      |
//! |--------------------------|------------|
//! | 2xx / entity found       | `SUCCESS`  |
//! | 404 / no such entity     | `NOTEXIST` |
//! | anything else            | `ERROR`    |
//!
//! The input payload carries `headers`, `path`, an optional `uid`, `data`
//! for writes and `query_params` or `query` for searches. Retries and
//! timeouts belong to the backend, never to the handlers.

pub mod memory;
pub mod rest;

pub use memory::InMemoryDocumentStore;
pub use rest::RestBackend;

use crate::operation::Operation;
use async_trait::async_trait;

/// Executes operations against one remote system.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &str;

    /// Run the operation. Never panics and never returns a pre-terminal state.
    async fn execute(&self, operation: Operation) -> Operation;
}
