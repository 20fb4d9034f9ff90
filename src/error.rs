//! Error types for resource server operations.
//!
//! Workflows return [`UmaResult`] internally; the handler layer turns any
//! [`UmaError`] into a terminal error [`Operation`](crate::operation::Operation)
//! so callers never see a raw error value.

use crate::operation::{OperationState, OperationType};

/// Main error type for resource server operations.
#[derive(Debug, thiserror::Error)]
pub enum UmaError {
    /// Input did not carry a required field or carried a malformed one
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A backend call finished in a state the workflow cannot accept
    #[error("Backend error: {state}: {status}")]
    Backend { state: OperationState, status: String },

    /// The handler does not implement the requested operation kind
    #[error("Unsupported operation type: '{operation}' for handler '{handler}'")]
    UnsupportedOperation {
        handler: String,
        operation: OperationType,
    },

    /// No handler is registered under the identifier
    #[error("Handler not found: '{0}'")]
    HandlerNotFound(String),

    /// The handler exists but never reached READY
    #[error("Handler '{handler}' is not ready: {status}")]
    HandlerNotReady { handler: String, status: String },

    /// Fatal setup failure surfaced at call time
    #[error("Setup error: {0}")]
    Build(#[from] BuildError),

    /// Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Validation errors for operation input.
///
/// Every variant names the offending attribute so the status text points at
/// the field the caller has to fix.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// The operation carried no payload at all
    #[error("JSON input is null or empty")]
    EmptyInput,

    /// Required attribute is missing or empty
    #[error("Required attribute '{attribute}' is missing or empty")]
    MissingRequiredAttribute { attribute: String },

    /// Attribute value doesn't match expected type
    #[error("Attribute '{attribute}' has invalid type, expected {expected}")]
    InvalidAttributeType { attribute: String, expected: String },

    /// General validation error with custom message
    #[error("Validation failed: {message}")]
    Custom { message: String },
}

/// Errors raised while configuring handlers or backends.
///
/// These leave the affected handler permanently not READY.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BuildError {
    /// A configuration key the handler depends on is absent
    #[error("Missing configuration value: '{key}'")]
    MissingConfiguration { key: String },

    /// Invalid configuration provided
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// The backend client could not be constructed
    #[error("Backend setup failed: {message}")]
    BackendSetup { message: String },
}

impl UmaError {
    /// Create a backend failure from the backend's own state and status text
    pub fn backend(state: OperationState, status: impl Into<String>) -> Self {
        Self::Backend {
            state,
            status: status.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create an unsupported operation error
    pub fn unsupported(handler: impl Into<String>, operation: OperationType) -> Self {
        Self::UnsupportedOperation {
            handler: handler.into(),
            operation,
        }
    }

    /// Whether this error means the workflow rejected its input
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl ValidationError {
    /// Create a missing required attribute error
    pub fn missing_required(attribute: impl Into<String>) -> Self {
        Self::MissingRequiredAttribute {
            attribute: attribute.into(),
        }
    }

    /// Create an invalid type error
    pub fn invalid_type(attribute: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::InvalidAttributeType {
            attribute: attribute.into(),
            expected: expected.into(),
        }
    }

    /// Create a custom validation error
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom {
            message: message.into(),
        }
    }
}

impl BuildError {
    /// Create a missing configuration error
    pub fn missing(key: impl Into<String>) -> Self {
        Self::MissingConfiguration { key: key.into() }
    }

    /// Create a backend setup error
    pub fn backend_setup(message: impl Into<String>) -> Self {
        Self::BackendSetup {
            message: message.into(),
        }
    }
}

// Result type aliases for convenience
pub type UmaResult<T> = Result<T, UmaError>;
pub type ValidationResult<T> = Result<T, ValidationError>;
pub type BuildResult<T> = Result<T, BuildError>;
