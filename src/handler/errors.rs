//! Conversion of failures into terminal operations.
//!
//! This is the only place an [`UmaError`] becomes an [`Operation`].

use super::Readiness;
use crate::error::UmaError;
use crate::operation::{Operation, OperationType};

/// Terminal operation for a failure raised inside a typed workflow.
///
/// Input rejections become `FAILED`; everything else becomes `ERROR`.
/// `method` prefixes the status so the failing step is visible.
pub fn error_operation(kind: OperationType, method: &str, error: UmaError) -> Operation {
    let status = format!("{}: {}", method, error);
    if error.is_rejection() {
        Operation::failed(kind, status)
    } else {
        Operation::error(kind, status)
    }
}

/// Terminal operation for a failed `validate` step. Always `ERROR`.
pub fn validation_failure(kind: OperationType, error: UmaError) -> Operation {
    Operation::error(kind, format!("validate: {}", error))
}

/// Terminal operation for a handler that never became ready.
pub fn not_ready(handler: &str, kind: OperationType, readiness: &Readiness) -> Operation {
    Operation::error(
        kind,
        UmaError::HandlerNotReady {
            handler: handler.to_string(),
            status: readiness.status().to_string(),
        }
        .to_string(),
    )
}

/// Terminal operation for a kind the handler does not implement.
pub fn unsupported(handler: &str, kind: OperationType) -> Operation {
    Operation::error(kind, UmaError::unsupported(handler, kind).to_string())
}
