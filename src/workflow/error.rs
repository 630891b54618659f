use axum::http::StatusCode;
use thiserror::Error;

use super::purchase::PurchaseStatus;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("{0}")]
    Validation(String),
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
    #[error("Cannot {action} a purchase order that is {status}")]
    InvalidTransition {
        action: &'static str,
        status: PurchaseStatus,
    },
    #[error("{0}")]
    OperationNotAllowed(String),
    #[error("{0} is not yet available")]
    NotImplemented(&'static str),
}

impl WorkflowError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        WorkflowError::MalformedPayload(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            WorkflowError::Validation(_) | WorkflowError::MalformedPayload(_) => {
                StatusCode::BAD_REQUEST
            }
            WorkflowError::InvalidTransition { .. } | WorkflowError::OperationNotAllowed(_) => {
                StatusCode::CONFLICT
            }
            WorkflowError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
        }
    }
}
