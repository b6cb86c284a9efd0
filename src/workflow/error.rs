//! Error types for the confirmation workflow.

use thiserror::Error;

use super::Stage;
use crate::api::ApiError;
use crate::collector::{UploadError, ValidationError};
use crate::gateway::GatewayError;
use crate::model::FinancingMethod;

/// Top-level error returned by [`Workflow`](super::Workflow) actions.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("cannot {action} while {stage}")]
    InvalidTransition { action: &'static str, stage: Stage },

    #[error("{action} does not apply to {method} plans")]
    MethodMismatch {
        action: &'static str,
        method: FinancingMethod,
    },

    #[error("product lookup failed: {0}")]
    Product(ApiError),

    #[error("variant {0} not found")]
    UnknownVariant(String),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Upload(#[from] UploadError),

    #[error("calculation failed: {0}")]
    Calculation(ApiError),

    #[error("calculation result rejected: {0}")]
    ImplausibleResult(String),

    #[error("payment authorization failed: {0}")]
    Authorization(#[from] GatewayError),

    #[error("card orders require a transaction token from payment authorization")]
    MissingTransactionToken,

    #[error("order submission failed: {0}")]
    Submission(ApiError),
}

impl WorkflowError {
    /// Text shown next to the action that failed.
    pub fn user_message(&self) -> String {
        match self {
            WorkflowError::Product(e)
            | WorkflowError::Calculation(e)
            | WorkflowError::Submission(e) => e.user_message(),
            WorkflowError::Upload(UploadError::Api { slot, source }) => {
                format!("upload of {slot} failed: {}", source.user_message())
            }
            other => other.to_string(),
        }
    }
}
