//! Error types for plan input collection.

use thiserror::Error;

use crate::Amount;
use crate::api::ApiError;
use crate::model::{DocumentSlot, FinancingMethod};

/// Input that blocks progression to calculation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("missing mandatory document '{0}'")]
    MissingDocument(DocumentSlot),

    #[error("unknown field '{field}' for {method} plans")]
    UnknownField {
        field: String,
        method: FinancingMethod,
    },

    #[error("{0} months is not an offered term")]
    UnsupportedTerm(u32),

    #[error("down payment cannot be negative")]
    NegativeDownPayment,

    #[error("down payment {down_payment} exceeds price {principal}")]
    DownPaymentExceedsPrincipal {
        down_payment: Amount,
        principal: Amount,
    },
}

/// Failure resolving a document to a server-side path.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("{0} plans take no documents")]
    NotApplicable(FinancingMethod),

    #[error("upload of {slot} failed: {source}")]
    Api { slot: DocumentSlot, source: ApiError },

    #[error("upload of {0} returned no path")]
    NoPath(DocumentSlot),
}
