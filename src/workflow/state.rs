use std::fmt;

use crate::Amount;
use crate::gateway::AuthorizationRequest;
use crate::model::{PlanCalculationResult, Term, TransactionToken};
use crate::order::CreatedOrder;

/// Where the workflow is, without the data each state carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    CollectingInput,
    AwaitingCalculation,
    Calculated,
    AwaitingPaymentAuth,
    Authorized,
    Submitting,
    Complete,
    Cancelled,
    Failed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::CollectingInput => "collecting_input",
            Stage::AwaitingCalculation => "awaiting_calculation",
            Stage::Calculated => "calculated",
            Stage::AwaitingPaymentAuth => "awaiting_payment_auth",
            Stage::Authorized => "authorized",
            Stage::Submitting => "submitting",
            Stage::Complete => "complete",
            Stage::Cancelled => "cancelled",
            Stage::Failed => "failed",
        }
    }

    /// No further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Complete | Stage::Cancelled)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Card and plan details shown for confirmation before a card plan is calculated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardReview {
    pub card_last4: String,
    pub card_holder: String,
    pub bank: String,
    pub expiry_date: String,
    pub principal: Amount,
    pub down_payment: Amount,
    pub term: Term,
}

impl fmt::Display for CardReview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "card **** {} ({}, {}, exp {}): price {}, down payment {}, {} months",
            self.card_last4,
            self.card_holder,
            self.bank,
            self.expiry_date,
            self.principal,
            self.down_payment,
            self.term
        )
    }
}

/// The single authoritative state of a confirmation workflow.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmationState {
    CollectingInput,
    /// Input validated; card plans carry the review the customer confirmed.
    AwaitingCalculation { review: Option<CardReview> },
    Calculated { result: PlanCalculationResult },
    AwaitingPaymentAuth {
        result: PlanCalculationResult,
        request: AuthorizationRequest,
    },
    /// Ready to order. Card plans always hold a token here.
    Authorized {
        result: PlanCalculationResult,
        token: Option<TransactionToken>,
    },
    Submitting {
        result: PlanCalculationResult,
        token: Option<TransactionToken>,
    },
    Complete {
        result: PlanCalculationResult,
        order: CreatedOrder,
    },
    Cancelled,
    /// Pass-through state; the workflow immediately recovers to a retryable point.
    Failed { message: String },
}

impl ConfirmationState {
    pub fn stage(&self) -> Stage {
        match self {
            ConfirmationState::CollectingInput => Stage::CollectingInput,
            ConfirmationState::AwaitingCalculation { .. } => Stage::AwaitingCalculation,
            ConfirmationState::Calculated { .. } => Stage::Calculated,
            ConfirmationState::AwaitingPaymentAuth { .. } => Stage::AwaitingPaymentAuth,
            ConfirmationState::Authorized { .. } => Stage::Authorized,
            ConfirmationState::Submitting { .. } => Stage::Submitting,
            ConfirmationState::Complete { .. } => Stage::Complete,
            ConfirmationState::Cancelled => Stage::Cancelled,
            ConfirmationState::Failed { .. } => Stage::Failed,
        }
    }

    /// Latest calculation, if the state still carries one.
    pub fn result(&self) -> Option<&PlanCalculationResult> {
        match self {
            ConfirmationState::Calculated { result }
            | ConfirmationState::AwaitingPaymentAuth { result, .. }
            | ConfirmationState::Authorized { result, .. }
            | ConfirmationState::Submitting { result, .. }
            | ConfirmationState::Complete { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn token(&self) -> Option<&TransactionToken> {
        match self {
            ConfirmationState::Authorized { token, .. }
            | ConfirmationState::Submitting { token, .. } => token.as_ref(),
            _ => None,
        }
    }
}
