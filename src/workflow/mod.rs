//! Installment confirmation workflow.
//!
//! Drives one plan from input collection to a created order:
//!
//! ```text
//! collecting_input -> awaiting_calculation -> calculated
//!     card:    -> awaiting_payment_auth -> authorized
//!     finance: -> authorized
//! authorized -> submitting -> complete
//! ```
//!
//! Any non-terminal state can be cancelled. Backend failures pass through
//! `failed` and land on the nearest retryable state with the error kept in
//! [`Workflow::last_error`]. Nothing is retried automatically.

use std::sync::Arc;

use tracing::{info, warn};

use crate::Amount;
use crate::api::{Backend, CalculateRequest, Session, Upload, wire::FinanceInfo};
use crate::collector::{PlanCollector, UploadError, ValidationError};
use crate::gateway::{AuthorizationRequest, PaymentGateway};
use crate::model::{
    ApplicantInfo, DocumentSlot, FinancingMethod, PlanCalculationResult, Product, Term,
    TransactionToken, Variant,
};
use crate::order::{self, CreatedOrder};

mod state;
pub use state::{CardReview, ConfirmationState, Stage};

mod error;
pub use error::WorkflowError;

/// What the customer must confirm before the calculation call goes out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalculationPrompt {
    /// Card plans: confirm the entered card and plan details.
    ReviewCard(CardReview),
    /// Finance plans go straight to calculation.
    Ready,
}

/// One customer's installment purchase of one product.
pub struct Workflow {
    backend: Arc<dyn Backend>,
    gateway: Arc<dyn PaymentGateway>,
    session: Session,
    product: Product,
    variant: Option<Variant>,
    collector: PlanCollector,
    state: ConfirmationState,
    history: Vec<Stage>,
    last_error: Option<String>,
}

/// Public API
impl Workflow {
    pub fn new(
        backend: Arc<dyn Backend>,
        gateway: Arc<dyn PaymentGateway>,
        session: Session,
        product: Product,
        variant: Option<Variant>,
        method: FinancingMethod,
    ) -> Self {
        let principal = variant.as_ref().map_or(product.price, |v| v.price);
        Self {
            backend,
            gateway,
            session,
            product,
            variant,
            collector: PlanCollector::new(method, principal),
            state: ConfirmationState::CollectingInput,
            history: vec![Stage::CollectingInput],
            last_error: None,
        }
    }

    /// Load the product and start collecting input for it.
    pub async fn open(
        backend: Arc<dyn Backend>,
        gateway: Arc<dyn PaymentGateway>,
        session: Session,
        product_id: &str,
        variant_id: Option<&str>,
        method: FinancingMethod,
    ) -> Result<Self, WorkflowError> {
        let product = backend
            .get_product_by_id(product_id)
            .await
            .map_err(WorkflowError::Product)?;
        let variant = match variant_id {
            Some(id) => Some(
                product
                    .variant(id)
                    .cloned()
                    .ok_or_else(|| WorkflowError::UnknownVariant(id.to_string()))?,
            ),
            None => None,
        };

        info!(
            product = %product.id,
            variant = ?variant.as_ref().map(|v| &v.id),
            method = %method,
            "installment workflow opened"
        );
        Ok(Self::new(backend, gateway, session, product, variant, method))
    }

    pub fn state(&self) -> &ConfirmationState {
        &self.state
    }

    pub fn stage(&self) -> Stage {
        self.state.stage()
    }

    /// Every stage entered so far, oldest first.
    pub fn history(&self) -> &[Stage] {
        &self.history
    }

    pub fn collector(&self) -> &PlanCollector {
        &self.collector
    }

    pub fn product(&self) -> &Product {
        &self.product
    }

    pub fn variant(&self) -> Option<&Variant> {
        self.variant.as_ref()
    }

    /// Message of the most recent failed action, cleared by the next action.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    // Input editing. Allowed until a payment is authorized. An accepted change to a
    // validated or calculated plan discards that progress; rejected or unchanged
    // input leaves the stage alone.

    pub fn select_method(&mut self, method: FinancingMethod) -> Result<(), WorkflowError> {
        self.ensure_editable("change method")?;
        self.last_error = None;
        if method == self.collector.method() {
            return Ok(());
        }
        self.begin_edit("change method")?;
        self.collector.select_method(method);
        Ok(())
    }

    pub fn set_term(&mut self, months: u32) -> Result<(), WorkflowError> {
        self.ensure_editable("change term")?;
        let term = Term::try_from(months)
            .map_err(|m| WorkflowError::from(ValidationError::UnsupportedTerm(m)));
        if self.record(term)? == self.collector.plan().term {
            return Ok(());
        }
        self.begin_edit("change term")?;
        let result = self.collector.set_term(months).map_err(WorkflowError::from);
        self.record(result)
    }

    pub fn set_down_payment(&mut self, amount: Amount) -> Result<(), WorkflowError> {
        self.ensure_editable("change down payment")?;
        if amount.is_negative() {
            return Err(self.reject(ValidationError::NegativeDownPayment.into()));
        }
        self.last_error = None;
        if amount == self.collector.plan().down_payment {
            return Ok(());
        }
        self.begin_edit("change down payment")?;
        let result = self
            .collector
            .set_down_payment(amount)
            .map_err(WorkflowError::from);
        self.record(result)
    }

    pub fn set_applicant_field(&mut self, field: &str, value: &str) -> Result<(), WorkflowError> {
        self.ensure_editable("edit applicant")?;
        let current = self
            .collector
            .applicant_field(field)
            .map(|current| current == value)
            .map_err(WorkflowError::from);
        if self.record(current)? {
            return Ok(());
        }
        self.begin_edit("edit applicant")?;
        let result = self
            .collector
            .set_applicant_field(field, value)
            .map_err(WorkflowError::from);
        self.record(result)
    }

    pub async fn upload_document(
        &mut self,
        slot: DocumentSlot,
        file: Upload,
    ) -> Result<String, WorkflowError> {
        self.ensure_editable("upload document")?;
        let method = self.collector.method();
        if method != FinancingMethod::FinanceCompany {
            return Err(self.reject(UploadError::NotApplicable(method).into()));
        }
        self.begin_edit("upload document")?;
        let result = self
            .collector
            .upload_document(self.backend.as_ref(), &self.session, slot, file)
            .await
            .map_err(WorkflowError::from);
        self.record(result)
    }

    /// Validate input and move to `awaiting_calculation`.
    pub fn request_calculation(&mut self) -> Result<CalculationPrompt, WorkflowError> {
        self.last_error = None;
        self.expect_stage("calculate", Stage::CollectingInput)?;
        let valid = self
            .collector
            .validate_for_submission()
            .map_err(WorkflowError::from);
        self.record(valid)?;

        let review = match self.collector.applicant() {
            ApplicantInfo::Card(card) => {
                let plan = self.collector.plan();
                Some(CardReview {
                    card_last4: order::last_four(&card.card_number),
                    card_holder: card.card_holder.clone(),
                    bank: card.bank.clone(),
                    expiry_date: card.expiry_date.clone(),
                    principal: plan.principal,
                    down_payment: plan.down_payment,
                    term: plan.term,
                })
            }
            ApplicantInfo::Finance(_) => None,
        };
        let prompt = review
            .clone()
            .map_or(CalculationPrompt::Ready, CalculationPrompt::ReviewCard);

        self.transition(ConfirmationState::AwaitingCalculation { review });
        Ok(prompt)
    }

    /// Issue the calculation call for a validated plan.
    pub async fn calculate(&mut self) -> Result<PlanCalculationResult, WorkflowError> {
        self.last_error = None;
        self.expect_stage("calculate", Stage::AwaitingCalculation)?;

        let request = self.calculation_request();
        let outcome = match self
            .backend
            .calculate_installment(&self.session, &request)
            .await
            .and_then(|response| response.into_result())
        {
            Ok(result) => self.check_result(&result).map(|()| result),
            Err(e) => Err(WorkflowError::Calculation(e)),
        };

        match outcome {
            Ok(result) => {
                info!(
                    method = %request.method,
                    months = %result.term,
                    monthly = %result.monthly_payment,
                    total = %result.total_payment,
                    "installment calculated"
                );
                self.transition(ConfirmationState::Calculated {
                    result: result.clone(),
                });
                Ok(result)
            }
            Err(e) => {
                self.fail(&e, ConfirmationState::CollectingInput);
                Err(e)
            }
        }
    }

    /// Card plans: open the payment authorization step.
    pub fn open_authorization(&mut self) -> Result<AuthorizationRequest, WorkflowError> {
        self.last_error = None;
        self.expect_method("authorize", FinancingMethod::Card)?;
        let result = self.calculated("authorize")?;
        let (card_last4, card_holder) = match self.collector.applicant() {
            ApplicantInfo::Card(card) => (
                order::last_four(&card.card_number),
                card.card_holder.clone(),
            ),
            ApplicantInfo::Finance(_) => (String::new(), String::new()),
        };
        let request = AuthorizationRequest {
            card_last4,
            card_holder,
            upfront: result.upfront,
            total: result.total_payment,
        };

        self.transition(ConfirmationState::AwaitingPaymentAuth {
            result,
            request: request.clone(),
        });
        Ok(request)
    }

    /// Card plans: confirm the payment; the only way a transaction token is minted.
    pub async fn authorize(&mut self) -> Result<TransactionToken, WorkflowError> {
        self.last_error = None;
        let (result, request) = match &self.state {
            ConfirmationState::AwaitingPaymentAuth { result, request } => {
                (result.clone(), request.clone())
            }
            other => {
                return Err(WorkflowError::InvalidTransition {
                    action: "confirm payment",
                    stage: other.stage(),
                });
            }
        };

        let authorized = self
            .gateway
            .authorize(&request)
            .await
            .map_err(WorkflowError::from)
            .and_then(|token| {
                if token.is_empty() {
                    Err(WorkflowError::MissingTransactionToken)
                } else {
                    Ok(token)
                }
            });

        match authorized {
            Ok(token) => {
                info!(token = %token, "payment authorized");
                self.transition(ConfirmationState::Authorized {
                    result,
                    token: Some(token.clone()),
                });
                Ok(token)
            }
            Err(e) => {
                self.fail(&e, ConfirmationState::Calculated { result });
                Err(e)
            }
        }
    }

    /// Finance plans: acknowledge that the finance company will call to verify.
    pub fn acknowledge(&mut self) -> Result<(), WorkflowError> {
        self.last_error = None;
        self.expect_method("acknowledge", FinancingMethod::FinanceCompany)?;
        let result = self.calculated("acknowledge")?;
        self.transition(ConfirmationState::Authorized {
            result,
            token: None,
        });
        Ok(())
    }

    /// Create the order.
    ///
    /// On failure the plan and any token are kept so submission can be retried.
    pub async fn submit(&mut self) -> Result<CreatedOrder, WorkflowError> {
        self.last_error = None;
        let method = self.collector.method();

        let (result, token) = match &self.state {
            ConfirmationState::Authorized { result, token } => (result.clone(), token.clone()),
            _ if method == FinancingMethod::Card => {
                warn!(stage = %self.stage(), "card order submitted without authorization");
                return Err(self.reject(WorkflowError::MissingTransactionToken));
            }
            _ => {
                return Err(WorkflowError::InvalidTransition {
                    action: "submit",
                    stage: self.stage(),
                });
            }
        };

        // Checked right before the call, whatever the state claims.
        if let Err(e) = Self::ensure_token(method, token.as_ref()) {
            warn!(reason = %e, "order submission blocked");
            return Err(self.reject(e));
        }

        let request = order::compose(
            &self.product,
            self.variant.as_ref(),
            self.collector.plan(),
            self.collector.applicant(),
            &result,
            token.as_ref(),
        );
        self.transition(ConfirmationState::Submitting {
            result: result.clone(),
            token: token.clone(),
        });

        match self.backend.create_order(&self.session, &request).await {
            Ok(order) => {
                info!(order = %order.id, method = %method, "installment order created");
                self.transition(ConfirmationState::Complete {
                    result,
                    order: order.clone(),
                });
                Ok(order)
            }
            Err(e) => {
                let e = WorkflowError::Submission(e);
                self.fail(&e, ConfirmationState::Authorized { result, token });
                Err(e)
            }
        }
    }

    /// Abandon the workflow.
    pub fn cancel(&mut self) -> Result<(), WorkflowError> {
        if self.stage().is_terminal() {
            return Err(WorkflowError::InvalidTransition {
                action: "cancel",
                stage: self.stage(),
            });
        }
        self.last_error = None;
        self.transition(ConfirmationState::Cancelled);
        Ok(())
    }
}

/// Private API
impl Workflow {
    fn transition(&mut self, next: ConfirmationState) {
        let from = self.state.stage();
        let to = next.stage();
        info!(from = %from, to = %to, "workflow transition");
        self.state = next;
        self.history.push(to);
    }

    /// Pass through `failed` to the recovery state, keeping the message.
    fn fail(&mut self, error: &WorkflowError, recover: ConfirmationState) {
        let message = error.user_message();
        warn!(stage = %self.stage(), reason = %error, "workflow step failed");
        self.transition(ConfirmationState::Failed {
            message: message.clone(),
        });
        self.transition(recover);
        self.last_error = Some(message);
    }

    /// Remember the error of a local action without changing state.
    fn record<T>(&mut self, result: Result<T, WorkflowError>) -> Result<T, WorkflowError> {
        self.last_error = result.as_ref().err().map(WorkflowError::user_message);
        result
    }

    fn reject(&mut self, error: WorkflowError) -> WorkflowError {
        self.last_error = Some(error.user_message());
        error
    }

    /// Result of the current `calculated` state.
    fn calculated(&self, action: &'static str) -> Result<PlanCalculationResult, WorkflowError> {
        match &self.state {
            ConfirmationState::Calculated { result } => Ok(result.clone()),
            other => Err(WorkflowError::InvalidTransition {
                action,
                stage: other.stage(),
            }),
        }
    }

    fn ensure_editable(&self, action: &'static str) -> Result<(), WorkflowError> {
        match self.stage() {
            Stage::CollectingInput | Stage::AwaitingCalculation | Stage::Calculated => Ok(()),
            stage => Err(WorkflowError::InvalidTransition { action, stage }),
        }
    }

    /// Drop back to `collecting_input` ahead of an accepted change.
    fn begin_edit(&mut self, action: &'static str) -> Result<(), WorkflowError> {
        self.ensure_editable(action)?;
        if self.stage() != Stage::CollectingInput {
            self.transition(ConfirmationState::CollectingInput);
        }
        Ok(())
    }

    fn expect_stage(&self, action: &'static str, expected: Stage) -> Result<(), WorkflowError> {
        let stage = self.stage();
        if stage == expected {
            Ok(())
        } else {
            Err(WorkflowError::InvalidTransition { action, stage })
        }
    }

    fn expect_method(
        &self,
        action: &'static str,
        expected: FinancingMethod,
    ) -> Result<(), WorkflowError> {
        let method = self.collector.method();
        if method == expected {
            Ok(())
        } else {
            Err(WorkflowError::MethodMismatch { action, method })
        }
    }

    fn ensure_token(
        method: FinancingMethod,
        token: Option<&TransactionToken>,
    ) -> Result<(), WorkflowError> {
        match (method, token) {
            (FinancingMethod::Card, None) => Err(WorkflowError::MissingTransactionToken),
            (FinancingMethod::Card, Some(t)) if t.is_empty() => {
                Err(WorkflowError::MissingTransactionToken)
            }
            _ => Ok(()),
        }
    }

    fn calculation_request(&self) -> CalculateRequest {
        let plan = self.collector.plan();
        let (card_info, finance_info) = match self.collector.applicant() {
            ApplicantInfo::Card(card) => (Some(card.clone()), None),
            ApplicantInfo::Finance(finance) => (
                None,
                Some(FinanceInfo {
                    applicant: finance.clone(),
                    documents: finance.documents.clone(),
                }),
            ),
        };
        CalculateRequest {
            product_id: self.product.id.clone(),
            variant_id: self.variant.as_ref().map(|v| v.id.clone()),
            upfront: plan.down_payment,
            months: plan.term,
            interest_rate: plan.rate,
            method: plan.method,
            card_info,
            finance_info,
        }
    }

    /// Reject figures that break the plan's invariants or do not echo the request.
    fn check_result(&self, result: &PlanCalculationResult) -> Result<(), WorkflowError> {
        let plan = self.collector.plan();
        let implausible = |reason: String| -> Result<(), WorkflowError> {
            Err(WorkflowError::ImplausibleResult(reason))
        };

        if result.term != plan.term {
            return implausible(format!(
                "asked for {} months, got {}",
                plan.term, result.term
            ));
        }
        if result.upfront != plan.down_payment {
            return implausible(format!(
                "asked for upfront {}, got {}",
                plan.down_payment, result.upfront
            ));
        }
        if result.monthly_payment.is_negative() {
            return implausible(format!(
                "negative monthly payment {}",
                result.monthly_payment
            ));
        }
        if result.total_payment < plan.financed_amount() {
            return implausible(format!(
                "total {} is below the financed amount {}",
                result.total_payment,
                plan.financed_amount()
            ));
        }

        // Installments must add up to the repaid amount, give or take rounding.
        let months = result.term.months();
        let repaid = result.total_payment.checked_sub(result.upfront);
        let drift = repaid
            .zip(result.monthly_payment.checked_mul(months))
            .and_then(|(repaid, scheduled)| scheduled.checked_sub(repaid))
            .and_then(Amount::checked_abs);
        let tolerance = repaid.and_then(|repaid| {
            Amount::from_float(repaid.to_float() / 100.0)
                .checked_add(Amount::from_whole(i64::from(months)))
        });
        if !matches!((drift, tolerance), (Some(d), Some(t)) if d <= t) {
            return implausible(format!(
                "{} x {} does not add up to total {} less upfront {}",
                result.term, result.monthly_payment, result.total_payment, result.upfront
            ));
        }

        Ok(())
    }
}
