//! Applies scripted actions to a [`Workflow`].
//!
//! Every action is logged; a failing action never stops the script, the
//! workflow simply stays where its failure handling left it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio_stream::{Stream, StreamExt};
use tracing::{info, warn};

use crate::api::{Backend, Upload};
use crate::config::Config;
use crate::csv::{Action, Summary};
use crate::gateway::PaymentGateway;
use crate::model::FinancingMethod;
use crate::workflow::{CalculationPrompt, ConfirmationState, Workflow, WorkflowError};

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("no workflow opened")]
    NotOpened,

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub struct Driver {
    backend: Arc<dyn Backend>,
    gateway: Arc<dyn PaymentGateway>,
    config: Config,
    /// Relative upload paths are resolved against this directory.
    base_dir: PathBuf,
    workflow: Option<Workflow>,
}

/// Public API
impl Driver {
    pub fn new(
        backend: Arc<dyn Backend>,
        gateway: Arc<dyn PaymentGateway>,
        config: Config,
    ) -> Self {
        Self {
            backend,
            gateway,
            config,
            base_dir: PathBuf::new(),
            workflow: None,
        }
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    /// Run the driver over the given action stream
    pub async fn run(&mut self, mut stream: impl Stream<Item = Action> + Unpin) {
        while let Some(action) = stream.next().await {
            // a failed action must not stop the script
            let _ = self.apply(action).await;
        }
    }

    pub fn workflow(&self) -> Option<&Workflow> {
        self.workflow.as_ref()
    }

    /// Apply a single action to the current workflow
    pub async fn apply(&mut self, action: Action) -> Result<(), DriverError> {
        let name = action_name(&action);
        let result = self.dispatch(action).await;
        match &result {
            Ok(()) => info!(action = name, stage = %self.stage_label(), "{name} applied"),
            Err(e) => warn!(
                action = name,
                stage = %self.stage_label(),
                reason = %e,
                "{name} skipped"
            ),
        }
        result
    }

    /// One-row view of where the workflow ended up.
    pub fn summary(&self) -> Summary {
        let Some(workflow) = &self.workflow else {
            return Summary {
                stage: self.stage_label(),
                ..Default::default()
            };
        };

        let plan = workflow.collector().plan();
        let state = workflow.state();
        let result = state.result();
        let rate = result.and_then(|r| r.rate).or(plan.rate);
        let order_id = match state {
            ConfirmationState::Complete { order, .. } => order.id.clone(),
            _ => String::new(),
        };

        Summary {
            stage: workflow.stage().to_string(),
            method: plan.method.to_string(),
            term: plan.term.to_string(),
            rate: rate.map(|r| r.to_string()).unwrap_or_default(),
            monthly_payment: result
                .map(|r| r.monthly_payment.to_string())
                .unwrap_or_default(),
            total_payment: result
                .map(|r| r.total_payment.to_string())
                .unwrap_or_default(),
            upfront: result.map(|r| r.upfront.to_string()).unwrap_or_default(),
            order_id,
        }
    }
}

/// Private API
impl Driver {
    async fn dispatch(&mut self, action: Action) -> Result<(), DriverError> {
        if let Action::Open {
            product_id,
            variant_id,
        } = action
        {
            return self.open(&product_id, variant_id.as_deref()).await;
        }

        let workflow = self.workflow.as_mut().ok_or(DriverError::NotOpened)?;
        match action {
            // handled above
            Action::Open { .. } => Ok(()),
            Action::Method(method) => Ok(workflow.select_method(method)?),
            Action::Term(months) => Ok(workflow.set_term(months)?),
            Action::DownPayment(amount) => Ok(workflow.set_down_payment(amount)?),
            Action::Set { field, value } => Ok(workflow.set_applicant_field(&field, &value)?),
            Action::Upload { slot, path } => {
                let path = resolve(&self.base_dir, &path);
                let bytes = tokio::fs::read(&path)
                    .await
                    .map_err(|source| DriverError::Io {
                        path: path.clone(),
                        source,
                    })?;
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| slot.to_string());
                let stored = workflow
                    .upload_document(slot, Upload::new(file_name, bytes))
                    .await?;
                info!(
                    slot = %slot,
                    url = %self.config.asset_url(&stored),
                    "document stored"
                );
                Ok(())
            }
            Action::Calculate => {
                if let CalculationPrompt::ReviewCard(review) = workflow.request_calculation()? {
                    info!(review = %review, "card details confirmed");
                }
                workflow.calculate().await?;
                Ok(())
            }
            Action::Authorize => {
                let request = workflow.open_authorization()?;
                info!(
                    card = %request.card_last4,
                    upfront = %request.upfront,
                    total = %request.total,
                    "authorizing payment"
                );
                workflow.authorize().await?;
                Ok(())
            }
            Action::Acknowledge => Ok(workflow.acknowledge()?),
            Action::Submit => {
                workflow.submit().await?;
                Ok(())
            }
            Action::Cancel => Ok(workflow.cancel()?),
        }
    }

    async fn open(
        &mut self,
        product_id: &str,
        variant_id: Option<&str>,
    ) -> Result<(), DriverError> {
        let workflow = Workflow::open(
            Arc::clone(&self.backend),
            Arc::clone(&self.gateway),
            self.config.session(),
            product_id,
            variant_id,
            FinancingMethod::Card,
        )
        .await?;

        for image in &workflow.product().images {
            info!(
                product = %product_id,
                image = %self.config.asset_url(image),
                "product image"
            );
        }
        if let Some(previous) = self.workflow.replace(workflow) {
            warn!(stage = %previous.stage(), "previous workflow discarded");
        }
        Ok(())
    }

    fn stage_label(&self) -> String {
        self.workflow
            .as_ref()
            .map_or_else(|| "not_opened".to_string(), |w| w.stage().to_string())
    }
}

fn resolve(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

fn action_name(action: &Action) -> &'static str {
    match action {
        Action::Open { .. } => "open",
        Action::Method(_) => "method",
        Action::Term(_) => "term",
        Action::DownPayment(_) => "down_payment",
        Action::Set { .. } => "set",
        Action::Upload { .. } => "upload",
        Action::Calculate => "calculate",
        Action::Authorize => "authorize",
        Action::Acknowledge => "acknowledge",
        Action::Submit => "submit",
        Action::Cancel => "cancel",
    }
}
