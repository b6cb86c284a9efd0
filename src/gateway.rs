//! Payment authorization for card plans.
//!
//! There is no real gateway integration yet. [`SimulatedGateway`] mints a
//! timestamp plus random token when the customer confirms; it proves nothing
//! and must not be treated as a security mechanism. A real integration plugs
//! in behind [`PaymentGateway`].

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tracing::info;

use crate::Amount;
use crate::model::TransactionToken;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("payment declined: {0}")]
    Declined(String),
}

/// What the customer is asked to authorize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub card_last4: String,
    pub card_holder: String,
    /// Charged now; the rest is billed monthly by the issuer.
    pub upfront: Amount,
    pub total: Amount,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn authorize(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<TransactionToken, GatewayError>;
}

/// Stand-in gateway that approves every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedGateway;

impl SimulatedGateway {
    pub fn mint_token() -> TransactionToken {
        let millis = Utc::now().timestamp_millis();
        let nonce: u32 = rand::random();
        TransactionToken::new(format!("TXN-{millis}-{nonce:08x}"))
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn authorize(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<TransactionToken, GatewayError> {
        let token = Self::mint_token();
        info!(
            card = %request.card_last4,
            upfront = %request.upfront,
            token = %token,
            "simulated payment authorized"
        );
        Ok(token)
    }
}
