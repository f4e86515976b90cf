//! # Card Gateway
//!
//! Seam to the external card terminal / acquirer. The engine never
//! talks to hardware or networks itself; a charge either comes back
//! with gateway metadata or fails, and on failure NO payment row is
//! written.

use async_trait::async_trait;
use registra_core::Money;
use thiserror::Error;

/// Successful charge result from the acquirer.
#[derive(Debug, Clone)]
pub struct GatewayCharge {
    pub gateway_txn_id: String,
    pub card_last_four: String,
    pub card_brand: String,
}

/// Card gateway failures.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Card declined: {0}")]
    Declined(String),

    #[error("Gateway timeout")]
    Timeout,

    #[error("Gateway unavailable: {0}")]
    Unavailable(String),
}

/// External card acquirer.
#[async_trait]
pub trait CardGateway: Send + Sync {
    /// Charges the card currently presented at the terminal.
    ///
    /// `reference` is the receipt number, echoed back in acquirer
    /// statements for reconciliation.
    async fn charge(
        &self,
        amount: Money,
        currency: &str,
        reference: &str,
    ) -> Result<GatewayCharge, GatewayError>;

    /// Reverses a previously successful charge.
    async fn refund(&self, gateway_txn_id: &str) -> Result<(), GatewayError>;
}
