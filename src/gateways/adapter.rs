//! Gateway seam: one capability interface, two remote implementations.
//!
//! The reconciliation engine is written once against [`GatewayAdapter`];
//! request/response shapes and correlation-key mechanics live in the
//! per-gateway modules.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::AppResult;
use crate::models::{Gateway, PaymentStatus};

/// Bounded timeout for all remote gateway calls. A timeout is a transient
/// failure, never a definitive rejection.
pub const GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct ChargeRequest {
    pub user_id: i64,
    pub amount: f64,
    pub payer_email: String,
    pub description: String,
    /// PIX correlation key (session id or synthesized top-up reference).
    /// The card gateway correlates through its own checkout-session id.
    pub external_reference: Option<String>,
    pub idempotency_key: String,
}

/// What the remote gateway hands back for a freshly created charge.
#[derive(Debug, Clone)]
pub struct ChargeHandle {
    pub payment_id: String,
    pub status: GatewayStatus,
    pub qr_code: Option<String>,
    pub qr_code_url: Option<String>,
    pub checkout_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayStatus {
    Pending,
    Approved,
    Rejected,
    Error,
}

impl GatewayStatus {
    pub fn as_payment_status(self) -> PaymentStatus {
        match self {
            GatewayStatus::Pending => PaymentStatus::Pending,
            GatewayStatus::Approved => PaymentStatus::Approved,
            GatewayStatus::Rejected => PaymentStatus::Rejected,
            GatewayStatus::Error => PaymentStatus::Error,
        }
    }
}

#[async_trait]
pub trait GatewayAdapter: Send + Sync {
    fn gateway(&self) -> Gateway;

    /// Create a remote charge. A failure here must leave no local state
    /// behind; the caller persists only after this returns.
    async fn create_charge(&self, request: &ChargeRequest) -> AppResult<ChargeHandle>;

    /// Re-fetch the live status of a charge by its gateway-assigned id.
    async fn fetch_status(&self, payment_id: &str) -> AppResult<GatewayStatus>;
}
