use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Which external gateway a payment was created against. Poll and webhook
/// reconciliation dispatch on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Gateway {
    Pix,
    Card,
}

impl std::fmt::Display for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Gateway::Pix => write!(f, "pix"),
            Gateway::Card => write!(f, "card"),
        }
    }
}

/// Mirrors the gateway status vocabulary. All non-pending states are
/// terminal with respect to ledger effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Rejected,
    Error,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Approved => write!(f, "approved"),
            PaymentStatus::Rejected => write!(f, "rejected"),
            PaymentStatus::Error => write!(f, "error"),
        }
    }
}

pub const PLAN_CREDITS: &str = "credits";

pub fn is_known_plan(plan: &str) -> bool {
    matches!(
        plan,
        "monthly" | "quarterly" | "semiannual" | "annual" | PLAN_CREDITS
    )
}

/// Subscription length per plan. Unknown plan strings fall back to 30 days.
pub fn plan_duration_days(plan: &str) -> i64 {
    match plan {
        "monthly" => 30,
        "quarterly" => 90,
        "semiannual" => 180,
        "annual" => 365,
        _ => 30,
    }
}

/// 1 currency unit = 100 credits.
pub fn credits_for_amount(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Payment {
    pub id: i64,
    pub user_id: i64,
    pub gateway: Gateway,
    pub plan: String,
    pub amount: f64,
    /// Gateway-assigned charge id, unique per gateway.
    pub payment_id: String,
    pub status: PaymentStatus,
    pub user_email: String,
    pub promotion_code: Option<String>,
    pub session_id: Option<String>,
    /// PIX-style correlation key; the card gateway correlates through the
    /// session's preference_id instead.
    pub external_reference: Option<String>,
    pub transaction_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateChargeRequest {
    pub amount: f64,
    pub payer_email: String,
    /// "credits" for a top-up, otherwise the subscription plan comes from
    /// the referenced session.
    pub payment_type: String,
    pub session_id: Option<String>,
    pub promotion_code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateChargeResponse {
    pub payment_id: String,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_code_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_url: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusQuery {
    pub payment_id: Option<String>,
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentStatusResponse {
    pub status: PaymentStatus,
    pub payment_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub plan: String,
    pub amount: f64,
}

impl From<&Payment> for PaymentStatusResponse {
    fn from(p: &Payment) -> Self {
        Self {
            status: p.status,
            payment_id: p.payment_id.clone(),
            session_id: p.session_id.clone(),
            plan: p.plan.clone(),
            amount: p.amount,
        }
    }
}

/// PIX-style webhook body: a "something changed" trigger, never trusted for
/// the status itself.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PixWebhookNotification {
    #[serde(rename = "type")]
    pub notification_type: String,
    pub data: Option<PixWebhookData>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PixWebhookData {
    pub id: String,
}
