use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub credits: i64,
    pub premium: bool,
    pub is_admin: bool,
    pub expire_date: Option<DateTime<Utc>>,
    /// Pending-payment UI state, cleared when a payment resolves.
    pub payment_qr_code_url: Option<String>,
    pub payment_id: Option<String>,
    pub payment_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BalanceResponse {
    pub user_id: i64,
    pub credits: i64,
}
