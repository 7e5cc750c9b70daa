use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Marks a post as requiring purchased access.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PaidPost {
    pub id: i64,
    pub post_id: i64,
    pub price_credits: i64,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Permanent access grant for one buyer to one paid post. Unique on
/// (user_id, paid_post_id).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PaidPostAccess {
    pub id: i64,
    pub user_id: i64,
    pub paid_post_id: i64,
    pub payment_type: String,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PurchaseAccessRequest {
    pub post_id: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PurchaseAccessResponse {
    pub access: PaidPostAccess,
    pub user_credits: i64,
    pub creator_credits: i64,
    pub commission: i64,
    pub creator_amount: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckAccessQuery {
    pub post_id: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaidPostInfo {
    pub id: i64,
    pub price_credits: i64,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckAccessResponse {
    pub has_access: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_post: Option<PaidPostInfo>,
}
