use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct VipPlan {
    pub id: i64,
    pub creator_id: i64,
    pub name: String,
    pub price_credits: i64,
    pub duration_days: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Recurring access grant from subscriber to a creator's VIP plan.
/// Currently entitling iff `is_active && end_date > now && plan.is_active`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct VipSubscription {
    pub id: i64,
    pub subscriber_id: i64,
    pub plan_id: i64,
    pub is_active: bool,
    pub end_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateVipPlanRequest {
    pub name: String,
    pub price_credits: i64,
    pub duration_days: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubscribeVipRequest {
    pub plan_id: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubscribeVipResponse {
    pub subscription: VipSubscription,
    pub user_credits: i64,
    pub commission: i64,
    pub creator_amount: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EntitlementQuery {
    pub plan_id: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EntitlementResponse {
    pub entitled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
}
