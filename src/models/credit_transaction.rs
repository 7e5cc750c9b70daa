use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Purchase,
    AdminAdd,
    AdminSubtract,
    AdminSet,
    PostAccessPurchase,
    PostAccessEarned,
    PlatformCommission,
    VipSubscription,
    VipEarned,
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TransactionType::Purchase => "purchase",
            TransactionType::AdminAdd => "admin_add",
            TransactionType::AdminSubtract => "admin_subtract",
            TransactionType::AdminSet => "admin_set",
            TransactionType::PostAccessPurchase => "post_access_purchase",
            TransactionType::PostAccessEarned => "post_access_earned",
            TransactionType::PlatformCommission => "platform_commission",
            TransactionType::VipSubscription => "vip_subscription",
            TransactionType::VipEarned => "vip_earned",
        };
        write!(f, "{s}")
    }
}

/// One row per credit-balance mutation; `balance` is the actor's balance
/// after the mutation. For any user, the sum of `amount` over all rows must
/// equal `users.credits`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CreditTransaction {
    pub id: i64,
    pub user_id: i64,
    pub transaction_type: TransactionType,
    pub amount: i64,
    pub description: Option<String>,
    pub balance: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreditTransactionResponse {
    pub id: i64,
    pub transaction_type: TransactionType,
    pub amount: i64,
    pub balance: i64,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<CreditTransaction> for CreditTransactionResponse {
    fn from(t: CreditTransaction) -> Self {
        Self {
            id: t.id,
            transaction_type: t.transaction_type,
            amount: t.amount,
            balance: t.balance,
            description: t.description,
            created_at: t.created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AdjustOperation {
    Add,
    Subtract,
    Set,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AdjustCreditsRequest {
    pub user_id: i64,
    pub operation: AdjustOperation,
    pub amount: i64,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AdjustCreditsResponse {
    pub user_id: i64,
    pub credits: i64,
}
