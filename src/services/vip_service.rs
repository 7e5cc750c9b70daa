use chrono::{Duration, Utc};

use crate::database::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{
    CreateVipPlanRequest, EntitlementResponse, SubscribeVipRequest, SubscribeVipResponse,
    TransactionType, VipPlan, VipSubscription,
};
use crate::services::marketplace_service::apply_credit_delta;
use crate::utils::with_retry;

const MAX_SUBSCRIBE_ATTEMPTS: u32 = 3;
const VALID_DURATIONS: [i64; 4] = [30, 90, 180, 365];

/// VIP plans: premium creators publish credit-priced recurring plans; a
/// subscription shares the marketplace's commission split and transactional
/// discipline.
#[derive(Clone)]
pub struct VipService {
    pool: DbPool,
    platform_username: String,
}

impl VipService {
    pub fn new(pool: DbPool, platform_username: String) -> Self {
        Self {
            pool,
            platform_username,
        }
    }

    pub async fn create_plan(
        &self,
        creator_id: i64,
        request: CreateVipPlanRequest,
    ) -> AppResult<VipPlan> {
        if request.name.trim().is_empty() {
            return Err(AppError::ValidationError("Plan name is required".to_string()));
        }
        if !(request.price_credits > 0 && request.price_credits <= 100_000) {
            return Err(AppError::ValidationError(
                "price_credits must be greater than 0 and at most 100000".to_string(),
            ));
        }
        if !VALID_DURATIONS.contains(&request.duration_days) {
            return Err(AppError::ValidationError(
                "duration_days must be one of 30, 90, 180, 365".to_string(),
            ));
        }

        let premium: Option<bool> = sqlx::query_scalar("SELECT premium FROM users WHERE id = ?")
            .bind(creator_id)
            .fetch_optional(&self.pool)
            .await?;
        if !premium.ok_or_else(|| AppError::NotFound("User not found".to_string()))? {
            return Err(AppError::PermissionDenied);
        }

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO vip_plans (creator_id, name, price_credits, duration_days, is_active, created_at)
            VALUES (?, ?, ?, ?, 1, ?)
            "#,
        )
        .bind(creator_id)
        .bind(request.name.trim())
        .bind(request.price_credits)
        .bind(request.duration_days)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let plan = sqlx::query_as::<_, VipPlan>("SELECT * FROM vip_plans WHERE id = ?")
            .bind(result.last_insert_rowid())
            .fetch_one(&self.pool)
            .await?;

        log::info!(
            "Created VIP plan {} for creator {creator_id}: {} credits / {} days",
            plan.id,
            plan.price_credits,
            plan.duration_days
        );
        Ok(plan)
    }

    pub async fn list_plans(&self, creator_id: i64) -> AppResult<Vec<VipPlan>> {
        let plans = sqlx::query_as::<_, VipPlan>(
            "SELECT * FROM vip_plans WHERE creator_id = ? AND is_active = 1 ORDER BY id",
        )
        .bind(creator_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(plans)
    }

    pub async fn subscribe(
        &self,
        subscriber_id: i64,
        request: SubscribeVipRequest,
    ) -> AppResult<SubscribeVipResponse> {
        with_retry(MAX_SUBSCRIBE_ATTEMPTS, || {
            self.try_subscribe(subscriber_id, request.plan_id)
        })
        .await
    }

    /// Currently entitling iff the subscription is active, unexpired, and
    /// the plan itself is still active.
    pub async fn check_entitlement(
        &self,
        subscriber_id: i64,
        plan_id: i64,
    ) -> AppResult<EntitlementResponse> {
        let row: Option<VipSubscription> = sqlx::query_as(
            r#"
            SELECT s.* FROM vip_subscriptions s
            JOIN vip_plans p ON p.id = s.plan_id
            WHERE s.subscriber_id = ? AND s.plan_id = ? AND s.is_active = 1 AND p.is_active = 1
            "#,
        )
        .bind(subscriber_id)
        .bind(plan_id)
        .fetch_optional(&self.pool)
        .await?;

        let now = Utc::now();
        match row {
            Some(sub) if sub.end_date > now => Ok(EntitlementResponse {
                entitled: true,
                end_date: Some(sub.end_date),
            }),
            _ => Ok(EntitlementResponse {
                entitled: false,
                end_date: None,
            }),
        }
    }

    async fn try_subscribe(
        &self,
        subscriber_id: i64,
        plan_id: i64,
    ) -> AppResult<SubscribeVipResponse> {
        let mut tx = self.pool.begin().await?;

        let plan = sqlx::query_as::<_, VipPlan>(
            "SELECT * FROM vip_plans WHERE id = ? AND is_active = 1",
        )
        .bind(plan_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("VIP plan not found".to_string()))?;

        if plan.creator_id == subscriber_id {
            return Err(AppError::IntegrityError(
                "Subscriber is the plan creator".to_string(),
            ));
        }

        let credits: i64 = sqlx::query_scalar("SELECT credits FROM users WHERE id = ?")
            .bind(subscriber_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        if credits < plan.price_credits {
            return Err(AppError::InsufficientCredits {
                available: credits,
                required: plan.price_credits,
            });
        }

        let platform_id: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE username = ?")
            .bind(&self.platform_username)
            .fetch_optional(&mut *tx)
            .await?;
        let platform_id = platform_id.ok_or_else(|| {
            AppError::IntegrityError(format!(
                "Platform account {} not found",
                self.platform_username
            ))
        })?;
        if platform_id == subscriber_id {
            return Err(AppError::IntegrityError(
                "Subscriber is the platform account".to_string(),
            ));
        }

        let price = plan.price_credits;
        let commission = price / 10;
        let creator_amount = price - commission;
        let now = Utc::now();

        log::info!(
            "VIP subscribe: plan={plan_id} subscriber={subscriber_id} creator={} price={price} commission={commission}",
            plan.creator_id
        );

        let subscriber_balance = apply_credit_delta(
            &mut tx,
            subscriber_id,
            -price,
            TransactionType::VipSubscription,
            &format!("Subscription to VIP plan {plan_id}"),
            now,
        )
        .await?;
        apply_credit_delta(
            &mut tx,
            plan.creator_id,
            creator_amount,
            TransactionType::VipEarned,
            &format!("VIP plan {plan_id} subscription earned"),
            now,
        )
        .await?;
        apply_credit_delta(
            &mut tx,
            platform_id,
            commission,
            TransactionType::PlatformCommission,
            &format!("Commission on VIP plan {plan_id}"),
            now,
        )
        .await?;

        // An active subscription extends; a lapsed one restarts from now.
        let existing: Option<VipSubscription> = sqlx::query_as(
            "SELECT * FROM vip_subscriptions WHERE subscriber_id = ? AND plan_id = ?",
        )
        .bind(subscriber_id)
        .bind(plan_id)
        .fetch_optional(&mut *tx)
        .await?;

        let base = match &existing {
            Some(sub) if sub.is_active && sub.end_date > now => sub.end_date,
            _ => now,
        };
        let end_date = base + Duration::days(plan.duration_days);

        match existing {
            Some(sub) => {
                sqlx::query(
                    "UPDATE vip_subscriptions SET is_active = 1, end_date = ? WHERE id = ?",
                )
                .bind(end_date)
                .bind(sub.id)
                .execute(&mut *tx)
                .await?;
            }
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO vip_subscriptions (subscriber_id, plan_id, is_active, end_date, created_at)
                    VALUES (?, ?, 1, ?, ?)
                    "#,
                )
                .bind(subscriber_id)
                .bind(plan_id)
                .bind(end_date)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            }
        }

        let subscription: VipSubscription = sqlx::query_as(
            "SELECT * FROM vip_subscriptions WHERE subscriber_id = ? AND plan_id = ?",
        )
        .bind(subscriber_id)
        .bind(plan_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(SubscribeVipResponse {
            subscription,
            user_credits: subscriber_balance,
            commission,
            creator_amount,
        })
    }
}
