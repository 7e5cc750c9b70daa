use chrono::Utc;
use sqlx::{Sqlite, Transaction};

use crate::database::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{
    PaidPost, PaidPostAccess, PurchaseAccessResponse, TransactionType,
};
use crate::utils::with_retry;

/// Commission the platform takes on every marketplace sale, as a fraction
/// denominator: floor(price / 10). Prices below 10 credits floor to zero
/// commission and the creator keeps the full amount.
const COMMISSION_DIVISOR: i64 = 10;
const MAX_PURCHASE_ATTEMPTS: u32 = 3;

/// Paid-content marketplace engine: moves credits from a buyer to a
/// creator and the platform account, at most once per (buyer, post) pair.
#[derive(Clone)]
pub struct MarketplaceService {
    pool: DbPool,
    platform_username: String,
}

impl MarketplaceService {
    pub fn new(pool: DbPool, platform_username: String) -> Self {
        Self {
            pool,
            platform_username,
        }
    }

    pub async fn purchase_access(
        &self,
        buyer_id: i64,
        post_id: i64,
    ) -> AppResult<PurchaseAccessResponse> {
        // Cheap prechecks before the transaction; everything is re-verified
        // inside it to close races.
        let paid_post = self
            .active_paid_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post is not a paid post".to_string()))?;
        if self.find_access(buyer_id, paid_post.id).await?.is_some() {
            return Err(AppError::Conflict(
                "User already has access to this post".to_string(),
            ));
        }

        with_retry(MAX_PURCHASE_ATTEMPTS, || {
            self.try_purchase(buyer_id, post_id)
        })
        .await
    }

    pub async fn check_access(
        &self,
        user_id: i64,
        post_id: i64,
    ) -> AppResult<(bool, Option<PaidPost>)> {
        let Some(paid_post) = self.active_paid_post(post_id).await? else {
            return Ok((false, None));
        };
        let has_access = self.find_access(user_id, paid_post.id).await?.is_some();
        Ok((has_access, Some(paid_post)))
    }

    async fn try_purchase(
        &self,
        buyer_id: i64,
        post_id: i64,
    ) -> AppResult<PurchaseAccessResponse> {
        let mut tx = self.pool.begin().await?;

        let paid_post = sqlx::query_as::<_, PaidPost>(
            "SELECT * FROM paid_posts WHERE post_id = ? AND is_active = 1",
        )
        .bind(post_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Post is not a paid post".to_string()))?;

        let existing: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM paid_post_accesses WHERE user_id = ? AND paid_post_id = ?",
        )
        .bind(buyer_id)
        .bind(paid_post.id)
        .fetch_optional(&mut *tx)
        .await?;
        if existing.is_some() {
            return Err(AppError::Conflict(
                "User already has access to this post".to_string(),
            ));
        }

        let creator_id: Option<i64> = sqlx::query_scalar("SELECT user_id FROM posts WHERE id = ?")
            .bind(post_id)
            .fetch_optional(&mut *tx)
            .await?;
        let creator_id = creator_id.ok_or_else(|| {
            AppError::IntegrityError(format!("Paid post {post_id} has no owning user"))
        })?;
        if creator_id == buyer_id {
            return Err(AppError::IntegrityError(
                "Buyer is the owner of the paid post".to_string(),
            ));
        }

        let buyer_credits: i64 = sqlx::query_scalar("SELECT credits FROM users WHERE id = ?")
            .bind(buyer_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let price = paid_post.price_credits;
        if buyer_credits < price {
            return Err(AppError::InsufficientCredits {
                available: buyer_credits,
                required: price,
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
        if platform_id == buyer_id {
            return Err(AppError::IntegrityError(
                "Buyer is the platform account".to_string(),
            ));
        }

        let commission = price / COMMISSION_DIVISOR;
        let creator_amount = price - commission;
        let now = Utc::now();

        log::info!(
            "Paid-post purchase: post={post_id} buyer={buyer_id} creator={creator_id} price={price} commission={commission}"
        );

        let buyer_balance = apply_credit_delta(
            &mut tx,
            buyer_id,
            -price,
            TransactionType::PostAccessPurchase,
            &format!("Access to paid post {post_id}"),
            now,
        )
        .await?;
        let creator_balance = apply_credit_delta(
            &mut tx,
            creator_id,
            creator_amount,
            TransactionType::PostAccessEarned,
            &format!("Sale of paid post {post_id}"),
            now,
        )
        .await?;
        apply_credit_delta(
            &mut tx,
            platform_id,
            commission,
            TransactionType::PlatformCommission,
            &format!("Commission on paid post {post_id}"),
            now,
        )
        .await?;

        sqlx::query(
            r#"
            INSERT INTO paid_post_accesses (user_id, paid_post_id, payment_type, amount, created_at)
            VALUES (?, ?, 'credits', ?, ?)
            "#,
        )
        .bind(buyer_id)
        .bind(paid_post.id)
        .bind(price)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Conflict(
                "User already has access to this post".to_string(),
            ),
            _ => AppError::DatabaseError(e),
        })?;

        let access = sqlx::query_as::<_, PaidPostAccess>(
            "SELECT * FROM paid_post_accesses WHERE user_id = ? AND paid_post_id = ?",
        )
        .bind(buyer_id)
        .bind(paid_post.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(PurchaseAccessResponse {
            access,
            user_credits: buyer_balance,
            creator_credits: creator_balance,
            commission,
            creator_amount,
        })
    }

    async fn active_paid_post(&self, post_id: i64) -> AppResult<Option<PaidPost>> {
        let paid_post = sqlx::query_as::<_, PaidPost>(
            "SELECT * FROM paid_posts WHERE post_id = ? AND is_active = 1",
        )
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(paid_post)
    }

    async fn find_access(
        &self,
        user_id: i64,
        paid_post_id: i64,
    ) -> AppResult<Option<PaidPostAccess>> {
        let access = sqlx::query_as::<_, PaidPostAccess>(
            "SELECT * FROM paid_post_accesses WHERE user_id = ? AND paid_post_id = ?",
        )
        .bind(user_id)
        .bind(paid_post_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(access)
    }
}

/// Mutates a balance and writes the paired ledger row in the same
/// transaction, returning the post-mutation balance.
pub(crate) async fn apply_credit_delta(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: i64,
    delta: i64,
    transaction_type: TransactionType,
    description: &str,
    now: chrono::DateTime<Utc>,
) -> AppResult<i64> {
    sqlx::query("UPDATE users SET credits = credits + ? WHERE id = ?")
        .bind(delta)
        .bind(user_id)
        .execute(&mut **tx)
        .await?;
    let balance: i64 = sqlx::query_scalar("SELECT credits FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_one(&mut **tx)
        .await?;
    sqlx::query(
        r#"
        INSERT INTO credit_transactions
            (user_id, transaction_type, amount, description, balance, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(transaction_type)
    .bind(delta)
    .bind(description)
    .bind(balance)
    .bind(now)
    .execute(&mut **tx)
    .await?;
    Ok(balance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{
        insert_paid_post, insert_post, insert_user, ledger_count, ledger_sum, test_pool,
        user_credits,
    };

    const PLATFORM: &str = "vibra";

    async fn setup(buyer_credits: i64, price: i64) -> (DbPool, MarketplaceService, i64, i64, i64, i64) {
        let pool = test_pool().await;
        let platform_id = insert_user(&pool, PLATFORM, 0).await;
        let buyer_id = insert_user(&pool, "buyer", buyer_credits).await;
        let creator_id = insert_user(&pool, "creator", 0).await;
        let post_id = insert_post(&pool, creator_id).await;
        insert_paid_post(&pool, post_id, price).await;
        let service = MarketplaceService::new(pool.clone(), PLATFORM.to_string());
        (pool, service, buyer_id, creator_id, platform_id, post_id)
    }

    #[tokio::test]
    async fn commission_split_is_exact() {
        for price in [1_i64, 9, 10, 11, 100, 999] {
            let (pool, service, buyer_id, creator_id, platform_id, post_id) =
                setup(price, price).await;

            let result = service.purchase_access(buyer_id, post_id).await.unwrap();
            let commission = price / 10;
            assert_eq!(result.commission, commission, "price {price}");
            assert_eq!(result.creator_amount + result.commission, price);

            assert_eq!(user_credits(&pool, buyer_id).await, 0);
            assert_eq!(user_credits(&pool, creator_id).await, price - commission);
            assert_eq!(user_credits(&pool, platform_id).await, commission);

            // No credit created or destroyed across the three actors.
            let total = user_credits(&pool, buyer_id).await
                + user_credits(&pool, creator_id).await
                + user_credits(&pool, platform_id).await;
            assert_eq!(total, price);

            // Ledger conservation holds per actor.
            for id in [buyer_id, creator_id, platform_id] {
                assert_eq!(ledger_sum(&pool, id).await, user_credits(&pool, id).await);
            }
        }
    }

    #[tokio::test]
    async fn purchase_writes_three_ledger_rows_and_one_access() {
        let (pool, service, buyer_id, creator_id, platform_id, post_id) = setup(100, 100).await;

        service.purchase_access(buyer_id, post_id).await.unwrap();

        // Buyer carries the fixture seed row plus the purchase debit.
        assert_eq!(ledger_count(&pool, buyer_id).await, 2);
        assert_eq!(ledger_count(&pool, creator_id).await, 1);
        assert_eq!(ledger_count(&pool, platform_id).await, 1);

        let accesses: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM paid_post_accesses")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(accesses, 1);
    }

    #[tokio::test]
    async fn second_purchase_is_rejected_without_charging() {
        let (pool, service, buyer_id, creator_id, _platform_id, post_id) = setup(500, 100).await;

        service.purchase_access(buyer_id, post_id).await.unwrap();
        let second = service.purchase_access(buyer_id, post_id).await;
        assert!(matches!(second, Err(AppError::Conflict(_))));

        assert_eq!(user_credits(&pool, buyer_id).await, 400);
        assert_eq!(user_credits(&pool, creator_id).await, 90);
        assert_eq!(ledger_count(&pool, buyer_id).await, 2);
    }

    #[tokio::test]
    async fn insufficient_credits_names_both_values_and_mutates_nothing() {
        let (pool, service, buyer_id, creator_id, platform_id, post_id) = setup(40, 100).await;

        let result = service.purchase_access(buyer_id, post_id).await;
        match result {
            Err(AppError::InsufficientCredits {
                available,
                required,
            }) => {
                assert_eq!(available, 40);
                assert_eq!(required, 100);
            }
            other => panic!("expected InsufficientCredits, got {other:?}"),
        }

        assert_eq!(user_credits(&pool, buyer_id).await, 40);
        assert_eq!(user_credits(&pool, creator_id).await, 0);
        assert_eq!(user_credits(&pool, platform_id).await, 0);
        // Only the buyer's fixture seed row exists; the failed purchase
        // wrote nothing.
        assert_eq!(ledger_count(&pool, buyer_id).await, 1);
        assert_eq!(ledger_count(&pool, creator_id).await, 0);
        assert_eq!(ledger_count(&pool, platform_id).await, 0);
    }

    #[tokio::test]
    async fn buying_own_post_is_an_integrity_failure() {
        let (_pool, service, _buyer_id, creator_id, _platform_id, post_id) = setup(500, 100).await;

        let result = service.purchase_access(creator_id, post_id).await;
        assert!(matches!(result, Err(AppError::IntegrityError(_))));
    }

    #[tokio::test]
    async fn missing_platform_account_is_an_integrity_failure() {
        let pool = test_pool().await;
        let buyer_id = insert_user(&pool, "buyer", 500).await;
        let creator_id = insert_user(&pool, "creator", 0).await;
        let post_id = insert_post(&pool, creator_id).await;
        insert_paid_post(&pool, post_id, 100).await;
        let service = MarketplaceService::new(pool.clone(), "ghost".to_string());

        let result = service.purchase_access(buyer_id, post_id).await;
        assert!(matches!(result, Err(AppError::IntegrityError(_))));
        assert_eq!(user_credits(&pool, buyer_id).await, 500);
    }

    #[tokio::test]
    async fn inactive_paid_post_is_not_purchasable() {
        let (pool, service, buyer_id, _creator_id, _platform_id, post_id) = setup(500, 100).await;
        sqlx::query("UPDATE paid_posts SET is_active = 0 WHERE post_id = ?")
            .bind(post_id)
            .execute(&pool)
            .await
            .unwrap();

        let result = service.purchase_access(buyer_id, post_id).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn check_access_reports_paid_post_details() {
        let (_pool, service, buyer_id, _creator_id, _platform_id, post_id) = setup(500, 100).await;

        let (before, paid_post) = service.check_access(buyer_id, post_id).await.unwrap();
        assert!(!before);
        assert_eq!(paid_post.unwrap().price_credits, 100);

        service.purchase_access(buyer_id, post_id).await.unwrap();
        let (after, _) = service.check_access(buyer_id, post_id).await.unwrap();
        assert!(after);
    }

    #[tokio::test]
    async fn top_up_then_purchase_end_to_end() {
        use crate::gateways::{GatewayStatus, mock::MockGateway};
        use crate::models::{CreateChargeRequest, Gateway, PLAN_CREDITS, StatusQuery};
        use crate::services::PaymentService;
        use std::sync::Arc;

        let pool = test_pool().await;
        let platform_id = insert_user(&pool, PLATFORM, 0).await;
        let buyer_id = insert_user(&pool, "buyer", 0).await;
        let creator_id = insert_user(&pool, "creator", 0).await;
        let post_id = insert_post(&pool, creator_id).await;
        insert_paid_post(&pool, post_id, 100).await;

        let pix = MockGateway::new(Gateway::Pix);
        let payments = PaymentService::new(
            pool.clone(),
            Arc::new(pix.clone()),
            Arc::new(MockGateway::new(Gateway::Card)),
        );
        let marketplace = MarketplaceService::new(pool.clone(), PLATFORM.to_string());

        // R$10 top-up approved via poll
        let charge = payments
            .create_charge(
                buyer_id,
                Gateway::Pix,
                CreateChargeRequest {
                    amount: 10.0,
                    payer_email: "buyer@test.dev".to_string(),
                    payment_type: PLAN_CREDITS.to_string(),
                    session_id: None,
                    promotion_code: None,
                },
            )
            .await
            .unwrap();
        pix.set_status(&charge.payment_id, GatewayStatus::Approved);
        payments
            .poll_status(
                buyer_id,
                StatusQuery {
                    payment_id: Some(charge.payment_id.clone()),
                    session_id: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(user_credits(&pool, buyer_id).await, 1000);

        let result = marketplace.purchase_access(buyer_id, post_id).await.unwrap();
        assert_eq!(result.user_credits, 900);
        assert_eq!(result.creator_credits, 90);
        assert_eq!(result.commission, 10);

        assert_eq!(user_credits(&pool, buyer_id).await, 900);
        assert_eq!(user_credits(&pool, creator_id).await, 90);
        assert_eq!(user_credits(&pool, platform_id).await, 10);

        // Buyer: top-up row plus debit row; creator and platform one each.
        assert_eq!(ledger_count(&pool, buyer_id).await, 2);
        assert_eq!(ledger_count(&pool, creator_id).await, 1);
        assert_eq!(ledger_count(&pool, platform_id).await, 1);
        let accesses: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM paid_post_accesses WHERE user_id = ?")
                .bind(buyer_id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(accesses, 1);
    }
}
