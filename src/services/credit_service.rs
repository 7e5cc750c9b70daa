use chrono::Utc;

use crate::database::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{
    AdjustCreditsRequest, AdjustCreditsResponse, AdjustOperation, BalanceResponse,
    CreditTransaction, CreditTransactionResponse, PaginatedResponse, PaginationParams,
    TransactionType,
};

#[derive(Clone)]
pub struct CreditService {
    pool: DbPool,
}

impl CreditService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn get_balance(&self, user_id: i64) -> AppResult<BalanceResponse> {
        let credits: i64 = sqlx::query_scalar("SELECT credits FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        Ok(BalanceResponse { user_id, credits })
    }

    pub async fn get_history(
        &self,
        user_id: i64,
        params: &PaginationParams,
    ) -> AppResult<PaginatedResponse<CreditTransactionResponse>> {
        let offset = params.get_offset();
        let limit = params.get_limit();

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM credit_transactions WHERE user_id = ?")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        let rows = sqlx::query_as::<_, CreditTransaction>(
            r#"
            SELECT * FROM credit_transactions
            WHERE user_id = ?
            ORDER BY id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let items: Vec<CreditTransactionResponse> = rows
            .into_iter()
            .map(CreditTransactionResponse::from)
            .collect();

        Ok(PaginatedResponse::new(
            items,
            params.get_page(),
            params.get_limit(),
            total,
        ))
    }

    /// Admin balance adjustment. The delta and the ledger row commit
    /// together; for `set` the row carries the delta, not the target.
    pub async fn adjust_credits(
        &self,
        admin_id: i64,
        request: AdjustCreditsRequest,
    ) -> AppResult<AdjustCreditsResponse> {
        let is_admin: Option<bool> = sqlx::query_scalar("SELECT is_admin FROM users WHERE id = ?")
            .bind(admin_id)
            .fetch_optional(&self.pool)
            .await?;
        if !is_admin.ok_or_else(|| AppError::NotFound("User not found".to_string()))? {
            return Err(AppError::PermissionDenied);
        }
        if request.amount < 0 {
            return Err(AppError::ValidationError(
                "amount must not be negative".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let current: i64 = sqlx::query_scalar("SELECT credits FROM users WHERE id = ?")
            .bind(request.user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let (delta, transaction_type) = match request.operation {
            AdjustOperation::Add => (request.amount, TransactionType::AdminAdd),
            AdjustOperation::Subtract => (-request.amount, TransactionType::AdminSubtract),
            AdjustOperation::Set => (request.amount - current, TransactionType::AdminSet),
        };
        let new_balance = current + delta;
        if new_balance < 0 {
            return Err(AppError::ValidationError(format!(
                "Adjustment would leave a negative balance ({new_balance})"
            )));
        }

        log::info!(
            "Admin {admin_id} adjusting credits for user {}: {current} -> {new_balance}",
            request.user_id
        );

        sqlx::query("UPDATE users SET credits = ? WHERE id = ?")
            .bind(new_balance)
            .bind(request.user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            r#"
            INSERT INTO credit_transactions
                (user_id, transaction_type, amount, description, balance, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(request.user_id)
        .bind(transaction_type)
        .bind(delta)
        .bind(
            request
                .description
                .unwrap_or_else(|| format!("Admin adjustment by {admin_id}")),
        )
        .bind(new_balance)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(AdjustCreditsResponse {
            user_id: request.user_id,
            credits: new_balance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{insert_user, ledger_sum, test_pool, user_credits};

    async fn setup() -> (DbPool, CreditService, i64, i64) {
        let pool = test_pool().await;
        let admin_id = insert_user(&pool, "admin", 0).await;
        sqlx::query("UPDATE users SET is_admin = 1 WHERE id = ?")
            .bind(admin_id)
            .execute(&pool)
            .await
            .unwrap();
        let user_id = insert_user(&pool, "alice", 0).await;
        let service = CreditService::new(pool.clone());
        (pool, service, admin_id, user_id)
    }

    #[tokio::test]
    async fn adjustments_keep_the_ledger_conserved() {
        let (pool, service, admin_id, user_id) = setup().await;

        service
            .adjust_credits(
                admin_id,
                AdjustCreditsRequest {
                    user_id,
                    operation: AdjustOperation::Add,
                    amount: 500,
                    description: None,
                },
            )
            .await
            .unwrap();
        service
            .adjust_credits(
                admin_id,
                AdjustCreditsRequest {
                    user_id,
                    operation: AdjustOperation::Subtract,
                    amount: 120,
                    description: None,
                },
            )
            .await
            .unwrap();
        let result = service
            .adjust_credits(
                admin_id,
                AdjustCreditsRequest {
                    user_id,
                    operation: AdjustOperation::Set,
                    amount: 1000,
                    description: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(result.credits, 1000);
        assert_eq!(user_credits(&pool, user_id).await, 1000);
        assert_eq!(ledger_sum(&pool, user_id).await, 1000);
    }

    #[tokio::test]
    async fn non_admin_cannot_adjust() {
        let (_pool, service, _admin_id, user_id) = setup().await;
        let result = service
            .adjust_credits(
                user_id,
                AdjustCreditsRequest {
                    user_id,
                    operation: AdjustOperation::Add,
                    amount: 500,
                    description: None,
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::PermissionDenied)));
    }

    #[tokio::test]
    async fn subtract_cannot_go_negative() {
        let (pool, service, admin_id, user_id) = setup().await;
        let result = service
            .adjust_credits(
                admin_id,
                AdjustCreditsRequest {
                    user_id,
                    operation: AdjustOperation::Subtract,
                    amount: 10,
                    description: None,
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
        assert_eq!(user_credits(&pool, user_id).await, 0);
    }

    #[tokio::test]
    async fn history_is_paginated_newest_first() {
        let (_pool, service, admin_id, user_id) = setup().await;
        for _ in 0..5 {
            service
                .adjust_credits(
                    admin_id,
                    AdjustCreditsRequest {
                        user_id,
                        operation: AdjustOperation::Add,
                        amount: 10,
                        description: None,
                    },
                )
                .await
                .unwrap();
        }

        let page = service
            .get_history(
                user_id,
                &PaginationParams {
                    page: Some(1),
                    per_page: Some(2),
                },
            )
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.data[0].balance, 50);
    }
}
