use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::database::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{
    CreateSessionRequest, CreateSessionResponse, PaymentSession, is_known_plan,
};

/// Sessions expire logically; no background reaper, expiry is enforced at
/// the next read.
pub const SESSION_TTL_MINUTES: i64 = 30;

#[derive(Clone)]
pub struct SessionService {
    pool: DbPool,
}

impl SessionService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create_session(
        &self,
        user_id: i64,
        request: CreateSessionRequest,
    ) -> AppResult<CreateSessionResponse> {
        if !is_known_plan(&request.plan) {
            return Err(AppError::ValidationError(format!(
                "Unknown plan: {}",
                request.plan
            )));
        }
        if !(request.amount > 0.0 && request.amount <= 10000.0) {
            return Err(AppError::ValidationError(
                "Amount must be greater than 0 and at most 10000".to_string(),
            ));
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let expires_at = now + Duration::minutes(SESSION_TTL_MINUTES);

        sqlx::query(
            r#"
            INSERT INTO payment_sessions (id, user_id, plan, amount, status, expires_at, created_at)
            VALUES (?, ?, ?, ?, 'pending', ?, ?)
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(&request.plan)
        .bind(request.amount)
        .bind(expires_at)
        .bind(now)
        .execute(&self.pool)
        .await?;

        log::info!(
            "Created payment session {id} for user {user_id}: plan={} amount={}",
            request.plan,
            request.amount
        );

        Ok(CreateSessionResponse {
            session_id: id,
            expires_at,
        })
    }

    /// Loads a session, treating an expired one as absent.
    pub async fn get_active_session(&self, session_id: &str) -> AppResult<Option<PaymentSession>> {
        let session = sqlx::query_as::<_, PaymentSession>(
            "SELECT * FROM payment_sessions WHERE id = ?",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session.filter(|s| !s.is_expired(Utc::now())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreateSessionRequest;
    use crate::test_util::{insert_user, test_pool};

    #[tokio::test]
    async fn creates_session_with_ttl() {
        let pool = test_pool().await;
        let user_id = insert_user(&pool, "alice", 0).await;
        let service = SessionService::new(pool);

        let response = service
            .create_session(
                user_id,
                CreateSessionRequest {
                    plan: "quarterly".to_string(),
                    amount: 59.90,
                },
            )
            .await
            .unwrap();

        let session = service
            .get_active_session(&response.session_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(session.user_id, user_id);
        assert_eq!(session.plan, "quarterly");
        assert!(session.payment_id.is_none());
        let ttl = session.expires_at - session.created_at;
        assert_eq!(ttl.num_minutes(), SESSION_TTL_MINUTES);
    }

    #[tokio::test]
    async fn rejects_unknown_plan_and_bad_amount() {
        let pool = test_pool().await;
        let user_id = insert_user(&pool, "alice", 0).await;
        let service = SessionService::new(pool);

        let bad_plan = service
            .create_session(
                user_id,
                CreateSessionRequest {
                    plan: "lifetime".to_string(),
                    amount: 10.0,
                },
            )
            .await;
        assert!(matches!(bad_plan, Err(AppError::ValidationError(_))));

        let bad_amount = service
            .create_session(
                user_id,
                CreateSessionRequest {
                    plan: "monthly".to_string(),
                    amount: 10001.0,
                },
            )
            .await;
        assert!(matches!(bad_amount, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn expired_session_reads_as_absent() {
        let pool = test_pool().await;
        let user_id = insert_user(&pool, "alice", 0).await;
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO payment_sessions (id, user_id, plan, amount, status, expires_at, created_at)
            VALUES ('stale', ?, 'monthly', 19.90, 'pending', ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(now - Duration::minutes(5))
        .bind(now - Duration::minutes(35))
        .execute(&pool)
        .await
        .unwrap();

        let service = SessionService::new(pool);
        assert!(service.get_active_session("stale").await.unwrap().is_none());
    }
}
