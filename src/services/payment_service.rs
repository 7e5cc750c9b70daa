use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::database::DbPool;
use crate::error::{AppError, AppResult};
use crate::gateways::{ChargeRequest, GatewayAdapter};
use crate::models::{
    CreateChargeRequest, CreateChargeResponse, Gateway, PLAN_CREDITS, Payment, PaymentSession,
    PaymentStatus, PaymentStatusResponse, PixWebhookNotification, SessionStatus, StatusQuery,
    TransactionType, credits_for_amount, plan_duration_days,
};

/// Payment reconciliation engine.
///
/// Three entry points (create, poll, webhook) feed one guarded state
/// machine: ledger effects fire only on the transition into `approved`,
/// compared against the locally stored status, inside a single transaction.
#[derive(Clone)]
pub struct PaymentService {
    pool: DbPool,
    pix: Arc<dyn GatewayAdapter>,
    card: Arc<dyn GatewayAdapter>,
}

impl PaymentService {
    pub fn new(
        pool: DbPool,
        pix: Arc<dyn GatewayAdapter>,
        card: Arc<dyn GatewayAdapter>,
    ) -> Self {
        Self { pool, pix, card }
    }

    fn adapter(&self, gateway: Gateway) -> &dyn GatewayAdapter {
        match gateway {
            Gateway::Pix => self.pix.as_ref(),
            Gateway::Card => self.card.as_ref(),
        }
    }

    /// Creates a remote charge and persists it. The gateway call happens
    /// first; a remote failure leaves no local row behind.
    pub async fn create_charge(
        &self,
        user_id: i64,
        gateway: Gateway,
        request: CreateChargeRequest,
    ) -> AppResult<CreateChargeResponse> {
        if !(request.amount > 0.0 && request.amount <= 10000.0) {
            return Err(AppError::ValidationError(
                "Amount must be greater than 0 and at most 10000".to_string(),
            ));
        }
        if request.payer_email.trim().is_empty() {
            return Err(AppError::ValidationError(
                "payer_email is required".to_string(),
            ));
        }

        let now = Utc::now();

        let (plan, amount, session) = if request.payment_type == PLAN_CREDITS {
            (PLAN_CREDITS.to_string(), request.amount, None)
        } else {
            let session_id = request.session_id.as_deref().ok_or_else(|| {
                AppError::ValidationError(
                    "session_id is required unless payment_type is credits".to_string(),
                )
            })?;
            let session = sqlx::query_as::<_, PaymentSession>(
                "SELECT * FROM payment_sessions WHERE id = ?",
            )
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?
            .filter(|s| !s.is_expired(now))
            .ok_or_else(|| {
                AppError::NotFound("Payment session not found or expired".to_string())
            })?;

            if session.user_id != user_id {
                return Err(AppError::Forbidden);
            }
            // Replay guard: once a charge exists for a session it is final.
            if session.payment_id.is_some() {
                return Err(AppError::Conflict(
                    "A charge was already created for this session".to_string(),
                ));
            }

            (session.plan.clone(), session.amount, Some(session))
        };

        let external_reference = match gateway {
            Gateway::Pix => Some(match &session {
                Some(s) => s.id.clone(),
                None => format!("credits_{}_{}", user_id, now.timestamp()),
            }),
            // The card gateway correlates through its own checkout-session
            // id, stored as preference_id below.
            Gateway::Card => session.as_ref().map(|s| s.id.clone()),
        };
        let idempotency_key = format!(
            "{}_{}_{}",
            user_id,
            session.as_ref().map(|s| s.id.as_str()).unwrap_or(PLAN_CREDITS),
            now.timestamp()
        );
        let description = if plan == PLAN_CREDITS {
            format!("Credit purchase of {amount:.2}")
        } else {
            format!("Subscription plan {plan}")
        };

        log::info!(
            "Creating {gateway} charge for user {user_id}: plan={plan} amount={amount} session={:?}",
            session.as_ref().map(|s| &s.id)
        );

        let handle = self
            .adapter(gateway)
            .create_charge(&ChargeRequest {
                user_id,
                amount,
                payer_email: request.payer_email.clone(),
                description,
                external_reference: external_reference.clone(),
                idempotency_key,
            })
            .await?;

        let status = handle.status.as_payment_status();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO payments (
                user_id, gateway, plan, amount, payment_id, status, user_email,
                promotion_code, session_id, external_reference, transaction_date, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(gateway)
        .bind(&plan)
        .bind(amount)
        .bind(&handle.payment_id)
        .bind(status)
        .bind(&request.payer_email)
        .bind(&request.promotion_code)
        .bind(session.as_ref().map(|s| s.id.as_str()))
        .bind(&external_reference)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Conflict(
                "A charge was already created for this session".to_string(),
            ),
            _ => AppError::DatabaseError(e),
        })?;

        if let Some(s) = &session {
            // The precheck above runs outside this transaction; a racing
            // create for the same session loses here and rolls back its
            // payment row, keeping payment_id write-once.
            let updated = sqlx::query(
                "UPDATE payment_sessions SET payment_id = ?, preference_id = ? \
                 WHERE id = ? AND payment_id IS NULL",
            )
            .bind(&handle.payment_id)
            .bind(&handle.payment_id)
            .bind(&s.id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
            if updated == 0 {
                return Err(AppError::Conflict(
                    "A charge was already created for this session".to_string(),
                ));
            }
        }

        // Pending-payment UI state, cleared again when the payment resolves.
        sqlx::query(
            "UPDATE users SET payment_qr_code_url = ?, payment_id = ?, payment_type = ? WHERE id = ?",
        )
        .bind(&handle.qr_code_url)
        .bind(&handle.payment_id)
        .bind(gateway.to_string())
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(CreateChargeResponse {
            payment_id: handle.payment_id.clone(),
            status,
            qr_code: handle.qr_code,
            qr_code_url: handle.qr_code_url,
            checkout_session_id: match gateway {
                Gateway::Card => Some(handle.payment_id),
                Gateway::Pix => None,
            },
            checkout_url: handle.checkout_url,
        })
    }

    /// Client-initiated poll. Verifies ownership, re-fetches the live
    /// gateway status and reconciles, always returning the local view.
    pub async fn poll_status(
        &self,
        user_id: i64,
        query: StatusQuery,
    ) -> AppResult<PaymentStatusResponse> {
        let payment = match (&query.payment_id, &query.session_id) {
            (Some(payment_id), _) => self.find_by_payment_id(payment_id).await?,
            (None, Some(session_id)) => self.find_by_session(session_id).await?,
            (None, None) => {
                return Err(AppError::ValidationError(
                    "payment_id or session_id is required".to_string(),
                ));
            }
        }
        .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))?;

        if payment.user_id != user_id {
            return Err(AppError::Forbidden);
        }

        let payment = self.reconcile(payment).await?;
        Ok((&payment).into())
    }

    /// Webhook entry point. The notification body is only a trigger; the
    /// status is re-fetched from the gateway before any effect applies.
    pub async fn handle_pix_webhook(
        &self,
        notification: PixWebhookNotification,
    ) -> AppResult<()> {
        if notification.notification_type != "payment" {
            log::info!(
                "Ignoring webhook notification of type {}",
                notification.notification_type
            );
            return Ok(());
        }
        let Some(data) = notification.data else {
            log::warn!("Payment webhook without data payload");
            return Ok(());
        };

        let Some(payment) = self.find_by_payment_id(&data.id).await? else {
            log::warn!("Webhook for unknown payment id {}", data.id);
            return Ok(());
        };

        self.reconcile(payment).await?;
        Ok(())
    }

    /// Fetches the live gateway status and applies the transition if it
    /// differs from the stored one. A failed fetch falls back to the stored
    /// status; effects are never applied on a failed fetch.
    async fn reconcile(&self, payment: Payment) -> AppResult<Payment> {
        let observed = match self
            .adapter(payment.gateway)
            .fetch_status(&payment.payment_id)
            .await
        {
            Ok(status) => status.as_payment_status(),
            Err(e) => {
                log::warn!(
                    "Gateway status fetch failed for payment {}: {e}; falling back to stored status {}",
                    payment.payment_id,
                    payment.status
                );
                return Ok(payment);
            }
        };

        if observed == payment.status {
            return Ok(payment);
        }

        self.apply_transition(&payment.payment_id, observed).await?;

        let refreshed = self
            .find_by_payment_id(&payment.payment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))?;
        Ok(refreshed)
    }

    /// The idempotence boundary. Re-reads the stored status inside the
    /// transaction; if it already equals the observed one a racing caller
    /// has applied the effects and this is a no-op. Status flip, ledger
    /// effect and session/affiliate propagation commit together.
    async fn apply_transition(
        &self,
        payment_id: &str,
        observed: PaymentStatus,
    ) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let payment =
            sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE payment_id = ?")
                .bind(payment_id)
                .fetch_one(&mut *tx)
                .await?;

        if payment.status == observed {
            return Ok(());
        }

        log::info!(
            "Reconciling payment {} for user {}: {} -> {} (plan={}, amount={})",
            payment.payment_id,
            payment.user_id,
            payment.status,
            observed,
            payment.plan,
            payment.amount
        );

        let now = Utc::now();

        sqlx::query("UPDATE payments SET status = ?, transaction_date = ? WHERE id = ?")
            .bind(observed)
            .bind(now)
            .bind(payment.id)
            .execute(&mut *tx)
            .await?;

        if observed == PaymentStatus::Approved {
            if payment.plan == PLAN_CREDITS {
                let credits_to_add = credits_for_amount(payment.amount);
                sqlx::query("UPDATE users SET credits = credits + ? WHERE id = ?")
                    .bind(credits_to_add)
                    .bind(payment.user_id)
                    .execute(&mut *tx)
                    .await?;
                let balance: i64 =
                    sqlx::query_scalar("SELECT credits FROM users WHERE id = ?")
                        .bind(payment.user_id)
                        .fetch_one(&mut *tx)
                        .await?;
                sqlx::query(
                    r#"
                    INSERT INTO credit_transactions
                        (user_id, transaction_type, amount, description, balance, created_at)
                    VALUES (?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(payment.user_id)
                .bind(TransactionType::Purchase)
                .bind(credits_to_add)
                .bind(format!("Credit purchase via {}", payment.gateway))
                .bind(balance)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            } else {
                let expire_date = now + Duration::days(plan_duration_days(&payment.plan));
                sqlx::query("UPDATE users SET premium = 1, expire_date = ? WHERE id = ?")
                    .bind(expire_date)
                    .bind(payment.user_id)
                    .execute(&mut *tx)
                    .await?;
            }

            sqlx::query(
                "UPDATE users SET payment_qr_code_url = NULL, payment_id = NULL, payment_type = NULL WHERE id = ?",
            )
            .bind(payment.user_id)
            .execute(&mut *tx)
            .await?;
        }

        // Keep denormalized views consistent with the payment outcome.
        let session_status = match observed {
            PaymentStatus::Approved => SessionStatus::Approved,
            PaymentStatus::Pending => SessionStatus::Pending,
            PaymentStatus::Rejected | PaymentStatus::Error => SessionStatus::Error,
        };
        sqlx::query("UPDATE payment_sessions SET status = ? WHERE id = ? OR preference_id = ?")
            .bind(session_status)
            .bind(&payment.session_id)
            .bind(&payment.payment_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE affiliates SET status = ? WHERE payment_id = ?")
            .bind(observed.to_string())
            .bind(&payment.payment_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_by_payment_id(&self, payment_id: &str) -> AppResult<Option<Payment>> {
        let payment =
            sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE payment_id = ?")
                .bind(payment_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(payment)
    }

    async fn find_by_session(&self, session_id: &str) -> AppResult<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE session_id = ? ORDER BY id DESC LIMIT 1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(payment)
    }
}
