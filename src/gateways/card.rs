use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::config::CardGatewayConfig;
use crate::error::{AppError, AppResult};
use crate::gateways::adapter::{
    ChargeHandle, ChargeRequest, GATEWAY_TIMEOUT, GatewayAdapter, GatewayStatus,
};
use crate::models::Gateway;

#[derive(Debug, Deserialize)]
struct CheckoutSession {
    id: String,
    payment_status: String,
    status: Option<String>,
    url: Option<String>,
}

fn map_session(session: &CheckoutSession) -> GatewayStatus {
    if session.status.as_deref() == Some("expired") {
        return GatewayStatus::Rejected;
    }
    match session.payment_status.as_str() {
        "paid" | "no_payment_required" => GatewayStatus::Approved,
        "unpaid" => GatewayStatus::Pending,
        _ => GatewayStatus::Error,
    }
}

/// Card-style gateway (Stripe-checkout-shaped API). The checkout session id
/// doubles as the charge handle and is stored as the session's
/// `preference_id` for correlation.
#[derive(Clone)]
pub struct CardGateway {
    client: Client,
    config: CardGatewayConfig,
}

impl CardGateway {
    pub fn new(config: CardGatewayConfig) -> Self {
        let client = Client::builder()
            .timeout(GATEWAY_TIMEOUT)
            .build()
            .expect("failed to construct HTTP client");
        Self { client, config }
    }
}

#[async_trait]
impl GatewayAdapter for CardGateway {
    fn gateway(&self) -> Gateway {
        Gateway::Card
    }

    async fn create_charge(&self, request: &ChargeRequest) -> AppResult<ChargeHandle> {
        let url = format!("{}/v1/checkout/sessions", self.config.base_url);
        let unit_amount = (request.amount * 100.0).round() as i64;

        let mut params = vec![
            ("mode".to_string(), "payment".to_string()),
            ("success_url".to_string(), self.config.success_url.clone()),
            ("cancel_url".to_string(), self.config.cancel_url.clone()),
            (
                "customer_email".to_string(),
                request.payer_email.clone(),
            ),
            (
                "line_items[0][price_data][currency]".to_string(),
                "brl".to_string(),
            ),
            (
                "line_items[0][price_data][unit_amount]".to_string(),
                unit_amount.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]".to_string(),
                request.description.clone(),
            ),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            (
                "metadata[user_id]".to_string(),
                request.user_id.to_string(),
            ),
        ];
        if let Some(reference) = &request.external_reference {
            params.push(("client_reference_id".to_string(), reference.clone()));
        }

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.secret_key)
            .header("Idempotency-Key", &request.idempotency_key)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "card checkout creation failed: {error_text}"
            )));
        }

        let session: CheckoutSession = response.json().await?;
        let status = map_session(&session);

        Ok(ChargeHandle {
            payment_id: session.id,
            status,
            qr_code: None,
            qr_code_url: None,
            checkout_url: session.url,
        })
    }

    async fn fetch_status(&self, payment_id: &str) -> AppResult<GatewayStatus> {
        let url = format!(
            "{}/v1/checkout/sessions/{}",
            self.config.base_url, payment_id
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.secret_key)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "card status fetch failed for {payment_id}: {error_text}"
            )));
        }

        let session: CheckoutSession = response.json().await?;
        Ok(map_session(&session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(payment_status: &str, status: Option<&str>) -> CheckoutSession {
        CheckoutSession {
            id: "cs_test_1".to_string(),
            payment_status: payment_status.to_string(),
            status: status.map(str::to_string),
            url: None,
        }
    }

    #[test]
    fn maps_checkout_session_states() {
        assert_eq!(map_session(&session("paid", Some("complete"))), GatewayStatus::Approved);
        assert_eq!(map_session(&session("unpaid", Some("open"))), GatewayStatus::Pending);
        assert_eq!(map_session(&session("unpaid", Some("expired"))), GatewayStatus::Rejected);
        assert_eq!(map_session(&session("weird", None)), GatewayStatus::Error);
    }
}
