use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::PixGatewayConfig;
use crate::error::{AppError, AppResult};
use crate::gateways::adapter::{
    ChargeHandle, ChargeRequest, GATEWAY_TIMEOUT, GatewayAdapter, GatewayStatus,
};
use crate::models::Gateway;

#[derive(Debug, Serialize)]
struct PixChargeBody<'a> {
    transaction_amount: f64,
    description: &'a str,
    payment_method_id: &'a str,
    payer: PixPayer<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    external_reference: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct PixPayer<'a> {
    email: &'a str,
}

#[derive(Debug, Deserialize)]
struct PixPayment {
    id: i64,
    status: String,
    point_of_interaction: Option<PixPointOfInteraction>,
}

#[derive(Debug, Deserialize)]
struct PixPointOfInteraction {
    transaction_data: Option<PixTransactionData>,
}

#[derive(Debug, Deserialize)]
struct PixTransactionData {
    qr_code: Option<String>,
    ticket_url: Option<String>,
}

fn map_status(status: &str) -> GatewayStatus {
    match status {
        "approved" => GatewayStatus::Approved,
        "pending" | "in_process" | "authorized" => GatewayStatus::Pending,
        "rejected" | "cancelled" | "refunded" | "charged_back" => GatewayStatus::Rejected,
        _ => GatewayStatus::Error,
    }
}

/// PIX-style gateway (Mercado-Pago-shaped API). Correlates through
/// `external_reference`; charges come back with a QR payload.
#[derive(Clone)]
pub struct PixGateway {
    client: Client,
    config: PixGatewayConfig,
}

impl PixGateway {
    pub fn new(config: PixGatewayConfig) -> Self {
        let client = Client::builder()
            .timeout(GATEWAY_TIMEOUT)
            .build()
            .expect("failed to construct HTTP client");
        Self { client, config }
    }
}

#[async_trait]
impl GatewayAdapter for PixGateway {
    fn gateway(&self) -> Gateway {
        Gateway::Pix
    }

    async fn create_charge(&self, request: &ChargeRequest) -> AppResult<ChargeHandle> {
        let url = format!("{}/v1/payments", self.config.base_url);
        let body = PixChargeBody {
            transaction_amount: request.amount,
            description: &request.description,
            payment_method_id: "pix",
            payer: PixPayer {
                email: &request.payer_email,
            },
            external_reference: request.external_reference.as_deref(),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.access_token)
            .header("X-Idempotency-Key", &request.idempotency_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "PIX charge creation failed: {error_text}"
            )));
        }

        let payment: PixPayment = response.json().await?;
        let transaction_data = payment
            .point_of_interaction
            .and_then(|poi| poi.transaction_data);

        Ok(ChargeHandle {
            payment_id: payment.id.to_string(),
            status: map_status(&payment.status),
            qr_code: transaction_data.as_ref().and_then(|t| t.qr_code.clone()),
            qr_code_url: transaction_data.and_then(|t| t.ticket_url),
            checkout_url: None,
        })
    }

    async fn fetch_status(&self, payment_id: &str) -> AppResult<GatewayStatus> {
        let url = format!("{}/v1/payments/{}", self.config.base_url, payment_id);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "PIX status fetch failed for {payment_id}: {error_text}"
            )));
        }

        let payment: PixPayment = response.json().await?;
        Ok(map_status(&payment.status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_gateway_status_vocabulary() {
        assert_eq!(map_status("approved"), GatewayStatus::Approved);
        assert_eq!(map_status("pending"), GatewayStatus::Pending);
        assert_eq!(map_status("in_process"), GatewayStatus::Pending);
        assert_eq!(map_status("rejected"), GatewayStatus::Rejected);
        assert_eq!(map_status("cancelled"), GatewayStatus::Rejected);
        assert_eq!(map_status("something_new"), GatewayStatus::Error);
    }
}
