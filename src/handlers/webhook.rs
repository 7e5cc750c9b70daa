use actix_web::{HttpResponse, ResponseError, Result, web};
use log::info;
use serde_json::json;

use crate::models::PixWebhookNotification;
use crate::services::PaymentService;

/// Pix gateway notification endpoint. The body is only a trigger; the
/// service re-fetches the status before applying any effect, so a forged
/// notification cannot move a payment forward.
pub async fn pix_webhook(
    payment_service: web::Data<PaymentService>,
    notification: web::Json<PixWebhookNotification>,
) -> Result<HttpResponse> {
    let notification = notification.into_inner();
    info!(
        "Received pix webhook notification: type={}",
        notification.notification_type
    );

    match payment_service.handle_pix_webhook(notification).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({ "received": true }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn webhook_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/webhook/pix", web::post().to(pix_webhook));
}
