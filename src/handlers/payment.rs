use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::handlers::get_user_id_from_request;
use crate::models::*;
use crate::services::PaymentService;

#[utoipa::path(
    post,
    path = "/payments/pix",
    tag = "payments",
    request_body = CreateChargeRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Pix charge created", body = CreateChargeResponse),
        (status = 400, description = "Invalid amount or payer email"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Session already has a payment"),
        (status = 502, description = "Gateway rejected the charge")
    )
)]
pub async fn create_pix_charge(
    payment_service: web::Data<PaymentService>,
    req: HttpRequest,
    request: web::Json<CreateChargeRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match payment_service
        .create_charge(user_id, Gateway::Pix, request.into_inner())
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/payments/card",
    tag = "payments",
    request_body = CreateChargeRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Card checkout session created", body = CreateChargeResponse),
        (status = 400, description = "Invalid amount or payer email"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Session already has a payment"),
        (status = 502, description = "Gateway rejected the charge")
    )
)]
pub async fn create_card_checkout(
    payment_service: web::Data<PaymentService>,
    req: HttpRequest,
    request: web::Json<CreateChargeRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match payment_service
        .create_charge(user_id, Gateway::Card, request.into_inner())
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/payments/status",
    tag = "payments",
    params(
        ("payment_id" = Option<String>, Query, description = "Gateway payment id"),
        ("session_id" = Option<String>, Query, description = "Payment session id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Reconciled payment status", body = PaymentStatusResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Payment belongs to another user"),
        (status = 404, description = "No payment for the given identifier")
    )
)]
pub async fn get_status(
    payment_service: web::Data<PaymentService>,
    req: HttpRequest,
    query: web::Query<StatusQuery>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match payment_service
        .poll_status(user_id, query.into_inner())
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn payment_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/payments")
            .route("/pix", web::post().to(create_pix_charge))
            .route("/card", web::post().to(create_card_checkout))
            .route("/status", web::get().to(get_status)),
    );
}
