use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::handlers::get_user_id_from_request;
use crate::models::*;
use crate::services::CreditService;

#[utoipa::path(
    get,
    path = "/credits/balance",
    tag = "credits",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Current credit balance", body = BalanceResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_balance(
    credit_service: web::Data<CreditService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match credit_service.get_balance(user_id).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/credits/history",
    tag = "credits",
    params(
        ("page" = Option<u32>, Query, description = "Page number"),
        ("per_page" = Option<u32>, Query, description = "Items per page")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Paginated ledger history"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_history(
    credit_service: web::Data<CreditService>,
    req: HttpRequest,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match credit_service.get_history(user_id, &query).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn credits_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/credits")
            .route("/balance", web::get().to(get_balance))
            .route("/history", web::get().to(get_history)),
    );
}
