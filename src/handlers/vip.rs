use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::handlers::get_user_id_from_request;
use crate::models::*;
use crate::services::VipService;

#[utoipa::path(
    post,
    path = "/vip/plans",
    tag = "vip",
    request_body = CreateVipPlanRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Plan created", body = VipPlan),
        (status = 400, description = "Invalid name, price or duration"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Creator is not premium")
    )
)]
pub async fn create_plan(
    vip_service: web::Data<VipService>,
    req: HttpRequest,
    request: web::Json<CreateVipPlanRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match vip_service.create_plan(user_id, request.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/vip/plans/{creator_id}",
    tag = "vip",
    params(
        ("creator_id" = i64, Path, description = "Creator whose plans to list")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Active plans offered by the creator"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_plans(
    vip_service: web::Data<VipService>,
    creator_id: web::Path<i64>,
) -> Result<HttpResponse> {
    match vip_service.list_plans(creator_id.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/vip/subscribe",
    tag = "vip",
    request_body = SubscribeVipRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Subscribed", body = SubscribeVipResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Plan not found or inactive"),
        (status = 409, description = "Insufficient credits")
    )
)]
pub async fn subscribe(
    vip_service: web::Data<VipService>,
    req: HttpRequest,
    request: web::Json<SubscribeVipRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match vip_service.subscribe(user_id, request.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/vip/entitlement",
    tag = "vip",
    params(
        ("plan_id" = i64, Query, description = "Plan id to check")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Entitlement state", body = EntitlementResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn check_entitlement(
    vip_service: web::Data<VipService>,
    req: HttpRequest,
    query: web::Query<EntitlementQuery>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match vip_service.check_entitlement(user_id, query.plan_id).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn vip_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/vip")
            .route("/plans", web::post().to(create_plan))
            .route("/plans/{creator_id}", web::get().to(list_plans))
            .route("/subscribe", web::post().to(subscribe))
            .route("/entitlement", web::get().to(check_entitlement)),
    );
}
