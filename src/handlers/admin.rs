use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::handlers::get_user_id_from_request;
use crate::models::*;
use crate::services::CreditService;

#[utoipa::path(
    post,
    path = "/admin/credits/adjust",
    tag = "admin",
    request_body = AdjustCreditsRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Balance adjusted", body = AdjustCreditsResponse),
        (status = 400, description = "Adjustment would go negative"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Target user not found")
    )
)]
pub async fn adjust_credits(
    credit_service: web::Data<CreditService>,
    req: HttpRequest,
    request: web::Json<AdjustCreditsRequest>,
) -> Result<HttpResponse> {
    let admin_id = get_user_id_from_request(&req).unwrap_or(0);

    match credit_service
        .adjust_credits(admin_id, request.into_inner())
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn admin_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/admin").route("/credits/adjust", web::post().to(adjust_credits)));
}
