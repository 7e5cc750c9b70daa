use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::handlers::get_user_id_from_request;
use crate::models::*;
use crate::services::SessionService;

#[utoipa::path(
    post,
    path = "/payments/sessions",
    tag = "payments",
    request_body = CreateSessionRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Payment session created", body = CreateSessionResponse),
        (status = 400, description = "Unknown plan or invalid amount"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn create_session(
    session_service: web::Data<SessionService>,
    req: HttpRequest,
    request: web::Json<CreateSessionRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match session_service
        .create_session(user_id, request.into_inner())
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn session_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/payments/sessions").route("", web::post().to(create_session)));
}
