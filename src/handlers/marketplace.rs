use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::handlers::get_user_id_from_request;
use crate::models::*;
use crate::services::MarketplaceService;

#[utoipa::path(
    post,
    path = "/paid-posts/purchase",
    tag = "marketplace",
    request_body = PurchaseAccessRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Access purchased", body = PurchaseAccessResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Post is not a paid post"),
        (status = 409, description = "Insufficient credits or user already has access")
    )
)]
pub async fn purchase_access(
    marketplace_service: web::Data<MarketplaceService>,
    req: HttpRequest,
    request: web::Json<PurchaseAccessRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match marketplace_service
        .purchase_access(user_id, request.post_id)
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
    path = "/paid-posts/access",
    tag = "marketplace",
    params(
        ("post_id" = i64, Query, description = "Post id to check")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Access state for the post", body = CheckAccessResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn check_access(
    marketplace_service: web::Data<MarketplaceService>,
    req: HttpRequest,
    query: web::Query<CheckAccessQuery>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match marketplace_service.check_access(user_id, query.post_id).await {
        Ok((has_access, paid_post)) => {
            let response = CheckAccessResponse {
                has_access,
                paid_post: paid_post.map(|p| PaidPostInfo {
                    id: p.id,
                    price_credits: p.price_credits,
                    description: p.description,
                }),
            };
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "data": response
            })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

pub fn marketplace_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/paid-posts")
            .route("/purchase", web::post().to(purchase_access))
            .route("/access", web::get().to(check_access)),
    );
}
