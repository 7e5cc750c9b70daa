use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.as_mut().unwrap();
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        )
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::session::create_session,
        handlers::payment::create_pix_charge,
        handlers::payment::create_card_checkout,
        handlers::payment::get_status,
        handlers::marketplace::purchase_access,
        handlers::marketplace::check_access,
        handlers::vip::create_plan,
        handlers::vip::list_plans,
        handlers::vip::subscribe,
        handlers::vip::check_entitlement,
        handlers::credits::get_balance,
        handlers::credits::get_history,
        handlers::admin::adjust_credits,
    ),
    components(
        schemas(
            ApiError,
            BalanceResponse,
            Gateway,
            PaymentStatus,
            CreateSessionRequest,
            CreateSessionResponse,
            CreateChargeRequest,
            CreateChargeResponse,
            StatusQuery,
            PaymentStatusResponse,
            PixWebhookNotification,
            PixWebhookData,
            TransactionType,
            CreditTransactionResponse,
            AdjustOperation,
            AdjustCreditsRequest,
            AdjustCreditsResponse,
            PaginationParams,
            PaidPost,
            PaidPostAccess,
            PurchaseAccessRequest,
            PurchaseAccessResponse,
            CheckAccessQuery,
            PaidPostInfo,
            CheckAccessResponse,
            VipPlan,
            VipSubscription,
            CreateVipPlanRequest,
            SubscribeVipRequest,
            SubscribeVipResponse,
            EntitlementQuery,
            EntitlementResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "payments", description = "Payment sessions, charges and reconciliation"),
        (name = "marketplace", description = "Paid post access purchases"),
        (name = "vip", description = "Creator VIP plans and subscriptions"),
        (name = "credits", description = "Credit balance and ledger history"),
        (name = "admin", description = "Administrative balance adjustments"),
    ),
    info(
        title = "Vibra Backend API",
        version = "1.0.0",
        description = "Payment reconciliation and credit ledger REST API",
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
