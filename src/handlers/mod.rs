pub mod admin;
pub mod credits;
pub mod marketplace;
pub mod payment;
pub mod session;
pub mod vip;
pub mod webhook;

pub use admin::admin_config;
pub use credits::credits_config;
pub use marketplace::marketplace_config;
pub use payment::payment_config;
pub use session::session_config;
pub use vip::vip_config;
pub use webhook::webhook_config;

use actix_web::{HttpMessage, HttpRequest};

/// User id placed in the request extensions by the auth middleware.
pub(crate) fn get_user_id_from_request(req: &HttpRequest) -> Option<i64> {
    req.extensions().get::<i64>().copied()
}
