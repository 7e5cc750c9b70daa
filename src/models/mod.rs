pub mod common;
pub mod credit_transaction;
pub mod paid_post;
pub mod pagination;
pub mod payment;
pub mod payment_session;
pub mod user;
pub mod vip;

pub use common::*;
pub use credit_transaction::*;
pub use paid_post::*;
pub use pagination::*;
pub use payment::*;
pub use payment_session::*;
pub use user::*;
pub use vip::*;
