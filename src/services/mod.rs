pub mod credit_service;
pub mod marketplace_service;
pub mod payment_service;
pub mod session_service;
pub mod vip_service;

pub use credit_service::*;
pub use marketplace_service::*;
pub use payment_service::*;
pub use session_service::*;
pub use vip_service::*;
