pub mod adapter;
pub mod card;
pub mod pix;

#[cfg(test)]
pub mod mock;

pub use adapter::{ChargeHandle, ChargeRequest, GatewayAdapter, GatewayStatus};
pub use card::CardGateway;
pub use pix::PixGateway;
