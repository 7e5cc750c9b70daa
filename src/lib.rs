pub mod config;
pub mod database;
pub mod error;
pub mod gateways;
pub mod handlers;
pub mod middlewares;
pub mod models;
pub mod services;
pub mod swagger;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_util;

pub use config::Config;
pub use error::{AppError, AppResult};
