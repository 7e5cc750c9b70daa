pub mod connection;

pub use connection::{DbPool, MIGRATOR, create_pool, run_migrations};
