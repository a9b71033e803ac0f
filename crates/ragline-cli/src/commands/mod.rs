//! Command implementations.

pub mod ask;
pub mod config;
pub mod eval;
pub mod health;

pub use self::ask::execute_ask;
pub use self::config::execute_config;
pub use self::eval::execute_eval;
pub use self::health::execute_health;
