//! Route modules.

pub mod health;
pub mod service_orders;
