//! Application services for the service order context.

pub mod command_handlers;
pub mod query_handlers;
