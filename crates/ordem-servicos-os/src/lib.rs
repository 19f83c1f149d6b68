//! Ordem Serviços: service order bounded context.
//!
//! Responsible for the service order aggregate, its append-only event
//! history, the persistence port, and the command and query handlers that
//! orchestrate them.

pub mod application;
pub mod domain;
