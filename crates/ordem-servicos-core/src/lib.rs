//! Ordem Serviços Core: shared domain abstractions.
//!
//! This crate defines the small set of traits and types that the service
//! order context and its adapters depend on. It contains no infrastructure
//! code.

pub mod clock;
pub mod error;
