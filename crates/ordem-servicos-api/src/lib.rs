//! Ordem Serviços HTTP API: configuration, error mapping, shared state and
//! the route tree served by the `ordem-servicos-api` binary.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
