//! Ordem Serviços Store: PostgreSQL persistence for service orders.

pub mod pg_service_order_repository;

use sqlx::migrate::Migrator;

/// Schema migrations for the `ordens_servico` and `eventos_os` tables.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");
