//! Shared test fakes and utilities for the Ordem Serviços backend.

mod clock;
mod repository;

pub use clock::{FixedClock, SteppingClock};
pub use repository::{FailingServiceOrderRepository, InMemoryServiceOrderRepository};
