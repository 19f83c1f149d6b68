//! Persistence port for service orders.

use async_trait::async_trait;
use ordem_servicos_core::error::DomainError;
use uuid::Uuid;

use super::aggregates::ServiceOrder;
use super::events::ServiceOrderEvent;
use super::status::ServiceOrderStatus;

/// Number of service orders in one status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCount {
    pub status: ServiceOrderStatus,
    pub count: i64,
}

/// Repository for service orders and their event history.
///
/// List queries return orders without history; only `get_by_id` attaches
/// it. Dropping a returned future cancels the pending storage operation.
#[async_trait]
pub trait ServiceOrderRepository: Send + Sync {
    /// Persist a new order and every event already in its history, atomically.
    async fn create(&self, order: &ServiceOrder) -> Result<(), DomainError>;

    /// Load an order with its full history, oldest event first.
    ///
    /// Returns `DomainError::NotFound` if no order has the given id.
    async fn get_by_id(&self, id: Uuid) -> Result<ServiceOrder, DomainError>;

    /// Orders of one authority, newest first, paginated.
    async fn get_by_authority(
        &self,
        authority_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ServiceOrder>, DomainError>;

    /// Orders of one authority in one status, by priority then newest first.
    async fn get_by_status(
        &self,
        status: ServiceOrderStatus,
        authority_id: Uuid,
    ) -> Result<Vec<ServiceOrder>, DomainError>;

    /// Orders assigned to one party across authorities, by priority then
    /// newest first.
    async fn get_by_responsible(&self, assignee_id: Uuid) -> Result<Vec<ServiceOrder>, DomainError>;

    /// Orders of one authority with one priority, newest first.
    async fn get_by_priority(
        &self,
        priority: i32,
        authority_id: Uuid,
    ) -> Result<Vec<ServiceOrder>, DomainError>;

    /// Per-status order counts of one authority. Statuses with no orders
    /// are omitted.
    async fn count_by_status(&self, authority_id: Uuid) -> Result<Vec<StatusCount>, DomainError>;

    /// Overwrite the mutable fields of an existing order.
    ///
    /// Never touches creation time, authority or requester, and never
    /// persists events: call `add_event` for events appended since load.
    async fn update(&self, order: &ServiceOrder) -> Result<(), DomainError>;

    /// Delete an order and its history, atomically.
    async fn delete(&self, id: Uuid) -> Result<(), DomainError>;

    /// The history of an order, oldest first.
    async fn get_history(&self, service_order_id: Uuid) -> Result<Vec<ServiceOrderEvent>, DomainError>;

    /// Persist a single history event.
    async fn add_event(&self, event: &ServiceOrderEvent) -> Result<(), DomainError>;
}
