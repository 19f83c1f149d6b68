//! Fake `ServiceOrderRepository` implementations.

use std::cmp::Reverse;
use std::sync::Mutex;

use async_trait::async_trait;
use ordem_servicos_core::error::DomainError;
use ordem_servicos_os::domain::aggregates::{ServiceOrder, ServiceOrderParts};
use ordem_servicos_os::domain::events::ServiceOrderEvent;
use ordem_servicos_os::domain::repository::{ServiceOrderRepository, StatusCount};
use ordem_servicos_os::domain::status::ServiceOrderStatus;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Tables {
    orders: Vec<ServiceOrder>,
    events: Vec<ServiceOrderEvent>,
    updates: usize,
    reject_events: bool,
}

/// The persisted fields of `order`, the way a row in the orders table holds
/// them.
fn parts_of(order: &ServiceOrder) -> ServiceOrderParts {
    ServiceOrderParts {
        id: order.id(),
        title: order.title().to_owned(),
        description: order.description().to_owned(),
        status: order.status(),
        priority: order.priority(),
        location: order.location().to_owned(),
        assignee_id: order.assignee_id(),
        authority_id: order.authority_id(),
        requester_id: order.requester_id(),
        created_at: order.created_at(),
        updated_at: order.updated_at(),
        completed_at: order.completed_at(),
        sla: order.sla().cloned(),
        tags: order.tags().to_vec(),
    }
}

fn row_of(order: &ServiceOrder) -> ServiceOrder {
    ServiceOrder::from_parts(parts_of(order), Vec::new())
}

/// Sorts by priority descending, then creation time descending.
fn by_urgency(mut orders: Vec<ServiceOrder>) -> Vec<ServiceOrder> {
    orders.sort_by_key(|o| (Reverse(o.priority()), Reverse(o.created_at())));
    orders
}

/// An in-memory repository with the same observable semantics as the
/// PostgreSQL one: orderings, not-found errors, immutable columns on update
/// and cascading deletes.
#[derive(Debug, Default)]
pub struct InMemoryServiceOrderRepository {
    tables: Mutex<Tables>,
}

impl InMemoryServiceOrderRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of every stored event, in insertion order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn events(&self) -> Vec<ServiceOrderEvent> {
        self.tables.lock().unwrap().events.clone()
    }

    /// Returns how many `update` calls matched an order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn update_count(&self) -> usize {
        self.tables.lock().unwrap().updates
    }

    /// Makes every later `add_event` call fail with an infrastructure error
    /// while other operations keep working.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn reject_event_inserts(&self) {
        self.tables.lock().unwrap().reject_events = true;
    }

    fn select(&self, predicate: impl Fn(&ServiceOrder) -> bool) -> Vec<ServiceOrder> {
        self.tables
            .lock()
            .unwrap()
            .orders
            .iter()
            .filter(|o| predicate(o))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ServiceOrderRepository for InMemoryServiceOrderRepository {
    async fn create(&self, order: &ServiceOrder) -> Result<(), DomainError> {
        let mut tables = self.tables.lock().unwrap();
        if tables.orders.iter().any(|o| o.id() == order.id()) {
            return Err(DomainError::Infrastructure(format!(
                "duplicate key: service order {}",
                order.id()
            )));
        }
        tables.orders.push(row_of(order));
        tables.events.extend(order.history().iter().cloned());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<ServiceOrder, DomainError> {
        let tables = self.tables.lock().unwrap();
        let row = tables
            .orders
            .iter()
            .find(|o| o.id() == id)
            .ok_or(DomainError::NotFound(id))?;
        let mut history: Vec<ServiceOrderEvent> = tables
            .events
            .iter()
            .filter(|e| e.service_order_id == id)
            .cloned()
            .collect();
        history.sort_by_key(|e| e.occurred_at);
        Ok(ServiceOrder::from_parts(parts_of(row), history))
    }

    async fn get_by_authority(
        &self,
        authority_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ServiceOrder>, DomainError> {
        let mut orders = self.select(|o| o.authority_id() == authority_id);
        orders.sort_by_key(|o| Reverse(o.created_at()));
        Ok(orders
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .collect())
    }

    async fn get_by_status(
        &self,
        status: ServiceOrderStatus,
        authority_id: Uuid,
    ) -> Result<Vec<ServiceOrder>, DomainError> {
        Ok(by_urgency(self.select(|o| {
            o.status() == status && o.authority_id() == authority_id
        })))
    }

    async fn get_by_responsible(&self, assignee_id: Uuid) -> Result<Vec<ServiceOrder>, DomainError> {
        Ok(by_urgency(self.select(|o| o.assignee_id() == Some(assignee_id))))
    }

    async fn get_by_priority(
        &self,
        priority: i32,
        authority_id: Uuid,
    ) -> Result<Vec<ServiceOrder>, DomainError> {
        let mut orders =
            self.select(|o| o.priority() == priority && o.authority_id() == authority_id);
        orders.sort_by_key(|o| Reverse(o.created_at()));
        Ok(orders)
    }

    async fn count_by_status(&self, authority_id: Uuid) -> Result<Vec<StatusCount>, DomainError> {
        let orders = self.select(|o| o.authority_id() == authority_id);
        Ok(ServiceOrderStatus::ALL
            .into_iter()
            .filter_map(|status| {
                let count = orders.iter().filter(|o| o.status() == status).count();
                (count > 0).then(|| StatusCount {
                    status,
                    count: i64::try_from(count).unwrap_or(i64::MAX),
                })
            })
            .collect())
    }

    async fn update(&self, order: &ServiceOrder) -> Result<(), DomainError> {
        let mut tables = self.tables.lock().unwrap();
        let Some(stored) = tables.orders.iter_mut().find(|o| o.id() == order.id()) else {
            return Err(DomainError::NotFound(order.id()));
        };
        let mut parts = parts_of(order);
        parts.authority_id = stored.authority_id();
        parts.requester_id = stored.requester_id();
        parts.created_at = stored.created_at();
        *stored = ServiceOrder::from_parts(parts, Vec::new());
        tables.updates += 1;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.orders.len();
        tables.orders.retain(|o| o.id() != id);
        if tables.orders.len() == before {
            return Err(DomainError::NotFound(id));
        }
        tables.events.retain(|e| e.service_order_id != id);
        Ok(())
    }

    async fn get_history(&self, service_order_id: Uuid) -> Result<Vec<ServiceOrderEvent>, DomainError> {
        let mut history: Vec<ServiceOrderEvent> = self
            .tables
            .lock()
            .unwrap()
            .events
            .iter()
            .filter(|e| e.service_order_id == service_order_id)
            .cloned()
            .collect();
        history.sort_by_key(|e| e.occurred_at);
        Ok(history)
    }

    async fn add_event(&self, event: &ServiceOrderEvent) -> Result<(), DomainError> {
        let mut tables = self.tables.lock().unwrap();
        if tables.reject_events {
            return Err(DomainError::Infrastructure("event insert rejected".into()));
        }
        tables.events.push(event.clone());
        Ok(())
    }
}

/// A repository that always returns an infrastructure error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingServiceOrderRepository;

fn connection_refused<T>() -> Result<T, DomainError> {
    Err(DomainError::Infrastructure("connection refused".into()))
}

#[async_trait]
impl ServiceOrderRepository for FailingServiceOrderRepository {
    async fn create(&self, _order: &ServiceOrder) -> Result<(), DomainError> {
        connection_refused()
    }

    async fn get_by_id(&self, _id: Uuid) -> Result<ServiceOrder, DomainError> {
        connection_refused()
    }

    async fn get_by_authority(
        &self,
        _authority_id: Uuid,
        _limit: i64,
        _offset: i64,
    ) -> Result<Vec<ServiceOrder>, DomainError> {
        connection_refused()
    }

    async fn get_by_status(
        &self,
        _status: ServiceOrderStatus,
        _authority_id: Uuid,
    ) -> Result<Vec<ServiceOrder>, DomainError> {
        connection_refused()
    }

    async fn get_by_responsible(&self, _assignee_id: Uuid) -> Result<Vec<ServiceOrder>, DomainError> {
        connection_refused()
    }

    async fn get_by_priority(
        &self,
        _priority: i32,
        _authority_id: Uuid,
    ) -> Result<Vec<ServiceOrder>, DomainError> {
        connection_refused()
    }

    async fn count_by_status(&self, _authority_id: Uuid) -> Result<Vec<StatusCount>, DomainError> {
        connection_refused()
    }

    async fn update(&self, _order: &ServiceOrder) -> Result<(), DomainError> {
        connection_refused()
    }

    async fn delete(&self, _id: Uuid) -> Result<(), DomainError> {
        connection_refused()
    }

    async fn get_history(&self, _service_order_id: Uuid) -> Result<Vec<ServiceOrderEvent>, DomainError> {
        connection_refused()
    }

    async fn add_event(&self, _event: &ServiceOrderEvent) -> Result<(), DomainError> {
        connection_refused()
    }
}
