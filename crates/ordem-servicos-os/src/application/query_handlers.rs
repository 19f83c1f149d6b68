//! Query handlers for the service order context.
//!
//! This module contains query handlers that load service orders through the
//! repository and return read-only view DTOs. View field names follow the
//! storage schema, which is also the JSON contract of the HTTP API.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use ordem_servicos_core::error::DomainError;
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::domain::aggregates::{ServiceOrder, Sla};
use crate::domain::events::{EventMetadata, ServiceOrderEvent};
use crate::domain::repository::ServiceOrderRepository;
use crate::domain::status::ServiceOrderStatus;

/// Page size used when the caller does not pass one.
pub const DEFAULT_PAGE_SIZE: i64 = 20;
/// Largest accepted page size.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Read-only view of a history event.
#[derive(Debug, Clone, Serialize)]
pub struct EventView {
    pub id: Uuid,
    pub os_id: Uuid,
    pub tipo: String,
    pub descricao: String,
    pub usuario_id: Uuid,
    pub data_criacao: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<EventMetadata>,
}

impl From<&ServiceOrderEvent> for EventView {
    fn from(event: &ServiceOrderEvent) -> Self {
        Self {
            id: event.id,
            os_id: event.service_order_id,
            tipo: event.event_type.clone(),
            descricao: event.description.clone(),
            usuario_id: event.user_id,
            data_criacao: event.occurred_at,
            metadata: event.metadata.clone(),
        }
    }
}

/// Read-only view of a service-level target.
#[derive(Debug, Clone, Serialize)]
pub struct SlaView {
    pub id: Uuid,
    pub tempo_limite: DateTime<Utc>,
    pub tempo_alerta: DateTime<Utc>,
    pub prioridade: i32,
    pub descricao: String,
}

impl From<&Sla> for SlaView {
    fn from(sla: &Sla) -> Self {
        Self {
            id: sla.id,
            tempo_limite: sla.deadline,
            tempo_alerta: sla.warning,
            prioridade: sla.priority,
            descricao: sla.description.clone(),
        }
    }
}

/// Read-only view of a service order aggregate.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceOrderView {
    pub id: Uuid,
    pub titulo: String,
    pub descricao: String,
    pub status: ServiceOrderStatus,
    pub prioridade: i32,
    pub localizacao: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responsavel_id: Option<Uuid>,
    pub prefeitura_id: Uuid,
    pub solicitante_id: Uuid,
    pub data_criacao: DateTime<Utc>,
    pub data_atualizacao: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_conclusao: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sla: Option<SlaView>,
    pub tags: Vec<String>,
    /// Empty in list views.
    pub historico: Vec<EventView>,
}

impl From<&ServiceOrder> for ServiceOrderView {
    fn from(order: &ServiceOrder) -> Self {
        Self {
            id: order.id(),
            titulo: order.title().to_owned(),
            descricao: order.description().to_owned(),
            status: order.status(),
            prioridade: order.priority(),
            localizacao: order.location().to_owned(),
            responsavel_id: order.assignee_id(),
            prefeitura_id: order.authority_id(),
            solicitante_id: order.requester_id(),
            data_criacao: order.created_at(),
            data_atualizacao: order.updated_at(),
            data_conclusao: order.completed_at(),
            sla: order.sla().map(SlaView::from),
            tags: order.tags().to_vec(),
            historico: order.history().iter().map(EventView::from).collect(),
        }
    }
}

/// Per-status order counts for one authority.
#[derive(Debug, Clone, Serialize)]
pub struct StatisticsView {
    pub prefeitura_id: Uuid,
    pub total: i64,
    /// Every status is present, with zero when no order has it.
    pub por_status: BTreeMap<String, i64>,
}

fn views(orders: &[ServiceOrder]) -> Vec<ServiceOrderView> {
    orders.iter().map(ServiceOrderView::from).collect()
}

/// Retrieves a service order with its full history.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if no order has the given id.
#[instrument(skip(repo))]
pub async fn get_service_order(
    service_order_id: Uuid,
    repo: &dyn ServiceOrderRepository,
) -> Result<ServiceOrderView, DomainError> {
    let order = repo.get_by_id(service_order_id).await?;
    Ok(ServiceOrderView::from(&order))
}

/// Lists the orders of one authority, newest first.
///
/// `limit` defaults to 20 and must be within 1 to 100; `offset` defaults to 0
/// and must not be negative.
///
/// # Errors
///
/// Returns `DomainError::Validation` for an out-of-range `limit` or `offset`.
#[instrument(skip(repo))]
pub async fn list_by_authority(
    authority_id: Uuid,
    limit: Option<i64>,
    offset: Option<i64>,
    repo: &dyn ServiceOrderRepository,
) -> Result<Vec<ServiceOrderView>, DomainError> {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE);
    if !(1..=MAX_PAGE_SIZE).contains(&limit) {
        return Err(DomainError::Validation(format!(
            "limit must be between 1 and {MAX_PAGE_SIZE}, got {limit}"
        )));
    }
    let offset = offset.unwrap_or(0);
    if offset < 0 {
        return Err(DomainError::Validation(format!(
            "offset must not be negative, got {offset}"
        )));
    }

    let orders = repo.get_by_authority(authority_id, limit, offset).await?;
    Ok(views(&orders))
}

/// Lists the orders of one authority in one status, most urgent and newest
/// first.
///
/// # Errors
///
/// Returns the repository error if loading fails.
#[instrument(skip(repo))]
pub async fn list_by_status(
    status: ServiceOrderStatus,
    authority_id: Uuid,
    repo: &dyn ServiceOrderRepository,
) -> Result<Vec<ServiceOrderView>, DomainError> {
    let orders = repo.get_by_status(status, authority_id).await?;
    Ok(views(&orders))
}

/// Lists the orders assigned to one party, most urgent and newest first.
///
/// # Errors
///
/// Returns the repository error if loading fails.
#[instrument(skip(repo))]
pub async fn list_by_responsible(
    assignee_id: Uuid,
    repo: &dyn ServiceOrderRepository,
) -> Result<Vec<ServiceOrderView>, DomainError> {
    let orders = repo.get_by_responsible(assignee_id).await?;
    Ok(views(&orders))
}

/// Lists the orders of one authority with one priority, newest first.
///
/// # Errors
///
/// Returns the repository error if loading fails.
#[instrument(skip(repo))]
pub async fn list_by_priority(
    priority: i32,
    authority_id: Uuid,
    repo: &dyn ServiceOrderRepository,
) -> Result<Vec<ServiceOrderView>, DomainError> {
    let orders = repo.get_by_priority(priority, authority_id).await?;
    Ok(views(&orders))
}

/// Retrieves the history of a service order, oldest first.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the order does not exist.
#[instrument(skip(repo))]
pub async fn get_history(
    service_order_id: Uuid,
    repo: &dyn ServiceOrderRepository,
) -> Result<Vec<EventView>, DomainError> {
    // An unknown order and an order without history must be told apart.
    let order = repo.get_by_id(service_order_id).await?;
    Ok(order.history().iter().map(EventView::from).collect())
}

/// Counts the orders of one authority per status.
///
/// # Errors
///
/// Returns the repository error if loading fails.
#[instrument(skip(repo))]
pub async fn get_statistics(
    authority_id: Uuid,
    repo: &dyn ServiceOrderRepository,
) -> Result<StatisticsView, DomainError> {
    let counts = repo.count_by_status(authority_id).await?;

    let mut por_status: BTreeMap<String, i64> = ServiceOrderStatus::ALL
        .into_iter()
        .map(|status| (status.as_str().to_owned(), 0))
        .collect();
    for entry in &counts {
        por_status.insert(entry.status.as_str().to_owned(), entry.count);
    }

    Ok(StatisticsView {
        prefeitura_id: authority_id,
        total: counts.iter().map(|entry| entry.count).sum(),
        por_status,
    })
}
