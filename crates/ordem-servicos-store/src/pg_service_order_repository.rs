//! `PostgreSQL` implementation of the `ServiceOrderRepository` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool};
use tracing::{debug, instrument};
use uuid::Uuid;

use ordem_servicos_core::error::DomainError;
use ordem_servicos_os::domain::aggregates::{ServiceOrder, ServiceOrderParts, Sla};
use ordem_servicos_os::domain::events::{EventMetadata, ServiceOrderEvent};
use ordem_servicos_os::domain::repository::{ServiceOrderRepository, StatusCount};
use ordem_servicos_os::domain::status::ServiceOrderStatus;

/// Expands to a `SELECT` of every `ordens_servico` column followed by `$tail`.
macro_rules! select_orders {
    ($tail:literal) => {
        concat!(
            "SELECT id, titulo, descricao, status, prioridade, localizacao, ",
            "responsavel_id, prefeitura_id, solicitante_id, ",
            "data_criacao, data_atualizacao, data_conclusao, sla, tags ",
            "FROM ordens_servico ",
            $tail
        )
    };
}

fn storage_error(err: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(format!("storage operation failed: {err}"))
}

/// One row of `ordens_servico`.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    titulo: String,
    descricao: String,
    status: String,
    prioridade: i32,
    localizacao: String,
    responsavel_id: Option<Uuid>,
    prefeitura_id: Uuid,
    solicitante_id: Uuid,
    data_criacao: DateTime<Utc>,
    data_atualizacao: DateTime<Utc>,
    data_conclusao: Option<DateTime<Utc>>,
    sla: Option<Json<Sla>>,
    tags: Vec<String>,
}

impl OrderRow {
    fn into_order(self, history: Vec<ServiceOrderEvent>) -> Result<ServiceOrder, DomainError> {
        let status: ServiceOrderStatus = self
            .status
            .parse()
            .map_err(|e| DomainError::Infrastructure(format!("corrupt row {}: {e}", self.id)))?;

        Ok(ServiceOrder::from_parts(
            ServiceOrderParts {
                id: self.id,
                title: self.titulo,
                description: self.descricao,
                status,
                priority: self.prioridade,
                location: self.localizacao,
                assignee_id: self.responsavel_id,
                authority_id: self.prefeitura_id,
                requester_id: self.solicitante_id,
                created_at: self.data_criacao,
                updated_at: self.data_atualizacao,
                completed_at: self.data_conclusao,
                sla: self.sla.map(|Json(sla)| sla),
                tags: self.tags,
            },
            history,
        ))
    }
}

/// One row of `eventos_os`.
#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    os_id: Uuid,
    tipo: String,
    descricao: String,
    usuario_id: Uuid,
    data_criacao: DateTime<Utc>,
    metadata: Option<Json<EventMetadata>>,
}

impl From<EventRow> for ServiceOrderEvent {
    fn from(row: EventRow) -> Self {
        Self {
            id: row.id,
            service_order_id: row.os_id,
            event_type: row.tipo,
            description: row.descricao,
            user_id: row.usuario_id,
            occurred_at: row.data_criacao,
            metadata: row.metadata.map(|Json(metadata)| metadata),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StatusCountRow {
    status: String,
    total: i64,
}

fn into_orders(rows: Vec<OrderRow>) -> Result<Vec<ServiceOrder>, DomainError> {
    rows.into_iter().map(|row| row.into_order(Vec::new())).collect()
}

/// PostgreSQL-backed service order repository.
///
/// Maps the aggregate to one `ordens_servico` row and each history entry
/// to one `eventos_os` row.
#[derive(Debug, Clone)]
pub struct PgServiceOrderRepository {
    pool: PgPool,
}

impl PgServiceOrderRepository {
    /// Creates a new `PgServiceOrderRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_event(
        executor: impl PgExecutor<'_>,
        event: &ServiceOrderEvent,
    ) -> Result<(), DomainError> {
        sqlx::query(
            r"
            INSERT INTO eventos_os (id, os_id, tipo, descricao, usuario_id, data_criacao, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(event.id)
        .bind(event.service_order_id)
        .bind(&event.event_type)
        .bind(&event.description)
        .bind(event.user_id)
        .bind(event.occurred_at)
        .bind(event.metadata.as_ref().map(Json))
        .execute(executor)
        .await
        .map_err(storage_error)?;
        Ok(())
    }
}

#[async_trait]
impl ServiceOrderRepository for PgServiceOrderRepository {
    #[instrument(skip(self, order), fields(service_order_id = %order.id()))]
    async fn create(&self, order: &ServiceOrder) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        sqlx::query(
            r"
            INSERT INTO ordens_servico (
                id, titulo, descricao, status, prioridade, localizacao,
                responsavel_id, prefeitura_id, solicitante_id,
                data_criacao, data_atualizacao, data_conclusao, sla, tags
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ",
        )
        .bind(order.id())
        .bind(order.title())
        .bind(order.description())
        .bind(order.status().as_str())
        .bind(order.priority())
        .bind(order.location())
        .bind(order.assignee_id())
        .bind(order.authority_id())
        .bind(order.requester_id())
        .bind(order.created_at())
        .bind(order.updated_at())
        .bind(order.completed_at())
        .bind(order.sla().map(Json))
        .bind(order.tags())
        .execute(&mut *tx)
        .await
        .map_err(storage_error)?;

        for event in order.history() {
            Self::insert_event(&mut *tx, event).await?;
        }

        tx.commit().await.map_err(storage_error)?;

        debug!(events = order.history().len(), "service order inserted");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_by_id(&self, id: Uuid) -> Result<ServiceOrder, DomainError> {
        let row = sqlx::query_as::<_, OrderRow>(select_orders!("WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?
            .ok_or(DomainError::NotFound(id))?;

        let history = self.get_history(id).await?;
        row.into_order(history)
    }

    #[instrument(skip(self))]
    async fn get_by_authority(
        &self,
        authority_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ServiceOrder>, DomainError> {
        let rows = sqlx::query_as::<_, OrderRow>(select_orders!(
            "WHERE prefeitura_id = $1 ORDER BY data_criacao DESC LIMIT $2 OFFSET $3"
        ))
        .bind(authority_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;
        into_orders(rows)
    }

    #[instrument(skip(self))]
    async fn get_by_status(
        &self,
        status: ServiceOrderStatus,
        authority_id: Uuid,
    ) -> Result<Vec<ServiceOrder>, DomainError> {
        let rows = sqlx::query_as::<_, OrderRow>(select_orders!(
            "WHERE status = $1 AND prefeitura_id = $2 ORDER BY prioridade DESC, data_criacao DESC"
        ))
        .bind(status.as_str())
        .bind(authority_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;
        into_orders(rows)
    }

    #[instrument(skip(self))]
    async fn get_by_responsible(&self, assignee_id: Uuid) -> Result<Vec<ServiceOrder>, DomainError> {
        let rows = sqlx::query_as::<_, OrderRow>(select_orders!(
            "WHERE responsavel_id = $1 ORDER BY prioridade DESC, data_criacao DESC"
        ))
        .bind(assignee_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;
        into_orders(rows)
    }

    #[instrument(skip(self))]
    async fn get_by_priority(
        &self,
        priority: i32,
        authority_id: Uuid,
    ) -> Result<Vec<ServiceOrder>, DomainError> {
        let rows = sqlx::query_as::<_, OrderRow>(select_orders!(
            "WHERE prioridade = $1 AND prefeitura_id = $2 ORDER BY data_criacao DESC"
        ))
        .bind(priority)
        .bind(authority_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;
        into_orders(rows)
    }

    #[instrument(skip(self))]
    async fn count_by_status(&self, authority_id: Uuid) -> Result<Vec<StatusCount>, DomainError> {
        let rows = sqlx::query_as::<_, StatusCountRow>(
            r"
            SELECT status, COUNT(*) AS total
            FROM ordens_servico
            WHERE prefeitura_id = $1
            GROUP BY status
            ORDER BY status
            ",
        )
        .bind(authority_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.into_iter()
            .map(|row| {
                let status = row.status.parse().map_err(|e| {
                    DomainError::Infrastructure(format!("corrupt status count row: {e}"))
                })?;
                Ok(StatusCount {
                    status,
                    count: row.total,
                })
            })
            .collect()
    }

    #[instrument(skip(self, order), fields(service_order_id = %order.id()))]
    async fn update(&self, order: &ServiceOrder) -> Result<(), DomainError> {
        let result = sqlx::query(
            r"
            UPDATE ordens_servico SET
                titulo = $1, descricao = $2, status = $3, prioridade = $4,
                localizacao = $5, responsavel_id = $6, data_atualizacao = $7,
                data_conclusao = $8, sla = $9, tags = $10
            WHERE id = $11
            ",
        )
        .bind(order.title())
        .bind(order.description())
        .bind(order.status().as_str())
        .bind(order.priority())
        .bind(order.location())
        .bind(order.assignee_id())
        .bind(order.updated_at())
        .bind(order.completed_at())
        .bind(order.sla().map(Json))
        .bind(order.tags())
        .bind(order.id())
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound(order.id()));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        let events = sqlx::query("DELETE FROM eventos_os WHERE os_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;

        let orders = sqlx::query("DELETE FROM ordens_servico WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;

        if orders.rows_affected() == 0 {
            // Dropping the transaction rolls back the event deletion.
            return Err(DomainError::NotFound(id));
        }

        tx.commit().await.map_err(storage_error)?;

        debug!(events = events.rows_affected(), "service order deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_history(&self, service_order_id: Uuid) -> Result<Vec<ServiceOrderEvent>, DomainError> {
        let rows = sqlx::query_as::<_, EventRow>(
            r"
            SELECT id, os_id, tipo, descricao, usuario_id, data_criacao, metadata
            FROM eventos_os
            WHERE os_id = $1
            ORDER BY data_criacao ASC, seq ASC
            ",
        )
        .bind(service_order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(rows.into_iter().map(ServiceOrderEvent::from).collect())
    }

    #[instrument(skip(self, event), fields(event_id = %event.id, event_type = %event.event_type))]
    async fn add_event(&self, event: &ServiceOrderEvent) -> Result<(), DomainError> {
        Self::insert_event(&self.pool, event).await
    }
}
