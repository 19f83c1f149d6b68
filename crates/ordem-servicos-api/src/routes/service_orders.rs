//! Routes for service orders.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, patch, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use ordem_servicos_os::application::command_handlers;
use ordem_servicos_os::application::query_handlers::{
    self, EventView, ServiceOrderView, StatisticsView,
};
use ordem_servicos_os::domain::aggregates::DetailsUpdate;
use ordem_servicos_os::domain::commands;
use ordem_servicos_os::domain::status::ServiceOrderStatus;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /.
#[derive(Debug, Deserialize)]
pub struct CreateServiceOrderRequest {
    pub titulo: String,
    #[serde(default)]
    pub descricao: String,
    #[serde(default)]
    pub localizacao: String,
    pub prefeitura_id: Uuid,
    pub solicitante_id: Uuid,
    pub prioridade: i32,
}

/// Request body for PUT /{id}. Absent fields are left unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateServiceOrderRequest {
    pub titulo: Option<String>,
    pub descricao: Option<String>,
    pub localizacao: Option<String>,
    pub prioridade: Option<i32>,
    pub usuario_id: Uuid,
}

/// Request body for PATCH /{id}/status.
#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: ServiceOrderStatus,
    #[serde(default)]
    pub motivo: String,
    pub usuario_id: Uuid,
}

/// Request body for PATCH /{id}/responsavel.
#[derive(Debug, Deserialize)]
pub struct AssignResponsibleRequest {
    pub responsavel_id: Uuid,
    pub usuario_id: Uuid,
}

/// Request body for PUT /{id}/sla.
#[derive(Debug, Deserialize)]
pub struct AttachSlaRequest {
    pub tempo_limite: DateTime<Utc>,
    pub tempo_alerta: DateTime<Utc>,
    pub prioridade: i32,
    #[serde(default)]
    pub descricao: String,
    pub usuario_id: Uuid,
}

/// Request body for POST /{id}/tags.
#[derive(Debug, Deserialize)]
pub struct AddTagRequest {
    pub tag: String,
}

/// Query string for GET /.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub prefeitura_id: Uuid,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Query string for the per-authority listings and statistics.
#[derive(Debug, Deserialize)]
pub struct AuthorityQuery {
    pub prefeitura_id: Uuid,
}

/// POST /
#[instrument(skip(state, request), fields(prefeitura_id = %request.prefeitura_id))]
async fn create_service_order(
    State(state): State<AppState>,
    Json(request): Json<CreateServiceOrderRequest>,
) -> Result<(StatusCode, Json<ServiceOrderView>), ApiError> {
    let command = commands::CreateServiceOrder {
        correlation_id: Uuid::new_v4(),
        title: request.titulo,
        description: request.descricao,
        location: request.localizacao,
        authority_id: request.prefeitura_id,
        requester_id: request.solicitante_id,
        priority: request.prioridade,
    };

    info!(correlation_id = %command.correlation_id, "handling create_service_order command");

    let order = command_handlers::handle_create(
        &command,
        state.clock.as_ref(),
        state.repository.as_ref(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(ServiceOrderView::from(&order))))
}

/// GET /?prefeitura_id=&limit=&offset=
#[instrument(skip(state))]
async fn list_service_orders(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ServiceOrderView>>, ApiError> {
    let views = query_handlers::list_by_authority(
        query.prefeitura_id,
        query.limit,
        query.offset,
        state.repository.as_ref(),
    )
    .await?;
    Ok(Json(views))
}

/// GET /{id}
#[instrument(skip(state))]
async fn get_service_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ServiceOrderView>, ApiError> {
    let view = query_handlers::get_service_order(id, state.repository.as_ref()).await?;
    Ok(Json(view))
}

/// PUT /{id}
#[instrument(skip(state, request))]
async fn update_service_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateServiceOrderRequest>,
) -> Result<Json<ServiceOrderView>, ApiError> {
    let command = commands::UpdateDetails {
        correlation_id: Uuid::new_v4(),
        service_order_id: id,
        changes: DetailsUpdate {
            title: request.titulo,
            description: request.descricao,
            location: request.localizacao,
            priority: request.prioridade,
        },
        user_id: request.usuario_id,
    };

    info!(correlation_id = %command.correlation_id, "handling update_details command");

    let order = command_handlers::handle_update_details(
        &command,
        state.clock.as_ref(),
        state.repository.as_ref(),
    )
    .await?;
    Ok(Json(ServiceOrderView::from(&order)))
}

/// DELETE /{id}
#[instrument(skip(state))]
async fn delete_service_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let command = commands::DeleteServiceOrder {
        correlation_id: Uuid::new_v4(),
        service_order_id: id,
    };

    info!(correlation_id = %command.correlation_id, "handling delete command");

    command_handlers::handle_delete(&command, state.repository.as_ref()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /{id}/status
#[instrument(skip(state, request), fields(status = %request.status))]
async fn change_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ChangeStatusRequest>,
) -> Result<Json<ServiceOrderView>, ApiError> {
    let command = commands::ChangeStatus {
        correlation_id: Uuid::new_v4(),
        service_order_id: id,
        status: request.status,
        user_id: request.usuario_id,
        reason: request.motivo,
    };

    info!(correlation_id = %command.correlation_id, "handling change_status command");

    let order = command_handlers::handle_change_status(
        &command,
        state.clock.as_ref(),
        state.repository.as_ref(),
    )
    .await?;
    Ok(Json(ServiceOrderView::from(&order)))
}

/// PATCH /{id}/responsavel
#[instrument(skip(state, request), fields(responsavel_id = %request.responsavel_id))]
async fn assign_responsible(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AssignResponsibleRequest>,
) -> Result<Json<ServiceOrderView>, ApiError> {
    let command = commands::AssignResponsible {
        correlation_id: Uuid::new_v4(),
        service_order_id: id,
        assignee_id: request.responsavel_id,
        user_id: request.usuario_id,
    };

    info!(correlation_id = %command.correlation_id, "handling assign_responsible command");

    let order = command_handlers::handle_assign_responsible(
        &command,
        state.clock.as_ref(),
        state.repository.as_ref(),
    )
    .await?;
    Ok(Json(ServiceOrderView::from(&order)))
}

/// PUT /{id}/sla
#[instrument(skip(state, request))]
async fn attach_sla(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AttachSlaRequest>,
) -> Result<Json<ServiceOrderView>, ApiError> {
    let command = commands::AttachSla {
        correlation_id: Uuid::new_v4(),
        service_order_id: id,
        deadline: request.tempo_limite,
        warning: request.tempo_alerta,
        priority: request.prioridade,
        description: request.descricao,
        user_id: request.usuario_id,
    };

    info!(correlation_id = %command.correlation_id, "handling attach_sla command");

    let order = command_handlers::handle_attach_sla(
        &command,
        state.clock.as_ref(),
        state.repository.as_ref(),
    )
    .await?;
    Ok(Json(ServiceOrderView::from(&order)))
}

/// GET /{id}/historico
#[instrument(skip(state))]
async fn get_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<EventView>>, ApiError> {
    let history = query_handlers::get_history(id, state.repository.as_ref()).await?;
    Ok(Json(history))
}

/// POST /{id}/tags
#[instrument(skip(state, request))]
async fn add_tag(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AddTagRequest>,
) -> Result<Json<ServiceOrderView>, ApiError> {
    let command = commands::AddTag {
        correlation_id: Uuid::new_v4(),
        service_order_id: id,
        tag: request.tag,
    };

    let order = command_handlers::handle_add_tag(
        &command,
        state.clock.as_ref(),
        state.repository.as_ref(),
    )
    .await?;
    Ok(Json(ServiceOrderView::from(&order)))
}

/// DELETE /{id}/tags/{tag}
#[instrument(skip(state))]
async fn remove_tag(
    State(state): State<AppState>,
    Path((id, tag)): Path<(Uuid, String)>,
) -> Result<Json<ServiceOrderView>, ApiError> {
    let command = commands::RemoveTag {
        correlation_id: Uuid::new_v4(),
        service_order_id: id,
        tag,
    };

    let order = command_handlers::handle_remove_tag(
        &command,
        state.clock.as_ref(),
        state.repository.as_ref(),
    )
    .await?;
    Ok(Json(ServiceOrderView::from(&order)))
}

/// GET /status/{status}?prefeitura_id=
#[instrument(skip(state))]
async fn list_by_status(
    State(state): State<AppState>,
    Path(status): Path<ServiceOrderStatus>,
    Query(query): Query<AuthorityQuery>,
) -> Result<Json<Vec<ServiceOrderView>>, ApiError> {
    let views =
        query_handlers::list_by_status(status, query.prefeitura_id, state.repository.as_ref())
            .await?;
    Ok(Json(views))
}

/// GET /responsavel/{id}
#[instrument(skip(state))]
async fn list_by_responsible(
    State(state): State<AppState>,
    Path(assignee_id): Path<Uuid>,
) -> Result<Json<Vec<ServiceOrderView>>, ApiError> {
    let views =
        query_handlers::list_by_responsible(assignee_id, state.repository.as_ref()).await?;
    Ok(Json(views))
}

/// GET /prioridade/{p}?prefeitura_id=
#[instrument(skip(state))]
async fn list_by_priority(
    State(state): State<AppState>,
    Path(priority): Path<i32>,
    Query(query): Query<AuthorityQuery>,
) -> Result<Json<Vec<ServiceOrderView>>, ApiError> {
    let views =
        query_handlers::list_by_priority(priority, query.prefeitura_id, state.repository.as_ref())
            .await?;
    Ok(Json(views))
}

/// GET /estatisticas?prefeitura_id=
#[instrument(skip(state))]
async fn get_statistics(
    State(state): State<AppState>,
    Query(query): Query<AuthorityQuery>,
) -> Result<Json<StatisticsView>, ApiError> {
    let stats =
        query_handlers::get_statistics(query.prefeitura_id, state.repository.as_ref()).await?;
    Ok(Json(stats))
}

/// Returns the router for service orders.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_service_orders).post(create_service_order))
        .route("/estatisticas", get(get_statistics))
        .route("/status/{status}", get(list_by_status))
        .route("/responsavel/{id}", get(list_by_responsible))
        .route("/prioridade/{priority}", get(list_by_priority))
        .route(
            "/{id}",
            get(get_service_order)
                .put(update_service_order)
                .delete(delete_service_order),
        )
        .route("/{id}/status", patch(change_status))
        .route("/{id}/responsavel", patch(assign_responsible))
        .route("/{id}/sla", put(attach_sla))
        .route("/{id}/historico", get(get_history))
        .route("/{id}/tags", post(add_tag))
        .route("/{id}/tags/{tag}", delete(remove_tag))
}
