//! Command handlers for the service order context.
//!
//! Each handler loads the aggregate, executes the command, and persists the
//! new state followed by every event appended during the command.

use ordem_servicos_core::clock::Clock;
use ordem_servicos_core::error::DomainError;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::domain::aggregates::{DetailsUpdate, ServiceOrder, Sla};
use crate::domain::commands::{
    AddTag, AssignResponsible, AttachSla, ChangeStatus, CreateServiceOrder, DeleteServiceOrder,
    RemoveTag, UpdateDetails,
};
use crate::domain::repository::ServiceOrderRepository;

/// Lowest accepted priority.
pub const MIN_PRIORITY: i32 = 1;
/// Highest accepted priority.
pub const MAX_PRIORITY: i32 = 5;

fn validate_priority(priority: i32) -> Result<(), DomainError> {
    if (MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
        Ok(())
    } else {
        Err(DomainError::Validation(format!(
            "priority must be between {MIN_PRIORITY} and {MAX_PRIORITY}, got {priority}"
        )))
    }
}

fn validate_not_blank(field: &str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        Err(DomainError::Validation(format!("{field} must not be blank")))
    } else {
        Ok(())
    }
}

fn validate_details(changes: &DetailsUpdate) -> Result<(), DomainError> {
    if let Some(title) = &changes.title {
        validate_not_blank("title", title)?;
    }
    if let Some(priority) = changes.priority {
        validate_priority(priority)?;
    }
    Ok(())
}

/// Writes the order's fields, then each event recorded after the first
/// `persisted` history entries.
///
/// The writes are not atomic: if an event insert fails after `update`
/// succeeded, the stored order keeps the change without its history entry.
async fn persist_changes(
    order: &ServiceOrder,
    persisted: usize,
    repo: &dyn ServiceOrderRepository,
) -> Result<(), DomainError> {
    repo.update(order).await?;
    for event in order.events_since(persisted) {
        repo.add_event(event).await?;
    }
    debug!(
        service_order_id = %order.id(),
        new_events = order.events_since(persisted).len(),
        "service order changes persisted"
    );
    Ok(())
}

/// Handles the `CreateServiceOrder` command.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the title is blank or the priority is
/// outside 1 to 5, or the repository error if persisting fails.
#[instrument(skip_all, fields(correlation_id = %command.correlation_id, authority_id = %command.authority_id))]
pub async fn handle_create(
    command: &CreateServiceOrder,
    clock: &dyn Clock,
    repo: &dyn ServiceOrderRepository,
) -> Result<ServiceOrder, DomainError> {
    validate_not_blank("title", &command.title)?;
    validate_priority(command.priority)?;

    let order = ServiceOrder::new(
        command.title.clone(),
        command.description.clone(),
        command.location.clone(),
        command.authority_id,
        command.requester_id,
        command.priority,
        clock,
    );

    repo.create(&order).await?;

    info!(service_order_id = %order.id(), "service order created");
    Ok(order)
}

/// Handles the `ChangeStatus` command.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the order does not exist, or the
/// repository error if loading or persisting fails.
#[instrument(skip_all, fields(correlation_id = %command.correlation_id, service_order_id = %command.service_order_id))]
pub async fn handle_change_status(
    command: &ChangeStatus,
    clock: &dyn Clock,
    repo: &dyn ServiceOrderRepository,
) -> Result<ServiceOrder, DomainError> {
    let mut order = repo.get_by_id(command.service_order_id).await?;
    let persisted = order.history().len();
    let previous = order.status();

    order.change_status(command.status, command.user_id, &command.reason, clock);
    persist_changes(&order, persisted, repo).await?;

    info!(%previous, new_status = %command.status, "service order status changed");
    Ok(order)
}

/// Handles the `AssignResponsible` command.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the order does not exist, or the
/// repository error if loading or persisting fails.
#[instrument(skip_all, fields(correlation_id = %command.correlation_id, service_order_id = %command.service_order_id))]
pub async fn handle_assign_responsible(
    command: &AssignResponsible,
    clock: &dyn Clock,
    repo: &dyn ServiceOrderRepository,
) -> Result<ServiceOrder, DomainError> {
    let mut order = repo.get_by_id(command.service_order_id).await?;
    let persisted = order.history().len();

    order.assign_responsible(command.assignee_id, command.user_id, clock);
    persist_changes(&order, persisted, repo).await?;

    info!(assignee_id = %command.assignee_id, "responsible party assigned");
    Ok(order)
}

/// Handles the `UpdateDetails` command. Nothing is written when no field
/// actually changes.
///
/// # Errors
///
/// Returns `DomainError::Validation` for a blank title or an out-of-range
/// priority, `DomainError::NotFound` if the order does not exist, or the
/// repository error if loading or persisting fails.
#[instrument(skip_all, fields(correlation_id = %command.correlation_id, service_order_id = %command.service_order_id))]
pub async fn handle_update_details(
    command: &UpdateDetails,
    clock: &dyn Clock,
    repo: &dyn ServiceOrderRepository,
) -> Result<ServiceOrder, DomainError> {
    validate_details(&command.changes)?;

    let mut order = repo.get_by_id(command.service_order_id).await?;
    let persisted = order.history().len();

    if order.update_details(command.changes.clone(), command.user_id, clock) {
        persist_changes(&order, persisted, repo).await?;
        info!("service order details updated");
    } else {
        debug!("service order details unchanged");
    }
    Ok(order)
}

/// Handles the `AttachSla` command.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the warning comes after the deadline
/// or the priority is outside 1 to 5, `DomainError::NotFound` if the order does
/// not exist, or the repository error if loading or persisting fails.
#[instrument(skip_all, fields(correlation_id = %command.correlation_id, service_order_id = %command.service_order_id))]
pub async fn handle_attach_sla(
    command: &AttachSla,
    clock: &dyn Clock,
    repo: &dyn ServiceOrderRepository,
) -> Result<ServiceOrder, DomainError> {
    validate_priority(command.priority)?;
    if command.warning > command.deadline {
        return Err(DomainError::Validation(
            "SLA warning must not be later than its deadline".to_owned(),
        ));
    }

    let mut order = repo.get_by_id(command.service_order_id).await?;
    let persisted = order.history().len();

    let sla = Sla {
        id: Uuid::new_v4(),
        deadline: command.deadline,
        warning: command.warning,
        priority: command.priority,
        description: command.description.clone(),
    };
    order.attach_sla(sla, command.user_id, clock);
    persist_changes(&order, persisted, repo).await?;

    info!(deadline = %command.deadline, "SLA attached");
    Ok(order)
}

/// Handles the `AddTag` command.
///
/// # Errors
///
/// Returns `DomainError::Validation` for a blank tag, `DomainError::NotFound`
/// if the order does not exist, or the repository error if loading or
/// persisting fails.
#[instrument(skip_all, fields(correlation_id = %command.correlation_id, service_order_id = %command.service_order_id))]
pub async fn handle_add_tag(
    command: &AddTag,
    clock: &dyn Clock,
    repo: &dyn ServiceOrderRepository,
) -> Result<ServiceOrder, DomainError> {
    validate_not_blank("tag", &command.tag)?;

    let mut order = repo.get_by_id(command.service_order_id).await?;
    if order.add_tag(command.tag.clone(), clock) {
        repo.update(&order).await?;
        info!(tag = %command.tag, "tag added");
    }
    Ok(order)
}

/// Handles the `RemoveTag` command. Removing an absent tag succeeds.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the order does not exist, or the
/// repository error if loading or persisting fails.
#[instrument(skip_all, fields(correlation_id = %command.correlation_id, service_order_id = %command.service_order_id))]
pub async fn handle_remove_tag(
    command: &RemoveTag,
    clock: &dyn Clock,
    repo: &dyn ServiceOrderRepository,
) -> Result<ServiceOrder, DomainError> {
    let mut order = repo.get_by_id(command.service_order_id).await?;
    if order.remove_tag(&command.tag, clock) {
        repo.update(&order).await?;
        info!(tag = %command.tag, "tag removed");
    }
    Ok(order)
}

/// Handles the `DeleteServiceOrder` command.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the order does not exist, or the
/// repository error if deletion fails.
#[instrument(skip_all, fields(correlation_id = %command.correlation_id, service_order_id = %command.service_order_id))]
pub async fn handle_delete(
    command: &DeleteServiceOrder,
    repo: &dyn ServiceOrderRepository,
) -> Result<(), DomainError> {
    repo.delete(command.service_order_id).await?;
    info!("service order deleted");
    Ok(())
}
