//! Commands for the service order context.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::aggregates::DetailsUpdate;
use super::status::ServiceOrderStatus;

/// Command to open a new service order.
#[derive(Debug, Clone)]
pub struct CreateServiceOrder {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    pub title: String,
    pub description: String,
    pub location: String,
    /// The owning authority (prefeitura).
    pub authority_id: Uuid,
    /// The citizen or agent who requested the service.
    pub requester_id: Uuid,
    /// 1 to 5, 5 being the most urgent.
    pub priority: i32,
}

/// Command to move a service order to another status.
#[derive(Debug, Clone)]
pub struct ChangeStatus {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    pub service_order_id: Uuid,
    pub status: ServiceOrderStatus,
    /// The user performing the change.
    pub user_id: Uuid,
    /// Free-text reason, embedded in the history entry.
    pub reason: String,
}

/// Command to assign a responsible party.
#[derive(Debug, Clone)]
pub struct AssignResponsible {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    pub service_order_id: Uuid,
    pub assignee_id: Uuid,
    /// The user performing the assignment.
    pub user_id: Uuid,
}

/// Command to edit title, description, location or priority.
#[derive(Debug, Clone)]
pub struct UpdateDetails {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    pub service_order_id: Uuid,
    pub changes: DetailsUpdate,
    /// The user performing the edit.
    pub user_id: Uuid,
}

/// Command to attach a service-level target.
#[derive(Debug, Clone)]
pub struct AttachSla {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    pub service_order_id: Uuid,
    pub deadline: DateTime<Utc>,
    pub warning: DateTime<Utc>,
    pub priority: i32,
    pub description: String,
    /// The user attaching the target.
    pub user_id: Uuid,
}

/// Command to add a tag.
#[derive(Debug, Clone)]
pub struct AddTag {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    pub service_order_id: Uuid,
    pub tag: String,
}

/// Command to remove a tag.
#[derive(Debug, Clone)]
pub struct RemoveTag {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    pub service_order_id: Uuid,
    pub tag: String,
}

/// Command to delete a service order together with its history.
#[derive(Debug, Clone)]
pub struct DeleteServiceOrder {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    pub service_order_id: Uuid,
}
