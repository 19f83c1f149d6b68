//! The service order aggregate root.

use chrono::{DateTime, Utc};
use ordem_servicos_core::clock::Clock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::events::{
    ASSIGNEE_SET, DETAILS_UPDATED, EventMetadata, MetadataValue, SLA_ATTACHED, STATUS_CHANGED,
    ServiceOrderEvent,
};
use super::status::ServiceOrderStatus;

/// A service-level target attached to a service order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sla {
    /// Identifier of this target.
    pub id: Uuid,
    /// When the order must be resolved.
    pub deadline: DateTime<Utc>,
    /// When a warning should be raised.
    pub warning: DateTime<Utc>,
    /// Priority the target was negotiated for.
    pub priority: i32,
    /// Free-text description.
    pub description: String,
}

/// Field changes requested by an edit of the order's details.
///
/// `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailsUpdate {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New location.
    pub location: Option<String>,
    /// New priority.
    pub priority: Option<i32>,
}

/// Persisted fields of a service order, used to rebuild it from storage.
#[derive(Debug, Clone)]
pub struct ServiceOrderParts {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: ServiceOrderStatus,
    pub priority: i32,
    pub location: String,
    pub assignee_id: Option<Uuid>,
    pub authority_id: Uuid,
    pub requester_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub sla: Option<Sla>,
    pub tags: Vec<String>,
}

/// The aggregate root for a service order.
///
/// Every user-visible mutation appends exactly one event to `history`
/// and refreshes `updated_at`. History is append-only.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceOrder {
    id: Uuid,
    title: String,
    description: String,
    status: ServiceOrderStatus,
    priority: i32,
    location: String,
    assignee_id: Option<Uuid>,
    authority_id: Uuid,
    requester_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    sla: Option<Sla>,
    tags: Vec<String>,
    history: Vec<ServiceOrderEvent>,
}

impl ServiceOrder {
    /// Creates a new, open service order with no tags and no history.
    ///
    /// Priority and text fields are not validated here.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        location: impl Into<String>,
        authority_id: Uuid,
        requester_id: Uuid,
        priority: i32,
        clock: &dyn Clock,
    ) -> Self {
        let now = clock.now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.into(),
            status: ServiceOrderStatus::Open,
            priority,
            location: location.into(),
            assignee_id: None,
            authority_id,
            requester_id,
            created_at: now,
            updated_at: now,
            completed_at: None,
            sla: None,
            tags: Vec::new(),
            history: Vec::new(),
        }
    }

    /// Rebuilds a service order from stored fields and its stored history.
    #[must_use]
    pub fn from_parts(parts: ServiceOrderParts, history: Vec<ServiceOrderEvent>) -> Self {
        Self {
            id: parts.id,
            title: parts.title,
            description: parts.description,
            status: parts.status,
            priority: parts.priority,
            location: parts.location,
            assignee_id: parts.assignee_id,
            authority_id: parts.authority_id,
            requester_id: parts.requester_id,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
            completed_at: parts.completed_at,
            sla: parts.sla,
            tags: parts.tags,
            history,
        }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn status(&self) -> ServiceOrderStatus {
        self.status
    }

    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    #[must_use]
    pub fn assignee_id(&self) -> Option<Uuid> {
        self.assignee_id
    }

    #[must_use]
    pub fn authority_id(&self) -> Uuid {
        self.authority_id
    }

    #[must_use]
    pub fn requester_id(&self) -> Uuid {
        self.requester_id
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn sla(&self) -> Option<&Sla> {
        self.sla.as_ref()
    }

    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// The full event history, oldest first.
    #[must_use]
    pub fn history(&self) -> &[ServiceOrderEvent] {
        &self.history
    }

    /// Events appended after the first `persisted` entries of the history.
    #[must_use]
    pub fn events_since(&self, persisted: usize) -> &[ServiceOrderEvent] {
        self.history.get(persisted..).unwrap_or_default()
    }

    /// Appends an event to the history and refreshes `updated_at`.
    pub fn record_event(
        &mut self,
        event_type: impl Into<String>,
        description: impl Into<String>,
        user_id: Uuid,
        metadata: Option<EventMetadata>,
        clock: &dyn Clock,
    ) {
        let now = clock.now();
        self.history.push(ServiceOrderEvent {
            id: Uuid::new_v4(),
            service_order_id: self.id,
            event_type: event_type.into(),
            description: description.into(),
            user_id,
            occurred_at: now,
            metadata,
        });
        self.updated_at = now;
    }

    /// Overwrites the status and records a `status_changed` event.
    ///
    /// Any transition is accepted. `completed_at` is set on the first
    /// transition into `Completed` and kept afterwards.
    pub fn change_status(
        &mut self,
        new_status: ServiceOrderStatus,
        user_id: Uuid,
        reason: &str,
        clock: &dyn Clock,
    ) {
        let previous = self.status;
        self.status = new_status;

        if new_status == ServiceOrderStatus::Completed && self.completed_at.is_none() {
            self.completed_at = Some(clock.now());
        }

        let mut metadata = EventMetadata::new();
        metadata.insert("previous_status".to_owned(), previous.into());
        metadata.insert("new_status".to_owned(), new_status.into());
        metadata.insert("reason".to_owned(), reason.into());

        self.record_event(
            STATUS_CHANGED,
            format!("Status changed from {previous} to {new_status}: {reason}"),
            user_id,
            Some(metadata),
            clock,
        );
    }

    /// Sets the responsible party and records an `assignee_set` event.
    pub fn assign_responsible(&mut self, assignee_id: Uuid, user_id: Uuid, clock: &dyn Clock) {
        self.assignee_id = Some(assignee_id);

        let mut metadata = EventMetadata::new();
        metadata.insert("assignee_id".to_owned(), assignee_id.into());

        self.record_event(
            ASSIGNEE_SET,
            "Responsible party assigned to the service order",
            user_id,
            Some(metadata),
            clock,
        );
    }

    /// Applies the supplied detail changes.
    ///
    /// Records one `details_updated` event naming every field whose value
    /// actually changed. Returns `false`, recording nothing, when no field
    /// changed.
    pub fn update_details(&mut self, update: DetailsUpdate, user_id: Uuid, clock: &dyn Clock) -> bool {
        let mut changes = EventMetadata::new();

        if let Some(title) = update.title.filter(|t| *t != self.title) {
            changes.insert("title".to_owned(), title.as_str().into());
            self.title = title;
        }
        if let Some(description) = update.description.filter(|d| *d != self.description) {
            changes.insert("description".to_owned(), description.as_str().into());
            self.description = description;
        }
        if let Some(location) = update.location.filter(|l| *l != self.location) {
            changes.insert("location".to_owned(), location.as_str().into());
            self.location = location;
        }
        if let Some(priority) = update.priority.filter(|p| *p != self.priority) {
            changes.insert("priority".to_owned(), priority.into());
            self.priority = priority;
        }

        if changes.is_empty() {
            return false;
        }

        let fields = changes.keys().cloned().collect::<Vec<_>>().join(", ");
        self.record_event(
            DETAILS_UPDATED,
            format!("Details updated: {fields}"),
            user_id,
            Some(changes),
            clock,
        );
        true
    }

    /// Replaces the service-level target and records an `sla_attached` event.
    pub fn attach_sla(&mut self, sla: Sla, user_id: Uuid, clock: &dyn Clock) {
        let mut metadata = EventMetadata::new();
        metadata.insert("sla_id".to_owned(), sla.id.into());
        metadata.insert("deadline".to_owned(), sla.deadline.into());
        metadata.insert("warning".to_owned(), sla.warning.into());
        metadata.insert("priority".to_owned(), MetadataValue::from(sla.priority));

        let description = format!("Service-level target attached: {}", sla.description);
        self.sla = Some(sla);

        self.record_event(SLA_ATTACHED, description, user_id, Some(metadata), clock);
    }

    /// Adds a tag unless an identical one is present. Returns whether the
    /// tag set changed.
    pub fn add_tag(&mut self, tag: impl Into<String>, clock: &dyn Clock) -> bool {
        let tag = tag.into();
        if self.tags.contains(&tag) {
            return false;
        }
        self.tags.push(tag);
        self.updated_at = clock.now();
        true
    }

    /// Removes the first identical tag. Returns whether the tag set changed.
    pub fn remove_tag(&mut self, tag: &str, clock: &dyn Clock) -> bool {
        let Some(index) = self.tags.iter().position(|t| t == tag) else {
            return false;
        };
        self.tags.remove(index);
        self.updated_at = clock.now();
        true
    }
}
