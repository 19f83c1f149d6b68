//! History events recorded by the service order aggregate.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::ServiceOrderStatus;

/// Event type recorded when the status label changes.
pub const STATUS_CHANGED: &str = "status_changed";
/// Event type recorded when a responsible party is assigned.
pub const ASSIGNEE_SET: &str = "assignee_set";
/// Event type recorded when title, description, location or priority change.
pub const DETAILS_UPDATED: &str = "details_updated";
/// Event type recorded when a service-level target is attached.
pub const SLA_ATTACHED: &str = "sla_attached";

/// Structured details carried by an event.
pub type EventMetadata = BTreeMap<String, MetadataValue>;

/// A metadata value: string, number, boolean or nested map.
///
/// Serialized untagged, so the stored JSON is the plain value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    /// A boolean.
    Bool(bool),
    /// An integer or floating point number.
    Number(serde_json::Number),
    /// A string.
    String(String),
    /// A nested map.
    Map(BTreeMap<String, MetadataValue>),
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<i32> for MetadataValue {
    fn from(value: i32) -> Self {
        Self::Number(value.into())
    }
}

impl From<Uuid> for MetadataValue {
    fn from(value: Uuid) -> Self {
        Self::String(value.to_string())
    }
}

impl From<ServiceOrderStatus> for MetadataValue {
    fn from(value: ServiceOrderStatus) -> Self {
        Self::String(value.as_str().to_owned())
    }
}

impl From<DateTime<Utc>> for MetadataValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::String(value.to_rfc3339())
    }
}

impl From<BTreeMap<String, MetadataValue>> for MetadataValue {
    fn from(value: BTreeMap<String, MetadataValue>) -> Self {
        Self::Map(value)
    }
}

/// One immutable entry in a service order's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceOrderEvent {
    /// Unique event identifier.
    pub id: Uuid,
    /// The service order this event belongs to.
    pub service_order_id: Uuid,
    /// Free-form type tag, e.g. `status_changed`.
    pub event_type: String,
    /// Human-readable description.
    pub description: String,
    /// The user who caused the change.
    pub user_id: Uuid,
    /// When the change happened.
    pub occurred_at: DateTime<Utc>,
    /// Structured details of the change.
    pub metadata: Option<EventMetadata>,
}
