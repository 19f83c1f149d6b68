//! Service order status labels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The lifecycle label of a service order.
///
/// Status is a label, not a guarded state machine: any status may follow any
/// other. `Completed` and `Cancelled` are terminal by convention only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ServiceOrderStatus {
    /// Newly created, not yet being worked on.
    #[serde(rename = "aberta")]
    Open,
    /// Work has started.
    #[serde(rename = "em_andamento")]
    InProgress,
    /// Work is finished.
    #[serde(rename = "concluida")]
    Completed,
    /// Handed over to another party.
    #[serde(rename = "transferida")]
    Transferred,
    /// Abandoned.
    #[serde(rename = "cancelada")]
    Cancelled,
    /// Waiting on an assessment.
    #[serde(rename = "em_analise")]
    UnderReview,
}

impl ServiceOrderStatus {
    /// Every status, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Open,
        Self::InProgress,
        Self::Completed,
        Self::Transferred,
        Self::Cancelled,
        Self::UnderReview,
    ];

    /// Returns the storage and wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "aberta",
            Self::InProgress => "em_andamento",
            Self::Completed => "concluida",
            Self::Transferred => "transferida",
            Self::Cancelled => "cancelada",
            Self::UnderReview => "em_analise",
        }
    }
}

impl fmt::Display for ServiceOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a known status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown service order status: {}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for ServiceOrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_owned()))
    }
}
