//! # Sync Operations
//!
//! One sync operation is one unit of work against one calendar side: an
//! action, a target location, and optionally a payload. Operations are
//! produced by discovery (or directly by a single-event change hook),
//! consumed once by the coordinator, and may round-trip through the job
//! queue as JSON in between.
//!
//! ## Wire format
//!
//! ```json
//! {
//!   "user_id": "u1",
//!   "subject_id": "crm-42",
//!   "location": "internal",
//!   "action": "update",
//!   "calendar_account_id": "acc-1",
//!   "payload": { "id": "ext-7", "name": "...", ... }
//! }
//! ```

use crate::error::{Result, SyncError};
use bridge_traits::calendar::CalendarEvent;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which calendar side an operation writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarLocation {
    /// The CRM-side calendar store
    Internal,
    /// The connected external calendar
    External,
}

impl CalendarLocation {
    /// The other side
    pub fn opposite(&self) -> Self {
        match self {
            CalendarLocation::Internal => CalendarLocation::External,
            CalendarLocation::External => CalendarLocation::Internal,
        }
    }

    /// Get the string representation used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            CalendarLocation::Internal => "internal",
            CalendarLocation::External => "external",
        }
    }
}

impl FromStr for CalendarLocation {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "internal" => Ok(CalendarLocation::Internal),
            "external" => Ok(CalendarLocation::External),
            _ => Err(SyncError::InvalidLocation(s.to_string())),
        }
    }
}

impl std::fmt::Display for CalendarLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What an operation does to its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    /// Create a counterpart event on the target side
    Create,
    /// Overwrite the target event's content from the payload
    Update,
    /// Remove the target event
    Delete,
}

impl SyncAction {
    /// Get the string representation used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncAction::Create => "create",
            SyncAction::Update => "update",
            SyncAction::Delete => "delete",
        }
    }
}

impl FromStr for SyncAction {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "create" => Ok(SyncAction::Create),
            "update" => Ok(SyncAction::Update),
            "delete" => Ok(SyncAction::Delete),
            _ => Err(SyncError::InvalidAction(s.to_string())),
        }
    }
}

impl std::fmt::Display for SyncAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One unit of sync work
///
/// Always construct through [`SyncOperation::new`]; the factory normalizes
/// the action-dependent fields unconditionally so the invariants
/// `action == Delete ⟺ payload == None` and `action == Create ⟺
/// subject_id == ""` hold for every instance it hands out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncOperation {
    /// Owning CRM user
    pub user_id: String,

    /// Target event ID on the write side; empty for Create
    pub subject_id: String,

    /// Which side this operation writes to
    pub location: CalendarLocation,

    /// What to do there
    pub action: SyncAction,

    /// The calendar account this work belongs to
    pub calendar_account_id: String,

    /// Source data to write; absent for Delete
    #[serde(default)]
    pub payload: Option<CalendarEvent>,
}

impl SyncOperation {
    /// Build a sync operation, normalizing action-dependent fields
    ///
    /// For `Create` the subject ID is forced to empty regardless of the
    /// passed value; for `Delete` the payload is forced to `None` regardless
    /// of the passed value.
    pub fn new(
        user_id: impl Into<String>,
        calendar_account_id: impl Into<String>,
        subject_id: impl Into<String>,
        location: CalendarLocation,
        action: SyncAction,
        payload: Option<CalendarEvent>,
    ) -> Self {
        let subject_id = match action {
            SyncAction::Create => String::new(),
            _ => subject_id.into(),
        };
        let payload = match action {
            SyncAction::Delete => None,
            _ => payload,
        };

        Self {
            user_id: user_id.into(),
            subject_id,
            location,
            action,
            calendar_account_id: calendar_account_id.into(),
            payload,
        }
    }

    /// Stable key identifying the (account, location, event) triple
    ///
    /// Used by the job queue for duplicate suppression and pending-job
    /// cancellation. For Create operations the event identity comes from the
    /// payload, since no target-side ID exists yet.
    pub fn operation_key(&self) -> String {
        let event_id = if self.subject_id.is_empty() {
            self.payload.as_ref().map(|p| p.id.as_str()).unwrap_or("")
        } else {
            self.subject_id.as_str()
        };

        format!(
            "{}:{}:{}",
            self.calendar_account_id,
            self.location.as_str(),
            event_id
        )
    }

    /// Serialize to the job-queue wire format
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| SyncError::Serialization(e.to_string()))
    }

    /// Deserialize from the job-queue wire format
    ///
    /// # Errors
    ///
    /// Rejects payloads missing `subject_id`, `location`, or `action`,
    /// unknown location/action values, an empty `subject_id` for any action
    /// other than Create, a missing event payload for Create/Update, and
    /// payload events whose end precedes their start.
    pub fn from_json(raw: &str) -> Result<Self> {
        let operation: SyncOperation =
            serde_json::from_str(raw).map_err(|e| SyncError::Serialization(e.to_string()))?;
        operation.validate()?;
        Ok(operation)
    }

    /// Check the action-dependent field invariants
    pub fn validate(&self) -> Result<()> {
        match self.action {
            SyncAction::Create => {
                if self.payload.is_none() {
                    return Err(SyncError::InvalidInput {
                        field: "payload".to_string(),
                        message: "Create operation requires an event payload".to_string(),
                    });
                }
            }
            SyncAction::Update => {
                if self.subject_id.is_empty() {
                    return Err(SyncError::InvalidInput {
                        field: "subject_id".to_string(),
                        message: "Update operation requires a target event ID".to_string(),
                    });
                }
                if self.payload.is_none() {
                    return Err(SyncError::InvalidInput {
                        field: "payload".to_string(),
                        message: "Update operation requires an event payload".to_string(),
                    });
                }
            }
            SyncAction::Delete => {
                if self.subject_id.is_empty() {
                    return Err(SyncError::InvalidInput {
                        field: "subject_id".to_string(),
                        message: "Delete operation requires a target event ID".to_string(),
                    });
                }
            }
        }

        if let Some(payload) = &self.payload {
            payload
                .validate()
                .map_err(|e| SyncError::Serialization(e.to_string()))?;
        }

        Ok(())
    }
}
