//! Calendar Model and Provider Abstraction
//!
//! Defines the normalized calendar event model exchanged between the sync
//! core and provider adapters, plus the `CalendarConnector` trait that each
//! adapter (Google, CalDAV, JSON file, CRM-internal) must implement.
//!
//! ## Hook-based provider contract
//!
//! `CalendarConnector` deliberately exposes only the raw hook methods
//! (`do_create_event`, `do_update_event`, `do_delete_event`, ...). The fixed
//! pre/post policy that must run around every create/update — stamping the
//! payload's `last_sync` with the cycle's sync time — lives in the sync core
//! (`core-sync::provider`) and cannot be overridden by adapters.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::str::FromStr;

use crate::error::{BridgeError, Result};

/// Kind of calendar item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    /// A meeting with participants
    Meeting,
    /// A phone call
    Call,
    /// A task with a due window
    Task,
}

impl EventType {
    /// Get the string representation used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Meeting => "meeting",
            EventType::Call => "call",
            EventType::Task => "task",
        }
    }
}

impl FromStr for EventType {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "meeting" => Ok(EventType::Meeting),
            "call" => Ok(EventType::Call),
            "task" => Ok(EventType::Task),
            _ => Err(BridgeError::OperationFailed(format!(
                "Unknown event type: {}",
                s
            ))),
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A normalized calendar event from either sync side
///
/// Constructed by provider adapters when listing or fetching events. The sync
/// core treats the content fields as immutable; only `linked_event_id` and
/// `last_sync` are written as part of executing a sync operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Provider-scoped event identifier
    pub id: String,

    /// Event title
    pub name: String,

    /// Free-form description
    pub description: String,

    /// Where the event takes place
    pub location: String,

    /// Start of the event
    pub date_start: DateTime<Utc>,

    /// End of the event, when the provider supplies one
    #[serde(default)]
    pub date_end: Option<DateTime<Utc>>,

    /// CRM user the event is assigned to
    pub assigned_user_id: String,

    /// Kind of calendar item
    #[serde(rename = "type")]
    pub event_type: EventType,

    /// ID of the counterpart event on the opposite sync side
    #[serde(default)]
    pub linked_event_id: Option<String>,

    /// When this pairing was last synchronized; absent means "always stale"
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,

    /// Last modification on the owning side
    pub date_modified: DateTime<Utc>,

    /// Which side this instance came from
    pub is_external: bool,
}

impl CalendarEvent {
    /// Stable hash over the content fields (name, description, location,
    /// start, end, type), used for cheap equality checks between linked
    /// event versions. Linkage and bookkeeping fields do not participate.
    pub fn content_checksum(&self) -> String {
        let end = self
            .date_end
            .map(|d| d.timestamp().to_string())
            .unwrap_or_default();
        let canonical = format!(
            "{}\x1f{}\x1f{}\x1f{}\x1f{}\x1f{}",
            self.name,
            self.description,
            self.location,
            self.date_start.timestamp(),
            end,
            self.event_type.as_str(),
        );

        let digest = Sha256::digest(canonical.as_bytes());
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// The last synchronization instant, defaulting to the far past when the
    /// pairing has never been synchronized.
    pub fn last_sync_or_epoch(&self) -> DateTime<Utc> {
        self.last_sync.unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Whether this event carries a usable identifier
    pub fn has_id(&self) -> bool {
        !self.id.is_empty()
    }

    /// Check the structural invariants of the event
    ///
    /// # Errors
    ///
    /// Returns an error if `date_end` precedes `date_start`.
    pub fn validate(&self) -> Result<()> {
        if let Some(end) = self.date_end {
            if self.date_start > end {
                return Err(BridgeError::OperationFailed(format!(
                    "Event {} has date_start after date_end",
                    self.id
                )));
            }
        }
        Ok(())
    }
}

/// Query constraints for listing events from a provider
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    /// Only events starting at or after this instant
    pub start_date: Option<DateTime<Utc>>,

    /// Only events starting at or before this instant
    pub end_date: Option<DateTime<Utc>>,

    /// Maximum number of events to return
    pub limit: Option<usize>,
}

impl EventQuery {
    /// Build a query covering the given window
    pub fn window(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start_date: Some(start),
            end_date: Some(end),
            limit: None,
        }
    }
}

/// Result of probing a provider connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionTestResult {
    /// Whether the provider answered
    pub success: bool,

    /// Human-readable detail (error text, calendar name, ...)
    pub message: String,
}

impl ConnectionTestResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Calendar provider adapter trait
///
/// One implementation per calendar side: the CRM-internal store and each
/// supported external backend. All methods are raw hooks; the sync core
/// layers its fixed policy on top and is the only caller.
///
/// Adapters are expected to:
/// - assign a new provider-scoped ID in `do_create_event` and record the
///   payload's `id` as the created event's counterpart linkage
/// - overwrite content fields and counterpart linkage in `do_update_event`
/// - persist the given `linked_event_id`/`sync_time` onto an event of their
///   own side in `update_source_event` without touching its content
///
/// # Example
///
/// ```ignore
/// use bridge_traits::calendar::{CalendarConnector, CalendarEvent, EventQuery};
/// use bridge_traits::error::Result;
/// use async_trait::async_trait;
///
/// pub struct JsonFileConnector { /* ... */ }
///
/// #[async_trait]
/// impl CalendarConnector for JsonFileConnector {
///     async fn get_events(&self, query: &EventQuery) -> Result<Vec<CalendarEvent>> {
///         // Implementation
///         todo!()
///     }
///     // ...
/// }
/// ```
#[async_trait]
pub trait CalendarConnector: Send + Sync {
    /// Probe the connection without mutating anything
    async fn test_connection(&self) -> Result<ConnectionTestResult>;

    /// List events within the query constraints
    async fn get_events(&self, query: &EventQuery) -> Result<Vec<CalendarEvent>>;

    /// Fetch a single event by its provider-scoped ID
    ///
    /// Returns `Ok(None)` if the event does not exist.
    async fn get_event(&self, event_id: &str) -> Result<Option<CalendarEvent>>;

    /// Create an event on this side from the given source payload
    ///
    /// Returns the newly assigned provider-scoped ID. The payload's `id`
    /// names the source-side counterpart and must be recorded as the new
    /// event's linkage.
    async fn do_create_event(
        &self,
        event: &CalendarEvent,
        sync_time: DateTime<Utc>,
    ) -> Result<String>;

    /// Overwrite the content of an existing event from the source payload
    async fn do_update_event(
        &self,
        target_id: &str,
        event: &CalendarEvent,
        sync_time: DateTime<Utc>,
    ) -> Result<()>;

    /// Write linkage back onto an event of this side
    ///
    /// Sets the event's counterpart reference to `target_id` and stamps its
    /// `last_sync` with `sync_time`. Content fields are left untouched.
    async fn update_source_event(
        &self,
        target_id: &str,
        source: &CalendarEvent,
        sync_time: DateTime<Utc>,
    ) -> Result<()>;

    /// Delete an event from this side
    async fn do_delete_event(&self, target_id: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(name: &str, start: i64) -> CalendarEvent {
        CalendarEvent {
            id: "ev-1".to_string(),
            name: name.to_string(),
            description: "desc".to_string(),
            location: "room 1".to_string(),
            date_start: Utc.timestamp_opt(start, 0).unwrap(),
            date_end: Some(Utc.timestamp_opt(start + 3600, 0).unwrap()),
            assigned_user_id: "user-1".to_string(),
            event_type: EventType::Meeting,
            linked_event_id: None,
            last_sync: None,
            date_modified: Utc.timestamp_opt(start, 0).unwrap(),
            is_external: false,
        }
    }

    #[test]
    fn test_event_type_round_trip() {
        assert_eq!("meeting".parse::<EventType>().unwrap(), EventType::Meeting);
        assert_eq!("CALL".parse::<EventType>().unwrap(), EventType::Call);
        assert_eq!("task".parse::<EventType>().unwrap(), EventType::Task);
        assert!("appointment".parse::<EventType>().is_err());
        assert_eq!(EventType::Meeting.as_str(), "meeting");
    }

    #[test]
    fn test_checksum_stable_across_linkage_changes() {
        let mut a = event("Standup", 1_700_000_000);
        let baseline = a.content_checksum();

        a.linked_event_id = Some("other-side".to_string());
        a.last_sync = Some(Utc.timestamp_opt(1_700_000_500, 0).unwrap());
        a.date_modified = Utc.timestamp_opt(1_700_000_500, 0).unwrap();
        assert_eq!(a.content_checksum(), baseline);
    }

    #[test]
    fn test_checksum_differs_on_content_change() {
        let a = event("Standup", 1_700_000_000);
        let b = event("Retro", 1_700_000_000);
        assert_ne!(a.content_checksum(), b.content_checksum());

        let mut c = event("Standup", 1_700_000_000);
        c.date_end = None;
        assert_ne!(a.content_checksum(), c.content_checksum());
    }

    #[test]
    fn test_validate_rejects_inverted_window() {
        let mut a = event("Standup", 1_700_000_000);
        a.date_end = Some(Utc.timestamp_opt(1_600_000_000, 0).unwrap());
        assert!(a.validate().is_err());

        a.date_end = None;
        assert!(a.validate().is_ok());
    }

    #[test]
    fn test_last_sync_defaults_to_far_past() {
        let mut a = event("Standup", 1_700_000_000);
        assert_eq!(a.last_sync_or_epoch(), DateTime::<Utc>::MIN_UTC);

        let stamped = Utc.timestamp_opt(1_700_000_100, 0).unwrap();
        a.last_sync = Some(stamped);
        assert_eq!(a.last_sync_or_epoch(), stamped);
    }

    #[test]
    fn test_event_wire_field_names() {
        let a = event("Standup", 1_700_000_000);
        let json = serde_json::to_value(&a).unwrap();

        assert_eq!(json["type"], "meeting");
        assert!(json.get("date_start").is_some());
        assert!(json.get("linked_event_id").is_some());
        assert_eq!(json["is_external"], false);
    }
}
