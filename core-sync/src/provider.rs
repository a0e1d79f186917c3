//! Fixed Policy Around Connector Hooks
//!
//! `CalendarConnector` exposes raw hooks; every write the sync engine makes
//! goes through these functions instead, so the pre/post steps run for every
//! adapter and cannot be overridden. The only policy today is stamping the
//! payload's `last_sync` with the cycle's sync time before it reaches the
//! adapter.

use bridge_traits::calendar::{CalendarConnector, CalendarEvent};
use chrono::{DateTime, Utc};

use crate::error::{Result, SyncError};

/// Create a counterpart event from a source payload
///
/// Stamps the payload's `last_sync` before handing it to the adapter.
/// Returns the ID the adapter assigned on its side.
pub async fn create_event_from_source(
    connector: &dyn CalendarConnector,
    source: &CalendarEvent,
    sync_time: DateTime<Utc>,
) -> Result<String> {
    let mut payload = source.clone();
    payload.last_sync = Some(sync_time);

    connector
        .do_create_event(&payload, sync_time)
        .await
        .map_err(|e| SyncError::Provider(e.to_string()))
}

/// Overwrite a target event's content from a source payload
pub async fn update_event_from_source(
    connector: &dyn CalendarConnector,
    target_id: &str,
    source: &CalendarEvent,
    sync_time: DateTime<Utc>,
) -> Result<()> {
    let mut payload = source.clone();
    payload.last_sync = Some(sync_time);

    connector
        .do_update_event(target_id, &payload, sync_time)
        .await
        .map_err(|e| SyncError::Provider(e.to_string()))
}

/// Write the target-side ID back onto the source event's linkage
pub async fn write_link_back(
    connector: &dyn CalendarConnector,
    target_id: &str,
    source: &CalendarEvent,
    sync_time: DateTime<Utc>,
) -> Result<()> {
    connector
        .update_source_event(target_id, source, sync_time)
        .await
        .map_err(|e| SyncError::Provider(e.to_string()))
}

/// Delete a target event
pub async fn delete_event(connector: &dyn CalendarConnector, target_id: &str) -> Result<()> {
    connector
        .do_delete_event(target_id)
        .await
        .map_err(|e| SyncError::Provider(e.to_string()))
}
