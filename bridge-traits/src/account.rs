//! Calendar Account Store Abstraction
//!
//! A calendar account pairs one CRM user with one external calendar
//! connection. The store owning account persistence (CRUD, ACL, field
//! encryption) is outside the sync core; this module defines the narrow
//! read/update surface the core consumes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{BridgeError, Result};

/// Supported external calendar backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Google Calendar API
    Google,
    /// Any CalDAV server
    CalDav,
    /// JSON file exchange (testing and offline imports)
    JsonFile,
}

impl ProviderKind {
    /// Get the string representation for storage and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Google => "google",
            ProviderKind::CalDav => "caldav",
            ProviderKind::JsonFile => "jsonfile",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "google" => Ok(ProviderKind::Google),
            "caldav" => Ok(ProviderKind::CalDav),
            "jsonfile" => Ok(ProviderKind::JsonFile),
            _ => Err(BridgeError::OperationFailed(format!(
                "Unknown provider kind: {}",
                s
            ))),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A configured pairing of one CRM user with one external calendar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarAccount {
    /// Account identifier
    pub id: String,

    /// Owning CRM user
    pub user_id: String,

    /// Which external backend this account connects to
    pub provider: ProviderKind,

    /// Identifier of the external calendar, once known
    pub external_calendar_id: Option<String>,

    /// When the last successful sync finished
    pub last_sync_date: Option<DateTime<Utc>>,

    /// When the last sync attempt started
    pub last_sync_attempt_date: Option<DateTime<Utc>>,

    /// Status of the last attempt ("in_progress", "success", ...)
    pub last_sync_attempt_status: Option<String>,

    /// Detail message of the last attempt
    pub last_sync_attempt_message: Option<String>,

    /// Result of the last connection test
    pub last_connection_status: Option<String>,

    /// When the connection was last tested
    pub last_connection_test: Option<DateTime<Utc>>,
}

/// Partial update of an account's sync-status metadata
///
/// Only the populated fields are written; the store leaves the rest alone.
#[derive(Debug, Clone, Default)]
pub struct SyncMetadataUpdate {
    pub last_sync_date: Option<DateTime<Utc>>,
    pub last_sync_attempt_date: Option<DateTime<Utc>>,
    pub last_sync_attempt_status: Option<String>,
    pub last_sync_attempt_message: Option<String>,
    pub last_connection_status: Option<String>,
    pub last_connection_test: Option<DateTime<Utc>>,
    pub external_calendar_id: Option<String>,
}

/// Account store trait
///
/// Implemented by the CRM persistence layer. `get_validated_accounts_batch`
/// returns only accounts whose configuration passed the store's own
/// validation (credentials present, user active).
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Fetch a batch of sync-ready accounts, optionally capped
    async fn get_validated_accounts_batch(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<CalendarAccount>>;

    /// Look up one account by ID
    ///
    /// Returns `Ok(None)` if no such account exists.
    async fn find_account(&self, account_id: &str) -> Result<Option<CalendarAccount>>;

    /// Apply a partial sync-metadata update to an account
    async fn update_sync_metadata(
        &self,
        account_id: &str,
        update: SyncMetadataUpdate,
    ) -> Result<()>;
}
