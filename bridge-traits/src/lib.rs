//! # Collaborator Bridge Traits
//!
//! Contracts between the calendar sync core and the infrastructure that
//! surrounds it inside the CRM.
//!
//! ## Overview
//!
//! The sync core makes decisions; everything that touches the outside world
//! is reached through a trait defined here and implemented by excluded
//! infrastructure:
//!
//! - [`CalendarConnector`](calendar::CalendarConnector) - one calendar side
//!   (CRM-internal store or an external backend adapter)
//! - [`AccountStore`](account::AccountStore) - account lookup and sync-status
//!   metadata persistence
//! - [`JobQueue`](jobs::JobQueue) - asynchronous execution of account- and
//!   event-level sync units
//! - [`Clock`](time::Clock) - time source for deterministic testing
//!
//! The crate also owns the normalized data model shared with adapters:
//! [`CalendarEvent`](calendar::CalendarEvent) and the account metadata types.
//!
//! ## Error Handling
//!
//! All traits use [`BridgeError`](error::BridgeError). Implementations should
//! convert their backend-specific errors and keep messages actionable; the
//! core logs them verbatim.
//!
//! ## Thread Safety
//!
//! All traits require `Send + Sync`; worker processes may drive different
//! accounts concurrently through the same trait objects.

pub mod account;
pub mod calendar;
pub mod error;
pub mod jobs;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use account::{AccountStore, CalendarAccount, ProviderKind, SyncMetadataUpdate};
pub use calendar::{
    CalendarConnector, CalendarEvent, ConnectionTestResult, EventQuery, EventType,
};
pub use jobs::{JobId, JobQueue};
pub use time::{Clock, SystemClock};
