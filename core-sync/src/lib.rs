//! # Calendar Sync Module
//!
//! Bidirectional synchronization engine between the CRM calendar and
//! connected external calendars.
//!
//! ## Overview
//!
//! This module is the decision core of calendar sync. Per account it:
//! - Fetches both calendar sides within a sliding time window
//! - Enriches the fetched sets with out-of-window linked events
//! - Diffs the two sides into create/update/delete operations
//! - Resolves conflicts when both sides changed since the last sync
//! - Applies each operation with per-operation failure isolation
//! - Records attempt and outcome metadata on the account
//!
//! Persistence, scheduling, and concrete provider protocols stay behind the
//! `bridge-traits` collaborator contracts.
//!
//! ## Components
//!
//! - **Sync Coordinator** (`coordinator`): Orchestrates account sweeps,
//!   per-account cycles, single-event execution, and queued execution
//! - **Operation Discovery** (`discovery`): Diffs event sets and repairs
//!   broken linkage
//! - **Conflict Resolver** (`conflict_resolver`): Picks the authoritative
//!   version of a linked event pair
//! - **Run State Machine** (`run`): Validated phase transitions and outcome
//!   mapping for one account cycle
//! - **Sync Operations** (`operation`): The unit of work and its job-queue
//!   wire format

pub mod conflict_resolver;
pub mod coordinator;
pub mod discovery;
pub mod error;
pub mod operation;
pub mod provider;
pub mod run;

pub use conflict_resolver::{ConflictResolutionStrategy, ConflictResolver};
pub use coordinator::{SweepStats, SyncConfig, SyncCoordinator};
pub use discovery::OperationDiscovery;
pub use error::{Result, SyncError};
pub use operation::{CalendarLocation, SyncAction, SyncOperation};
pub use run::{AccountSyncReport, RunPhase, SyncOutcome, SyncRun};
