//! Conflict Resolution for Linked Event Pairs
//!
//! Decides which version of a linked event pair is authoritative when both
//! sides changed since the last synchronization.
//!
//! ## Overview
//!
//! The resolver is pure decision logic over two already-validated events. It
//! is only invoked by discovery once a counterpart match exists; the "nothing
//! to do" cases are filtered out upstream. Cheap checks run before expensive
//! ones: a content-checksum comparison short-circuits convergent edits before
//! any strategy logic is consulted.
//!
//! ## Strategies
//!
//! - **Timestamp**: the later `date_modified` wins, compared at second
//!   granularity; an exact tie falls to the lexicographically smaller event
//!   ID, which keeps the choice stable across cycles and prevents two
//!   indistinguishable clocks from ping-ponging writes.
//! - **ExternalBased**: the external side wins whenever exactly one of the
//!   two versions is external; otherwise the Timestamp rule applies.
//! - **InternalBased**: mirror of ExternalBased.
//!
//! ## Usage
//!
//! ```ignore
//! use core_sync::conflict_resolver::{ConflictResolutionStrategy, ConflictResolver};
//!
//! let resolver = ConflictResolver::new(ConflictResolutionStrategy::Timestamp);
//! let winner = resolver.determine_winning_event(&target, &source);
//! ```

use bridge_traits::calendar::CalendarEvent;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::warn;

use crate::error::{Result, SyncError};

/// Content markers that should never appear in calendar fields
const UNSAFE_CONTENT_MARKERS: &[&str] = &["<script", "javascript:", "onerror="];

/// Upper bound of a signed 32-bit epoch timestamp
const EPOCH_32BIT_MAX: i64 = i32::MAX as i64;

/// How to pick a winner when both sides changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictResolutionStrategy {
    /// Later modification wins, ties broken by event ID
    #[default]
    Timestamp,

    /// The external calendar is authoritative
    #[serde(rename = "external")]
    ExternalBased,

    /// The CRM-side calendar is authoritative
    #[serde(rename = "internal")]
    InternalBased,
}

impl ConflictResolutionStrategy {
    /// Get the string representation for configuration storage
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictResolutionStrategy::Timestamp => "timestamp",
            ConflictResolutionStrategy::ExternalBased => "external",
            ConflictResolutionStrategy::InternalBased => "internal",
        }
    }
}

impl FromStr for ConflictResolutionStrategy {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "timestamp" => Ok(ConflictResolutionStrategy::Timestamp),
            "external" => Ok(ConflictResolutionStrategy::ExternalBased),
            "internal" => Ok(ConflictResolutionStrategy::InternalBased),
            _ => Err(SyncError::InvalidStrategy(s.to_string())),
        }
    }
}

impl std::fmt::Display for ConflictResolutionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Conflict resolver for linked event pairs
#[derive(Debug, Clone)]
pub struct ConflictResolver {
    strategy: ConflictResolutionStrategy,
}

impl ConflictResolver {
    /// Create a resolver with the deployment's configured strategy
    pub fn new(strategy: ConflictResolutionStrategy) -> Self {
        Self { strategy }
    }

    /// The configured strategy
    pub fn strategy(&self) -> ConflictResolutionStrategy {
        self.strategy
    }

    /// Choose the authoritative version of a linked event pair
    ///
    /// `target` is the current value on the sync target side, `source` the
    /// candidate from the sync source side. Returns one of the two inputs,
    /// never a constructed event. Identical content returns `target` so no
    /// pointless write is emitted downstream.
    pub fn determine_winning_event<'a>(
        &self,
        target: &'a CalendarEvent,
        source: &'a CalendarEvent,
    ) -> &'a CalendarEvent {
        scan_event_diagnostics(target);
        scan_event_diagnostics(source);

        if target.content_checksum() == source.content_checksum() {
            return target;
        }

        match self.strategy {
            ConflictResolutionStrategy::Timestamp => later_modified(target, source),
            ConflictResolutionStrategy::ExternalBased => {
                if target.is_external != source.is_external {
                    if target.is_external {
                        target
                    } else {
                        source
                    }
                } else {
                    later_modified(target, source)
                }
            }
            ConflictResolutionStrategy::InternalBased => {
                if target.is_external != source.is_external {
                    if target.is_external {
                        source
                    } else {
                        target
                    }
                } else {
                    later_modified(target, source)
                }
            }
        }
    }
}

/// Timestamp rule: later `date_modified` wins at second granularity, exact
/// ties fall to the lexicographically smaller event ID.
fn later_modified<'a>(
    target: &'a CalendarEvent,
    source: &'a CalendarEvent,
) -> &'a CalendarEvent {
    let target_modified = target.date_modified.timestamp();
    let source_modified = source.date_modified.timestamp();

    if source_modified > target_modified {
        source
    } else if target_modified > source_modified {
        target
    } else if target.id <= source.id {
        target
    } else {
        source
    }
}

/// Observability-only scan; never blocks resolution.
fn scan_event_diagnostics(event: &CalendarEvent) {
    if event.date_modified.timestamp() > EPOCH_32BIT_MAX {
        warn!(
            event_id = %event.id,
            date_modified = %event.date_modified,
            "Event modification timestamp exceeds the 32-bit epoch range"
        );
    }

    for field in [&event.name, &event.description, &event.location] {
        let lowered = field.to_lowercase();
        if UNSAFE_CONTENT_MARKERS.iter().any(|m| lowered.contains(m)) {
            warn!(event_id = %event.id, "Event content matches an unsafe pattern");
            break;
        }
    }
}
