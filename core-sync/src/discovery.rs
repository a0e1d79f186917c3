//! Sync Operation Discovery
//!
//! Diffs a source event set against a target event set and produces the
//! create/update/delete operations that reconcile one sync direction, plus
//! the link repair that keeps broken pairings self-healing.
//!
//! ## Overview
//!
//! The coordinator runs discovery twice per account cycle - once per
//! direction - and concatenates the results. One pass:
//!
//! 1. Index the target events by ID and by reverse link (a target already
//!    pointing back at some source event).
//! 2. For each source event: detect tombstones (the linked counterpart
//!    vanished), match a counterpart, and emit a Create, an Update gated by
//!    the conflict resolver, or nothing.
//!
//! Discovery never talks to a provider; it is pure computation over the two
//! in-memory event lists.

use bridge_traits::calendar::CalendarEvent;
use std::collections::HashMap;
use tracing::{debug, trace};

use crate::conflict_resolver::ConflictResolver;
use crate::operation::{CalendarLocation, SyncAction, SyncOperation};

/// Discovers the sync operations that reconcile one direction
#[derive(Debug, Clone)]
pub struct OperationDiscovery {
    resolver: ConflictResolver,
}

impl OperationDiscovery {
    /// Create a discovery pass bound to a conflict resolver
    pub fn new(resolver: ConflictResolver) -> Self {
        Self { resolver }
    }

    /// The resolver used to gate content updates
    pub fn resolver(&self) -> &ConflictResolver {
        &self.resolver
    }

    /// Reconcile `source_events` against `target_events`
    ///
    /// `target_location` names the side being written; tombstone deletions go
    /// to the opposite side, since they remove the orphaned source event
    /// itself. Events without an ID are skipped entirely. Output order
    /// follows the source input order.
    ///
    /// When `allow_deletion` is false, a source event whose counterpart
    /// vanished falls through to matching and is re-created on the target
    /// side instead of being removed.
    pub fn discover_sync_operations(
        &self,
        source_events: &[CalendarEvent],
        target_events: &[CalendarEvent],
        target_location: CalendarLocation,
        allow_deletion: bool,
        user_id: &str,
        calendar_account_id: &str,
    ) -> Vec<SyncOperation> {
        // Own the target list so link repair during the pass is visible to
        // later source events without mutating the caller's data.
        let mut targets: Vec<CalendarEvent> = target_events.to_vec();

        let mut by_id: HashMap<String, usize> = HashMap::new();
        // Reverse index; duplicate links collapse to the last target indexed.
        let mut by_linked_id: HashMap<String, usize> = HashMap::new();
        for (idx, target) in targets.iter().enumerate() {
            if !target.has_id() {
                continue;
            }
            by_id.insert(target.id.clone(), idx);
            if let Some(linked) = target.linked_event_id.as_deref() {
                if !linked.is_empty() {
                    by_linked_id.insert(linked.to_string(), idx);
                }
            }
        }

        let mut operations = Vec::new();

        for source in source_events {
            if !source.has_id() {
                debug!("Skipping source event without an ID");
                continue;
            }

            // Tombstone: the counterpart this event points at no longer
            // exists, so the orphaned source event is removed on its own side.
            if let Some(linked) = source.linked_event_id.as_deref().filter(|l| !l.is_empty()) {
                if !by_id.contains_key(linked) && allow_deletion {
                    trace!(
                        event_id = %source.id,
                        linked_event_id = linked,
                        "Counterpart vanished, emitting tombstone delete"
                    );
                    operations.push(SyncOperation::new(
                        user_id,
                        calendar_account_id,
                        source.id.clone(),
                        target_location.opposite(),
                        SyncAction::Delete,
                        None,
                    ));
                    continue;
                }
            }

            let matched = source
                .linked_event_id
                .as_deref()
                .and_then(|linked| by_id.get(linked))
                .or_else(|| by_linked_id.get(source.id.as_str()))
                .copied();

            let Some(idx) = matched else {
                operations.push(SyncOperation::new(
                    user_id,
                    calendar_account_id,
                    String::new(),
                    target_location,
                    SyncAction::Create,
                    Some(source.clone()),
                ));
                continue;
            };

            let content_moves = {
                let winner = self.resolver.determine_winning_event(&targets[idx], source);
                winner.id == source.id
            };
            let link_stale = targets[idx].linked_event_id.as_deref() != Some(source.id.as_str());

            if !content_moves && !link_stale {
                trace!(event_id = %source.id, "Pair already in sync");
                continue;
            }

            let subject_id = targets[idx].id.clone();
            targets[idx].linked_event_id = Some(source.id.clone());
            operations.push(SyncOperation::new(
                user_id,
                calendar_account_id,
                subject_id,
                target_location,
                SyncAction::Update,
                Some(source.clone()),
            ));
        }

        operations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict_resolver::ConflictResolutionStrategy;
    use bridge_traits::calendar::EventType;
    use chrono::{TimeZone, Utc};

    fn discovery() -> OperationDiscovery {
        OperationDiscovery::new(ConflictResolver::new(ConflictResolutionStrategy::Timestamp))
    }

    fn event(id: &str, name: &str, modified: i64, is_external: bool) -> CalendarEvent {
        CalendarEvent {
            id: id.to_string(),
            name: name.to_string(),
            description: "desc".to_string(),
            location: "room".to_string(),
            date_start: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            date_end: Some(Utc.timestamp_opt(1_700_003_600, 0).unwrap()),
            assigned_user_id: "u1".to_string(),
            event_type: EventType::Meeting,
            linked_event_id: None,
            last_sync: None,
            date_modified: Utc.timestamp_opt(modified, 0).unwrap(),
            is_external,
        }
    }

    fn linked(mut e: CalendarEvent, counterpart: &str) -> CalendarEvent {
        e.linked_event_id = Some(counterpart.to_string());
        e
    }

    fn discover(
        d: &OperationDiscovery,
        sources: &[CalendarEvent],
        targets: &[CalendarEvent],
        allow_deletion: bool,
    ) -> Vec<SyncOperation> {
        d.discover_sync_operations(
            sources,
            targets,
            CalendarLocation::Internal,
            allow_deletion,
            "u1",
            "acc-1",
        )
    }

    #[test]
    fn test_unmatched_source_emits_create() {
        let d = discovery();
        let sources = vec![event("ext-1", "Standup", 1_700_000_100, true)];

        let ops = discover(&d, &sources, &[], true);

        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].action, SyncAction::Create);
        assert_eq!(ops[0].location, CalendarLocation::Internal);
        assert_eq!(ops[0].subject_id, "");
        assert_eq!(ops[0].payload.as_ref().unwrap().id, "ext-1");
    }

    #[test]
    fn test_tombstone_emits_delete_at_opposite_location() {
        let d = discovery();
        let sources = vec![linked(event("s1", "Standup", 1_700_000_000, true), "t1")];

        let ops = discover(&d, &sources, &[], true);

        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].action, SyncAction::Delete);
        assert_eq!(ops[0].location, CalendarLocation::External);
        assert_eq!(ops[0].subject_id, "s1");
        assert!(ops[0].payload.is_none());
        assert!(!ops.iter().any(|op| op.action == SyncAction::Create));
    }

    #[test]
    fn test_orphan_recreated_when_deletion_disallowed() {
        let d = discovery();
        let sources = vec![linked(event("s1", "Standup", 1_700_000_000, true), "t1")];

        let ops = discover(&d, &sources, &[], false);

        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].action, SyncAction::Create);
        assert_eq!(ops[0].location, CalendarLocation::Internal);
    }

    #[test]
    fn test_matched_newer_source_emits_update() {
        let d = discovery();
        let targets = vec![linked(event("t1", "Standup", 1_700_000_000, false), "s1")];
        let sources = vec![linked(event("s1", "Standup (moved)", 1_700_000_100, true), "t1")];

        let ops = discover(&d, &sources, &targets, true);

        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].action, SyncAction::Update);
        assert_eq!(ops[0].subject_id, "t1");
        assert_eq!(ops[0].payload.as_ref().unwrap().id, "s1");
    }

    #[test]
    fn test_matched_older_source_is_skipped() {
        let d = discovery();
        let targets = vec![linked(event("t1", "Standup (edited)", 1_700_000_200, false), "s1")];
        let sources = vec![linked(event("s1", "Standup", 1_700_000_100, true), "t1")];

        let ops = discover(&d, &sources, &targets, true);

        assert!(ops.is_empty());
    }

    #[test]
    fn test_link_repair_fires_without_content_change() {
        let d = discovery();
        // Target content identical but its stored link does not point back
        let targets = vec![event("t1", "Standup", 1_700_000_000, false)];
        let sources = vec![linked(event("s1", "Standup", 1_700_000_000, true), "t1")];

        let ops = discover(&d, &sources, &targets, true);

        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].action, SyncAction::Update);
        assert_eq!(ops[0].subject_id, "t1");
    }

    #[test]
    fn test_reverse_link_match_without_forward_link() {
        let d = discovery();
        // Source does not know its counterpart, but the target points back
        let targets = vec![linked(event("t1", "Standup", 1_700_000_000, false), "s1")];
        let sources = vec![event("s1", "Standup (moved)", 1_700_000_100, true)];

        let ops = discover(&d, &sources, &targets, true);

        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].action, SyncAction::Update);
        assert_eq!(ops[0].subject_id, "t1");
    }

    #[test]
    fn test_events_without_id_are_skipped_entirely() {
        let d = discovery();
        let sources = vec![event("", "Ghost", 1_700_000_100, true)];

        let ops = discover(&d, &sources, &[], true);

        assert!(ops.is_empty());
    }

    #[test]
    fn test_discovery_is_idempotent_once_linked() {
        let d = discovery();
        let targets = vec![linked(event("t1", "Standup", 1_700_000_100, false), "s1")];
        let mut source = linked(event("s1", "Standup", 1_700_000_100, true), "t1");
        source.name = "Standup".to_string();
        let sources = vec![source];

        // Content equal, links both in place: the second run of an applied
        // first run discovers nothing.
        let ops = discover(&d, &sources, &targets, true);
        assert!(ops.is_empty());

        let ops_again = discover(&d, &sources, &targets, true);
        assert!(ops_again.is_empty());
    }

    #[test]
    fn test_output_preserves_source_order() {
        let d = discovery();
        let sources = vec![
            event("ext-b", "Second", 1_700_000_100, true),
            event("ext-a", "First", 1_700_000_100, true),
        ];

        let ops = discover(&d, &sources, &[], true);

        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].payload.as_ref().unwrap().id, "ext-b");
        assert_eq!(ops[1].payload.as_ref().unwrap().id, "ext-a");
    }

    #[test]
    fn test_duplicate_reverse_links_collapse_to_last() {
        let d = discovery();
        // Two targets claim the same source; the last indexed one wins.
        let targets = vec![
            linked(event("t1", "Standup", 1_700_000_000, false), "s1"),
            linked(event("t2", "Standup", 1_700_000_000, false), "s1"),
        ];
        let sources = vec![event("s1", "Standup (moved)", 1_700_000_100, true)];

        let ops = discover(&d, &sources, &targets, true);

        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].subject_id, "t2");
    }

    #[test]
    fn test_link_repair_visible_to_later_duplicates() {
        let d = discovery();
        // First source repairs the target's missing link; the duplicate then
        // matches the repaired target and sees nothing left to do.
        let targets = vec![event("t1", "Standup", 1_700_000_000, false)];
        let sources = vec![
            linked(event("s1", "Standup", 1_700_000_000, true), "t1"),
            linked(event("s1", "Standup", 1_700_000_000, true), "t1"),
        ];

        let ops = discover(&d, &sources, &targets, true);

        assert_eq!(ops.len(), 1);
    }
}
