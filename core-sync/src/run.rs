//! # Account Sync Run State Machine
//!
//! Tracks one account's sync cycle through validated phase transitions and
//! maps its final counts onto the status recorded in the account metadata.
//!
//! ## State Machine
//!
//! ```text
//! NotStarted → AttemptRecorded → EventsFetched → EventsEnriched
//!     → OperationsDiscovered → OperationsApplied → MetadataFinalized
//!
//! any non-terminal state → ErrorRecorded
//! ```
//!
//! `MetadataFinalized` and `ErrorRecorded` are terminal. An error during
//! fetch or discovery aborts the whole run for that account; it is not
//! recoverable within the same run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

/// Phase of one account's sync run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// Run object created, nothing recorded yet
    NotStarted,
    /// Attempt metadata written to the account
    AttemptRecorded,
    /// Both sides fetched within the sync window
    EventsFetched,
    /// Out-of-window linked events pulled in
    EventsEnriched,
    /// Discovery produced the operation list
    OperationsDiscovered,
    /// Operations applied up to the per-account cap
    OperationsApplied,
    /// Final status written to the account
    MetadataFinalized,
    /// Unhandled failure recorded; run aborted
    ErrorRecorded,
}

impl RunPhase {
    /// Check if this phase represents a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunPhase::MetadataFinalized | RunPhase::ErrorRecorded)
    }

    /// Get the string representation for logs
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::NotStarted => "not_started",
            RunPhase::AttemptRecorded => "attempt_recorded",
            RunPhase::EventsFetched => "events_fetched",
            RunPhase::EventsEnriched => "events_enriched",
            RunPhase::OperationsDiscovered => "operations_discovered",
            RunPhase::OperationsApplied => "operations_applied",
            RunPhase::MetadataFinalized => "metadata_finalized",
            RunPhase::ErrorRecorded => "error_recorded",
        }
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Summary status of a finished run
///
/// Serialized into the account's `last_sync_attempt_status` /
/// `last_sync_attempt_message` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Nothing to do; both sides already agreed
    UpToDate,
    /// Every discovered operation executed
    Complete,
    /// Operation cap reached; remainder deferred to the next cycle
    Partial,
    /// At least one operation failed; the rest were still applied
    MeetingsFailed,
    /// The run itself aborted before finishing
    Failed,
}

impl SyncOutcome {
    /// Derive the outcome from a finished run's counts
    pub fn from_counts(discovered: usize, executed: usize, failed: usize) -> Self {
        if failed > 0 {
            SyncOutcome::MeetingsFailed
        } else if discovered == 0 {
            SyncOutcome::UpToDate
        } else if executed + failed < discovered {
            SyncOutcome::Partial
        } else {
            SyncOutcome::Complete
        }
    }

    /// The status token ("success", "warning", "error")
    pub fn status(&self) -> &'static str {
        match self {
            SyncOutcome::UpToDate | SyncOutcome::Complete | SyncOutcome::Partial => "success",
            SyncOutcome::MeetingsFailed => "warning",
            SyncOutcome::Failed => "error",
        }
    }

    /// The message token stored alongside the status
    pub fn message(&self) -> &'static str {
        match self {
            SyncOutcome::UpToDate => "up_to_date",
            SyncOutcome::Complete => "sync_complete",
            SyncOutcome::Partial => "sync_partial",
            SyncOutcome::MeetingsFailed => "meetings_failed",
            SyncOutcome::Failed => "sync_failed",
        }
    }
}

impl std::fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.status(), self.message())
    }
}

/// Counts and outcome of one account sync
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountSyncReport {
    /// Operations discovered across both directions
    pub discovered: usize,
    /// Operations executed successfully
    pub executed: usize,
    /// Operations that failed and were skipped past
    pub failed: usize,
    /// Summary status
    pub outcome: SyncOutcome,
}

/// One account's sync run
#[derive(Debug, Clone)]
pub struct SyncRun {
    /// Account being synced
    pub account_id: String,
    /// Current phase
    pub phase: RunPhase,
    /// When the run was created
    pub started_at: DateTime<Utc>,
    /// When the run reached a terminal phase
    pub finished_at: Option<DateTime<Utc>>,
    /// Operations discovered
    pub discovered: usize,
    /// Operations executed successfully
    pub executed: usize,
    /// Operations that failed
    pub failed: usize,
    /// Error message if the run aborted
    pub error_message: Option<String>,
}

impl SyncRun {
    /// Create a run in `NotStarted`
    pub fn new(account_id: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            account_id: account_id.into(),
            phase: RunPhase::NotStarted,
            started_at,
            finished_at: None,
            discovered: 0,
            executed: 0,
            failed: 0,
            error_message: None,
        }
    }

    /// Record that the attempt metadata was written
    pub fn attempt_recorded(&mut self) -> Result<()> {
        self.transition(RunPhase::AttemptRecorded)
    }

    /// Record that both sides were fetched
    pub fn events_fetched(&mut self) -> Result<()> {
        self.transition(RunPhase::EventsFetched)
    }

    /// Record that enrichment finished
    pub fn events_enriched(&mut self) -> Result<()> {
        self.transition(RunPhase::EventsEnriched)
    }

    /// Record the discovered operation count
    pub fn operations_discovered(&mut self, discovered: usize) -> Result<()> {
        self.transition(RunPhase::OperationsDiscovered)?;
        self.discovered = discovered;
        Ok(())
    }

    /// Record the applied/failed counts
    pub fn operations_applied(&mut self, executed: usize, failed: usize) -> Result<()> {
        self.transition(RunPhase::OperationsApplied)?;
        self.executed = executed;
        self.failed = failed;
        Ok(())
    }

    /// Finish the run and derive its outcome
    ///
    /// # Errors
    ///
    /// Returns an error unless the run is in `OperationsApplied`.
    pub fn finalize(&mut self, finished_at: DateTime<Utc>) -> Result<SyncOutcome> {
        self.transition(RunPhase::MetadataFinalized)?;
        self.finished_at = Some(finished_at);
        Ok(self.outcome())
    }

    /// Abort the run with an error
    ///
    /// Valid from any non-terminal phase; a no-op error if already terminal.
    pub fn record_error(
        &mut self,
        message: impl Into<String>,
        finished_at: DateTime<Utc>,
    ) -> Result<()> {
        self.transition(RunPhase::ErrorRecorded)?;
        self.finished_at = Some(finished_at);
        self.error_message = Some(message.into());
        Ok(())
    }

    /// The outcome implied by the run's current state
    pub fn outcome(&self) -> SyncOutcome {
        if self.phase == RunPhase::ErrorRecorded {
            SyncOutcome::Failed
        } else {
            SyncOutcome::from_counts(self.discovered, self.executed, self.failed)
        }
    }

    /// Snapshot the counts into a report
    pub fn report(&self) -> AccountSyncReport {
        AccountSyncReport {
            discovered: self.discovered,
            executed: self.executed,
            failed: self.failed,
            outcome: self.outcome(),
        }
    }

    /// Validate a phase transition
    fn transition(&mut self, to: RunPhase) -> Result<()> {
        let valid = match (self.phase, to) {
            (RunPhase::NotStarted, RunPhase::AttemptRecorded) => true,
            (RunPhase::AttemptRecorded, RunPhase::EventsFetched) => true,
            (RunPhase::EventsFetched, RunPhase::EventsEnriched) => true,
            (RunPhase::EventsEnriched, RunPhase::OperationsDiscovered) => true,
            (RunPhase::OperationsDiscovered, RunPhase::OperationsApplied) => true,
            (RunPhase::OperationsApplied, RunPhase::MetadataFinalized) => true,

            // Any non-terminal phase may abort
            (from, RunPhase::ErrorRecorded) if !from.is_terminal() => true,

            _ => false,
        };

        if !valid {
            return Err(SyncError::InvalidStateTransition {
                from: self.phase.as_str().to_string(),
                to: to.as_str().to_string(),
                reason: format!(
                    "Cannot transition from {} to {}",
                    self.phase.as_str(),
                    to.as_str()
                ),
            });
        }

        self.phase = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn run_through_applied(discovered: usize, executed: usize, failed: usize) -> SyncRun {
        let mut run = SyncRun::new("acc-1", t0());
        run.attempt_recorded().unwrap();
        run.events_fetched().unwrap();
        run.events_enriched().unwrap();
        run.operations_discovered(discovered).unwrap();
        run.operations_applied(executed, failed).unwrap();
        run
    }

    #[test]
    fn test_full_workflow() {
        let mut run = run_through_applied(3, 3, 0);
        let outcome = run.finalize(t0()).unwrap();

        assert_eq!(run.phase, RunPhase::MetadataFinalized);
        assert!(run.phase.is_terminal());
        assert!(run.finished_at.is_some());
        assert_eq!(outcome, SyncOutcome::Complete);
    }

    #[test]
    fn test_phases_cannot_be_skipped() {
        let mut run = SyncRun::new("acc-1", t0());

        assert!(run.events_fetched().is_err());
        assert!(run.operations_discovered(1).is_err());
        assert!(run.finalize(t0()).is_err());

        run.attempt_recorded().unwrap();
        assert!(run.attempt_recorded().is_err());
        assert!(run.events_enriched().is_err());
    }

    #[test]
    fn test_error_recorded_from_any_non_terminal_phase() {
        let mut fresh = SyncRun::new("acc-1", t0());
        assert!(fresh.record_error("boom", t0()).is_ok());
        assert_eq!(fresh.phase, RunPhase::ErrorRecorded);
        assert_eq!(fresh.outcome(), SyncOutcome::Failed);

        let mut fetched = SyncRun::new("acc-2", t0());
        fetched.attempt_recorded().unwrap();
        fetched.events_fetched().unwrap();
        assert!(fetched.record_error("boom", t0()).is_ok());
        assert_eq!(fetched.error_message.as_deref(), Some("boom"));
    }

    #[test]
    fn test_terminal_phases_cannot_transition() {
        let mut run = run_through_applied(0, 0, 0);
        run.finalize(t0()).unwrap();

        assert!(run.record_error("late", t0()).is_err());

        let mut errored = SyncRun::new("acc-1", t0());
        errored.record_error("boom", t0()).unwrap();
        assert!(errored.attempt_recorded().is_err());
        assert!(errored.record_error("again", t0()).is_err());
    }

    #[test]
    fn test_outcome_up_to_date() {
        assert_eq!(SyncOutcome::from_counts(0, 0, 0), SyncOutcome::UpToDate);
        assert_eq!(SyncOutcome::UpToDate.status(), "success");
        assert_eq!(SyncOutcome::UpToDate.message(), "up_to_date");
    }

    #[test]
    fn test_outcome_complete() {
        assert_eq!(SyncOutcome::from_counts(5, 5, 0), SyncOutcome::Complete);
        assert_eq!(SyncOutcome::Complete.to_string(), "success/sync_complete");
    }

    #[test]
    fn test_outcome_partial_when_cap_reached() {
        // 10 discovered, cap of 3, all 3 succeeded
        let outcome = SyncOutcome::from_counts(10, 3, 0);
        assert_eq!(outcome, SyncOutcome::Partial);
        assert_eq!(outcome.status(), "success");
        assert_eq!(outcome.message(), "sync_partial");
    }

    #[test]
    fn test_outcome_failures_dominate_partial() {
        // Failures win over the partial classification
        assert_eq!(
            SyncOutcome::from_counts(10, 2, 1),
            SyncOutcome::MeetingsFailed
        );
        assert_eq!(SyncOutcome::from_counts(5, 4, 1), SyncOutcome::MeetingsFailed);
        assert_eq!(SyncOutcome::MeetingsFailed.status(), "warning");
    }

    #[test]
    fn test_report_snapshot() {
        let run = run_through_applied(5, 4, 1);
        let report = run.report();

        assert_eq!(report.discovered, 5);
        assert_eq!(report.executed, 4);
        assert_eq!(report.failed, 1);
        assert_eq!(report.outcome, SyncOutcome::MeetingsFailed);
    }
}
