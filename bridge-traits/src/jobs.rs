//! Job Queue Abstraction
//!
//! The sync core never runs its own workers. Account-level and event-level
//! sync units are handed to an external queue/worker-pool through this trait;
//! the queue owns scheduling, retry policy, and worker processes.

use async_trait::async_trait;

use crate::error::Result;

/// Identifier of an enqueued job
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(pub String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job queue trait
///
/// "Active" means queued or running. The activity checks are the only
/// safeguard against redundant concurrent work for the same target; the core
/// consults them before every enqueue.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Whether an account-level sync job is queued or running for this account
    async fn is_account_job_active(&self, account_id: &str) -> Result<bool>;

    /// Whether an event-level sync job is queued or running for this
    /// (account, location, event) key
    async fn is_meeting_job_active(&self, operation_key: &str) -> Result<bool>;

    /// Enqueue an account-level sync job
    async fn enqueue_account_job(&self, account_id: &str) -> Result<JobId>;

    /// Enqueue an event-level sync job carrying a serialized operation
    async fn enqueue_meeting_job(&self, serialized_operation: &str) -> Result<JobId>;

    /// Cancel event-level jobs for this key that are queued but not started
    ///
    /// Running jobs are not touched. Returns the number of jobs cancelled.
    async fn cancel_pending_meeting_jobs(&self, operation_key: &str) -> Result<usize>;
}
