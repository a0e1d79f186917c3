//! # Sync Coordinator
//!
//! Orchestrates bidirectional calendar synchronization per account.
//!
//! ## Overview
//!
//! The `SyncCoordinator` is the central orchestrator. It coordinates between
//! the collaborator traits to:
//! - Sweep validated accounts from the `AccountStore`
//! - Fetch both calendar sides within the configured sync window
//! - Enrich the fetched sets with out-of-window linked events
//! - Discover operations in both directions via `OperationDiscovery`
//! - Apply each operation with per-operation failure isolation
//! - Record attempt and outcome metadata on the account
//! - Hand account- and event-level work to the `JobQueue` in async mode
//!
//! ## Workflow
//!
//! ### Account cycle
//! 1. Record the attempt (status `in_progress`) before anything can fail
//! 2. Resolve the internal and external connectors; a missing external
//!    connector aborts the account with an error status
//! 3. Fetch both sides within `[now - past_days, now + future_days]`
//! 4. Pull in linked events that fell outside the window (failures here are
//!    tolerated and only degrade matching for this cycle)
//! 5. Discover operations: external→internal first, then internal→external
//! 6. Apply operations up to `max_operations_per_account`; one bad event
//!    never aborts the batch
//! 7. Finalize: write `last_sync_date` and the summary status
//!
//! ### Single event
//! `sync_event` executes one operation and reports success as a boolean so
//! change hooks can decide whether to notify or just log. Link-back failures
//! after a successful create/update are downgraded to warnings; discovery's
//! link repair heals them on a later cycle.
//!
//! ## Usage
//!
//! ```ignore
//! use core_sync::{SyncConfig, SyncCoordinator};
//! use bridge_traits::account::ProviderKind;
//! use std::sync::Arc;
//!
//! let coordinator = SyncCoordinator::from_config(&core_config, SyncConfig::default());
//! coordinator.register_provider(ProviderKind::Google, google_connector).await;
//!
//! let stats = coordinator.sync_all_accounts(None).await?;
//! println!("Synced {} accounts", stats.accounts_processed);
//! ```

use crate::{
    conflict_resolver::{ConflictResolutionStrategy, ConflictResolver},
    discovery::OperationDiscovery,
    operation::{CalendarLocation, SyncAction, SyncOperation},
    provider,
    run::{AccountSyncReport, SyncRun},
    Result, SyncError,
};
use bridge_traits::{
    account::{AccountStore, CalendarAccount, ProviderKind, SyncMetadataUpdate},
    calendar::{CalendarConnector, CalendarEvent, ConnectionTestResult, EventQuery},
    jobs::{JobId, JobQueue},
    time::Clock,
};
use chrono::Duration;
use core_runtime::config::CoreConfig;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

/// Sync coordinator configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Days of history included in the sync window
    pub past_days: i64,

    /// Days of future included in the sync window
    pub future_days: i64,

    /// Maximum operations applied per account per cycle. Operations beyond
    /// the cap are left for the next cycle, not counted as failed.
    pub max_operations_per_account: usize,

    /// Whether tombstone detection may emit deletions
    pub allow_deletion: bool,

    /// How to pick a winner when both sides changed
    pub strategy: ConflictResolutionStrategy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            past_days: 30,
            future_days: 90,
            max_operations_per_account: 100,
            allow_deletion: true,
            strategy: ConflictResolutionStrategy::Timestamp,
        }
    }
}

/// Aggregate result of a sweep across accounts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Accounts the sweep attempted
    pub accounts_processed: usize,
    /// Accounts whose run aborted with an error
    pub accounts_failed: usize,
}

/// Sync coordinator for orchestrating calendar synchronization
pub struct SyncCoordinator {
    /// Configuration
    config: SyncConfig,

    /// Account lookup and metadata persistence
    account_store: Arc<dyn AccountStore>,

    /// Job queue for async execution
    job_queue: Arc<dyn JobQueue>,

    /// The CRM-side calendar store
    internal_connector: Arc<dyn CalendarConnector>,

    /// External connectors by provider kind
    external_connectors: RwLock<HashMap<ProviderKind, Arc<dyn CalendarConnector>>>,

    /// Time source
    clock: Arc<dyn Clock>,

    /// Operation discovery bound to the configured strategy
    discovery: OperationDiscovery,
}

impl SyncCoordinator {
    /// Create a new sync coordinator
    pub fn new(
        config: SyncConfig,
        account_store: Arc<dyn AccountStore>,
        job_queue: Arc<dyn JobQueue>,
        internal_connector: Arc<dyn CalendarConnector>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let discovery = OperationDiscovery::new(ConflictResolver::new(config.strategy));

        Self {
            config,
            account_store,
            job_queue,
            internal_connector,
            external_connectors: RwLock::new(HashMap::new()),
            clock,
            discovery,
        }
    }

    /// Create a coordinator from wired runtime configuration
    pub fn from_config(core: &CoreConfig, config: SyncConfig) -> Self {
        Self::new(
            config,
            Arc::clone(&core.account_store),
            Arc::clone(&core.job_queue),
            Arc::clone(&core.internal_connector),
            Arc::clone(&core.clock),
        )
    }

    /// Register an external calendar connector
    ///
    /// Connectors must be registered before syncing accounts of their kind.
    pub async fn register_provider(&self, kind: ProviderKind, connector: Arc<dyn CalendarConnector>) {
        let mut connectors = self.external_connectors.write().await;
        connectors.insert(kind, connector);
        info!("Registered calendar provider: {}", kind);
    }

    async fn external_connector(&self, kind: ProviderKind) -> Option<Arc<dyn CalendarConnector>> {
        let connectors = self.external_connectors.read().await;
        connectors.get(&kind).cloned()
    }

    // ========================================================================
    // Account sweep
    // ========================================================================

    /// Sync a batch of validated accounts
    ///
    /// One account's failure is recorded and logged; the sweep always
    /// proceeds to the next account.
    #[instrument(skip(self))]
    pub async fn sync_all_accounts(&self, limit: Option<usize>) -> Result<SweepStats> {
        let accounts = self
            .account_store
            .get_validated_accounts_batch(limit)
            .await
            .map_err(|e| SyncError::Store(e.to_string()))?;

        info!("Syncing {} calendar accounts", accounts.len());

        let mut stats = SweepStats::default();
        for account in &accounts {
            stats.accounts_processed += 1;
            match self.sync_calendar_account(account).await {
                Ok(report) => {
                    debug!(
                        account_id = %account.id,
                        outcome = %report.outcome,
                        "Account sync finished"
                    );
                }
                Err(e) => {
                    stats.accounts_failed += 1;
                    error!(account_id = %account.id, "Account sync failed: {}", e);
                }
            }
        }

        Ok(stats)
    }

    // ========================================================================
    // Per-account cycle
    // ========================================================================

    /// Run one full sync cycle for an account
    ///
    /// # Errors
    ///
    /// Returns an error when the run aborts before applying operations
    /// (missing connector, fetch or discovery failure, metadata write
    /// failure). Individual operation failures do not error; they surface in
    /// the report counts and a `warning/meetings_failed` status.
    #[instrument(skip(self, account), fields(account_id = %account.id))]
    pub async fn sync_calendar_account(
        &self,
        account: &CalendarAccount,
    ) -> Result<AccountSyncReport> {
        let mut run = SyncRun::new(account.id.clone(), self.clock.now());

        // Record the attempt before validating anything about the account
        run.attempt_recorded()?;
        self.account_store
            .update_sync_metadata(
                &account.id,
                SyncMetadataUpdate {
                    last_sync_attempt_date: Some(self.clock.now()),
                    last_sync_attempt_status: Some("in_progress".to_string()),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| SyncError::Store(e.to_string()))?;

        match self.run_account_cycle(account, &mut run).await {
            Ok(report) => Ok(report),
            Err(e) => {
                if let Err(transition) = run.record_error(e.to_string(), self.clock.now()) {
                    debug!("Run already terminal while recording error: {}", transition);
                }
                self.record_failure_metadata(account).await;
                Err(e)
            }
        }
    }

    async fn run_account_cycle(
        &self,
        account: &CalendarAccount,
        run: &mut SyncRun,
    ) -> Result<AccountSyncReport> {
        let external = self
            .external_connector(account.provider)
            .await
            .ok_or_else(|| SyncError::ProviderNotFound(account.provider.to_string()))?;
        let internal = Arc::clone(&self.internal_connector);

        // Windowed fetch from both sides
        let now = self.clock.now();
        let query = EventQuery::window(
            now - Duration::days(self.config.past_days),
            now + Duration::days(self.config.future_days),
        );

        let mut internal_events = internal
            .get_events(&query)
            .await
            .map_err(|e| SyncError::Provider(format!("Internal fetch failed: {}", e)))?;
        let mut external_events = external
            .get_events(&query)
            .await
            .map_err(|e| SyncError::Provider(format!("External fetch failed: {}", e)))?;
        run.events_fetched()?;
        debug!(
            internal = internal_events.len(),
            external = external_events.len(),
            "Fetched events in sync window"
        );

        // Linked events that fell outside the window are pulled in one by
        // one; a failed fetch only degrades matching for this cycle.
        let internal_snapshot = internal_events.clone();
        self.enrich_linked_events(&internal_snapshot, &mut external_events, external.as_ref())
            .await;
        let external_snapshot = external_events.clone();
        self.enrich_linked_events(&external_snapshot, &mut internal_events, internal.as_ref())
            .await;
        run.events_enriched()?;

        // Discover both directions; the internal direction applies first
        let mut operations = self.discovery.discover_sync_operations(
            &external_events,
            &internal_events,
            CalendarLocation::Internal,
            self.config.allow_deletion,
            &account.user_id,
            &account.id,
        );
        operations.extend(self.discovery.discover_sync_operations(
            &internal_events,
            &external_events,
            CalendarLocation::External,
            self.config.allow_deletion,
            &account.user_id,
            &account.id,
        ));
        run.operations_discovered(operations.len())?;
        info!(discovered = operations.len(), "Discovered sync operations");

        // Apply up to the cap, isolating each operation's failure
        let cap = self.config.max_operations_per_account;
        let mut executed = 0usize;
        let mut failed = 0usize;
        for operation in operations.iter().take(cap) {
            if self
                .apply_operation(operation, internal.as_ref(), external.as_ref())
                .await
            {
                executed += 1;
            } else {
                failed += 1;
            }
        }
        if operations.len() > cap {
            info!(
                deferred = operations.len() - cap,
                "Operation cap reached, deferring remainder to next cycle"
            );
        }
        run.operations_applied(executed, failed)?;

        // Finalize account metadata
        let finished_at = self.clock.now();
        let outcome = run.finalize(finished_at)?;
        self.account_store
            .update_sync_metadata(
                &account.id,
                SyncMetadataUpdate {
                    last_sync_date: Some(finished_at),
                    last_sync_attempt_status: Some(outcome.status().to_string()),
                    last_sync_attempt_message: Some(outcome.message().to_string()),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| SyncError::Store(e.to_string()))?;

        info!(
            discovered = run.discovered,
            executed = run.executed,
            failed = run.failed,
            outcome = %outcome,
            "Account sync cycle finished"
        );

        Ok(run.report())
    }

    /// Append linked counterparts that the windowed fetch missed
    async fn enrich_linked_events(
        &self,
        scan: &[CalendarEvent],
        other: &mut Vec<CalendarEvent>,
        other_connector: &dyn CalendarConnector,
    ) {
        let mut known: HashSet<String> = other.iter().map(|e| e.id.clone()).collect();

        for event in scan {
            let Some(linked) = event.linked_event_id.as_deref().filter(|l| !l.is_empty()) else {
                continue;
            };
            if known.contains(linked) {
                continue;
            }

            match other_connector.get_event(linked).await {
                Ok(Some(found)) => {
                    known.insert(found.id.clone());
                    other.push(found);
                }
                Ok(None) => {
                    debug!(
                        linked_event_id = linked,
                        "Linked event no longer exists on the other side"
                    );
                }
                Err(e) => {
                    debug!(
                        linked_event_id = linked,
                        "Failed to fetch out-of-window linked event: {}", e
                    );
                }
            }
        }
    }

    /// Best-effort error status write; failures are logged, not propagated
    async fn record_failure_metadata(&self, account: &CalendarAccount) {
        let update = SyncMetadataUpdate {
            last_sync_attempt_status: Some("error".to_string()),
            last_sync_attempt_message: Some("sync_failed".to_string()),
            ..Default::default()
        };

        if let Err(e) = self
            .account_store
            .update_sync_metadata(&account.id, update)
            .await
        {
            error!(account_id = %account.id, "Failed to record error status: {}", e);
        }
    }

    // ========================================================================
    // Single-event execution
    // ========================================================================

    /// Execute one sync operation, resolving connectors from its account
    ///
    /// Returns `true` on success. Any failure of the primary action is
    /// caught, logged, and surfaces as `false`; the caller decides whether
    /// to notify anyone.
    #[instrument(
        skip(self, operation),
        fields(
            account_id = %operation.calendar_account_id,
            action = %operation.action,
            location = %operation.location,
        )
    )]
    pub async fn sync_event(&self, operation: &SyncOperation) -> bool {
        let (internal, external) = match self
            .resolve_connectors_for_account(&operation.calendar_account_id)
            .await
        {
            Ok(pair) => pair,
            Err(e) => {
                error!("Cannot resolve connectors for operation: {}", e);
                return false;
            }
        };

        self.apply_operation(operation, internal.as_ref(), external.as_ref())
            .await
    }

    async fn resolve_connectors_for_account(
        &self,
        account_id: &str,
    ) -> Result<(Arc<dyn CalendarConnector>, Arc<dyn CalendarConnector>)> {
        if account_id.is_empty() {
            return Err(SyncError::InvalidInput {
                field: "calendar_account_id".to_string(),
                message: "Account ID must not be empty".to_string(),
            });
        }

        let account = self
            .account_store
            .find_account(account_id)
            .await
            .map_err(|e| SyncError::Store(e.to_string()))?
            .ok_or_else(|| SyncError::AccountNotFound(account_id.to_string()))?;

        let external = self
            .external_connector(account.provider)
            .await
            .ok_or_else(|| SyncError::ProviderNotFound(account.provider.to_string()))?;

        Ok((Arc::clone(&self.internal_connector), external))
    }

    /// Execute one operation against already-resolved connectors
    async fn apply_operation(
        &self,
        operation: &SyncOperation,
        internal: &dyn CalendarConnector,
        external: &dyn CalendarConnector,
    ) -> bool {
        match self.execute_primary(operation, internal, external).await {
            Ok(()) => true,
            Err(e) => {
                error!(
                    subject_id = %operation.subject_id,
                    action = %operation.action,
                    "Sync operation failed: {}", e
                );
                false
            }
        }
    }

    async fn execute_primary(
        &self,
        operation: &SyncOperation,
        internal: &dyn CalendarConnector,
        external: &dyn CalendarConnector,
    ) -> Result<()> {
        let (target, source) = match operation.location {
            CalendarLocation::Internal => (internal, external),
            CalendarLocation::External => (external, internal),
        };
        let sync_time = self.clock.now();

        match operation.action {
            SyncAction::Create => {
                let payload = required_payload(operation)?;
                let new_id = provider::create_event_from_source(target, payload, sync_time).await?;
                debug!(new_id = %new_id, "Created counterpart event");

                // The creation already succeeded; a failed link-back is left
                // for discovery's link repair on a later cycle.
                if let Err(e) = provider::write_link_back(source, &new_id, payload, sync_time).await
                {
                    warn!(
                        event_id = %payload.id,
                        "Link-back write failed after create: {}", e
                    );
                }
            }
            SyncAction::Update => {
                let payload = required_payload(operation)?;
                provider::update_event_from_source(target, &operation.subject_id, payload, sync_time)
                    .await?;

                if let Err(e) =
                    provider::write_link_back(source, &operation.subject_id, payload, sync_time)
                        .await
                {
                    warn!(
                        event_id = %payload.id,
                        "Link-back write failed after update: {}", e
                    );
                }
            }
            SyncAction::Delete => {
                provider::delete_event(target, &operation.subject_id).await?;
            }
        }

        Ok(())
    }

    // ========================================================================
    // Async mode
    // ========================================================================

    /// Queue an account-level sync job
    ///
    /// Returns `Ok(None)` when an equivalent job is already queued or
    /// running for this account.
    pub async fn queue_account_sync(&self, account_id: &str) -> Result<Option<JobId>> {
        if account_id.is_empty() {
            return Err(SyncError::InvalidInput {
                field: "account_id".to_string(),
                message: "Account ID must not be empty".to_string(),
            });
        }

        if self
            .job_queue
            .is_account_job_active(account_id)
            .await
            .map_err(|e| SyncError::JobQueue(e.to_string()))?
        {
            debug!(account_id, "Equivalent account sync job already active, skipping");
            return Ok(None);
        }

        let job_id = self
            .job_queue
            .enqueue_account_job(account_id)
            .await
            .map_err(|e| SyncError::JobQueue(e.to_string()))?;
        info!(account_id, job_id = %job_id, "Queued account sync job");
        Ok(Some(job_id))
    }

    /// Queue an event-level sync job
    ///
    /// With `supersede_pending`, still-pending jobs for the same operation
    /// key are cancelled first so the latest edit wins the race; running
    /// jobs are not touched. Returns `Ok(None)` when an equivalent job is
    /// already active.
    pub async fn queue_event_sync(
        &self,
        operation: &SyncOperation,
        supersede_pending: bool,
    ) -> Result<Option<JobId>> {
        operation.validate()?;
        let key = operation.operation_key();

        if supersede_pending {
            let cancelled = self
                .job_queue
                .cancel_pending_meeting_jobs(&key)
                .await
                .map_err(|e| SyncError::JobQueue(e.to_string()))?;
            if cancelled > 0 {
                debug!(
                    cancelled,
                    operation_key = %key,
                    "Cancelled superseded pending event jobs"
                );
            }
        }

        if self
            .job_queue
            .is_meeting_job_active(&key)
            .await
            .map_err(|e| SyncError::JobQueue(e.to_string()))?
        {
            debug!(operation_key = %key, "Equivalent event sync job already active, skipping");
            return Ok(None);
        }

        let serialized = operation.to_json()?;
        let job_id = self
            .job_queue
            .enqueue_meeting_job(&serialized)
            .await
            .map_err(|e| SyncError::JobQueue(e.to_string()))?;
        debug!(operation_key = %key, job_id = %job_id, "Queued event sync job");
        Ok(Some(job_id))
    }

    /// Worker entry point for account-level jobs
    pub async fn run_queued_account(&self, account_id: &str) -> Result<AccountSyncReport> {
        let account = self
            .account_store
            .find_account(account_id)
            .await
            .map_err(|e| SyncError::Store(e.to_string()))?
            .ok_or_else(|| SyncError::AccountNotFound(account_id.to_string()))?;

        self.sync_calendar_account(&account).await
    }

    /// Worker entry point for event-level jobs
    ///
    /// # Errors
    ///
    /// Returns an error only for malformed job payloads; execution failures
    /// surface as `Ok(false)` like the synchronous path.
    pub async fn run_queued_event(&self, serialized_operation: &str) -> Result<bool> {
        let operation = SyncOperation::from_json(serialized_operation)?;
        Ok(self.sync_event(&operation).await)
    }

    // ========================================================================
    // Connection testing
    // ========================================================================

    /// Probe an account's external connection and record the result
    pub async fn test_account_connection(
        &self,
        account: &CalendarAccount,
    ) -> Result<ConnectionTestResult> {
        let external = self
            .external_connector(account.provider)
            .await
            .ok_or_else(|| SyncError::ProviderNotFound(account.provider.to_string()))?;

        let result = match external.test_connection().await {
            Ok(result) => result,
            Err(e) => ConnectionTestResult::failed(e.to_string()),
        };

        let update = SyncMetadataUpdate {
            last_connection_status: Some(
                if result.success { "ok" } else { "failed" }.to_string(),
            ),
            last_connection_test: Some(self.clock.now()),
            ..Default::default()
        };
        self.account_store
            .update_sync_metadata(&account.id, update)
            .await
            .map_err(|e| SyncError::Store(e.to_string()))?;

        Ok(result)
    }
}

fn required_payload(operation: &SyncOperation) -> Result<&CalendarEvent> {
    operation
        .payload
        .as_ref()
        .ok_or_else(|| SyncError::InvalidInput {
            field: "payload".to_string(),
            message: format!("{} operation requires an event payload", operation.action),
        })
}
