//! # Core Configuration Module
//!
//! Wires the sync core to its collaborators.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a
//! `CoreConfig` instance holding the collaborator trait objects the sync
//! engine needs. It enforces fail-fast validation so a deployment with a
//! missing collaborator dies at startup with an actionable message instead
//! of at the first sync attempt.
//!
//! ## Required Dependencies
//!
//! - `AccountStore` - account lookup and sync-metadata persistence
//! - `JobQueue` - asynchronous execution of sync units
//! - `CalendarConnector` (internal) - the CRM-side calendar store
//!
//! External connectors are registered per provider kind on the coordinator
//! at runtime, not here.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .account_store(Arc::new(CrmAccountStore::new(pool)))
//!     .job_queue(Arc::new(CrmJobQueue::new(pool)))
//!     .internal_connector(Arc::new(CrmCalendarConnector::new(pool)))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{
    account::AccountStore,
    calendar::CalendarConnector,
    jobs::JobQueue,
    time::{Clock, SystemClock},
};
use std::sync::Arc;

/// Collaborator wiring for the calendar sync core
///
/// Use [`CoreConfig::builder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Account lookup and sync-metadata persistence (required)
    pub account_store: Arc<dyn AccountStore>,

    /// Job queue for asynchronous execution (required)
    pub job_queue: Arc<dyn JobQueue>,

    /// The CRM-side calendar store (required)
    pub internal_connector: Arc<dyn CalendarConnector>,

    /// Time source (defaults to the system clock)
    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("account_store", &"AccountStore { ... }")
            .field("job_queue", &"JobQueue { ... }")
            .field("internal_connector", &"CalendarConnector { ... }")
            .field("clock", &"Clock { ... }")
            .finish()
    }
}

impl CoreConfig {
    /// Start building a configuration
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }
}

/// Builder for [`CoreConfig`]
#[derive(Default)]
pub struct CoreConfigBuilder {
    account_store: Option<Arc<dyn AccountStore>>,
    job_queue: Option<Arc<dyn JobQueue>>,
    internal_connector: Option<Arc<dyn CalendarConnector>>,
    clock: Option<Arc<dyn Clock>>,
}

impl CoreConfigBuilder {
    /// Set the account store (required)
    pub fn account_store(mut self, store: Arc<dyn AccountStore>) -> Self {
        self.account_store = Some(store);
        self
    }

    /// Set the job queue (required)
    pub fn job_queue(mut self, queue: Arc<dyn JobQueue>) -> Self {
        self.job_queue = Some(queue);
        self
    }

    /// Set the CRM-side calendar connector (required)
    pub fn internal_connector(mut self, connector: Arc<dyn CalendarConnector>) -> Self {
        self.internal_connector = Some(connector);
        self
    }

    /// Set a custom time source
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Validate and build the configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapabilityMissing`] naming the first absent required
    /// collaborator.
    pub fn build(self) -> Result<CoreConfig> {
        let account_store = self.account_store.ok_or_else(|| Error::CapabilityMissing {
            capability: "AccountStore".to_string(),
            message: "No account store provided. Inject the CRM account \
                      persistence adapter via CoreConfigBuilder::account_store."
                .to_string(),
        })?;

        let job_queue = self.job_queue.ok_or_else(|| Error::CapabilityMissing {
            capability: "JobQueue".to_string(),
            message: "No job queue provided. Inject the scheduler adapter via \
                      CoreConfigBuilder::job_queue."
                .to_string(),
        })?;

        let internal_connector =
            self.internal_connector
                .ok_or_else(|| Error::CapabilityMissing {
                    capability: "CalendarConnector".to_string(),
                    message: "No internal calendar connector provided. Inject the \
                              CRM-side adapter via CoreConfigBuilder::internal_connector."
                        .to_string(),
                })?;

        Ok(CoreConfig {
            account_store,
            job_queue,
            internal_connector,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::{
        account::{CalendarAccount, SyncMetadataUpdate},
        calendar::{CalendarEvent, ConnectionTestResult, EventQuery},
        error::Result as BridgeResult,
        jobs::JobId,
    };
    use chrono::{DateTime, Utc};

    struct NullStore;

    #[async_trait]
    impl AccountStore for NullStore {
        async fn get_validated_accounts_batch(
            &self,
            _limit: Option<usize>,
        ) -> BridgeResult<Vec<CalendarAccount>> {
            Ok(Vec::new())
        }

        async fn find_account(&self, _account_id: &str) -> BridgeResult<Option<CalendarAccount>> {
            Ok(None)
        }

        async fn update_sync_metadata(
            &self,
            _account_id: &str,
            _update: SyncMetadataUpdate,
        ) -> BridgeResult<()> {
            Ok(())
        }
    }

    struct NullQueue;

    #[async_trait]
    impl JobQueue for NullQueue {
        async fn is_account_job_active(&self, _account_id: &str) -> BridgeResult<bool> {
            Ok(false)
        }

        async fn is_meeting_job_active(&self, _operation_key: &str) -> BridgeResult<bool> {
            Ok(false)
        }

        async fn enqueue_account_job(&self, _account_id: &str) -> BridgeResult<JobId> {
            Ok(JobId::new("job"))
        }

        async fn enqueue_meeting_job(&self, _serialized_operation: &str) -> BridgeResult<JobId> {
            Ok(JobId::new("job"))
        }

        async fn cancel_pending_meeting_jobs(&self, _operation_key: &str) -> BridgeResult<usize> {
            Ok(0)
        }
    }

    struct NullConnector;

    #[async_trait]
    impl CalendarConnector for NullConnector {
        async fn test_connection(&self) -> BridgeResult<ConnectionTestResult> {
            Ok(ConnectionTestResult::ok("null"))
        }

        async fn get_events(&self, _query: &EventQuery) -> BridgeResult<Vec<CalendarEvent>> {
            Ok(Vec::new())
        }

        async fn get_event(&self, _event_id: &str) -> BridgeResult<Option<CalendarEvent>> {
            Ok(None)
        }

        async fn do_create_event(
            &self,
            _event: &CalendarEvent,
            _sync_time: DateTime<Utc>,
        ) -> BridgeResult<String> {
            Ok("new-id".to_string())
        }

        async fn do_update_event(
            &self,
            _target_id: &str,
            _event: &CalendarEvent,
            _sync_time: DateTime<Utc>,
        ) -> BridgeResult<()> {
            Ok(())
        }

        async fn update_source_event(
            &self,
            _target_id: &str,
            _source: &CalendarEvent,
            _sync_time: DateTime<Utc>,
        ) -> BridgeResult<()> {
            Ok(())
        }

        async fn do_delete_event(&self, _target_id: &str) -> BridgeResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_build_with_all_required() {
        let config = CoreConfig::builder()
            .account_store(Arc::new(NullStore))
            .job_queue(Arc::new(NullQueue))
            .internal_connector(Arc::new(NullConnector))
            .build();

        assert!(config.is_ok());
    }

    #[test]
    fn test_build_missing_account_store() {
        let result = CoreConfig::builder()
            .job_queue(Arc::new(NullQueue))
            .internal_connector(Arc::new(NullConnector))
            .build();

        match result {
            Err(Error::CapabilityMissing { capability, .. }) => {
                assert_eq!(capability, "AccountStore");
            }
            other => panic!("Expected CapabilityMissing, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_build_missing_internal_connector() {
        let result = CoreConfig::builder()
            .account_store(Arc::new(NullStore))
            .job_queue(Arc::new(NullQueue))
            .build();

        match result {
            Err(Error::CapabilityMissing { capability, .. }) => {
                assert_eq!(capability, "CalendarConnector");
            }
            other => panic!("Expected CapabilityMissing, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_clock_defaults_to_system() {
        let config = CoreConfig::builder()
            .account_store(Arc::new(NullStore))
            .job_queue(Arc::new(NullQueue))
            .internal_connector(Arc::new(NullConnector))
            .build()
            .unwrap();

        assert!(config.clock.unix_timestamp() > 0);
    }
}
