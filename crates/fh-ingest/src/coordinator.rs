//! Ingestion Coordinator — keeps remote rules and local storage consistent
//!
//! ```text
//! reset_rule(new)
//!   ├── remove_rules()
//!   │     ├── store.clear()
//!   │     ├── registry.fetch_rules()      ── zero rules: done
//!   │     ├── registry.delete_rules(ids)
//!   │     ├── grace period (cancellable)
//!   │     └── store.clear()
//!   └── registry.add_rules(new)
//! ```

use std::sync::Arc;
use std::time::Duration;

use fh_core::{FirehoseConfig, FirehoseResult, NewRule, RuleSet, Shutdown};
use fh_rules::RuleRegistry;
use fh_store::EventStore;
use tokio::sync::Mutex;

/// Orchestrates rule resets against the registry and the event store
pub struct IngestionCoordinator {
    registry: RuleRegistry,
    store: Arc<dyn EventStore>,
    grace_period: Duration,
    shutdown: Shutdown,
    /// Serializes rule-sync operations
    sync_lock: Mutex<()>,
}

impl IngestionCoordinator {
    /// Create a coordinator
    pub fn new(
        registry: RuleRegistry,
        store: Arc<dyn EventStore>,
        config: &FirehoseConfig,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            registry,
            store,
            grace_period: config.grace_period(),
            shutdown,
            sync_lock: Mutex::new(()),
        }
    }

    /// Configured grace period
    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Replace every remote rule with `new_rules` and wipe local records.
    ///
    /// Returns the remote's create response. Any rule-sync error aborts the
    /// reset and is returned as is; a delete that succeeded before a failed
    /// add leaves the remote without rules.
    pub async fn reset_rule(&self, new_rules: &[NewRule]) -> FirehoseResult<RuleSet> {
        let _guard = self.sync_lock.lock().await;

        self.remove_rules_locked().await?;
        let created = self.registry.add_rules(new_rules).await?;

        log::info!(
            "[Coordinator] Reset rules: {} submitted, {} active",
            new_rules.len(),
            created.len()
        );
        Ok(created)
    }

    /// Delete every remote rule and wipe local records.
    ///
    /// Returns the number of remote rules targeted by the delete.
    pub async fn remove_rules(&self) -> FirehoseResult<usize> {
        let _guard = self.sync_lock.lock().await;
        self.remove_rules_locked().await
    }

    async fn remove_rules_locked(&self) -> FirehoseResult<usize> {
        let cleared = self.store.clear();
        log::debug!("[Coordinator] Cleared {} record(s) before removal", cleared);

        let existing = self.registry.fetch_rules().await?;
        if existing.is_empty() {
            log::info!("[Coordinator] No remote rules to remove");
            return Ok(0);
        }

        let ids = existing.ids();
        self.registry.delete_rules(&ids).await?;

        // Records matched by the old rules may still be arriving
        self.shutdown
            .sleep(self.grace_period, "rule removal grace period")
            .await?;

        let cleared = self.store.clear();
        log::info!(
            "[Coordinator] Removed {} rule(s), cleared {} late record(s)",
            ids.len(),
            cleared
        );
        Ok(ids.len())
    }
}
