//! Rule Registry — fetch, delete, add and replace the remote filter rules

use std::sync::Arc;

use fh_core::{FirehoseError, FirehoseResult, NewRule, RuleSet};

use crate::protocol::RulesRequest;
use crate::transport::RulesTransport;

/// Thin synchronization layer over the remote rule state.
///
/// The remote service owns rule identity; the registry never caches rules.
#[derive(Clone)]
pub struct RuleRegistry {
    transport: Arc<dyn RulesTransport>,
}

impl RuleRegistry {
    /// Create a registry over a transport
    pub fn new(transport: Arc<dyn RulesTransport>) -> Self {
        Self { transport }
    }

    /// Current remote rules. An empty remote yields an empty set.
    pub async fn fetch_rules(&self) -> FirehoseResult<RuleSet> {
        let rules = self.transport.get_rules().await?;
        log::debug!("[Rules] Fetched {} rule(s)", rules.len());
        Ok(rules)
    }

    /// Delete rules by id. No request is issued for an empty id list.
    pub async fn delete_rules(&self, ids: &[String]) -> FirehoseResult<RuleSet> {
        if ids.is_empty() {
            return Ok(RuleSet::default());
        }

        let response = self
            .transport
            .post_rules(&RulesRequest::delete(ids.to_vec()))
            .await?;

        match response.summary() {
            Some(summary) if summary.not_deleted > 0 => log::warn!(
                "[Rules] Deleted {} rule(s), {} not deleted",
                summary.deleted,
                summary.not_deleted
            ),
            _ => log::info!("[Rules] Deleted {} rule(s)", ids.len()),
        }
        Ok(response)
    }

    /// Create rules and return the remote's canonical copies (with ids).
    ///
    /// A 400 response, or a success body flagging invalid rules, is reported
    /// as [`FirehoseError::Validation`].
    pub async fn add_rules(&self, new_rules: &[NewRule]) -> FirehoseResult<RuleSet> {
        let response = match self
            .transport
            .post_rules(&RulesRequest::add(new_rules.to_vec()))
            .await
        {
            Ok(response) => response,
            Err(FirehoseError::Remote { status: 400, body }) => {
                return Err(FirehoseError::Validation(format!("rules rejected: {body}")));
            }
            Err(e) => return Err(e),
        };

        if let Some(summary) = response.summary() {
            if summary.invalid > 0 {
                let detail = serde_json::to_string(&response.errors).unwrap_or_default();
                return Err(FirehoseError::Validation(format!(
                    "{} invalid rule(s): {detail}",
                    summary.invalid
                )));
            }
        }

        log::info!(
            "[Rules] Added {} rule(s), remote created {}",
            new_rules.len(),
            response.len()
        );
        Ok(response)
    }

    /// Replace every remote rule: fetch, delete the fetched ids, add.
    ///
    /// Not transactional. If the delete succeeds and the add fails, the remote
    /// is left with no rules and the add error is returned.
    pub async fn reset_all_rules(&self, new_rules: &[NewRule]) -> FirehoseResult<RuleSet> {
        let existing = self.fetch_rules().await?;
        if !existing.is_empty() {
            self.delete_rules(&existing.ids()).await?;
        }

        self.add_rules(new_rules).await.inspect_err(|e| {
            if !existing.is_empty() {
                log::warn!(
                    "[Rules] Reset left remote without rules: {} deleted, add failed: {}",
                    existing.len(),
                    e
                );
            }
        })
    }
}
