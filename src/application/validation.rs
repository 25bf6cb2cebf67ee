//! Existence checks for notebook references made by notes.
//!
//! Resolution order, first answer wins:
//!
//! 1. fresh cache tier
//! 2. live listing from the notebook service (also rewrites both tiers)
//! 3. stale cache tier
//! 4. direct `GET /api/notebooks/{id}`, used only when the cache store itself
//!    is unreachable
//!
//! When every source fails the reference is treated as invalid.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tracing::{debug, warn};

use crate::application::peers::NotebooksPeer;
use crate::cache::{CacheTierStore, Tier, contains};

pub const METRIC_VALIDATION_TOTAL: &str = "notekeep_validation_total";
pub const DEFAULT_FRESH_TTL: Duration = Duration::from_secs(1);

/// Where a verdict came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictSource {
    FreshCache,
    LiveListing,
    StaleCache,
    DirectQuery,
    /// No source could answer.
    Exhausted,
}

impl VerdictSource {
    pub fn as_str(self) -> &'static str {
        match self {
            VerdictSource::FreshCache => "fresh_cache",
            VerdictSource::LiveListing => "live_listing",
            VerdictSource::StaleCache => "stale_cache",
            VerdictSource::DirectQuery => "direct_query",
            VerdictSource::Exhausted => "exhausted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub exists: bool,
    pub source: VerdictSource,
}

#[derive(Clone)]
pub struct NotebookValidator {
    cache: Arc<dyn CacheTierStore>,
    owner: Arc<dyn NotebooksPeer>,
    fresh_ttl: Duration,
}

impl NotebookValidator {
    pub fn new(
        cache: Arc<dyn CacheTierStore>,
        owner: Arc<dyn NotebooksPeer>,
        fresh_ttl: Duration,
    ) -> Self {
        Self {
            cache,
            owner,
            fresh_ttl,
        }
    }

    pub async fn exists(&self, notebook_id: &str) -> bool {
        self.check(notebook_id).await.exists
    }

    /// Resolve `notebook_id` to a definitive verdict. Never fails.
    pub async fn check(&self, notebook_id: &str) -> Verdict {
        match self.cache.get(Tier::Fresh).await {
            Ok(listing) => {
                return self.resolve(
                    notebook_id,
                    VerdictSource::FreshCache,
                    contains(&listing, notebook_id),
                );
            }
            Err(err) if err.is_miss() => {
                debug!(
                    target = "notekeep::validation",
                    notebook_id,
                    error = %err,
                    "fresh tier missed, asking notebook service"
                );
            }
            Err(err) => {
                warn!(
                    target = "notekeep::validation",
                    notebook_id,
                    error = %err,
                    "cache store unreachable, querying notebook service directly"
                );
                return self.check_directly(notebook_id).await;
            }
        }

        if let Some(verdict) = self.check_live_listing(notebook_id).await {
            return verdict;
        }

        self.check_stale(notebook_id).await
    }

    async fn check_live_listing(&self, notebook_id: &str) -> Option<Verdict> {
        if !self.owner.is_live().await {
            warn!(
                target = "notekeep::validation",
                notebook_id,
                origin = self.owner.origin(),
                "notebook service is down, trying stale tier"
            );
            return None;
        }

        let listing = match self.owner.list_ids().await {
            Ok(listing) => listing,
            Err(err) => {
                warn!(
                    target = "notekeep::validation",
                    notebook_id,
                    origin = self.owner.origin(),
                    error = %err,
                    "notebook listing failed, trying stale tier"
                );
                return None;
            }
        };

        if let Err(err) = self.cache.refresh(&listing, self.fresh_ttl).await {
            warn!(
                target = "notekeep::validation",
                error = %err,
                "failed to refresh notebook cache tiers"
            );
        }

        Some(self.resolve(
            notebook_id,
            VerdictSource::LiveListing,
            contains(&listing, notebook_id),
        ))
    }

    async fn check_stale(&self, notebook_id: &str) -> Verdict {
        match self.cache.get(Tier::Stale).await {
            Ok(listing) => self.resolve(
                notebook_id,
                VerdictSource::StaleCache,
                contains(&listing, notebook_id),
            ),
            Err(err) => {
                warn!(
                    target = "notekeep::validation",
                    notebook_id,
                    error = %err,
                    "stale tier unavailable, treating notebook as invalid"
                );
                self.resolve(notebook_id, VerdictSource::Exhausted, false)
            }
        }
    }

    async fn check_directly(&self, notebook_id: &str) -> Verdict {
        if !self.owner.is_live().await {
            warn!(
                target = "notekeep::validation",
                notebook_id,
                origin = self.owner.origin(),
                "cache and notebook service both unavailable, treating notebook as invalid"
            );
            return self.resolve(notebook_id, VerdictSource::Exhausted, false);
        }

        match self.owner.notebook_exists(notebook_id).await {
            Ok(found) => self.resolve(notebook_id, VerdictSource::DirectQuery, found),
            Err(err) => {
                warn!(
                    target = "notekeep::validation",
                    notebook_id,
                    error = %err,
                    "direct notebook lookup failed, treating notebook as invalid"
                );
                self.resolve(notebook_id, VerdictSource::Exhausted, false)
            }
        }
    }

    fn resolve(&self, notebook_id: &str, source: VerdictSource, exists: bool) -> Verdict {
        counter!(
            METRIC_VALIDATION_TOTAL,
            "source" => source.as_str(),
            "result" => if exists { "valid" } else { "invalid" }
        )
        .increment(1);
        debug!(
            target = "notekeep::validation",
            notebook_id,
            source = source.as_str(),
            exists,
            "notebook reference resolved"
        );
        Verdict { exists, source }
    }
}
