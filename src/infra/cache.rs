//! Redis-backed cache tiers shared by every note service instance.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Pool, Runtime};
use metrics::counter;
use notekeep_api_types::IdEntry;
use redis::AsyncCommands;
use tracing::{info, warn};

use crate::cache::{CacheTierStore, Listing, Tier, TierError, decode_listing, encode_listing};
use crate::config::CacheSettings;

use super::error::InfraError;

pub const METRIC_CACHE_OPERATION_TOTAL: &str = "notekeep_cache_operation_total";

#[derive(Clone)]
pub struct RedisTierStore {
    pool: Pool,
    timeout: Duration,
}

impl RedisTierStore {
    /// Build the connection pool. No connection is opened until first use, so
    /// an unavailable Redis only surfaces as `TierError::Unreachable`.
    pub fn connect(url: &str, settings: &CacheSettings) -> Result<Self, InfraError> {
        let mut redis_config = deadpool_redis::Config::from_url(url);
        let mut pool_config = redis_config.get_pool_config();
        pool_config.max_size = settings.pool_size.get();
        pool_config.timeouts.wait = Some(settings.timeout);
        pool_config.timeouts.create = Some(settings.timeout);
        pool_config.timeouts.recycle = Some(settings.timeout);
        redis_config.pool = Some(pool_config);

        let pool = redis_config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|err| InfraError::cache(format!("failed to create redis pool: {err}")))?;

        info!(
            target = "notekeep::infra::cache",
            pool_size = settings.pool_size.get(),
            timeout_ms = settings.timeout.as_millis() as u64,
            "redis tier store configured"
        );

        Ok(Self {
            pool,
            timeout: settings.timeout,
        })
    }

    async fn bounded<T, F>(&self, tier: Tier, op: &'static str, fut: F) -> Result<T, TierError>
    where
        F: Future<Output = Result<T, TierError>>,
    {
        let result = match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(TierError::unreachable(format!(
                "redis {op} on `{}` timed out after {}ms",
                tier.key(),
                self.timeout.as_millis()
            ))),
        };

        let outcome = outcome_label(&result);
        counter!(
            METRIC_CACHE_OPERATION_TOTAL,
            "tier" => tier.as_str(),
            "op" => op,
            "outcome" => outcome
        )
        .increment(1);

        if let Err(TierError::Unreachable(message)) = &result {
            warn!(
                target = "notekeep::infra::cache",
                tier = tier.as_str(),
                op,
                error = %message,
                "redis operation failed"
            );
        }
        result
    }
}

fn outcome_label<T>(result: &Result<T, TierError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(TierError::Empty(_) | TierError::Malformed { .. }) => "miss",
        Err(TierError::Unreachable(_)) => "unreachable",
        Err(TierError::Encode(_)) => "encode_error",
    }
}

fn unreachable(err: impl std::fmt::Display) -> TierError {
    TierError::unreachable(err.to_string())
}

#[async_trait]
impl CacheTierStore for RedisTierStore {
    async fn get(&self, tier: Tier) -> Result<Listing, TierError> {
        self.bounded(tier, "get", async {
            let mut conn = self.pool.get().await.map_err(unreachable)?;
            let raw: Option<String> = conn.get(tier.key()).await.map_err(unreachable)?;
            decode_listing(tier, raw.as_deref())
        })
        .await
    }

    async fn set(
        &self,
        tier: Tier,
        listing: &[IdEntry],
        ttl: Option<Duration>,
    ) -> Result<(), TierError> {
        let payload = encode_listing(listing)?;
        self.bounded(tier, "set", async {
            let mut conn = self.pool.get().await.map_err(unreachable)?;
            match ttl {
                // SET EX rejects zero; round sub-second lifetimes up.
                Some(ttl) => conn
                    .set_ex::<_, _, ()>(tier.key(), payload, ttl.as_secs().max(1))
                    .await
                    .map_err(unreachable),
                None => conn
                    .set::<_, _, ()>(tier.key(), payload)
                    .await
                    .map_err(unreachable),
            }
        })
        .await
    }
}
