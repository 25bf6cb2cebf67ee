//! Two-tier storage contract for the cached notebook listing.

use std::time::Duration;

use async_trait::async_trait;
use notekeep_api_types::IdEntry;
use thiserror::Error;

use super::keys::Tier;

pub type Listing = Vec<IdEntry>;

#[derive(Debug, Error)]
pub enum TierError {
    #[error("cache tier `{0}` is empty")]
    Empty(Tier),
    #[error("cache tier `{tier}` holds an unreadable listing: {message}")]
    Malformed { tier: Tier, message: String },
    #[error("cache store unreachable: {0}")]
    Unreachable(String),
    #[error("failed to encode listing: {0}")]
    Encode(String),
}

impl TierError {
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable(message.into())
    }

    /// A miss means the tier has nothing usable while the store itself answered.
    pub fn is_miss(&self) -> bool {
        matches!(self, TierError::Empty(_) | TierError::Malformed { .. })
    }
}

#[async_trait]
pub trait CacheTierStore: Send + Sync {
    async fn get(&self, tier: Tier) -> Result<Listing, TierError>;

    async fn set(
        &self,
        tier: Tier,
        listing: &[IdEntry],
        ttl: Option<Duration>,
    ) -> Result<(), TierError>;

    /// Overwrite both tiers from one live listing, fresh first.
    ///
    /// The two writes are independent; a failure after the fresh write leaves
    /// the previous stale snapshot in place.
    async fn refresh(&self, listing: &[IdEntry], fresh_ttl: Duration) -> Result<(), TierError> {
        self.set(Tier::Fresh, listing, Some(fresh_ttl)).await?;
        self.set(Tier::Stale, listing, None).await
    }
}

pub fn encode_listing(listing: &[IdEntry]) -> Result<String, TierError> {
    serde_json::to_string(listing)
        .map_err(|err| TierError::Encode(err.to_string()))
}

pub fn decode_listing(tier: Tier, raw: Option<&str>) -> Result<Listing, TierError> {
    match raw {
        None => Err(TierError::Empty(tier)),
        Some(raw) if raw.is_empty() => Err(TierError::Empty(tier)),
        Some(raw) => serde_json::from_str(raw).map_err(|err| TierError::Malformed {
            tier,
            message: err.to_string(),
        }),
    }
}

pub fn contains(listing: &[IdEntry], id: &str) -> bool {
    listing.iter().any(|entry| entry.id == id)
}
