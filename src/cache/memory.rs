//! In-process tier store for single-instance deployments and tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use notekeep_api_types::IdEntry;
use tokio::time::Instant;

use super::keys::Tier;
use super::lock::mutex_lock;
use super::tiers::{CacheTierStore, Listing, TierError, decode_listing, encode_listing};

const SOURCE: &str = "cache::memory";

struct Entry {
    payload: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|deadline| now < deadline)
    }
}

/// Tier store keeping serialized listings in memory with per-entry expiry.
#[derive(Default)]
pub struct MemoryTierStore {
    entries: Mutex<HashMap<Tier, Entry>>,
}

impl MemoryTierStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_raw(&self, tier: Tier, payload: impl Into<String>, ttl: Option<Duration>) {
        let entry = Entry {
            payload: payload.into(),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        mutex_lock(&self.entries, SOURCE, "put_raw").insert(tier, entry);
    }

    pub fn clear(&self, tier: Tier) {
        mutex_lock(&self.entries, SOURCE, "clear").remove(&tier);
    }
}

#[async_trait]
impl CacheTierStore for MemoryTierStore {
    async fn get(&self, tier: Tier) -> Result<Listing, TierError> {
        let now = Instant::now();
        let payload = {
            let mut entries = mutex_lock(&self.entries, SOURCE, "get");
            match entries.get(&tier) {
                Some(entry) if entry.is_live(now) => Some(entry.payload.clone()),
                Some(_) => {
                    entries.remove(&tier);
                    None
                }
                None => None,
            }
        };
        decode_listing(tier, payload.as_deref())
    }

    async fn set(
        &self,
        tier: Tier,
        listing: &[IdEntry],
        ttl: Option<Duration>,
    ) -> Result<(), TierError> {
        let payload = encode_listing(listing)?;
        self.put_raw(tier, payload, ttl);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fresh_entries_expire_and_stale_entries_persist() {
        let store = MemoryTierStore::new();
        let listing = vec![IdEntry::new("b1")];
        store
            .refresh(&listing, Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(store.get(Tier::Fresh).await.unwrap(), listing);
        tokio::time::advance(Duration::from_millis(1500)).await;

        assert!(matches!(
            store.get(Tier::Fresh).await,
            Err(TierError::Empty(Tier::Fresh))
        ));
        assert_eq!(store.get(Tier::Stale).await.unwrap(), listing);
    }
}
