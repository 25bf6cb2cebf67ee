//! Tiered cache of the notebook listing.
//!
//! - **fresh**: short TTL, the preferred source for cheap validation
//! - **stale**: no TTL, last resort when the notebook service is down
//!
//! Redis backs the tiers in multi-instance deployments (see
//! `infra::cache::RedisTierStore`); `MemoryTierStore` serves single-instance
//! setups and tests.

mod keys;
mod lock;
mod memory;
mod tiers;

pub use keys::Tier;
pub use memory::MemoryTierStore;
pub use tiers::{CacheTierStore, Listing, TierError, contains, decode_listing, encode_listing};
