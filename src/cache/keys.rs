//! Cache key definitions for the notebook listing tiers.

use std::fmt;

const FRESH_NOTEBOOKS_KEY: &str = "cache:notebooks:fresh";
const STALE_NOTEBOOKS_KEY: &str = "cache:notebooks:stale";

/// One of the two tiers holding the cached notebook listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Short-lived snapshot, refreshed from the live listing.
    Fresh,
    /// Snapshot without expiry, consulted only when the owner is down.
    Stale,
}

impl Tier {
    pub const ALL: [Tier; 2] = [Tier::Fresh, Tier::Stale];

    pub fn key(self) -> &'static str {
        match self {
            Tier::Fresh => FRESH_NOTEBOOKS_KEY,
            Tier::Stale => STALE_NOTEBOOKS_KEY,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Fresh => "fresh",
            Tier::Stale => "stale",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_use_distinct_keys() {
        assert_eq!(Tier::Fresh.key(), "cache:notebooks:fresh");
        assert_eq!(Tier::Stale.key(), "cache:notebooks:stale");
    }
}
