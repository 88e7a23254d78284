use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashSet;

/// Set of keys with a derivation currently running.
///
/// A claim is held by its [`FlightGuard`] and released when the guard drops,
/// including when the owning task panics or is cancelled.
pub struct InFlight<K: Eq + Hash + Clone> {
    claims: Arc<DashSet<K>>,
}

impl<K: Eq + Hash + Clone> InFlight<K> {
    pub fn new() -> Self {
        Self {
            claims: Arc::new(DashSet::new()),
        }
    }

    /// Claim `key`, or `None` when another holder already has it
    pub fn try_claim(&self, key: K) -> Option<FlightGuard<K>> {
        if self.claims.insert(key.clone()) {
            Some(FlightGuard {
                claims: Arc::clone(&self.claims),
                key,
            })
        } else {
            None
        }
    }

    pub fn is_in_flight(&self, key: &K) -> bool {
        self.claims.contains(key)
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}

impl<K: Eq + Hash + Clone> Default for InFlight<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone> Clone for InFlight<K> {
    fn clone(&self) -> Self {
        Self {
            claims: Arc::clone(&self.claims),
        }
    }
}

pub struct FlightGuard<K: Eq + Hash + Clone> {
    claims: Arc<DashSet<K>>,
    key: K,
}

impl<K: Eq + Hash + Clone> Drop for FlightGuard<K> {
    fn drop(&mut self) {
        self.claims.remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_claim_is_refused() {
        let flights = InFlight::new();
        let guard = flights.try_claim("planets");
        assert!(guard.is_some());
        assert!(flights.try_claim("planets").is_none());
        assert!(flights.try_claim("houses").is_some());
        assert!(flights.is_in_flight(&"planets"));
    }

    #[test]
    fn test_drop_releases_claim() {
        let flights = InFlight::new();
        {
            let _guard = flights.try_claim(7);
            assert_eq!(flights.len(), 1);
        }
        assert!(flights.is_empty());
        assert!(flights.try_claim(7).is_some());
    }

    #[test]
    fn test_clones_share_claims() {
        let flights = InFlight::new();
        let other = flights.clone();
        let _guard = flights.try_claim("dasha");
        assert!(other.try_claim("dasha").is_none());
    }
}
