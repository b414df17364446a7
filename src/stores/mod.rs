//! Client-side stores mirroring backend state.
//!
//! Each store owns its state behind a lock that is never held across an
//! `.await`. Reads are synchronous snapshots; mutations go to the backend first.

mod history;
mod notes;
mod papers;
mod tags;

pub use history::*;
pub use notes::*;
pub use papers::*;
pub use tags::*;

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::errors::ClientError;

/// Set of mutations currently outstanding, keyed by target.
///
/// A second identical mutation issued while the first is still running is
/// rejected instead of reaching the backend twice.
#[derive(Debug, Default)]
pub struct InFlight {
    keys: Mutex<HashSet<String>>,
}

impl InFlight {
    /// Claim `key`, failing if it is already claimed.
    pub fn begin(&self, key: impl Into<String>) -> Result<InFlightGuard<'_>, ClientError> {
        let key = key.into();
        let mut keys = self.keys.lock().unwrap_or_else(PoisonError::into_inner);

        if !keys.insert(key.clone()) {
            tracing::debug!("Rejecting duplicate request {}", key);
            return Err(ClientError::InFlight(format!(
                "A request for {} is already in progress",
                key
            )));
        }

        Ok(InFlightGuard { owner: self, key })
    }

    pub fn is_active(&self, key: &str) -> bool {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }
}

/// Releases its key when dropped, including on cancellation.
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    owner: &'a InFlight,
    key: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.owner
            .keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

/// Counts outstanding fetches for a store's loading indicator.
#[derive(Debug, Default)]
pub(crate) struct Pending {
    count: AtomicUsize,
}

impl Pending {
    pub(crate) fn start(&self) -> PendingGuard<'_> {
        self.count.fetch_add(1, Ordering::SeqCst);
        PendingGuard { owner: self }
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.count.load(Ordering::SeqCst) > 0
    }
}

pub(crate) struct PendingGuard<'a> {
    owner: &'a Pending,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.owner.count.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Per-key mutation counters.
///
/// A fetch records the counter for its key before awaiting the backend and
/// only applies its result if no local mutation bumped the counter meanwhile.
#[derive(Debug, Default)]
pub(crate) struct Generations {
    counters: Mutex<HashMap<String, u64>>,
}

impl Generations {
    pub(crate) fn current(&self, key: &str) -> u64 {
        self.lock().get(key).copied().unwrap_or(0)
    }

    pub(crate) fn bump(&self, key: &str) {
        *self.lock().entry(key.to_string()).or_insert(0) += 1;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, u64>> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_flight_rejects_duplicates_until_released() {
        let in_flight = InFlight::default();

        let guard = in_flight.begin("paper:W1").unwrap();
        assert!(in_flight.is_active("paper:W1"));

        let err = in_flight.begin("paper:W1").unwrap_err();
        assert!(matches!(err, ClientError::InFlight(_)));

        // Other keys are independent
        let _other = in_flight.begin("paper:W2").unwrap();

        drop(guard);
        assert!(!in_flight.is_active("paper:W1"));
        assert!(in_flight.begin("paper:W1").is_ok());
    }

    #[test]
    fn test_pending_tracks_nested_fetches() {
        let pending = Pending::default();
        assert!(!pending.is_pending());

        let a = pending.start();
        let b = pending.start();
        drop(a);
        assert!(pending.is_pending());
        drop(b);
        assert!(!pending.is_pending());
    }

    #[test]
    fn test_generations_are_per_key() {
        let generations = Generations::default();
        assert_eq!(generations.current("W1"), 0);

        let seen = generations.current("W1");
        generations.bump("W1");
        assert_ne!(generations.current("W1"), seen);
        assert_eq!(generations.current("W2"), 0);
    }
}
