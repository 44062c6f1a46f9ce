//! Single-flight memoization for a resolution session.
//!
//! Each key is registered atomically before any work starts, so concurrent
//! requests for the same key share one computation and later requests reuse
//! its result.

use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;
use tracing::trace;

pub struct SingleFlight<K, V> {
    entries: DashMap<K, Arc<OnceCell<V>>>,
    shared_count: AtomicU64,
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            shared_count: AtomicU64::new(0),
        }
    }

    /// Return the value for `key`, running `init` only if no other caller
    /// has produced it or is producing it.
    ///
    /// A failed `init` leaves the key empty; the next caller runs it again.
    pub async fn get_or_try_init<F, Fut, E>(&self, key: K, init: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        // The entry guard is dropped at the end of this statement, before any await.
        let cell = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        if cell.initialized() {
            self.shared_count.fetch_add(1, Ordering::Relaxed);
            trace!(?key, "memoized");
        }
        cell.get_or_try_init(init).await.cloned()
    }

    /// Number of calls answered from an already computed value.
    pub fn shared_count(&self) -> u64 {
        self.shared_count.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> Default for SingleFlight<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
