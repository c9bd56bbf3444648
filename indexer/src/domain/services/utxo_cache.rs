//! UTXO Cache
//!
//! In-memory cache mapping output references to decoded outputs so that the
//! resolver can serve most inputs without touching an external provider.
//!
//! Architecture:
//! - Entries are keyed by `txHash#index`
//! - A single mutex guards the map together with the insertion-order queue
//! - Eviction is strictly by first insertion; reads never promote an entry
//! - Entries are not removed when spent: a later rollback may need them again

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use log::warn;

use crate::domain::models::{OutputRef, ResolvedInput, TransactionOutput};

/// Default maximum number of cached outputs
pub const DEFAULT_MAX_ENTRIES: usize = 100_000;

/// Point-in-time cache statistics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub utilization_percent: f64,
}

struct CacheInner {
    entries: HashMap<String, TransactionOutput>,
    insertion_order: VecDeque<String>,
}

/// Thread-safe bounded cache of transaction outputs
pub struct UtxoCache {
    inner: Mutex<CacheInner>,
    max_entries: usize,
}

impl UtxoCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                insertion_order: VecDeque::new(),
            }),
            max_entries: max_entries.max(1),
        }
    }

    /// Cache every output of a transaction. Keys already present are left
    /// untouched, so repeated calls for the same transaction are idempotent.
    pub fn add_outputs(&self, tx_hash: &str, outputs: &[TransactionOutput]) {
        let mut inner = match self.inner.lock() {
            Ok(inner) => inner,
            Err(e) => {
                warn!(
                    "UTXO cache lock failed while adding outputs of {}: {}",
                    tx_hash, e);
                return;
            }
        };

        for (index, output) in outputs.iter().enumerate() {
            let key = format!("{}#{}", tx_hash, index);
            if inner.entries.contains_key(&key) {
                continue;
            }

            while inner.entries.len() >= self.max_entries {
                match inner.insertion_order.pop_front() {
                    Some(oldest) => {
                        inner.entries.remove(&oldest);
                    }
                    None => break,
                }
            }

            inner.entries.insert(key.clone(), output.clone());
            inner.insertion_order.push_back(key);
        }
    }

    /// Look up a single output
    pub fn get(&self, reference: &OutputRef) -> Option<TransactionOutput> {
        match self.inner.lock() {
            Ok(inner) => inner.entries.get(&reference.key()).cloned(),
            Err(e) => {
                warn!("UTXO cache lock failed on read: {}", e);
                None
            }
        }
    }

    /// Look up many references; returns only the subset found
    pub fn get_many(&self, references: &[OutputRef]) -> Vec<ResolvedInput> {
        let inner = match self.inner.lock() {
            Ok(inner) => inner,
            Err(e) => {
                warn!("UTXO cache lock failed on read: {}", e);
                return Vec::new();
            }
        };

        references
            .iter()
            .filter_map(|reference| {
                inner
                    .entries
                    .get(&reference.key())
                    .map(|output| ResolvedInput::new(reference.clone(), output.clone()))
            })
            .collect()
    }

    /// Explicitly drop one entry
    pub fn remove_spent(&self, tx_hash: &str, output_index: u32) {
        let key = format!("{}#{}", tx_hash, output_index);
        if let Ok(mut inner) = self.inner.lock() {
            if inner.entries.remove(&key).is_some() {
                inner.insertion_order.retain(|k| k != &key);
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        let size = self
            .inner
            .lock()
            .map(|inner| inner.entries.len())
            .unwrap_or(0);
        CacheStats {
            size,
            max_size: self.max_entries,
            utilization_percent: size as f64 / self.max_entries as f64 * 100.0,
        }
    }

    /// Drop every entry (used on rollback re-initialization)
    pub fn clear(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.entries.clear();
            inner.insertion_order.clear();
        }
    }
}

impl Default for UtxoCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Datum, TxAmount};

    fn output(lovelace: u64) -> TransactionOutput {
        TransactionOutput::new(
            "addr1test",
            None,
            vec![TxAmount::lovelace(lovelace)],
            Datum::None,
        )
    }

    #[test]
    fn add_and_get_roundtrip() {
        let cache = UtxoCache::new(10);
        cache.add_outputs("aa", &[output(1), output(2)]);

        let found = cache.get(&OutputRef::new("aa", 1));
        assert_eq!(found.map(|o| o.lovelace()), Some(2));
        assert!(cache.get(&OutputRef::new("aa", 5)).is_none());
    }

    #[test]
    fn get_many_returns_found_subset() {
        let cache = UtxoCache::new(10);
        cache.add_outputs("aa", &[output(1)]);

        let refs = vec![OutputRef::new("aa", 0), OutputRef::new("bb", 0)];
        let found = cache.get_many(&refs);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].reference, refs[0]);
    }

    #[test]
    fn eviction_is_first_inserted_first_out() {
        let cache = UtxoCache::new(3);
        cache.add_outputs("aa", &[output(1), output(2), output(3)]);

        // Two new keys push out the two oldest
        cache.add_outputs("bb", &[output(4), output(5)]);

        assert!(cache.get(&OutputRef::new("aa", 0)).is_none());
        assert!(cache.get(&OutputRef::new("aa", 1)).is_none());
        assert!(cache.get(&OutputRef::new("aa", 2)).is_some());
        assert!(cache.get(&OutputRef::new("bb", 0)).is_some());
        assert!(cache.get(&OutputRef::new("bb", 1)).is_some());
        assert_eq!(cache.stats().size, 3);
    }

    #[test]
    fn size_never_exceeds_capacity() {
        let cache = UtxoCache::new(5);
        for i in 0..20 {
            cache.add_outputs(&format!("tx{}", i), &[output(i as u64)]);
            assert!(cache.stats().size <= 5);
        }
    }

    #[test]
    fn duplicate_adds_are_idempotent() {
        let cache = UtxoCache::new(10);
        cache.add_outputs("aa", &[output(1)]);
        cache.add_outputs("aa", &[output(99)]);

        // First insertion wins; the duplicate neither replaces nor evicts
        assert_eq!(
            cache.get(&OutputRef::new("aa", 0)).map(|o| o.lovelace()),
            Some(1)
        );
        assert_eq!(cache.stats().size, 1);
    }

    #[test]
    fn remove_spent_drops_entry() {
        let cache = UtxoCache::new(10);
        cache.add_outputs("aa", &[output(1)]);
        cache.remove_spent("aa", 0);
        assert!(cache.get(&OutputRef::new("aa", 0)).is_none());
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn stats_report_utilization() {
        let cache = UtxoCache::new(4);
        cache.add_outputs("aa", &[output(1), output(2)]);
        let stats = cache.stats();
        assert_eq!(stats.size, 2);
        assert_eq!(stats.max_size, 4);
        assert_eq!(stats.utilization_percent, 50.0);
    }
}
