//! Metrics tracking for the ingestion pipeline.
//!
//! Provides atomic counters for monitoring pipeline progress and failures,
//! rendered in Prometheus text format by the web module.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for the ingestion pipeline.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    /// Blocks fully processed (completion signalled).
    blocks_processed: AtomicU64,

    /// Swaps extracted by the classifiers.
    swaps_computed: AtomicU64,

    /// Price rows persisted.
    prices_persisted: AtomicU64,

    /// Pool reserve rows persisted.
    pool_reserves_persisted: AtomicU64,

    /// Rollbacks handled.
    rollbacks_processed: AtomicU64,

    /// Events whose handling failed.
    event_processing_failed: AtomicU64,

    /// Pool reserve batches that failed to persist.
    pool_reserve_persist_failed: AtomicU64,

    /// Prices that failed to publish externally.
    price_publish_failed: AtomicU64,

    /// Input references the resolver could not resolve at all.
    utxo_resolution_missing: AtomicU64,

    /// Resolver calls where the fallback returned a different count
    /// than requested.
    utxo_resolution_count_mismatch: AtomicU64,

    /// UTXO cache hits.
    utxo_cache_hits: AtomicU64,

    /// UTXO cache misses.
    utxo_cache_misses: AtomicU64,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_block_processed(&self) {
        self.blocks_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_swaps_computed(&self, count: u64) {
        self.swaps_computed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_prices_persisted(&self, count: u64) {
        self.prices_persisted.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_pool_reserves_persisted(&self, count: u64) {
        self.pool_reserves_persisted.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_rollback_processed(&self) {
        self.rollbacks_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_event_processing_failed(&self) {
        self.event_processing_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pool_reserve_persist_failed(&self) {
        self.pool_reserve_persist_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_price_publish_failed(&self) {
        self.price_publish_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_utxo_resolution_missing(&self, count: u64) {
        self.utxo_resolution_missing.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_utxo_resolution_count_mismatch(&self) {
        self.utxo_resolution_count_mismatch
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hits(&self, count: u64) {
        self.utxo_cache_hits.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_cache_misses(&self, count: u64) {
        self.utxo_cache_misses.fetch_add(count, Ordering::Relaxed);
    }

    pub fn blocks_processed(&self) -> u64 {
        self.blocks_processed.load(Ordering::Relaxed)
    }

    pub fn event_processing_failed(&self) -> u64 {
        self.event_processing_failed.load(Ordering::Relaxed)
    }

    pub fn utxo_resolution_missing(&self) -> u64 {
        self.utxo_resolution_missing.load(Ordering::Relaxed)
    }

    pub fn utxo_resolution_count_mismatch(&self) -> u64 {
        self.utxo_resolution_count_mismatch.load(Ordering::Relaxed)
    }

    pub fn cache_hits(&self) -> u64 {
        self.utxo_cache_hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> u64 {
        self.utxo_cache_misses.load(Ordering::Relaxed)
    }

    /// Cache hit rate in percent over the process lifetime
    pub fn cache_hit_rate(&self) -> f64 {
        let hits = self.cache_hits() as f64;
        let total = hits + self.cache_misses() as f64;
        if total == 0.0 {
            0.0
        } else {
            hits / total * 100.0
        }
    }

    /// Render all counters in Prometheus text exposition format
    pub fn render_prometheus(&self) -> String {
        let counters = [
            ("blocks_processed", self.blocks_processed.load(Ordering::Relaxed)),
            ("swaps_computed", self.swaps_computed.load(Ordering::Relaxed)),
            ("prices_persisted", self.prices_persisted.load(Ordering::Relaxed)),
            (
                "pool_reserves_persisted",
                self.pool_reserves_persisted.load(Ordering::Relaxed),
            ),
            (
                "rollbacks_processed",
                self.rollbacks_processed.load(Ordering::Relaxed),
            ),
            (
                "event_processing_failed",
                self.event_processing_failed.load(Ordering::Relaxed),
            ),
            (
                "pool_reserve_persist_failed",
                self.pool_reserve_persist_failed.load(Ordering::Relaxed),
            ),
            (
                "price_publish_failed",
                self.price_publish_failed.load(Ordering::Relaxed),
            ),
            (
                "utxo_resolution_missing",
                self.utxo_resolution_missing.load(Ordering::Relaxed),
            ),
            (
                "utxo_resolution_count_mismatch",
                self.utxo_resolution_count_mismatch.load(Ordering::Relaxed),
            ),
            ("utxo_cache_hits", self.utxo_cache_hits.load(Ordering::Relaxed)),
            (
                "utxo_cache_misses",
                self.utxo_cache_misses.load(Ordering::Relaxed),
            ),
        ];

        let mut out = String::new();
        for (name, value) in counters {
            out.push_str(&format!("# TYPE dex_indexer_{} counter\n", name));
            out.push_str(&format!("dex_indexer_{} {}\n", name, value));
        }
        out
    }
}
