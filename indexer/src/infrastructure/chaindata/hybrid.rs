//! Hybrid resolver
//!
//! Serves input resolution from the in-memory UTXO cache first and falls
//! back to a configured provider for the misses. The merged result preserves
//! the order of the requested references.
//!
//! The fallback is contracted to echo each reference it resolves; the
//! resolver validates the response by reference key and by size, and exports
//! counters for both kinds of violation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use log::{info, warn};

use crate::domain::models::{ChainPoint, OutputRef, ResolvedInput, TransactionOutput};
use crate::domain::services::utxo_cache::UtxoCache;
use crate::infrastructure::chaindata::error::ChainDataError;
use crate::infrastructure::chaindata::provider::ChainDataProvider;
use crate::utils::metrics::PipelineMetrics;

/// Summary log line frequency, in resolver invocations
const REPORT_EVERY: u64 = 100;

/// Cache-first resolver over a fallback provider
pub struct HybridResolver {
    cache: Arc<UtxoCache>,
    fallback: Arc<dyn ChainDataProvider>,
    metrics: Arc<PipelineMetrics>,
    invocations: AtomicU64,
}

impl HybridResolver {
    pub fn new(
        cache: Arc<UtxoCache>,
        fallback: Arc<dyn ChainDataProvider>,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            cache,
            fallback,
            metrics,
            invocations: AtomicU64::new(0),
        }
    }

    fn report(&self) {
        let invocations = self.invocations.fetch_add(1, Ordering::Relaxed) + 1;
        if invocations % REPORT_EVERY == 0 {
            let stats = self.cache.stats();
            info!(
                "Resolver after {} calls: {:.1}% cache hit rate ({} hits / {} misses), \
                 cache {}/{} ({:.1}% full)",
                invocations,
                self.metrics.cache_hit_rate(),
                self.metrics.cache_hits(),
                self.metrics.cache_misses(),
                stats.size,
                stats.max_size,
                stats.utilization_percent);
        }
    }
}

#[async_trait]
impl ChainDataProvider for HybridResolver {
    fn name(&self) -> &'static str {
        "hybrid"
    }

    async fn resolve_inputs(
        &self,
        references: &[OutputRef],
    ) -> Result<Vec<ResolvedInput>, ChainDataError> {
        self.report();

        let hits = self.cache.get_many(references);
        let mut cached: HashMap<String, TransactionOutput> = hits
            .into_iter()
            .map(|input| (input.reference.key(), input.output))
            .collect();

        let misses: Vec<OutputRef> = references
            .iter()
            .filter(|reference| !cached.contains_key(&reference.key()))
            .cloned()
            .collect();

        self.metrics.record_cache_hits(cached.len() as u64);
        self.metrics.record_cache_misses(misses.len() as u64);

        let mut fetched: HashMap<String, TransactionOutput> = HashMap::new();
        if !misses.is_empty() {
            let resolved = self.fallback.resolve_inputs(&misses).await?;

            if resolved.len() != misses.len() {
                self.metrics.record_utxo_resolution_count_mismatch();
                warn!(
                    "Fallback {} returned {} outputs for {} requested references",
                    self.fallback.name(),
                    resolved.len(),
                    misses.len());
            }

            for input in resolved {
                fetched.insert(input.reference.key(), input.output);
            }
        }

        let mut merged = Vec::with_capacity(references.len());
        let mut missing = 0u64;
        for reference in references {
            let key = reference.key();
            let output = cached.remove(&key).or_else(|| fetched.remove(&key));
            match output {
                Some(output) => merged.push(ResolvedInput::new(reference.clone(), output)),
                None => missing += 1,
            }
        }

        if missing > 0 {
            self.metrics.record_utxo_resolution_missing(missing);
            warn!(
                "{} of {} input references could not be resolved",
                missing,
                references.len());
        }

        Ok(merged)
    }

    async fn find_block_nearest(&self, slot: u64) -> Result<ChainPoint, ChainDataError> {
        self.fallback.find_block_nearest(slot).await
    }
}
