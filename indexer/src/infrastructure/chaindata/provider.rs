use async_trait::async_trait;

use crate::domain::models::{ChainPoint, OutputRef, ResolvedInput};
use crate::infrastructure::chaindata::error::ChainDataError;

/// Resolves historical chain data the pipeline cannot derive from the
/// current block alone.
///
/// Contract: `resolve_inputs` returns the outputs it can resolve in the
/// order of the input references, each echoing the reference it belongs to.
/// References that cannot be resolved are absent from the result; callers
/// detect this by comparing lengths.
#[async_trait]
pub trait ChainDataProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &'static str;

    /// Resolve the given output references
    async fn resolve_inputs(
        &self,
        references: &[OutputRef],
    ) -> Result<Vec<ResolvedInput>, ChainDataError>;

    /// The closest block at or before the given slot
    async fn find_block_nearest(&self, slot: u64) -> Result<ChainPoint, ChainDataError>;
}
