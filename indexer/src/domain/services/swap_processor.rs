//! Per-block swap extraction
//!
//! Qualifies the transactions of a block against the enabled DEX pool
//! credentials, resolves their inputs through the chain-data provider, and
//! hands each qualifying transaction to the owning classifier.

use std::collections::HashSet;
use std::sync::Arc;

use log::debug;

use crate::domain::errors::PipelineError;
use crate::domain::models::{Block, PoolReserve, Swap, TransactionBody};
use crate::domain::services::dex::{ClassifierRegistry, DexClassifier, QualifiedTx};
use crate::infrastructure::chaindata::ChainDataProvider;

/// The per-block result: swaps plus reserve snapshots
#[derive(Debug, Clone, Default)]
pub struct BlockDexActivity {
    pub swaps: Vec<Swap>,
    pub reserves: Vec<PoolReserve>,
}

pub struct SwapProcessor {
    registry: Arc<ClassifierRegistry>,
    chain_data: Arc<dyn ChainDataProvider>,
}

impl SwapProcessor {
    pub fn new(registry: Arc<ClassifierRegistry>, chain_data: Arc<dyn ChainDataProvider>) -> Self {
        Self {
            registry,
            chain_data,
        }
    }

    /// Extract all DEX activity from a block.
    ///
    /// Transactions with no output paying to a known pool credential are
    /// skipped without resolving their inputs.
    pub async fn process_block(&self, block: &Block) -> Result<BlockDexActivity, PipelineError> {
        let mut activity = BlockDexActivity::default();

        let qualifying: Vec<(&TransactionBody, Vec<String>)> = block
            .transactions
            .iter()
            .filter_map(|tx| {
                let credentials = self.matched_credentials(tx);
                if credentials.is_empty() {
                    None
                } else {
                    Some((tx, credentials))
                }
            })
            .collect();

        if qualifying.is_empty() {
            return Ok(activity);
        }

        debug!(
            "Block {}: {} of {} transactions touch DEX pools",
            block.slot,
            qualifying.len(),
            block.transactions.len());

        for (tx, credentials) in qualifying {
            let resolved = self
                .chain_data
                .resolve_inputs(&tx.inputs)
                .await
                .map_err(PipelineError::ChainDataError)?;

            // One classification pass per distinct protocol touched
            let mut seen = HashSet::new();
            for credential in &credentials {
                let classifier = match self.registry.for_credential(credential) {
                    Some(classifier) => classifier,
                    None => continue,
                };
                if !seen.insert(classifier.dex_code()) {
                    continue;
                }

                let qualified = QualifiedTx {
                    tx_hash: tx.hash.clone(),
                    slot: block.slot,
                    dex_credential: credential.clone(),
                    inputs: resolved.clone(),
                    outputs: tx.outputs.clone(),
                    datums: tx.datums.clone(),
                };

                activity.swaps.extend(classifier.compute_swaps(&qualified));
                activity
                    .reserves
                    .extend(classifier.compute_pool_reserves(&qualified));
            }
        }

        Ok(activity)
    }

    fn matched_credentials(&self, tx: &TransactionBody) -> Vec<String> {
        let mut credentials = Vec::new();
        for output in &tx.outputs {
            if let Some(credential) = output.payment_credential.as_deref() {
                if self.registry.for_credential(credential).is_some()
                    && !credentials.iter().any(|c: &String| c == credential)
                {
                    credentials.push(credential.to_string());
                }
            }
        }
        credentials
    }
}
