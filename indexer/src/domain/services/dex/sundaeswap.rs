//! SundaeSwap classifier
//!
//! Pool datum layout (constructor 0):
//!   0: asset pair as ((policy, name), (policy, name))
//!   1: pool identifier bytes
//!   2: circulating LP tokens
//!   3: fee as (numerator, denominator)
//!
//! Reserves are read from the pool output value. Distinct pools over the
//! same pair are distinguished by the identifier, so the matching pool
//! input must carry the same identifier as well.

use log::warn;

use crate::domain::models::{PlutusData, PoolReserve, Swap, TransactionOutput};
use crate::domain::services::dex::types::{swap_from_reserve_delta, PoolSnapshot, QualifiedTx};
use crate::domain::services::dex::{DexClassifier, DexCode};

pub const POOL_SCRIPT_HASHES: &[&str] =
    &["4020e7fc2de75a0729c3cc3af715b34d98381e0cdbcfa99c950bc3ac"];

pub struct SundaeswapClassifier;

struct SundaePool {
    snapshot: PoolSnapshot,
    ident: Vec<u8>,
}

impl SundaeswapClassifier {
    fn decode_pool(
        tx: &QualifiedTx,
        output: &TransactionOutput,
    ) -> Option<SundaePool> {
        let datum = tx.resolve_datum(output)?;
        let pair = datum.field(0)?;
        let unit_a = pair.field(0)?.as_asset_unit()?;
        let unit_b = pair.field(1)?.as_asset_unit()?;
        let ident = datum.field(1)?.as_bytes()?.to_vec();

        Some(SundaePool {
            snapshot: PoolSnapshot::from_sides(
                unit_a.clone(),
                output.quantity_of(&unit_a),
                unit_b.clone(),
                output.quantity_of(&unit_b),
            ),
            ident,
        })
    }

    fn decode_or_warn(tx: &QualifiedTx, output: &TransactionOutput) -> Option<SundaePool> {
        match Self::decode_pool(tx, output) {
            Some(pool) => Some(pool),
            None => {
                warn!(
                    "[sundaeswap] Malformed pool datum in tx {}",
                    tx.tx_hash);
                None
            }
        }
    }
}

impl DexClassifier for SundaeswapClassifier {
    fn dex_code(&self) -> DexCode {
        DexCode::Sundaeswap
    }

    fn pool_script_hashes(&self) -> &'static [&'static str] {
        POOL_SCRIPT_HASHES
    }

    fn compute_swaps(&self, tx: &QualifiedTx) -> Vec<Swap> {
        let mut swaps = Vec::new();

        for output in tx.pool_outputs(POOL_SCRIPT_HASHES) {
            let after = match Self::decode_or_warn(tx, output) {
                Some(pool) => pool,
                None => continue,
            };

            let before = tx
                .pool_inputs(POOL_SCRIPT_HASHES)
                .filter_map(|input| Self::decode_pool(tx, input))
                .find(|pool| pool.ident == after.ident);

            if let Some(before) = before {
                if let Some(swap) = swap_from_reserve_delta(
                    DexCode::Sundaeswap,
                    &tx.tx_hash,
                    tx.slot,
                    &before.snapshot,
                    &after.snapshot,
                ) {
                    swaps.push(swap);
                }
            }
        }

        swaps
    }

    fn compute_pool_reserves(&self, tx: &QualifiedTx) -> Vec<PoolReserve> {
        tx.pool_outputs(POOL_SCRIPT_HASHES)
            .filter_map(|output| Self::decode_or_warn(tx, output))
            .map(|pool| {
                pool.snapshot
                    .into_pool_reserve(DexCode::Sundaeswap, tx.slot, &tx.tx_hash)
            })
            .collect()
    }
}
