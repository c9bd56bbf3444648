//! Minswap v1 classifier
//!
//! Pool datum layout (constructor 0):
//!   0: asset A as (policy, name)
//!   1: asset B as (policy, name)
//!   2: total liquidity
//!   3: root K last
//!
//! Reserves are read from the pool output value.

use log::warn;

use crate::domain::models::{PlutusData, PoolReserve, Swap, TransactionOutput};
use crate::domain::services::dex::types::{swap_from_reserve_delta, PoolSnapshot, QualifiedTx};
use crate::domain::services::dex::{DexClassifier, DexCode};

/// Pool validator payment credentials (v1 and v1 stable pools)
pub const POOL_SCRIPT_HASHES: &[&str] = &[
    "e1317b152faac13426e6a83e06ff88a4d62cce3c1634ab0a5ec13309",
    "57c8e718c201fba10a9da1748d675b54281d3b1b983c5d1687fc7317",
];

pub struct MinswapClassifier;

impl MinswapClassifier {
    fn decode_pair(datum: &PlutusData) -> Option<(String, String)> {
        let unit_a = datum.field(0)?.as_asset_unit()?;
        let unit_b = datum.field(1)?.as_asset_unit()?;
        Some((unit_a, unit_b))
    }

    fn snapshot(&self, tx: &QualifiedTx, output: &TransactionOutput) -> Option<PoolSnapshot> {
        let datum = tx.resolve_datum(output)?;
        let (unit_a, unit_b) = match Self::decode_pair(datum) {
            Some(pair) => pair,
            None => {
                warn!(
                    "[minswap] Malformed pool datum in tx {}",
                    tx.tx_hash);
                return None;
            }
        };

        Some(PoolSnapshot::from_sides(
            unit_a.clone(),
            output.quantity_of(&unit_a),
            unit_b.clone(),
            output.quantity_of(&unit_b),
        ))
    }
}

impl DexClassifier for MinswapClassifier {
    fn dex_code(&self) -> DexCode {
        DexCode::Minswap
    }

    fn pool_script_hashes(&self) -> &'static [&'static str] {
        POOL_SCRIPT_HASHES
    }

    fn compute_swaps(&self, tx: &QualifiedTx) -> Vec<Swap> {
        let mut swaps = Vec::new();

        for output in tx.pool_outputs(POOL_SCRIPT_HASHES) {
            let after = match self.snapshot(tx, output) {
                Some(snapshot) => snapshot,
                None => continue,
            };

            // The pool input carrying the same pair; absent for pool creation
            let before = tx
                .pool_inputs(POOL_SCRIPT_HASHES)
                .filter_map(|input| self.snapshot(tx, input))
                .find(|snapshot| snapshot.pair == after.pair);

            if let Some(before) = before {
                if let Some(swap) = swap_from_reserve_delta(
                    DexCode::Minswap,
                    &tx.tx_hash,
                    tx.slot,
                    &before,
                    &after,
                ) {
                    swaps.push(swap);
                }
            }
        }

        swaps
    }

    fn compute_pool_reserves(&self, tx: &QualifiedTx) -> Vec<PoolReserve> {
        tx.pool_outputs(POOL_SCRIPT_HASHES)
            .filter_map(|output| self.snapshot(tx, output))
            .map(|snapshot| snapshot.into_pool_reserve(DexCode::Minswap, tx.slot, &tx.tx_hash))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::SwapOperation;
    use crate::domain::services::dex::types::test_support::{
        pool_datum_v1, qualified_tx, resolved_pool_input, pool_output,
    };
    use crate::domain::models::LOVELACE;

    const TOKEN: &str = "aabbccddeeff00112233445566778899aabbccddeeff001122334455564d494e";

    #[test]
    fn derives_sell_swap_from_pool_delta() {
        let credential = POOL_SCRIPT_HASHES[0];
        let datum = pool_datum_v1(LOVELACE, TOKEN);

        let tx = qualified_tx(
            "tx1",
            1_000_000,
            credential,
            vec![resolved_pool_input(
                credential,
                &[(LOVELACE, 100_000_000), (TOKEN, 200)],
                datum.clone(),
            )],
            vec![pool_output(
                credential,
                &[(LOVELACE, 90_000_000), (TOKEN, 250)],
                datum,
            )],
        );

        let swaps = MinswapClassifier.compute_swaps(&tx);
        assert_eq!(swaps.len(), 1);
        assert_eq!(swaps[0].operation, SwapOperation::Sell);
        assert_eq!(swaps[0].asset1_unit, LOVELACE);
        assert_eq!(swaps[0].asset2_unit, TOKEN);
        assert_eq!(swaps[0].amount1, 10_000_000);
        assert_eq!(swaps[0].amount2, 50);
    }

    #[test]
    fn pool_creation_emits_reserves_but_no_swap() {
        let credential = POOL_SCRIPT_HASHES[0];
        let datum = pool_datum_v1(LOVELACE, TOKEN);

        let tx = qualified_tx(
            "tx1",
            1_000_000,
            credential,
            vec![],
            vec![pool_output(
                credential,
                &[(LOVELACE, 50_000_000), (TOKEN, 1000)],
                datum,
            )],
        );

        assert!(MinswapClassifier.compute_swaps(&tx).is_empty());

        let reserves = MinswapClassifier.compute_pool_reserves(&tx);
        assert_eq!(reserves.len(), 1);
        assert_eq!(reserves[0].reserve1, 50_000_000);
        assert_eq!(reserves[0].reserve2, 1000);
    }

    #[test]
    fn malformed_datum_emits_nothing() {
        let credential = POOL_SCRIPT_HASHES[0];
        let tx = qualified_tx(
            "tx1",
            1_000_000,
            credential,
            vec![],
            vec![pool_output(
                credential,
                &[(LOVELACE, 50_000_000)],
                PlutusData::Int(42),
            )],
        );

        assert!(MinswapClassifier.compute_swaps(&tx).is_empty());
        assert!(MinswapClassifier.compute_pool_reserves(&tx).is_empty());
    }
}
