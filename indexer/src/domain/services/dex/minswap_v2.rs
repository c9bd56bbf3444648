//! Minswap v2 classifier
//!
//! Pool datum layout (constructor 0):
//!   0: batching stake credential
//!   1: asset A as (policy, name)
//!   2: asset B as (policy, name)
//!   3: total liquidity
//!   4: reserve A
//!   5: reserve B
//!
//! Unlike v1, the v2 datum tracks the tradable reserves directly; the output
//! value additionally holds protocol fees, so reserves are read from the
//! datum rather than from the value.

use log::warn;

use crate::domain::models::{PlutusData, PoolReserve, Swap, TransactionOutput};
use crate::domain::services::dex::types::{swap_from_reserve_delta, PoolSnapshot, QualifiedTx};
use crate::domain::services::dex::{DexClassifier, DexCode};

pub const POOL_SCRIPT_HASHES: &[&str] =
    &["ea07b733d932129c378af627436e7cbc2ef0bf96e0036bb51b3bde6b"];

pub struct MinswapV2Classifier;

impl MinswapV2Classifier {
    fn decode_pool(datum: &PlutusData) -> Option<(String, u64, String, u64)> {
        let unit_a = datum.field(1)?.as_asset_unit()?;
        let unit_b = datum.field(2)?.as_asset_unit()?;
        let reserve_a = datum.field(4)?.as_int()?;
        let reserve_b = datum.field(5)?.as_int()?;

        if reserve_a < 0 || reserve_b < 0 {
            return None;
        }

        Some((unit_a, reserve_a as u64, unit_b, reserve_b as u64))
    }

    fn snapshot(&self, tx: &QualifiedTx, output: &TransactionOutput) -> Option<PoolSnapshot> {
        let datum = tx.resolve_datum(output)?;
        match Self::decode_pool(datum) {
            Some((unit_a, reserve_a, unit_b, reserve_b)) => Some(PoolSnapshot::from_sides(
                unit_a, reserve_a, unit_b, reserve_b,
            )),
            None => {
                warn!(
                    "[minswapv2] Malformed pool datum in tx {}",
                    tx.tx_hash);
                None
            }
        }
    }
}

impl DexClassifier for MinswapV2Classifier {
    fn dex_code(&self) -> DexCode {
        DexCode::MinswapV2
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

            let before = tx
                .pool_inputs(POOL_SCRIPT_HASHES)
                .filter_map(|input| self.snapshot(tx, input))
                .find(|snapshot| snapshot.pair == after.pair);

            if let Some(before) = before {
                if let Some(swap) = swap_from_reserve_delta(
                    DexCode::MinswapV2,
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
            .map(|snapshot| snapshot.into_pool_reserve(DexCode::MinswapV2, tx.slot, &tx.tx_hash))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{SwapOperation, LOVELACE};
    use crate::domain::services::dex::types::test_support::{
        asset_pair_data, pool_output, qualified_tx, resolved_pool_input,
    };

    const TOKEN: &str = "00112233445566778899aabbccddeeff00112233445566778899aabb434f4e59";

    fn pool_datum_v2(reserve_a: i128, reserve_b: i128) -> PlutusData {
        PlutusData::constr(
            0,
            vec![
                PlutusData::Bytes(vec![0u8; 28]),
                asset_pair_data(LOVELACE),
                asset_pair_data(TOKEN),
                PlutusData::Int(0),
                PlutusData::Int(reserve_a),
                PlutusData::Int(reserve_b),
                PlutusData::Int(30),
                PlutusData::Int(30),
            ],
        )
    }

    #[test]
    fn reserves_come_from_datum_not_value() {
        let credential = POOL_SCRIPT_HASHES[0];

        // The output value carries extra protocol fees on top of the
        // datum-tracked reserves
        let tx = qualified_tx(
            "tx1",
            2_000_000,
            credential,
            vec![],
            vec![pool_output(
                credential,
                &[(LOVELACE, 105_000_000), (TOKEN, 500)],
                pool_datum_v2(100_000_000, 500),
            )],
        );

        let reserves = MinswapV2Classifier.compute_pool_reserves(&tx);
        assert_eq!(reserves.len(), 1);
        assert_eq!(reserves[0].reserve1, 100_000_000);
        assert_eq!(reserves[0].reserve2, 500);
    }

    #[test]
    fn derives_buy_swap_from_datum_deltas() {
        let credential = POOL_SCRIPT_HASHES[0];

        let tx = qualified_tx(
            "tx1",
            2_000_000,
            credential,
            vec![resolved_pool_input(
                credential,
                &[(LOVELACE, 100_000_000), (TOKEN, 500)],
                pool_datum_v2(100_000_000, 500),
            )],
            vec![pool_output(
                credential,
                &[(LOVELACE, 110_000_000), (TOKEN, 455)],
                pool_datum_v2(110_000_000, 455),
            )],
        );

        let swaps = MinswapV2Classifier.compute_swaps(&tx);
        assert_eq!(swaps.len(), 1);
        assert_eq!(swaps[0].operation, SwapOperation::Buy);
        assert_eq!(swaps[0].amount1, 10_000_000);
        assert_eq!(swaps[0].amount2, 45);
    }

    #[test]
    fn negative_datum_reserve_is_malformed() {
        let credential = POOL_SCRIPT_HASHES[0];

        let tx = qualified_tx(
            "tx1",
            2_000_000,
            credential,
            vec![],
            vec![pool_output(
                credential,
                &[(LOVELACE, 1_000_000)],
                pool_datum_v2(-1, 500),
            )],
        );

        assert!(MinswapV2Classifier.compute_pool_reserves(&tx).is_empty());
    }
}
