//! WingRiders classifier
//!
//! Pool datum layout (constructor 0):
//!   0: request validator hash
//!   1: pool state (constructor 0):
//!     0: asset pair as ((policy, name), (policy, name))
//!     1: last interaction timestamp
//!     2: treasury of asset A
//!     3: treasury of asset B
//!
//! The pool output value includes the protocol treasury, which is not part
//! of the tradable liquidity: reserve = value - treasury per side.

use log::warn;

use crate::domain::models::{PlutusData, PoolReserve, Swap, TransactionOutput};
use crate::domain::services::dex::types::{swap_from_reserve_delta, PoolSnapshot, QualifiedTx};
use crate::domain::services::dex::{DexClassifier, DexCode};

pub const POOL_SCRIPT_HASHES: &[&str] =
    &["e6c90a5923713af5786963dee0fdffd830ca7e0c86a041d9e5833e91"];

pub struct WingridersClassifier;

impl WingridersClassifier {
    fn decode_pool(datum: &PlutusData) -> Option<(String, u64, String, u64)> {
        let state = datum.field(1)?;
        let pair = state.field(0)?;
        let unit_a = pair.field(0)?.as_asset_unit()?;
        let unit_b = pair.field(1)?.as_asset_unit()?;
        let treasury_a = state.field(2)?.as_int()?;
        let treasury_b = state.field(3)?.as_int()?;

        if treasury_a < 0 || treasury_b < 0 {
            return None;
        }

        Some((unit_a, treasury_a as u64, unit_b, treasury_b as u64))
    }

    fn snapshot(&self, tx: &QualifiedTx, output: &TransactionOutput) -> Option<PoolSnapshot> {
        let datum = tx.resolve_datum(output)?;
        let (unit_a, treasury_a, unit_b, treasury_b) = match Self::decode_pool(datum) {
            Some(decoded) => decoded,
            None => {
                warn!(
                    "[wingriders] Malformed pool datum in tx {}",
                    tx.tx_hash);
                return None;
            }
        };

        let value_a = output.quantity_of(&unit_a);
        let value_b = output.quantity_of(&unit_b);

        let reserve_a = match value_a.checked_sub(treasury_a) {
            Some(reserve) => reserve,
            None => {
                warn!(
                    "[wingriders] Treasury exceeds pool value in tx {}",
                    tx.tx_hash);
                return None;
            }
        };
        let reserve_b = match value_b.checked_sub(treasury_b) {
            Some(reserve) => reserve,
            None => {
                warn!(
                    "[wingriders] Treasury exceeds pool value in tx {}",
                    tx.tx_hash);
                return None;
            }
        };

        Some(PoolSnapshot::from_sides(
            unit_a, reserve_a, unit_b, reserve_b,
        ))
    }
}

impl DexClassifier for WingridersClassifier {
    fn dex_code(&self) -> DexCode {
        DexCode::Wingriders
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
                    DexCode::Wingriders,
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
            .map(|snapshot| snapshot.into_pool_reserve(DexCode::Wingriders, tx.slot, &tx.tx_hash))
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

    const TOKEN: &str = "5544332211009988776655443322110099887766554433221100998857494e47";

    fn pool_datum(treasury_a: i128, treasury_b: i128) -> PlutusData {
        PlutusData::constr(
            0,
            vec![
                PlutusData::Bytes(vec![0u8; 28]),
                PlutusData::constr(
                    0,
                    vec![
                        PlutusData::constr(
                            0,
                            vec![asset_pair_data(LOVELACE), asset_pair_data(TOKEN)],
                        ),
                        PlutusData::Int(1_650_000_000),
                        PlutusData::Int(treasury_a),
                        PlutusData::Int(treasury_b),
                    ],
                ),
            ],
        )
    }

    #[test]
    fn treasury_is_excluded_from_reserves() {
        let credential = POOL_SCRIPT_HASHES[0];

        let tx = qualified_tx(
            "tx1",
            4_000_000,
            credential,
            vec![],
            vec![pool_output(
                credential,
                &[(LOVELACE, 100_000_000), (TOKEN, 1000)],
                pool_datum(5_000_000, 50),
            )],
        );

        let reserves = WingridersClassifier.compute_pool_reserves(&tx);
        assert_eq!(reserves.len(), 1);
        assert_eq!(reserves[0].reserve1, 95_000_000);
        assert_eq!(reserves[0].reserve2, 950);
    }

    #[test]
    fn swap_uses_treasury_adjusted_reserves() {
        let credential = POOL_SCRIPT_HASHES[0];

        let tx = qualified_tx(
            "tx1",
            4_000_000,
            credential,
            vec![resolved_pool_input(
                credential,
                &[(LOVELACE, 100_000_000), (TOKEN, 1000)],
                pool_datum(0, 0),
            )],
            vec![pool_output(
                credential,
                // Treasury grew by 1 ADA alongside the trade
                &[(LOVELACE, 111_000_000), (TOKEN, 900)],
                pool_datum(1_000_000, 0),
            )],
        );

        let swaps = WingridersClassifier.compute_swaps(&tx);
        assert_eq!(swaps.len(), 1);
        assert_eq!(swaps[0].operation, SwapOperation::Buy);
        assert_eq!(swaps[0].amount1, 10_000_000);
        assert_eq!(swaps[0].amount2, 100);
    }

    #[test]
    fn treasury_larger_than_value_is_malformed() {
        let credential = POOL_SCRIPT_HASHES[0];

        let tx = qualified_tx(
            "tx1",
            4_000_000,
            credential,
            vec![],
            vec![pool_output(
                credential,
                &[(LOVELACE, 1_000_000), (TOKEN, 10)],
                pool_datum(2_000_000, 0),
            )],
        );

        assert!(WingridersClassifier.compute_pool_reserves(&tx).is_empty());
    }
}
