//! Shared types and helpers for the DEX classifiers

use std::collections::HashMap;

use log::warn;

use crate::domain::models::{
    PlutusData, PoolReserve, ResolvedInput, Swap, SwapOperation, TransactionOutput, LOVELACE,
};
use crate::domain::services::dex::DexCode;

/// A transaction that qualified for classification: it pays to a known pool
/// credential, with its inputs resolved and witness datums attached
#[derive(Debug, Clone)]
pub struct QualifiedTx {
    pub tx_hash: String,
    pub slot: u64,
    /// The pool credential that qualified this transaction
    pub dex_credential: String,
    pub inputs: Vec<ResolvedInput>,
    pub outputs: Vec<TransactionOutput>,
    /// Witness-set datums keyed by datum hash
    pub datums: HashMap<String, PlutusData>,
}

impl QualifiedTx {
    /// Outputs paying to any of the given pool credentials
    pub fn pool_outputs<'a>(
        &'a self,
        credentials: &[&str],
    ) -> impl Iterator<Item = &'a TransactionOutput> {
        let credentials: Vec<String> = credentials.iter().map(|c| c.to_string()).collect();
        self.outputs
            .iter()
            .filter(move |output| matches_any(output, &credentials))
    }

    /// Resolved inputs spending outputs of any of the given pool credentials
    pub fn pool_inputs<'a>(
        &'a self,
        credentials: &[&str],
    ) -> impl Iterator<Item = &'a TransactionOutput> {
        let credentials: Vec<String> = credentials.iter().map(|c| c.to_string()).collect();
        self.inputs
            .iter()
            .map(|input| &input.output)
            .filter(move |output| matches_any(output, &credentials))
    }

    /// The structured datum of an output: inline, or looked up in the
    /// witness set by hash
    pub fn resolve_datum<'a>(&'a self, output: &'a TransactionOutput) -> Option<&'a PlutusData> {
        match &output.datum {
            crate::domain::models::Datum::Inline(data) => Some(data),
            crate::domain::models::Datum::Hash(hash) => self.datums.get(hash),
            crate::domain::models::Datum::None => None,
        }
    }
}

fn matches_any(output: &TransactionOutput, credentials: &[String]) -> bool {
    credentials
        .iter()
        .any(|credential| output.pays_to_credential(credential))
}

/// A pool's asset pair in canonical order: the quote side first.
/// The native coin is always the quote; otherwise the lexicographically
/// smaller unit is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolPair {
    pub quote_unit: String,
    pub asset_unit: String,
}

impl PoolPair {
    pub fn canonical(unit_a: String, unit_b: String) -> Self {
        if unit_a == LOVELACE {
            Self {
                quote_unit: unit_a,
                asset_unit: unit_b,
            }
        } else if unit_b == LOVELACE || unit_b < unit_a {
            Self {
                quote_unit: unit_b,
                asset_unit: unit_a,
            }
        } else {
            Self {
                quote_unit: unit_a,
                asset_unit: unit_b,
            }
        }
    }
}

/// Reserve state of one pool at one point, in canonical pair order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub pair: PoolPair,
    pub quote_reserve: u64,
    pub asset_reserve: u64,
}

impl PoolSnapshot {
    /// Build a snapshot from protocol-order sides, swapping reserves along
    /// with units when canonicalization flips the pair
    pub fn from_sides(unit_a: String, reserve_a: u64, unit_b: String, reserve_b: u64) -> Self {
        let pair = PoolPair::canonical(unit_a.clone(), unit_b);
        if pair.quote_unit == unit_a {
            Self {
                pair,
                quote_reserve: reserve_a,
                asset_reserve: reserve_b,
            }
        } else {
            Self {
                pair,
                quote_reserve: reserve_b,
                asset_reserve: reserve_a,
            }
        }
    }

    pub fn into_pool_reserve(self, dex: DexCode, slot: u64, tx_hash: &str) -> PoolReserve {
        PoolReserve {
            asset1_unit: self.pair.quote_unit,
            asset2_unit: self.pair.asset_unit,
            dex,
            slot,
            reserve1: self.quote_reserve,
            reserve2: self.asset_reserve,
            tx_hash: tx_hash.to_string(),
        }
    }
}

/// Derive a swap from the reserve movement of one pool across a transaction.
///
/// Reserves moving in opposite directions is a trade; the trader bought
/// whichever side the pool lost. Same-direction movement is a liquidity
/// change, not a swap. A one-sided movement is an anomaly but still emitted;
/// it is flagged as an outlier downstream.
pub fn swap_from_reserve_delta(
    dex: DexCode,
    tx_hash: &str,
    slot: u64,
    before: &PoolSnapshot,
    after: &PoolSnapshot,
) -> Option<Swap> {
    if before.pair != after.pair {
        warn!(
            "[{}] Pool pair changed within tx {}; skipping swap derivation",
            dex.code(),
            tx_hash);
        return None;
    }

    let delta_quote = after.quote_reserve as i128 - before.quote_reserve as i128;
    let delta_asset = after.asset_reserve as i128 - before.asset_reserve as i128;

    if delta_quote == 0 && delta_asset == 0 {
        return None;
    }

    // Both reserves moved the same way: deposit or withdrawal
    if delta_quote.signum() == delta_asset.signum() && delta_quote != 0 && delta_asset != 0 {
        return None;
    }

    let operation = if delta_asset < 0 || (delta_asset == 0 && delta_quote > 0) {
        SwapOperation::Buy
    } else {
        SwapOperation::Sell
    };

    Some(Swap {
        tx_hash: tx_hash.to_string(),
        slot,
        dex,
        asset1_unit: after.pair.quote_unit.clone(),
        asset2_unit: after.pair.asset_unit.clone(),
        amount1: delta_quote.unsigned_abs() as u64,
        amount2: delta_asset.unsigned_abs() as u64,
        operation,
    })
}

/// Builders shared by the classifier unit tests
#[cfg(test)]
pub mod test_support {
    use super::*;
    use crate::domain::models::{Datum, OutputRef, TxAmount};

    /// `(policy, name)` constructor pair for a unit string; a unit is the
    /// policy id (56 hex chars) followed by the hex asset name
    pub fn asset_pair_data(unit: &str) -> PlutusData {
        if unit == LOVELACE {
            PlutusData::constr(
                0,
                vec![PlutusData::Bytes(vec![]), PlutusData::Bytes(vec![])],
            )
        } else {
            let (policy, name) = unit.split_at(56.min(unit.len()));
            PlutusData::constr(
                0,
                vec![PlutusData::bytes_hex(policy), PlutusData::bytes_hex(name)],
            )
        }
    }

    /// Minswap v1 style pool datum
    pub fn pool_datum_v1(unit_a: &str, unit_b: &str) -> PlutusData {
        PlutusData::constr(
            0,
            vec![
                asset_pair_data(unit_a),
                asset_pair_data(unit_b),
                PlutusData::Int(0),
                PlutusData::Int(0),
            ],
        )
    }

    pub fn pool_output(
        credential: &str,
        amounts: &[(&str, u64)],
        datum: PlutusData,
    ) -> TransactionOutput {
        TransactionOutput::new(
            "addr1pool",
            Some(credential.to_string()),
            amounts
                .iter()
                .map(|(unit, quantity)| TxAmount::new(*unit, *quantity))
                .collect(),
            Datum::Inline(datum),
        )
    }

    pub fn resolved_pool_input(
        credential: &str,
        amounts: &[(&str, u64)],
        datum: PlutusData,
    ) -> ResolvedInput {
        ResolvedInput::new(
            OutputRef::new("previous", 0),
            pool_output(credential, amounts, datum),
        )
    }

    pub fn qualified_tx(
        tx_hash: &str,
        slot: u64,
        credential: &str,
        inputs: Vec<ResolvedInput>,
        outputs: Vec<TransactionOutput>,
    ) -> QualifiedTx {
        QualifiedTx {
            tx_hash: tx_hash.to_string(),
            slot,
            dex_credential: credential.to_string(),
            inputs,
            outputs,
            datums: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(quote: u64, asset: u64) -> PoolSnapshot {
        PoolSnapshot {
            pair: PoolPair::canonical(LOVELACE.to_string(), "aabbcc".to_string()),
            quote_reserve: quote,
            asset_reserve: asset,
        }
    }

    #[test]
    fn canonical_pair_prefers_lovelace_as_quote() {
        let pair = PoolPair::canonical("ff00".to_string(), LOVELACE.to_string());
        assert_eq!(pair.quote_unit, LOVELACE);
        assert_eq!(pair.asset_unit, "ff00");

        let pair = PoolPair::canonical("ff00".to_string(), "aa00".to_string());
        assert_eq!(pair.quote_unit, "aa00");
        assert_eq!(pair.asset_unit, "ff00");
    }

    #[test]
    fn buy_when_pool_loses_asset() {
        let swap = swap_from_reserve_delta(
            DexCode::Minswap,
            "tx1",
            1000,
            &snapshot(100, 200),
            &snapshot(110, 180),
        )
        .unwrap();

        assert_eq!(swap.operation, SwapOperation::Buy);
        assert_eq!(swap.amount1, 10);
        assert_eq!(swap.amount2, 20);
    }

    #[test]
    fn sell_when_pool_gains_asset() {
        let swap = swap_from_reserve_delta(
            DexCode::Minswap,
            "tx1",
            1000,
            &snapshot(100, 200),
            &snapshot(90, 220),
        )
        .unwrap();

        assert_eq!(swap.operation, SwapOperation::Sell);
        assert_eq!(swap.amount1, 10);
        assert_eq!(swap.amount2, 20);
    }

    #[test]
    fn liquidity_change_is_not_a_swap() {
        let swap = swap_from_reserve_delta(
            DexCode::Minswap,
            "tx1",
            1000,
            &snapshot(100, 200),
            &snapshot(150, 300),
        );
        assert!(swap.is_none());
    }

    #[test]
    fn one_sided_movement_is_emitted() {
        let swap = swap_from_reserve_delta(
            DexCode::Minswap,
            "tx1",
            1000,
            &snapshot(100, 200),
            &snapshot(110, 200),
        )
        .unwrap();

        assert_eq!(swap.operation, SwapOperation::Buy);
        assert_eq!(swap.amount2, 0);
    }

    #[test]
    fn unchanged_reserves_emit_nothing() {
        let swap = swap_from_reserve_delta(
            DexCode::Minswap,
            "tx1",
            1000,
            &snapshot(100, 200),
            &snapshot(100, 200),
        );
        assert!(swap.is_none());
    }
}
