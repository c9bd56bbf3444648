//! Swap to price conversion
//!
//! Each swap becomes one price row. The price is the quote amount per asset
//! amount, normalized by the decimals known for each unit; chain time is
//! derived from the slot.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::errors::PipelineError;
use crate::domain::models::asset::LOVELACE_DECIMALS;
use crate::domain::models::{Price, Swap, LOVELACE};
use crate::infrastructure::persistence::error::DbError;

/// Source of known asset decimals, backed by the asset table
#[async_trait]
pub trait AssetDecimalsSource: Send + Sync {
    /// Known decimals per unit; units without a known precision are absent
    async fn decimals_for(&self, units: &[String]) -> Result<HashMap<String, u32>, DbError>;
}

pub struct PriceProcessor {
    decimals_source: Arc<dyn AssetDecimalsSource>,
    slot_conversion_offset: i64,
    /// Memo of decimals already looked up; unknown units memoized as absent
    known_decimals: Mutex<HashMap<String, Option<u32>>>,
}

impl PriceProcessor {
    pub fn new(decimals_source: Arc<dyn AssetDecimalsSource>, slot_conversion_offset: i64) -> Self {
        Self {
            decimals_source,
            slot_conversion_offset,
            known_decimals: Mutex::new(HashMap::new()),
        }
    }

    /// Convert the swaps of one block into price rows.
    ///
    /// Swap indices are assigned per transaction in extraction order, so the
    /// resulting price keys are unique by construction.
    pub async fn compute_prices(&self, swaps: &[Swap]) -> Result<Vec<Price>, PipelineError> {
        self.ensure_decimals(swaps).await?;

        let mut swap_indices: HashMap<&str, i32> = HashMap::new();
        let mut prices = Vec::with_capacity(swaps.len());

        for swap in swaps {
            let swap_index = swap_indices.entry(swap.tx_hash.as_str()).or_insert(0);
            let index = *swap_index;
            *swap_index += 1;

            let quote_decimals = self.decimals_of(&swap.asset1_unit);
            let asset_decimals = self.decimals_of(&swap.asset2_unit);

            let (price, outlier) = if swap.amount1 == 0 || swap.amount2 == 0 {
                (Decimal::ZERO, Some(true))
            } else {
                let quote = Decimal::from_i128_with_scale(swap.amount1 as i128, quote_decimals);
                let asset = Decimal::from_i128_with_scale(swap.amount2 as i128, asset_decimals);
                (quote / asset, None)
            };

            prices.push(Price {
                asset_unit: swap.asset2_unit.clone(),
                quote_unit: swap.asset1_unit.clone(),
                dex: swap.dex,
                time: swap.slot as i64 - self.slot_conversion_offset,
                tx_hash: swap.tx_hash.clone(),
                swap_index: index,
                price,
                amount1: swap.amount1,
                amount2: swap.amount2,
                operation: swap.operation.as_i16(),
                outlier,
            });
        }

        Ok(prices)
    }

    /// Chain time in seconds for a slot
    pub fn slot_to_time(&self, slot: u64) -> i64 {
        slot as i64 - self.slot_conversion_offset
    }

    async fn ensure_decimals(&self, swaps: &[Swap]) -> Result<(), PipelineError> {
        let unknown: Vec<String> = {
            let known = self
                .known_decimals
                .lock()
                .map_err(|e| PipelineError::ProcessingError(e.to_string()))?;
            swaps
                .iter()
                .flat_map(|swap| [&swap.asset1_unit, &swap.asset2_unit])
                .filter(|unit| unit.as_str() != LOVELACE && !known.contains_key(unit.as_str()))
                .cloned()
                .collect::<std::collections::HashSet<_>>()
                .into_iter()
                .collect()
        };

        if unknown.is_empty() {
            return Ok(());
        }

        let resolved = self
            .decimals_source
            .decimals_for(&unknown)
            .await
            .map_err(PipelineError::DbError)?;

        if let Ok(mut known) = self.known_decimals.lock() {
            for unit in unknown {
                known.insert(unit.clone(), resolved.get(&unit).copied());
            }
        }

        Ok(())
    }

    fn decimals_of(&self, unit: &str) -> u32 {
        if unit == LOVELACE {
            return LOVELACE_DECIMALS;
        }
        self.known_decimals
            .lock()
            .ok()
            .and_then(|known| known.get(unit).copied().flatten())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::SwapOperation;
    use crate::domain::services::dex::DexCode;
    use std::str::FromStr;

    struct StubDecimals(HashMap<String, u32>);

    #[async_trait]
    impl AssetDecimalsSource for StubDecimals {
        async fn decimals_for(&self, units: &[String]) -> Result<HashMap<String, u32>, DbError> {
            Ok(units
                .iter()
                .filter_map(|unit| self.0.get(unit).map(|d| (unit.clone(), *d)))
                .collect())
        }
    }

    fn processor(decimals: &[(&str, u32)]) -> PriceProcessor {
        let source = StubDecimals(
            decimals
                .iter()
                .map(|(unit, d)| (unit.to_string(), *d))
                .collect(),
        );
        // Offset of -1000: time = slot + 1000
        PriceProcessor::new(Arc::new(source), -1000)
    }

    fn swap(amount1: u64, amount2: u64) -> Swap {
        Swap {
            tx_hash: "tx1".to_string(),
            slot: 1_000_000,
            dex: DexCode::Minswap,
            asset1_unit: LOVELACE.to_string(),
            asset2_unit: "aabb".to_string(),
            amount1,
            amount2,
            operation: SwapOperation::Sell,
        }
    }

    #[tokio::test]
    async fn price_is_quote_per_asset_with_decimals() {
        let processor = processor(&[]);
        // 10 ADA for 50 tokens with no known token decimals
        let prices = processor
            .compute_prices(&[swap(10_000_000, 50)])
            .await
            .unwrap();

        assert_eq!(prices.len(), 1);
        assert_eq!(prices[0].price, Decimal::from_str("0.2").unwrap());
        assert_eq!(prices[0].amount1, 10_000_000);
        assert_eq!(prices[0].amount2, 50);
        assert_eq!(prices[0].time, 1_001_000);
        assert_eq!(prices[0].operation, 1);
        assert_eq!(prices[0].outlier, None);
    }

    #[tokio::test]
    async fn known_asset_decimals_scale_the_price() {
        let processor = processor(&[("aabb", 6)]);
        let prices = processor
            .compute_prices(&[swap(10_000_000, 50_000_000)])
            .await
            .unwrap();

        assert_eq!(prices[0].price, Decimal::from_str("0.2").unwrap());
    }

    #[tokio::test]
    async fn zero_amount_swap_is_an_outlier() {
        let processor = processor(&[]);
        let prices = processor.compute_prices(&[swap(10_000_000, 0)]).await.unwrap();

        assert_eq!(prices[0].price, Decimal::ZERO);
        assert_eq!(prices[0].outlier, Some(true));
    }

    #[tokio::test]
    async fn swap_indices_increment_within_a_transaction() {
        let processor = processor(&[]);
        let prices = processor
            .compute_prices(&[swap(1_000_000, 10), swap(2_000_000, 20)])
            .await
            .unwrap();

        assert_eq!(prices[0].swap_index, 0);
        assert_eq!(prices[1].swap_index, 1);
    }
}
