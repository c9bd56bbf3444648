use rust_decimal::Decimal;

use crate::domain::services::dex::DexCode;

/// A computed per-swap price, ready for persistence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Price {
    /// Asset side unit
    pub asset_unit: String,
    /// Quote side unit
    pub quote_unit: String,
    pub dex: DexCode,
    /// Chain time in seconds
    pub time: i64,
    pub tx_hash: String,
    /// Position of the swap within its transaction
    pub swap_index: i32,
    /// Quote per asset, normalized by known decimals
    pub price: Decimal,
    /// Quote amount in base units
    pub amount1: u64,
    /// Asset amount in base units
    pub amount2: u64,
    /// 0 = buy, 1 = sell
    pub operation: i16,
    pub outlier: Option<bool>,
}
