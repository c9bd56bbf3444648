use crate::domain::services::dex::DexCode;

/// Which side of the pair the trader received
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapOperation {
    /// The trader bought the asset, paying with the quote asset
    Buy,
    /// The trader sold the asset for the quote asset
    Sell,
}

impl SwapOperation {
    pub fn as_i16(self) -> i16 {
        match self {
            SwapOperation::Buy => 0,
            SwapOperation::Sell => 1,
        }
    }
}

/// A single exchange event extracted from one transaction.
/// Lives only through the pipeline; persisted as a price row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Swap {
    pub tx_hash: String,
    pub slot: u64,
    pub dex: DexCode,
    /// Quote side unit (the native coin when the pool holds it)
    pub asset1_unit: String,
    /// Asset side unit
    pub asset2_unit: String,
    /// Quote amount moved, in base units
    pub amount1: u64,
    /// Asset amount moved, in base units
    pub amount2: u64,
    pub operation: SwapOperation,
}
