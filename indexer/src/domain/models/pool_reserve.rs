use crate::domain::services::dex::DexCode;

/// A liquidity-pool reserve snapshot observed in one transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolReserve {
    pub asset1_unit: String,
    pub asset2_unit: String,
    pub dex: DexCode,
    pub slot: u64,
    pub reserve1: u64,
    pub reserve2: u64,
    pub tx_hash: String,
}

impl PoolReserve {
    /// Synthetic pool identifier: `asset1Unit:asset2Unit:dexCode`
    pub fn pool_id(&self) -> String {
        format!(
            "{}:{}:{}",
            self.asset1_unit,
            self.asset2_unit,
            self.dex.code()
        )
    }
}
