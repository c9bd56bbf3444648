pub mod asset;
pub mod chain;
pub mod pool_reserve;
pub mod price;
pub mod swap;

pub use chain::{
    Block, ChainPoint, Datum, OutputRef, PlutusData, ResolvedInput, TransactionBody,
    TransactionOutput, TxAmount, LOVELACE,
};
pub use pool_reserve::PoolReserve;
pub use price::Price;
pub use swap::{Swap, SwapOperation};
