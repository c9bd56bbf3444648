//! Events flowing through the pipeline bus.
//!
//! The set is closed: the dispatcher matches exhaustively, so adding a
//! variant forces every consumer to handle it.

use crate::domain::models::{Block, ChainPoint, PoolReserve, Price, Swap};

/// A pipeline event
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// A new block arrived from the sync session
    BlockReceived(Box<Block>),

    /// Swaps extracted from one block
    SwapsComputed { slot: u64, swaps: Vec<Swap> },

    /// Reserve snapshots extracted from one block. `has_swaps` tells the
    /// dispatcher which path will produce the block-completion signal.
    PoolReservesComputed {
        slot: u64,
        reserves: Vec<PoolReserve>,
        has_swaps: bool,
    },

    /// Prices derived from one block's swaps
    PricesCalculated { slot: u64, prices: Vec<Price> },

    /// The upstream chain rolled back to the given point
    Rollback { point: ChainPoint },
}

impl PipelineEvent {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            PipelineEvent::BlockReceived(_) => "BlockReceived",
            PipelineEvent::SwapsComputed { .. } => "SwapsComputed",
            PipelineEvent::PoolReservesComputed { .. } => "PoolReservesComputed",
            PipelineEvent::PricesCalculated { .. } => "PricesCalculated",
            PipelineEvent::Rollback { .. } => "Rollback",
        }
    }
}
