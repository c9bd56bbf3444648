//! Block source abstraction
//!
//! The sync session consumes typed blocks and rollback notifications from a
//! `BlockSource`. The shipped implementation polls the node bridge; tests
//! substitute scripted sources.

use async_trait::async_trait;

use crate::domain::errors::ChainSyncError;
use crate::domain::models::{Block, ChainPoint};

/// One step of chain progress
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// The chain advanced by one block
    RollForward { block: Block, tip_slot: u64 },
    /// The chain reorganized; discard state after `point`
    RollBack { point: ChainPoint },
}

/// An in-order feed of blocks and rollbacks
#[async_trait]
pub trait BlockSource: Send {
    /// The next chain event. Implementations block until one is available.
    async fn next_event(&mut self) -> Result<SyncEvent, ChainSyncError>;
}

/// Creates sync sessions starting from a chosen point
#[async_trait]
pub trait BlockSourceFactory: Send + Sync {
    async fn create(&self, from: ChainPoint) -> Result<Box<dyn BlockSource>, ChainSyncError>;
}
