//! Chain service
//!
//! Owns the upstream sync session: starts it from a point, feeds blocks and
//! rollbacks into the event bus, and gates delivery of the next block behind
//! a one-shot barrier that the dispatcher releases when the previous block
//! has been fully processed. This barrier is what keeps the pipeline
//! strictly in slot order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

use log::{error, info, warn};

use crate::application::chain::source::{BlockSourceFactory, SyncEvent};
use crate::application::events::bus::EventBus;
use crate::application::events::types::PipelineEvent;
use crate::domain::errors::ChainSyncError;
use crate::domain::models::ChainPoint;
use crate::infrastructure::chaindata::ChainDataProvider;

/// Consecutive source failures tolerated before the session gives up
const MAX_CONSECUTIVE_FAILURES: u32 = 10;

/// Delay between retries after a source failure
const FAILURE_RETRY_DELAY: Duration = Duration::from_secs(5);

pub struct ChainService {
    source_factory: Arc<dyn BlockSourceFactory>,
    chain_data: Arc<dyn ChainDataProvider>,
    bus: EventBus,
    slot_conversion_offset: i64,
    block_processed: Arc<Notify>,
    rollback_processed: Arc<Notify>,
    is_synced: Arc<AtomicBool>,
    sync_task: Mutex<Option<JoinHandle<()>>>,
}

impl ChainService {
    pub fn new(
        source_factory: Arc<dyn BlockSourceFactory>,
        chain_data: Arc<dyn ChainDataProvider>,
        bus: EventBus,
        slot_conversion_offset: i64,
    ) -> Self {
        Self {
            source_factory,
            chain_data,
            bus,
            slot_conversion_offset,
            block_processed: Arc::new(Notify::new()),
            rollback_processed: Arc::new(Notify::new()),
            is_synced: Arc::new(AtomicBool::new(false)),
            sync_task: Mutex::new(None),
        }
    }

    /// Open a sync session from the given point and start delivering events
    pub async fn start(&self, from: ChainPoint) -> Result<(), ChainSyncError> {
        let source = self.source_factory.create(from.clone()).await?;

        info!(
            "Starting block sync from slot {} ({})",
            from.slot,
            if from.hash.is_empty() {
                "origin"
            } else {
                &from.hash
            });

        let bus = self.bus.clone();
        let block_processed = self.block_processed.clone();
        let rollback_processed = self.rollback_processed.clone();
        let is_synced = self.is_synced.clone();

        let handle = tokio::spawn(async move {
            Self::sync_loop(source, bus, block_processed, rollback_processed, is_synced).await;
        });

        let mut task = self.sync_task.lock().await;
        if let Some(previous) = task.replace(handle) {
            previous.abort();
        }

        Ok(())
    }

    async fn sync_loop(
        mut source: Box<dyn crate::application::chain::source::BlockSource>,
        bus: EventBus,
        block_processed: Arc<Notify>,
        rollback_processed: Arc<Notify>,
        is_synced: Arc<AtomicBool>,
    ) {
        let mut consecutive_failures = 0u32;

        loop {
            match source.next_event().await {
                Ok(SyncEvent::RollForward { block, tip_slot }) => {
                    consecutive_failures = 0;

                    if block.slot >= tip_slot {
                        is_synced.store(true, Ordering::SeqCst);
                    }

                    if bus
                        .publish(PipelineEvent::BlockReceived(Box::new(block)))
                        .await
                        .is_err()
                    {
                        error!("Event bus closed; stopping sync session");
                        return;
                    }

                    // One-shot barrier: wait until the dispatcher reports the
                    // block fully processed before requesting the next one
                    block_processed.notified().await;
                }
                Ok(SyncEvent::RollBack { point }) => {
                    warn!(
                        "Chain rollback to slot {} ({})",
                        point.slot, point.hash);
                    is_synced.store(false, Ordering::SeqCst);

                    if bus
                        .publish(PipelineEvent::Rollback { point })
                        .await
                        .is_err()
                    {
                        error!("Event bus closed; stopping sync session");
                        return;
                    }

                    rollback_processed.notified().await;

                    // The dispatcher restarts the session from a safe point;
                    // this session is done
                    return;
                }
                Err(e) => {
                    consecutive_failures += 1;
                    error!(
                        "Sync source failure ({}/{}): {}",
                        consecutive_failures, MAX_CONSECUTIVE_FAILURES, e);

                    if consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
                        error!("Sync source failed beyond retry; stopping session");
                        return;
                    }

                    sleep(FAILURE_RETRY_DELAY).await;
                }
            }
        }
    }

    /// Release the barrier so the session delivers the next block
    pub fn signal_block_processed(&self) {
        self.block_processed.notify_one();
    }

    /// Release the rollback barrier
    pub fn signal_rollback_processed(&self) {
        self.rollback_processed.notify_one();
    }

    /// Tear down the current session and restart from the given point
    pub async fn restart_block_sync(&self, point: ChainPoint) -> Result<(), ChainSyncError> {
        self.stop().await;
        self.start(point).await
    }

    /// Abort the current session, if any
    pub async fn stop(&self) {
        let mut task = self.sync_task.lock().await;
        if let Some(handle) = task.take() {
            handle.abort();
        }
    }

    /// True once the session has reached the tip
    pub fn get_is_synced(&self) -> bool {
        self.is_synced.load(Ordering::SeqCst)
    }

    /// Map a chain time to the closest block point at or before it
    pub async fn determine_initialisation_state(
        &self,
        time_seconds: i64,
    ) -> Result<ChainPoint, ChainSyncError> {
        let slot = (time_seconds + self.slot_conversion_offset).max(0) as u64;
        let point = self.chain_data.find_block_nearest(slot).await?;
        Ok(point)
    }
}
