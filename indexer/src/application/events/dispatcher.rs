//! Event dispatcher
//!
//! The single consumer of the pipeline bus. Events are handled one at a
//! time, so per-block state never needs synchronization.
//!
//! Completion contract: every `BlockReceived` leads to exactly one
//! block-processed signal. When the block has swaps the signal comes from
//! the `PricesCalculated` arm (also on persistence failure); when it has
//! none, from the `PoolReservesComputed` arm. A failure while handling
//! `BlockReceived` itself signals nothing, leaving the sync barrier closed
//! so the stall is observable upstream.

use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::application::chain::ChainService;
use crate::application::events::bus::{EventBus, EventReceiver};
use crate::application::events::types::PipelineEvent;
use crate::domain::models::{Block, ChainPoint, PoolReserve, Price, Swap};
use crate::domain::services::{PriceProcessor, SwapProcessor, UtxoCache};
use crate::infrastructure::persistence::Repositories;
use crate::infrastructure::publisher::PricePublisher;
use crate::utils::metrics::PipelineMetrics;

pub struct EventDispatcher {
    receiver: EventReceiver,
    bus: EventBus,
    cache: Arc<UtxoCache>,
    swap_processor: Arc<SwapProcessor>,
    price_processor: Arc<PriceProcessor>,
    repositories: Repositories,
    chain_service: Arc<ChainService>,
    publisher: Option<Arc<PricePublisher>>,
    metrics: Arc<PipelineMetrics>,
    slot_conversion_offset: i64,
    /// Point of the block currently flowing through the pipeline; valid
    /// because block handling is strictly serial
    current_block_point: Option<ChainPoint>,
}

impl EventDispatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        receiver: EventReceiver,
        bus: EventBus,
        cache: Arc<UtxoCache>,
        swap_processor: Arc<SwapProcessor>,
        price_processor: Arc<PriceProcessor>,
        repositories: Repositories,
        chain_service: Arc<ChainService>,
        publisher: Option<Arc<PricePublisher>>,
        metrics: Arc<PipelineMetrics>,
        slot_conversion_offset: i64,
    ) -> Self {
        Self {
            receiver,
            bus,
            cache,
            swap_processor,
            price_processor,
            repositories,
            chain_service,
            publisher,
            metrics,
            slot_conversion_offset,
            current_block_point: None,
        }
    }

    /// Consume events until the bus closes
    pub async fn run(mut self) {
        info!("Event dispatcher started");

        while let Some(event) = self.receiver.recv().await {
            let name = event.name();
            debug!("Dispatching {}", name);

            match event {
                PipelineEvent::BlockReceived(block) => self.on_block_received(*block).await,
                PipelineEvent::SwapsComputed { slot, swaps } => {
                    self.on_swaps_computed(slot, swaps).await
                }
                PipelineEvent::PoolReservesComputed {
                    slot,
                    reserves,
                    has_swaps,
                } => self.on_pool_reserves_computed(slot, reserves, has_swaps).await,
                PipelineEvent::PricesCalculated { slot, prices } => {
                    self.on_prices_calculated(slot, prices).await
                }
                PipelineEvent::Rollback { point } => self.on_rollback(point).await,
            }
        }

        info!("Event bus closed; dispatcher stopped");
    }

    /// Populate the cache with the block's outputs, extract DEX activity,
    /// and publish the derived events. On failure nothing is published and
    /// no completion is signalled.
    async fn on_block_received(&mut self, block: Block) {
        self.current_block_point = Some(block.point());

        for tx in &block.transactions {
            self.cache.add_outputs(&tx.hash, &tx.outputs);
        }

        let activity = match self.swap_processor.process_block(&block).await {
            Ok(activity) => activity,
            Err(e) => {
                self.metrics.record_event_processing_failed();
                error!(
                    "Failed to process block at slot {}: {}",
                    block.slot, e);
                return;
            }
        };

        let has_swaps = !activity.swaps.is_empty();
        self.metrics.record_swaps_computed(activity.swaps.len() as u64);

        let published = self
            .bus
            .publish(PipelineEvent::SwapsComputed {
                slot: block.slot,
                swaps: activity.swaps,
            })
            .await
            .and(
                self.bus
                    .publish(PipelineEvent::PoolReservesComputed {
                        slot: block.slot,
                        reserves: activity.reserves,
                        has_swaps,
                    })
                    .await,
            );

        if published.is_err() {
            self.metrics.record_event_processing_failed();
            error!(
                "Failed to publish derived events for slot {}",
                block.slot);
        }
    }

    /// Convert swaps to prices and hand them on. An empty event needs no
    /// prices pass; the reserves arm will complete the block.
    async fn on_swaps_computed(&mut self, slot: u64, swaps: Vec<Swap>) {
        if swaps.is_empty() {
            return;
        }

        match self.price_processor.compute_prices(&swaps).await {
            Ok(prices) => {
                if self
                    .bus
                    .publish(PipelineEvent::PricesCalculated { slot, prices })
                    .await
                    .is_err()
                {
                    self.metrics.record_event_processing_failed();
                    error!(
                        "Failed to publish prices for slot {}; completing block",
                        slot);
                    self.complete_block(slot).await;
                }
            }
            Err(e) => {
                // The prices arm will never run for this block, so the
                // completion signal has to come from here
                self.metrics.record_event_processing_failed();
                error!(
                    "Failed to compute prices for slot {}: {}; completing block",
                    slot, e);
                self.complete_block(slot).await;
            }
        }
    }

    /// Persist reserve snapshots; complete the block when no swaps path
    /// will do it
    async fn on_pool_reserves_computed(
        &mut self,
        slot: u64,
        reserves: Vec<PoolReserve>,
        has_swaps: bool,
    ) {
        if !reserves.is_empty() {
            match self
                .repositories
                .pool_reserve
                .persist_pool_reserves(&reserves)
                .await
            {
                Ok(persisted) => {
                    self.metrics.record_pool_reserves_persisted(persisted as u64);
                }
                Err(e) => {
                    self.metrics.record_pool_reserve_persist_failed();
                    error!(
                        "Failed to persist pool reserves for slot {}: {}",
                        slot, e);
                }
            }
        }

        if !has_swaps {
            self.complete_block(slot).await;
        }
    }

    /// Persist prices, refresh views when live, publish externally, and
    /// complete the block. Completion happens on failure paths as well: the
    /// block was processed up to the point of failure.
    async fn on_prices_calculated(&mut self, slot: u64, prices: Vec<Price>) {
        match self.repositories.price.persist_prices(&prices).await {
            Ok(persisted) => {
                self.metrics.record_prices_persisted(persisted as u64);

                if self.chain_service.get_is_synced() && self.repositories.view.has_views() {
                    if let Err(e) = self.repositories.view.refresh_views().await {
                        warn!(
                            "Failed to refresh aggregate views: {}",
                            e);
                    }
                }

                if let Some(publisher) = &self.publisher {
                    publisher.publish_prices(&prices).await;
                }
            }
            Err(e) => {
                self.metrics.record_event_processing_failed();
                error!(
                    "Failed to persist prices for slot {}: {}",
                    slot, e);
            }
        }

        self.complete_block(slot).await;
    }

    /// Stop the current session and restart from a safe point: the earlier
    /// of the persisted sync position and the rollback point
    async fn on_rollback(&mut self, point: ChainPoint) {
        self.metrics.record_rollback_processed();
        self.current_block_point = None;

        let rollback_time = point.slot as i64 - self.slot_conversion_offset;

        let persisted_time = match self.repositories.sync_point.get().await {
            Ok(persisted) => persisted.map(|p| p.time),
            Err(e) => {
                warn!(
                    "Could not read persisted sync point during rollback: {}",
                    e);
                None
            }
        };

        // The persisted position may lag behind the tip; never restart
        // after it
        let reinit_time = match persisted_time {
            Some(time) => time.min(rollback_time),
            None => rollback_time,
        };

        let restart = async {
            let restart_point = self
                .chain_service
                .determine_initialisation_state(reinit_time)
                .await?;
            info!(
                "Restarting sync at slot {} after rollback to slot {}",
                restart_point.slot, point.slot);
            self.chain_service.restart_block_sync(restart_point).await
        };

        if let Err(e) = restart.await {
            self.metrics.record_event_processing_failed();
            error!("Failed to restart sync after rollback: {}", e);
        }

        self.chain_service.signal_rollback_processed();
    }

    /// Record progress and release the sync barrier; runs exactly once per
    /// block
    async fn complete_block(&mut self, slot: u64) {
        if let Some(point) = self.current_block_point.take() {
            let time = point.slot as i64 - self.slot_conversion_offset;
            if let Err(e) = self.repositories.sync_point.save(&point, time).await {
                warn!(
                    "Failed to persist sync point for slot {}: {}",
                    point.slot, e);
            }
        } else {
            warn!(
                "Completing slot {} without a recorded block point",
                slot);
        }

        self.metrics.record_block_processed();
        self.chain_service.signal_block_processed();
    }
}
