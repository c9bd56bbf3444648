//! Polling block source over the node bridge
//!
//! Requests blocks height by height and detects chain reorganizations by
//! comparing each block's parent hash against the last delivered block.
//! On a mismatch the source walks its recent history backwards to find the
//! highest point still on the chain and emits a rollback to it.

use std::collections::VecDeque;

use async_trait::async_trait;

use log::warn;

use crate::application::chain::source::{BlockSource, BlockSourceFactory, SyncEvent};
use crate::domain::errors::ChainSyncError;
use crate::domain::models::ChainPoint;
use crate::infrastructure::node::client::NodeClient;

/// How many delivered points are kept for rollback resolution
const RECENT_POINTS: usize = 100;

pub struct NodeBlockSource {
    client: NodeClient,
    next_number: u64,
    last_hash: Option<String>,
    /// Recently delivered `(number, point)` pairs, oldest first
    recent: VecDeque<(u64, ChainPoint)>,
    poll_interval: tokio::time::Duration,
}

impl NodeBlockSource {
    /// Open a source delivering blocks after `from`
    pub async fn open(
        client: NodeClient,
        from: ChainPoint,
        poll_interval_ms: u64,
    ) -> Result<Self, ChainSyncError> {
        let start = client.resolve_start(&from).await?;

        let (next_number, last_hash, recent) = match start {
            Some(summary) => {
                let point = ChainPoint::new(summary.slot, summary.hash.clone());
                let mut recent = VecDeque::new();
                recent.push_back((summary.number, point));
                (summary.number + 1, Some(summary.hash), recent)
            }
            None => (1, None, VecDeque::new()),
        };

        Ok(Self {
            client,
            next_number,
            last_hash,
            recent,
            poll_interval: tokio::time::Duration::from_millis(poll_interval_ms.max(1)),
        })
    }

    /// The highest recently delivered point whose block is still on the
    /// chain; origin when the whole recent history was reorganized away
    async fn find_fork_point(&self) -> Result<ChainPoint, ChainSyncError> {
        for (number, point) in self.recent.iter().rev() {
            match self.client.get_block_by_number(*number).await? {
                Some(block) if block.hash == point.hash => return Ok(point.clone()),
                _ => continue,
            }
        }

        warn!("Rollback beyond recent history; restarting from origin");
        Ok(ChainPoint::origin())
    }
}

#[async_trait]
impl BlockSource for NodeBlockSource {
    async fn next_event(&mut self) -> Result<SyncEvent, ChainSyncError> {
        loop {
            let tip = self.client.get_tip().await?;

            if self.next_number > tip.number {
                tokio::time::sleep(self.poll_interval).await;
                continue;
            }

            let block = match self.client.get_block_by_number(self.next_number).await? {
                Some(block) => block,
                None => {
                    tokio::time::sleep(self.poll_interval).await;
                    continue;
                }
            };

            if let Some(last_hash) = &self.last_hash {
                if block.parent_hash != *last_hash {
                    let point = self.find_fork_point().await?;
                    return Ok(SyncEvent::RollBack { point });
                }
            }

            self.last_hash = Some(block.hash.clone());
            self.recent.push_back((self.next_number, block.point()));
            while self.recent.len() > RECENT_POINTS {
                self.recent.pop_front();
            }
            self.next_number += 1;

            return Ok(SyncEvent::RollForward {
                block,
                tip_slot: tip.slot,
            });
        }
    }
}

/// Factory creating node-bridge sessions
pub struct NodeBlockSourceFactory {
    base_url: String,
    poll_interval_ms: u64,
}

impl NodeBlockSourceFactory {
    pub fn new(base_url: String, poll_interval_ms: u64) -> Self {
        Self {
            base_url,
            poll_interval_ms,
        }
    }
}

#[async_trait]
impl BlockSourceFactory for NodeBlockSourceFactory {
    async fn create(&self, from: ChainPoint) -> Result<Box<dyn BlockSource>, ChainSyncError> {
        let client = NodeClient::new(self.base_url.clone())?;
        let source = NodeBlockSource::open(client, from, self.poll_interval_ms).await?;
        Ok(Box::new(source))
    }
}
