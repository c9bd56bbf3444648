//! Node bridge client
//!
//! Thin JSON client over the node's block REST bridge, which serves typed
//! blocks the indexer consumes without touching wire-level encoding.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::domain::errors::ChainSyncError;
use crate::domain::models::{Block, ChainPoint};

/// Summary of a block as reported by the bridge
#[derive(Debug, Clone, Deserialize)]
pub struct BlockSummary {
    pub hash: String,
    pub slot: u64,
    pub number: u64,
}

/// Client for the node bridge REST interface
#[derive(Clone)]
pub struct NodeClient {
    client: Client,
    base_url: String,
}

impl NodeClient {
    pub fn new(base_url: String) -> Result<Self, ChainSyncError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ChainSyncError::ConfigError(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    /// The current tip of the chain
    pub async fn get_tip(&self) -> Result<BlockSummary, ChainSyncError> {
        self.get_json::<BlockSummary>("/api/v1/blocks/latest")
            .await?
            .ok_or_else(|| ChainSyncError::SourceError("Node bridge has no tip".to_string()))
    }

    /// The full block at the given height, if it exists yet
    pub async fn get_block_by_number(&self, number: u64) -> Result<Option<Block>, ChainSyncError> {
        self.get_json::<Block>(&format!("/api/v1/blocks/{}", number))
            .await
    }

    /// The block summary closest to the given point
    pub async fn find_block_by_slot(
        &self,
        slot: u64,
    ) -> Result<Option<BlockSummary>, ChainSyncError> {
        self.get_json::<BlockSummary>(&format!("/api/v1/blocks/slot/{}", slot))
            .await
    }

    /// Resolve a starting point to a block summary; the origin maps to the
    /// first block
    pub async fn resolve_start(
        &self,
        from: &ChainPoint,
    ) -> Result<Option<BlockSummary>, ChainSyncError> {
        if from.slot == 0 && from.hash.is_empty() {
            return Ok(None);
        }
        self.find_block_by_slot(from.slot).await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Option<T>, ChainSyncError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ChainSyncError::SourceError(e.to_string()))?;

        if response.status().as_u16() == 404 {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(ChainSyncError::SourceError(format!(
                "Node bridge returned status {} for {}",
                response.status(),
                path
            )));
        }

        response
            .json::<T>()
            .await
            .map(Some)
            .map_err(|e| ChainSyncError::SourceError(e.to_string()))
    }
}
