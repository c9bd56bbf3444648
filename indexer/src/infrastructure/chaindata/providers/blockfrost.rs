//! Blockfrost provider implementation
//!
//! Resolves outputs through the remote JSON API, one `/txs/{hash}/utxos`
//! call per distinct transaction. Transient failures are retried with
//! backoff before surfacing as a chain-data error.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::domain::models::{
    ChainPoint, Datum, OutputRef, PlutusData, ResolvedInput, TransactionOutput, TxAmount,
};
use crate::infrastructure::chaindata::error::ChainDataError;
use crate::infrastructure::chaindata::provider::ChainDataProvider;
use crate::utils::retry::RetryHandler;

#[derive(Debug, Deserialize)]
struct TxUtxosDto {
    outputs: Vec<UtxoOutputDto>,
}

#[derive(Debug, Deserialize)]
struct UtxoOutputDto {
    address: String,
    payment_credential: Option<String>,
    output_index: u32,
    amount: Vec<AmountDto>,
    data_hash: Option<String>,
    inline_datum: Option<PlutusData>,
}

#[derive(Debug, Deserialize)]
struct AmountDto {
    unit: String,
    quantity: String,
}

#[derive(Debug, Deserialize)]
struct BlockDto {
    slot: u64,
    hash: String,
}

/// Blockfrost-backed chain-data provider
pub struct BlockfrostProvider {
    endpoint: String,
    project_id: String,
    client: Client,
    retry: RetryHandler,
}

impl BlockfrostProvider {
    pub fn new(
        endpoint: String,
        project_id: String,
        timeout_secs: u64,
    ) -> Result<Self, ChainDataError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ChainDataError::ConfigError(e.to_string()))?;

        Ok(Self {
            endpoint,
            project_id,
            client,
            retry: RetryHandler::with_config(3, 500),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Option<T>, ChainDataError> {
        let url = format!("{}{}", self.endpoint, path);

        let response = self
            .client
            .get(&url)
            .header("project_id", &self.project_id)
            .send()
            .await
            .map_err(|e| ChainDataError::NetworkError(e.to_string()))?;

        if response.status().as_u16() == 404 {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(ChainDataError::NetworkError(format!(
                "Blockfrost returned status {} for {}",
                response.status(),
                path
            )));
        }

        response
            .json::<T>()
            .await
            .map(Some)
            .map_err(|e| ChainDataError::ParseError(e.to_string()))
    }

    async fn fetch_tx_outputs(
        &self,
        tx_hash: &str,
    ) -> Result<Option<Vec<UtxoOutputDto>>, ChainDataError> {
        let path = format!("/txs/{}/utxos", tx_hash);
        let utxos: Option<TxUtxosDto> = self
            .retry
            .execute_with_retry(|| self.get_json(&path), "Blockfrost tx utxos")
            .await?;
        Ok(utxos.map(|dto| dto.outputs))
    }
}

fn convert_output(dto: UtxoOutputDto) -> Result<TransactionOutput, ChainDataError> {
    let amounts = dto
        .amount
        .into_iter()
        .map(|amount| {
            amount
                .quantity
                .parse::<u64>()
                .map(|quantity| TxAmount::new(amount.unit, quantity))
                .map_err(|e| ChainDataError::ParseError(e.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let datum = match (dto.inline_datum, dto.data_hash) {
        (Some(data), _) => Datum::Inline(data),
        (None, Some(hash)) => Datum::Hash(hash),
        (None, None) => Datum::None,
    };

    Ok(TransactionOutput::new(
        dto.address,
        dto.payment_credential,
        amounts,
        datum,
    ))
}

#[async_trait]
impl ChainDataProvider for BlockfrostProvider {
    fn name(&self) -> &'static str {
        "blockfrost"
    }

    async fn resolve_inputs(
        &self,
        references: &[OutputRef],
    ) -> Result<Vec<ResolvedInput>, ChainDataError> {
        // One fetch per distinct transaction, in first-reference order
        let mut tx_order: Vec<&str> = Vec::new();
        for reference in references {
            if !tx_order.contains(&reference.tx_hash.as_str()) {
                tx_order.push(&reference.tx_hash);
            }
        }

        let mut outputs_by_tx: HashMap<String, HashMap<u32, TransactionOutput>> = HashMap::new();
        for tx_hash in tx_order {
            if let Some(outputs) = self.fetch_tx_outputs(tx_hash).await? {
                let mut by_index = HashMap::new();
                for dto in outputs {
                    let index = dto.output_index;
                    by_index.insert(index, convert_output(dto)?);
                }
                outputs_by_tx.insert(tx_hash.to_string(), by_index);
            }
        }

        Ok(references
            .iter()
            .filter_map(|reference| {
                outputs_by_tx
                    .get(&reference.tx_hash)
                    .and_then(|by_index| by_index.get(&reference.output_index))
                    .map(|output| ResolvedInput::new(reference.clone(), output.clone()))
            })
            .collect())
    }

    async fn find_block_nearest(&self, slot: u64) -> Result<ChainPoint, ChainDataError> {
        let path = format!("/blocks/slot/{}", slot);
        let block: Option<BlockDto> = self
            .retry
            .execute_with_retry(|| self.get_json(&path), "Blockfrost block by slot")
            .await?;

        block
            .map(|dto| ChainPoint::new(dto.slot, dto.hash))
            .ok_or_else(|| ChainDataError::NotFound(format!("No block at or before slot {}", slot)))
    }
}
