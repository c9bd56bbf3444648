//! Koios provider implementation
//!
//! Resolves outputs through the batched `/utxo_info` endpoint, which accepts
//! all references in a single POST and echoes each reference back.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::domain::models::{
    ChainPoint, Datum, OutputRef, PlutusData, ResolvedInput, TransactionOutput, TxAmount, LOVELACE,
};
use crate::infrastructure::chaindata::error::ChainDataError;
use crate::infrastructure::chaindata::provider::ChainDataProvider;
use crate::utils::retry::RetryHandler;

#[derive(Debug, Deserialize)]
struct UtxoInfoDto {
    tx_hash: String,
    tx_index: u32,
    address: String,
    payment_cred: Option<String>,
    value: String,
    #[serde(default)]
    asset_list: Vec<AssetDto>,
    datum_hash: Option<String>,
    inline_datum: Option<InlineDatumDto>,
}

#[derive(Debug, Deserialize)]
struct AssetDto {
    policy_id: String,
    asset_name: String,
    quantity: String,
}

#[derive(Debug, Deserialize)]
struct InlineDatumDto {
    value: PlutusData,
}

#[derive(Debug, Deserialize)]
struct BlockInfoDto {
    abs_slot: u64,
    hash: String,
}

/// Koios-backed chain-data provider
pub struct KoiosProvider {
    endpoint: String,
    client: Client,
    retry: RetryHandler,
}

impl KoiosProvider {
    pub fn new(endpoint: String, timeout_secs: u64) -> Result<Self, ChainDataError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ChainDataError::ConfigError(e.to_string()))?;

        Ok(Self {
            endpoint,
            client,
            retry: RetryHandler::with_config(3, 500),
        })
    }

    async fn fetch_utxo_info(
        &self,
        references: &[OutputRef],
    ) -> Result<Vec<UtxoInfoDto>, ChainDataError> {
        let refs: Vec<String> = references.iter().map(|reference| reference.key()).collect();
        let url = format!("{}/utxo_info", self.endpoint);
        let body = json!({ "_utxo_refs": refs, "_extended": true });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChainDataError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ChainDataError::NetworkError(format!(
                "Koios returned status {}",
                response.status()
            )));
        }

        response
            .json::<Vec<UtxoInfoDto>>()
            .await
            .map_err(|e| ChainDataError::ParseError(e.to_string()))
    }
}

fn convert_output(dto: &UtxoInfoDto) -> Result<TransactionOutput, ChainDataError> {
    let mut amounts = vec![TxAmount::new(
        LOVELACE,
        dto.value
            .parse::<u64>()
            .map_err(|e| ChainDataError::ParseError(e.to_string()))?,
    )];

    for asset in &dto.asset_list {
        amounts.push(TxAmount::new(
            format!("{}{}", asset.policy_id, asset.asset_name),
            asset
                .quantity
                .parse::<u64>()
                .map_err(|e| ChainDataError::ParseError(e.to_string()))?,
        ));
    }

    let datum = match (&dto.inline_datum, &dto.datum_hash) {
        (Some(inline), _) => Datum::Inline(inline.value.clone()),
        (None, Some(hash)) => Datum::Hash(hash.clone()),
        (None, None) => Datum::None,
    };

    Ok(TransactionOutput::new(
        dto.address.clone(),
        dto.payment_cred.clone(),
        amounts,
        datum,
    ))
}

#[async_trait]
impl ChainDataProvider for KoiosProvider {
    fn name(&self) -> &'static str {
        "koios"
    }

    async fn resolve_inputs(
        &self,
        references: &[OutputRef],
    ) -> Result<Vec<ResolvedInput>, ChainDataError> {
        if references.is_empty() {
            return Ok(Vec::new());
        }

        let rows = self
            .retry
            .execute_with_retry(|| self.fetch_utxo_info(references), "Koios utxo info")
            .await?;

        // Emit in input order, keyed by the echoed reference
        let mut resolved = Vec::with_capacity(references.len());
        for reference in references {
            let row = rows.iter().find(|row| {
                row.tx_hash == reference.tx_hash && row.tx_index == reference.output_index
            });
            if let Some(row) = row {
                resolved.push(ResolvedInput::new(reference.clone(), convert_output(row)?));
            }
        }

        Ok(resolved)
    }

    async fn find_block_nearest(&self, slot: u64) -> Result<ChainPoint, ChainDataError> {
        let url = format!(
            "{}/blocks?abs_slot=lte.{}&order=abs_slot.desc&limit=1",
            self.endpoint, slot
        );

        let blocks = self
            .retry
            .execute_with_retry(
                || async {
                    let response = self
                        .client
                        .get(&url)
                        .send()
                        .await
                        .map_err(|e| ChainDataError::NetworkError(e.to_string()))?;

                    if !response.status().is_success() {
                        return Err(ChainDataError::NetworkError(format!(
                            "Koios returned status {}",
                            response.status()
                        )));
                    }

                    response
                        .json::<Vec<BlockInfoDto>>()
                        .await
                        .map_err(|e| ChainDataError::ParseError(e.to_string()))
                },
                "Koios block by slot",
            )
            .await?;

        blocks
            .first()
            .map(|block| ChainPoint::new(block.abs_slot, block.hash.clone()))
            .ok_or_else(|| ChainDataError::NotFound(format!("No block at or before slot {}", slot)))
    }
}
