//! Yaci store mirror provider
//!
//! Resolves outputs from a local Yaci store database, which mirrors the
//! node's ledger state. Lookups are single batched queries against the
//! `address_utxo` and `block` tables.

use async_trait::async_trait;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbBackend, Statement};

use log::info;

use crate::domain::models::{
    ChainPoint, Datum, OutputRef, PlutusData, ResolvedInput, TransactionOutput, TxAmount,
};
use crate::infrastructure::chaindata::error::ChainDataError;
use crate::infrastructure::chaindata::provider::ChainDataProvider;
use crate::infrastructure::persistence::repositories::escape_literal;

/// Chain-data provider over a Yaci store mirror database
pub struct YaciStoreProvider {
    conn: DatabaseConnection,
}

impl YaciStoreProvider {
    /// Connect to the mirror database
    pub async fn connect(url: &str) -> Result<Self, ChainDataError> {
        info!("Connecting to Yaci store mirror: {}", url);
        let conn = Database::connect(url)
            .await
            .map_err(|e| ChainDataError::DatabaseError(e.to_string()))?;
        Ok(Self { conn })
    }

    fn reference_list(references: &[OutputRef]) -> String {
        references
            .iter()
            .map(|reference| {
                format!(
                    "('{}', {})",
                    escape_literal(&reference.tx_hash),
                    reference.output_index
                )
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[async_trait]
impl ChainDataProvider for YaciStoreProvider {
    fn name(&self) -> &'static str {
        "yacistore"
    }

    async fn resolve_inputs(
        &self,
        references: &[OutputRef],
    ) -> Result<Vec<ResolvedInput>, ChainDataError> {
        if references.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT tx_hash, output_index, owner_addr, owner_payment_credential, \
                    amounts, data_hash, inline_datum \
             FROM address_utxo WHERE (tx_hash, output_index) IN ({})",
            Self::reference_list(references)
        );

        let rows = self
            .conn
            .query_all(Statement::from_string(DbBackend::Postgres, sql))
            .await
            .map_err(|e| ChainDataError::DatabaseError(e.to_string()))?;

        let mut found: Vec<(OutputRef, TransactionOutput)> = Vec::with_capacity(rows.len());
        for row in rows {
            let tx_hash: String = row
                .try_get("", "tx_hash")
                .map_err(|e| ChainDataError::ParseError(e.to_string()))?;
            let output_index: i32 = row
                .try_get("", "output_index")
                .map_err(|e| ChainDataError::ParseError(e.to_string()))?;
            let address: String = row
                .try_get("", "owner_addr")
                .map_err(|e| ChainDataError::ParseError(e.to_string()))?;
            let payment_credential: Option<String> = row
                .try_get("", "owner_payment_credential")
                .map_err(|e| ChainDataError::ParseError(e.to_string()))?;
            let amounts_json: serde_json::Value = row
                .try_get("", "amounts")
                .map_err(|e| ChainDataError::ParseError(e.to_string()))?;
            let data_hash: Option<String> = row
                .try_get("", "data_hash")
                .map_err(|e| ChainDataError::ParseError(e.to_string()))?;
            let inline_datum: Option<serde_json::Value> = row
                .try_get("", "inline_datum")
                .map_err(|e| ChainDataError::ParseError(e.to_string()))?;

            let amounts: Vec<TxAmount> = serde_json::from_value(amounts_json)
                .map_err(|e| ChainDataError::ParseError(e.to_string()))?;

            let datum = match (inline_datum, data_hash) {
                (Some(value), _) => Datum::Inline(
                    serde_json::from_value::<PlutusData>(value)
                        .map_err(|e| ChainDataError::ParseError(e.to_string()))?,
                ),
                (None, Some(hash)) => Datum::Hash(hash),
                (None, None) => Datum::None,
            };

            found.push((
                OutputRef::new(tx_hash, output_index.max(0) as u32),
                TransactionOutput::new(address, payment_credential, amounts, datum),
            ));
        }

        // Emit in input order
        Ok(references
            .iter()
            .filter_map(|reference| {
                found
                    .iter()
                    .find(|(candidate, _)| candidate == reference)
                    .map(|(_, output)| ResolvedInput::new(reference.clone(), output.clone()))
            })
            .collect())
    }

    async fn find_block_nearest(&self, slot: u64) -> Result<ChainPoint, ChainDataError> {
        let sql = format!(
            "SELECT slot, hash FROM block WHERE slot <= {} ORDER BY slot DESC LIMIT 1",
            slot
        );

        let row = self
            .conn
            .query_one(Statement::from_string(DbBackend::Postgres, sql))
            .await
            .map_err(|e| ChainDataError::DatabaseError(e.to_string()))?;

        match row {
            Some(row) => {
                let slot: i64 = row
                    .try_get("", "slot")
                    .map_err(|e| ChainDataError::ParseError(e.to_string()))?;
                let hash: String = row
                    .try_get("", "hash")
                    .map_err(|e| ChainDataError::ParseError(e.to_string()))?;
                Ok(ChainPoint::new(slot.max(0) as u64, hash))
            }
            None => Err(ChainDataError::NotFound(format!(
                "No block at or before slot {}",
                slot
            ))),
        }
    }
}
