//! Carp mirror provider
//!
//! Resolves outputs from a local Carp database. Carp keys outputs by the
//! owning transaction, so the lookup joins `transaction_output` with `tx`
//! and reads the decoded output payload.

use async_trait::async_trait;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbBackend, Statement};

use log::info;

use crate::domain::models::{ChainPoint, OutputRef, ResolvedInput, TransactionOutput};
use crate::infrastructure::chaindata::error::ChainDataError;
use crate::infrastructure::chaindata::provider::ChainDataProvider;
use crate::infrastructure::persistence::repositories::escape_literal;

/// Chain-data provider over a Carp mirror database
pub struct CarpProvider {
    conn: DatabaseConnection,
}

impl CarpProvider {
    /// Connect to the mirror database
    pub async fn connect(url: &str) -> Result<Self, ChainDataError> {
        info!("Connecting to Carp mirror: {}", url);
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
impl ChainDataProvider for CarpProvider {
    fn name(&self) -> &'static str {
        "carp"
    }

    async fn resolve_inputs(
        &self,
        references: &[OutputRef],
    ) -> Result<Vec<ResolvedInput>, ChainDataError> {
        if references.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT t.hash AS tx_hash, o.output_index, o.payload \
             FROM transaction_output o JOIN tx t ON t.id = o.tx_id \
             WHERE (t.hash, o.output_index) IN ({})",
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
            let payload: serde_json::Value = row
                .try_get("", "payload")
                .map_err(|e| ChainDataError::ParseError(e.to_string()))?;

            let output: TransactionOutput = serde_json::from_value(payload)
                .map_err(|e| ChainDataError::ParseError(e.to_string()))?;

            found.push((OutputRef::new(tx_hash, output_index.max(0) as u32), output));
        }

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
