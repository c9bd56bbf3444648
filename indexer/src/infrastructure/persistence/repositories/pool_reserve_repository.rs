use std::collections::HashMap;

use std::sync::Arc;

use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, Statement, TransactionTrait};

use log::warn;

use crate::domain::models::PoolReserve;
use crate::infrastructure::persistence::error::DbError;
use crate::infrastructure::persistence::repositories::{
    escape_literal, AssetRepository, TransactionRepository,
};

/// Rows per composite statement
const BATCH_SIZE: usize = 500;

/// Repository for pool reserve snapshots and their latest-per-pool companion
#[derive(Clone)]
pub struct PoolReserveRepository {
    conn: Arc<DatabaseConnection>,
    asset_repository: AssetRepository,
    transaction_repository: TransactionRepository,
    slot_conversion_offset: i64,
}

#[derive(Debug)]
struct ProcessedReserve {
    pool_id: String,
    asset1_id: i64,
    asset2_id: i64,
    provider: &'static str,
    time: i64,
    reserve1: u64,
    reserve2: u64,
    tx_id: i64,
}

impl PoolReserveRepository {
    pub fn new(
        conn: Arc<DatabaseConnection>,
        asset_repository: AssetRepository,
        transaction_repository: TransactionRepository,
        slot_conversion_offset: i64,
    ) -> Self {
        Self {
            conn,
            asset_repository,
            transaction_repository,
            slot_conversion_offset,
        }
    }

    /// Persist a batch of reserve snapshots.
    ///
    /// Multiple transactions within one block may touch the same pool at the
    /// same slot; only the final state per (pool, time) is kept, so the batch
    /// never conflicts with its own primary key.
    pub async fn persist_pool_reserves(&self, reserves: &[PoolReserve]) -> Result<usize, DbError> {
        if reserves.is_empty() {
            return Ok(0);
        }

        let units: Vec<String> = reserves
            .iter()
            .flat_map(|reserve| [reserve.asset1_unit.clone(), reserve.asset2_unit.clone()])
            .collect();
        let hashes: Vec<String> = reserves
            .iter()
            .map(|reserve| reserve.tx_hash.clone())
            .collect();

        let asset_ids = self.asset_repository.upsert_assets(&units).await?;
        let tx_ids = self
            .transaction_repository
            .upsert_transactions(&hashes)
            .await?;

        let mut processed = Vec::with_capacity(reserves.len());
        for reserve in reserves {
            let asset1_id = asset_ids.get(&reserve.asset1_unit);
            let asset2_id = asset_ids.get(&reserve.asset2_unit);
            let tx_id = tx_ids.get(&reserve.tx_hash);

            match (asset1_id, asset2_id, tx_id) {
                (Some(asset1_id), Some(asset2_id), Some(tx_id)) => {
                    processed.push(ProcessedReserve {
                        pool_id: reserve.pool_id(),
                        asset1_id: *asset1_id,
                        asset2_id: *asset2_id,
                        provider: reserve.dex.code(),
                        time: reserve.slot as i64 - self.slot_conversion_offset,
                        reserve1: reserve.reserve1,
                        reserve2: reserve.reserve2,
                        tx_id: *tx_id,
                    });
                }
                _ => {
                    warn!(
                        "Dropping reserve snapshot for pool {} in tx {}: unresolved dependencies",
                        reserve.pool_id(),
                        reserve.tx_hash);
                }
            }
        }

        let deduped = Self::dedupe_keep_last(processed);

        let mut persisted = 0usize;
        for chunk in deduped.chunks(BATCH_SIZE) {
            let sql = Self::build_statement(chunk);
            let txn = self.conn.begin().await?;
            txn.execute(Statement::from_string(DbBackend::Postgres, sql))
                .await
                .map_err(|e| DbError::batch("pool_reserve", e))?;
            txn.commit().await?;
            persisted += chunk.len();
        }

        Ok(persisted)
    }

    /// Collapse duplicate (pool, time) rows to the last occurrence,
    /// preserving first-seen order
    fn dedupe_keep_last(rows: Vec<ProcessedReserve>) -> Vec<ProcessedReserve> {
        let mut by_key: HashMap<(String, i64), ProcessedReserve> = HashMap::new();
        let mut order: Vec<(String, i64)> = Vec::new();

        for row in rows {
            let key = (row.pool_id.clone(), row.time);
            if by_key.insert(key.clone(), row).is_none() {
                order.push(key);
            }
        }

        order
            .into_iter()
            .filter_map(|key| by_key.remove(&key))
            .collect()
    }

    fn build_statement(chunk: &[ProcessedReserve]) -> String {
        let values: Vec<String> = chunk
            .iter()
            .map(|row| {
                format!(
                    "('{}', {}, {}, '{}', {}, {}, {}, {})",
                    escape_literal(&row.pool_id),
                    row.asset1_id,
                    row.asset2_id,
                    escape_literal(row.provider),
                    row.time,
                    row.reserve1,
                    row.reserve2,
                    row.tx_id,
                )
            })
            .collect();

        format!(
            "WITH upserted AS ( \
                INSERT INTO pool_reserve \
                    (pool_id, asset1_id, asset2_id, provider, time, reserve1, reserve2, tx_id) \
                VALUES {} \
                ON CONFLICT (pool_id, time) DO UPDATE SET \
                    asset1_id = EXCLUDED.asset1_id, \
                    asset2_id = EXCLUDED.asset2_id, \
                    provider = EXCLUDED.provider, \
                    reserve1 = EXCLUDED.reserve1, \
                    reserve2 = EXCLUDED.reserve2, \
                    tx_id = EXCLUDED.tx_id \
                RETURNING pool_id, asset1_id, asset2_id, provider, time, \
                          reserve1, reserve2, tx_id \
            ) \
            INSERT INTO latest_pool_reserve \
                (pool_id, asset1_id, asset2_id, provider, time, reserve1, reserve2, tx_id) \
            SELECT DISTINCT ON (pool_id) \
                pool_id, asset1_id, asset2_id, provider, time, reserve1, reserve2, tx_id \
            FROM upserted \
            ORDER BY pool_id, time DESC \
            ON CONFLICT (pool_id) DO UPDATE SET \
                asset1_id = EXCLUDED.asset1_id, \
                asset2_id = EXCLUDED.asset2_id, \
                provider = EXCLUDED.provider, \
                time = EXCLUDED.time, \
                reserve1 = EXCLUDED.reserve1, \
                reserve2 = EXCLUDED.reserve2, \
                tx_id = EXCLUDED.tx_id \
            WHERE EXCLUDED.time >= latest_pool_reserve.time",
            values.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pool_id: &str, time: i64, reserve1: u64) -> ProcessedReserve {
        ProcessedReserve {
            pool_id: pool_id.to_string(),
            asset1_id: 1,
            asset2_id: 2,
            provider: "minswap",
            time,
            reserve1,
            reserve2: 0,
            tx_id: 1,
        }
    }

    #[test]
    fn dedupe_keeps_the_last_occurrence() {
        let deduped = PoolReserveRepository::dedupe_keep_last(vec![
            row("pool-a", 10, 100),
            row("pool-b", 10, 1),
            row("pool-a", 10, 90),
        ]);

        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].pool_id, "pool-a");
        assert_eq!(deduped[0].reserve1, 90);
        assert_eq!(deduped[1].pool_id, "pool-b");
    }

    #[test]
    fn distinct_times_are_not_collapsed() {
        let deduped = PoolReserveRepository::dedupe_keep_last(vec![
            row("pool-a", 10, 100),
            row("pool-a", 11, 90),
        ]);
        assert_eq!(deduped.len(), 2);
    }

    #[test]
    fn statement_upserts_both_tables() {
        let sql = PoolReserveRepository::build_statement(&[row("pool-a", 10, 100)]);
        assert!(sql.contains("INSERT INTO pool_reserve"));
        assert!(sql.contains("INSERT INTO latest_pool_reserve"));
        assert!(sql.contains("ON CONFLICT (pool_id, time) DO UPDATE"));
        assert!(sql.contains("WHERE EXCLUDED.time >= latest_pool_reserve.time"));
    }
}
