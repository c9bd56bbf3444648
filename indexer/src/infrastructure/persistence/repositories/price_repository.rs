use std::sync::Arc;

use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, Statement, TransactionTrait};

use log::warn;

use crate::domain::models::Price;
use crate::infrastructure::persistence::error::DbError;
use crate::infrastructure::persistence::repositories::{
    escape_literal, AssetRepository, TransactionRepository,
};

/// Rows per composite statement
const BATCH_SIZE: usize = 500;

/// Repository for price rows and their latest-per-pair companion
#[derive(Clone)]
pub struct PriceRepository {
    conn: Arc<DatabaseConnection>,
    asset_repository: AssetRepository,
    transaction_repository: TransactionRepository,
}

struct ProcessedPrice<'a> {
    asset_id: i64,
    quote_asset_id: i64,
    provider: &'a str,
    time: i64,
    tx_id: i64,
    swap_index: i32,
    price: &'a Price,
}

impl PriceRepository {
    pub fn new(
        conn: Arc<DatabaseConnection>,
        asset_repository: AssetRepository,
        transaction_repository: TransactionRepository,
    ) -> Self {
        Self {
            conn,
            asset_repository,
            transaction_repository,
        }
    }

    /// Persist a batch of prices.
    ///
    /// Asset and transaction rows are upserted first so the surrogate ids
    /// exist; each chunk then runs a single composite statement that upserts
    /// the price rows and refreshes `latest_price` for the touched pairs in
    /// one round-trip.
    pub async fn persist_prices(&self, prices: &[Price]) -> Result<usize, DbError> {
        if prices.is_empty() {
            return Ok(0);
        }

        let units: Vec<String> = prices
            .iter()
            .flat_map(|price| [price.asset_unit.clone(), price.quote_unit.clone()])
            .collect();
        let hashes: Vec<String> = prices.iter().map(|price| price.tx_hash.clone()).collect();

        let asset_ids = self.asset_repository.upsert_assets(&units).await?;
        let tx_ids = self
            .transaction_repository
            .upsert_transactions(&hashes)
            .await?;

        let mut processed = Vec::with_capacity(prices.len());
        for price in prices {
            let asset_id = asset_ids.get(&price.asset_unit);
            let quote_asset_id = asset_ids.get(&price.quote_unit);
            let tx_id = tx_ids.get(&price.tx_hash);

            match (asset_id, quote_asset_id, tx_id) {
                (Some(asset_id), Some(quote_asset_id), Some(tx_id)) => {
                    processed.push(ProcessedPrice {
                        asset_id: *asset_id,
                        quote_asset_id: *quote_asset_id,
                        provider: price.dex.code(),
                        time: price.time,
                        tx_id: *tx_id,
                        swap_index: price.swap_index,
                        price,
                    });
                }
                _ => {
                    warn!(
                        "Dropping price for {}/{} in tx {}: unresolved dependencies",
                        price.asset_unit, price.quote_unit, price.tx_hash);
                }
            }
        }

        let mut persisted = 0usize;
        for chunk in processed.chunks(BATCH_SIZE) {
            let sql = Self::build_statement(chunk);
            let txn = self.conn.begin().await?;
            txn.execute(Statement::from_string(DbBackend::Postgres, sql))
                .await
                .map_err(|e| DbError::batch("price", e))?;
            txn.commit().await?;
            persisted += chunk.len();
        }

        Ok(persisted)
    }

    fn build_statement(chunk: &[ProcessedPrice<'_>]) -> String {
        let values: Vec<String> = chunk
            .iter()
            .map(|row| {
                format!(
                    "({}, {}, '{}', {}, {}, {}, {}, {}, {}, {}, {})",
                    row.asset_id,
                    row.quote_asset_id,
                    escape_literal(row.provider),
                    row.time,
                    row.tx_id,
                    row.swap_index,
                    row.price.price,
                    row.price.amount1,
                    row.price.amount2,
                    row.price.operation,
                    match row.price.outlier {
                        Some(true) => "TRUE",
                        Some(false) => "FALSE",
                        None => "NULL",
                    },
                )
            })
            .collect();

        format!(
            "WITH upserted AS ( \
                INSERT INTO price \
                    (asset_id, quote_asset_id, provider, time, tx_id, swap_index, \
                     price, amount1, amount2, operation, outlier) \
                VALUES {} \
                ON CONFLICT (asset_id, quote_asset_id, time, tx_id, swap_index) DO UPDATE SET \
                    provider = EXCLUDED.provider, \
                    price = EXCLUDED.price, \
                    amount1 = EXCLUDED.amount1, \
                    amount2 = EXCLUDED.amount2, \
                    operation = EXCLUDED.operation, \
                    outlier = EXCLUDED.outlier \
                RETURNING asset_id, quote_asset_id, provider, time, tx_id, swap_index, \
                          price, amount1, amount2, operation, outlier \
            ) \
            INSERT INTO latest_price \
                (asset_id, quote_asset_id, provider, time, tx_id, swap_index, \
                 price, amount1, amount2, operation, outlier) \
            SELECT DISTINCT ON (asset_id, quote_asset_id) \
                asset_id, quote_asset_id, provider, time, tx_id, swap_index, \
                price, amount1, amount2, operation, outlier \
            FROM upserted \
            ORDER BY asset_id, quote_asset_id, time DESC, tx_id DESC, swap_index DESC \
            ON CONFLICT (asset_id, quote_asset_id) DO UPDATE SET \
                provider = EXCLUDED.provider, \
                time = EXCLUDED.time, \
                tx_id = EXCLUDED.tx_id, \
                swap_index = EXCLUDED.swap_index, \
                price = EXCLUDED.price, \
                amount1 = EXCLUDED.amount1, \
                amount2 = EXCLUDED.amount2, \
                operation = EXCLUDED.operation, \
                outlier = EXCLUDED.outlier \
            WHERE EXCLUDED.time >= latest_price.time",
            values.join(", ")
        )
    }
}
