use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::infrastructure::persistence::connection::DbPool;
use crate::infrastructure::persistence::repositories::{
    AssetRepository, PoolReserveRepository, PriceRepository, Repositories, SyncPointRepository,
    TransactionRepository, ViewRepository,
};

/// Factory for creating repositories
pub struct RepositoryFactory;

impl RepositoryFactory {
    /// Create all repositories
    pub fn create_repositories(db_pool: &DbPool, config: &AppConfig) -> Repositories {
        let conn = db_pool.get_connection();

        let asset = Self::create_asset_repository(conn.clone());
        let transaction = Self::create_transaction_repository(conn.clone());

        Repositories::new(
            asset.clone(),
            transaction.clone(),
            PriceRepository::new(conn.clone(), asset.clone(), transaction.clone()),
            PoolReserveRepository::new(
                conn.clone(),
                asset,
                transaction,
                config.pipeline.slot_conversion_offset,
            ),
            SyncPointRepository::new(conn.clone()),
            ViewRepository::new(conn, config.pipeline.refresh_views.clone()),
        )
    }

    /// Create an asset repository
    pub fn create_asset_repository(conn: Arc<DatabaseConnection>) -> AssetRepository {
        AssetRepository::new(conn)
    }

    /// Create a transaction repository
    pub fn create_transaction_repository(conn: Arc<DatabaseConnection>) -> TransactionRepository {
        TransactionRepository::new(conn)
    }
}
