pub mod asset_repository;
pub mod pool_reserve_repository;
pub mod price_repository;
pub mod sync_point_repository;
pub mod transaction_repository;
pub mod view_repository;

pub use asset_repository::AssetRepository;
pub use pool_reserve_repository::PoolReserveRepository;
pub use price_repository::PriceRepository;
pub use sync_point_repository::{PersistedSyncPoint, SyncPointRepository};
pub use transaction_repository::TransactionRepository;
pub use view_repository::ViewRepository;

/// Escape a string for inlining into a single-quoted SQL literal
pub(crate) fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

/// Container for all repositories used by the pipeline
#[derive(Clone)]
pub struct Repositories {
    pub asset: AssetRepository,
    pub transaction: TransactionRepository,
    pub price: PriceRepository,
    pub pool_reserve: PoolReserveRepository,
    pub sync_point: SyncPointRepository,
    pub view: ViewRepository,
}

impl Repositories {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        asset: AssetRepository,
        transaction: TransactionRepository,
        price: PriceRepository,
        pool_reserve: PoolReserveRepository,
        sync_point: SyncPointRepository,
        view: ViewRepository,
    ) -> Self {
        Self {
            asset,
            transaction,
            price,
            pool_reserve,
            sync_point,
            view,
        }
    }
}
