pub mod asset;
pub mod latest_pool_reserve;
pub mod latest_price;
pub mod pool_reserve;
pub mod price;
pub mod sync_point;
pub mod tx;

pub mod prelude {
    pub use super::asset::Entity as Asset;
    pub use super::latest_pool_reserve::Entity as LatestPoolReserve;
    pub use super::latest_price::Entity as LatestPrice;
    pub use super::pool_reserve::Entity as PoolReserve;
    pub use super::price::Entity as Price;
    pub use super::sync_point::Entity as SyncPoint;
    pub use super::tx::Entity as Tx;
}
