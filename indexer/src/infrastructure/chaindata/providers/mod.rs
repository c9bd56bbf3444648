pub mod blockfrost;
pub mod carp;
pub mod koios;
pub mod yacistore;

pub use blockfrost::BlockfrostProvider;
pub use carp::CarpProvider;
pub use koios::KoiosProvider;
pub use yacistore::YaciStoreProvider;
