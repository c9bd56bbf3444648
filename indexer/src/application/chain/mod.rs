pub mod service;
pub mod source;

pub use service::ChainService;
pub use source::{BlockSource, BlockSourceFactory, SyncEvent};
