//! Streaming Cardano DEX indexer
//!
//! Consumes blocks from an upstream node, extracts swap and liquidity-pool
//! activity across several DEX protocols, derives per-swap prices, and
//! persists prices and reserve snapshots for downstream query services.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod utils;

pub use config::AppConfig;
