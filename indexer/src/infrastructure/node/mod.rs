pub mod client;
pub mod source;

pub use client::NodeClient;
pub use source::{NodeBlockSource, NodeBlockSourceFactory};
