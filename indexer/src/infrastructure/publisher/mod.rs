pub mod price_publisher;

pub use price_publisher::PricePublisher;
