//! External price publisher
//!
//! Forwards each computed price to an external bus as JSON. Delivery is
//! best-effort: transient failures are retried a few times, then the price
//! is dropped with a counter increment. A publish failure never fails the
//! block that produced the price.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde_json::json;

use log::warn;

use crate::domain::models::Price;
use crate::utils::metrics::PipelineMetrics;
use crate::utils::retry::RetryHandler;

pub struct PricePublisher {
    client: Client,
    url: String,
    retry: RetryHandler,
    metrics: Arc<PipelineMetrics>,
}

impl PricePublisher {
    pub fn new(url: String, metrics: Arc<PipelineMetrics>) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| e.to_string())?;

        Ok(Self {
            client,
            url,
            retry: RetryHandler::with_config(3, 250),
            metrics,
        })
    }

    /// Publish every price in the batch, best-effort
    pub async fn publish_prices(&self, prices: &[Price]) {
        for price in prices {
            if let Err(e) = self
                .retry
                .execute_with_retry(|| self.publish_price(price), "Price publish")
                .await
            {
                self.metrics.record_price_publish_failed();
                warn!(
                    "Dropping price publication for {}/{} in tx {}: {}",
                    price.asset_unit, price.quote_unit, price.tx_hash, e);
            }
        }
    }

    async fn publish_price(&self, price: &Price) -> Result<(), String> {
        let body = json!({
            "asset": price.asset_unit,
            "quoteAsset": price.quote_unit,
            "provider": price.dex.code(),
            "time": price.time,
            "txHash": price.tx_hash,
            "swapIndex": price.swap_index,
            "price": price.price.to_string(),
            "amount1": price.amount1,
            "amount2": price.amount2,
            "operation": price.operation,
            "outlier": price.outlier,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("sink returned status {}", response.status()));
        }

        Ok(())
    }
}
