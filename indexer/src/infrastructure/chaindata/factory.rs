//! Provider factory for creating chain-data providers based on configuration

use std::str::FromStr;
use std::sync::Arc;

use crate::config::ChainDataConfig;
use crate::domain::services::utxo_cache::UtxoCache;
use crate::infrastructure::chaindata::error::ChainDataError;
use crate::infrastructure::chaindata::hybrid::HybridResolver;
use crate::infrastructure::chaindata::provider::ChainDataProvider;
use crate::infrastructure::chaindata::providers::{
    BlockfrostProvider, CarpProvider, KoiosProvider, YaciStoreProvider,
};

/// Selectable chain-data services
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainDataServiceKind {
    Hybrid,
    Blockfrost,
    Koios,
    Yacistore,
    Carp,
}

impl FromStr for ChainDataServiceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hybrid" => Ok(ChainDataServiceKind::Hybrid),
            "blockfrost" => Ok(ChainDataServiceKind::Blockfrost),
            "koios" => Ok(ChainDataServiceKind::Koios),
            "yacistore" => Ok(ChainDataServiceKind::Yacistore),
            "carp" => Ok(ChainDataServiceKind::Carp),
            other => Err(format!("Unknown chain data service '{}'", other)),
        }
    }
}

/// Factory for creating chain-data providers
pub struct ProviderFactory;

impl ProviderFactory {
    /// Create the provider selected by the configuration. For `hybrid`, the
    /// configured fallback is created first and wrapped with the cache.
    pub async fn create_provider(
        config: &ChainDataConfig,
        cache: Arc<UtxoCache>,
        metrics: Arc<crate::utils::metrics::PipelineMetrics>,
    ) -> Result<Arc<dyn ChainDataProvider>, ChainDataError> {
        match config.service {
            ChainDataServiceKind::Hybrid => {
                if config.fallback == ChainDataServiceKind::Hybrid {
                    return Err(ChainDataError::ConfigError(
                        "Hybrid fallback cannot be hybrid itself".to_string(),
                    ));
                }
                let fallback = Self::create_backend(config, config.fallback).await?;
                Ok(Arc::new(HybridResolver::new(cache, fallback, metrics)))
            }
            kind => Self::create_backend(config, kind).await,
        }
    }

    async fn create_backend(
        config: &ChainDataConfig,
        kind: ChainDataServiceKind,
    ) -> Result<Arc<dyn ChainDataProvider>, ChainDataError> {
        match kind {
            ChainDataServiceKind::Blockfrost => {
                let provider = BlockfrostProvider::new(
                    config.blockfrost_url.clone(),
                    config.blockfrost_project_id.clone(),
                    config.request_timeout_secs,
                )?;
                Ok(Arc::new(provider))
            }
            ChainDataServiceKind::Koios => {
                let provider =
                    KoiosProvider::new(config.koios_url.clone(), config.request_timeout_secs)?;
                Ok(Arc::new(provider))
            }
            ChainDataServiceKind::Yacistore => {
                let provider = YaciStoreProvider::connect(&config.yacistore_url).await?;
                Ok(Arc::new(provider))
            }
            ChainDataServiceKind::Carp => {
                let provider = CarpProvider::connect(&config.carp_url).await?;
                Ok(Arc::new(provider))
            }
            ChainDataServiceKind::Hybrid => Err(ChainDataError::ConfigError(
                "Hybrid is not a backend".to_string(),
            )),
        }
    }

    /// Get provider name for logging
    pub fn get_provider_name(kind: ChainDataServiceKind) -> &'static str {
        match kind {
            ChainDataServiceKind::Hybrid => "hybrid",
            ChainDataServiceKind::Blockfrost => "blockfrost",
            ChainDataServiceKind::Koios => "koios",
            ChainDataServiceKind::Yacistore => "yacistore",
            ChainDataServiceKind::Carp => "carp",
        }
    }
}
