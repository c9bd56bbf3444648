//! DEX Indexer - streaming Cardano DEX swap and price indexer
//!
//! Consumes blocks from the upstream node, extracts swaps and pool reserves
//! for the enabled DEX protocols, derives prices, and persists everything
//! into the relational store.
//!
//! ## Operation Modes
//!
//! - **Live sync** (default): follows the chain tip and refreshes aggregate
//!   views as new prices land
//! - **Historical** (`RUN_MODE=historical`): replays from the configured
//!   start slot without touching the aggregate views

use std::process;
use std::sync::Arc;

use log::{error, info};

use dex_indexer::application::chain::ChainService;
use dex_indexer::application::events::{EventBus, EventDispatcher};
use dex_indexer::config::{AppConfig, RunMode};
use dex_indexer::domain::models::ChainPoint;
use dex_indexer::domain::services::dex::ClassifierRegistry;
use dex_indexer::domain::services::{PriceProcessor, SwapProcessor, UtxoCache};
use dex_indexer::infrastructure::chaindata::ProviderFactory;
use dex_indexer::infrastructure::node::NodeBlockSourceFactory;
use dex_indexer::infrastructure::persistence::{DbPool, RepositoryFactory};
use dex_indexer::infrastructure::publisher::PricePublisher;
use dex_indexer::infrastructure::web::{self, AppState};
use dex_indexer::utils::logging;
use dex_indexer::utils::metrics::PipelineMetrics;

#[tokio::main]
async fn main() {
    logging::init_logger();

    let config = AppConfig::load();

    // Connect to database and apply migrations
    let db_pool = match DbPool::new(&config).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = db_pool.migrate().await {
        error!("Failed to apply migrations: {}", e);
        process::exit(1);
    }

    let repositories = RepositoryFactory::create_repositories(&db_pool, &config);

    let metrics = Arc::new(PipelineMetrics::new());
    let cache = Arc::new(UtxoCache::new(config.pipeline.utxo_cache_size));

    let chain_data = match ProviderFactory::create_provider(
        &config.chaindata,
        cache.clone(),
        metrics.clone(),
    )
    .await
    {
        Ok(provider) => provider,
        Err(e) => {
            error!("Failed to create chain data provider: {}", e);
            process::exit(1);
        }
    };

    info!(
        "Chain data service: {} (fallback: {})",
        ProviderFactory::get_provider_name(config.chaindata.service),
        ProviderFactory::get_provider_name(config.chaindata.fallback));

    let registry = ClassifierRegistry::new(&config.pipeline.dexes);
    if registry.is_empty() {
        error!("No DEX classifiers enabled");
        process::exit(1);
    }

    let swap_processor = Arc::new(SwapProcessor::new(
        Arc::new(registry),
        chain_data.clone(),
    ));
    let price_processor = Arc::new(PriceProcessor::new(
        Arc::new(repositories.asset.clone()),
        config.pipeline.slot_conversion_offset,
    ));

    let (bus, receiver) = EventBus::new(config.pipeline.event_buffer_size);

    let source_factory = Arc::new(NodeBlockSourceFactory::new(
        config.node.base_url(),
        config.node.poll_interval_ms,
    ));

    let chain_service = Arc::new(ChainService::new(
        source_factory,
        chain_data,
        bus.clone(),
        config.pipeline.slot_conversion_offset,
    ));

    let publisher = if config.publisher.enabled {
        match PricePublisher::new(config.publisher.url.clone(), metrics.clone()) {
            Ok(publisher) => Some(Arc::new(publisher)),
            Err(e) => {
                error!("Failed to create price publisher: {}", e);
                process::exit(1);
            }
        }
    } else {
        None
    };

    let dispatcher = EventDispatcher::new(
        receiver,
        bus,
        cache.clone(),
        swap_processor,
        price_processor,
        repositories.clone(),
        chain_service.clone(),
        publisher,
        metrics.clone(),
        config.pipeline.slot_conversion_offset,
    );
    let dispatcher_task = tokio::spawn(dispatcher.run());

    // Metrics and status server
    let web_state = AppState {
        metrics: metrics.clone(),
        cache: cache.clone(),
        chain_service: chain_service.clone(),
    };
    let web_config = config.clone();
    tokio::spawn(async move {
        web::server::start_server(&web_config, web_state).await;
    });

    // Determine where to start syncing from
    let start_point = match determine_start_point(&config, &repositories, &chain_service).await {
        Ok(point) => point,
        Err(message) => {
            error!("{}", &message);
            process::exit(1);
        }
    };

    if let Err(e) = chain_service.start(start_point).await {
        error!("Failed to start block sync: {}", e);
        process::exit(1);
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }

    chain_service.stop().await;
    dispatcher_task.abort();
    info!("Indexer stopped");
}

/// Resolve the initial sync point: the persisted position in live mode, the
/// configured start slot otherwise
async fn determine_start_point(
    config: &AppConfig,
    repositories: &dex_indexer::infrastructure::persistence::Repositories,
    chain_service: &ChainService,
) -> Result<ChainPoint, String> {
    let persisted = match config.pipeline.mode {
        RunMode::LiveSync => repositories
            .sync_point
            .get()
            .await
            .map_err(|e| format!("Failed to read persisted sync point: {}", e))?,
        RunMode::Historical => None,
    };

    if let Some(persisted) = persisted {
        let point = chain_service
            .determine_initialisation_state(persisted.time)
            .await
            .map_err(|e| format!("Failed to determine initialisation state: {}", e))?;
        info!(
            "Resuming from persisted sync point at slot {}",
            point.slot);
        return Ok(point);
    }

    if config.pipeline.start_slot == 0 {
        info!("No sync point; starting from origin");
        return Ok(ChainPoint::origin());
    }

    let time = config.pipeline.start_slot as i64 - config.pipeline.slot_conversion_offset;
    let point = chain_service
        .determine_initialisation_state(time)
        .await
        .map_err(|e| format!("Failed to determine initialisation state: {}", e))?;
    info!(
        "Starting from configured slot {} (resolved to slot {})",
        config.pipeline.start_slot, point.slot);
    Ok(point)
}
