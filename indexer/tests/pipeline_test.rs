//! End-to-end pipeline tests over a scripted block source, a stubbed
//! chain-data provider, and a mocked database.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult, Value};

use dex_indexer::application::chain::{
    BlockSource, BlockSourceFactory, ChainService, SyncEvent,
};
use dex_indexer::application::events::{EventBus, EventDispatcher};
use dex_indexer::domain::errors::ChainSyncError;
use dex_indexer::domain::models::{
    Block, ChainPoint, Datum, OutputRef, PlutusData, ResolvedInput, TransactionBody,
    TransactionOutput, TxAmount, LOVELACE,
};
use dex_indexer::domain::services::dex::{minswap, ClassifierRegistry, DexCode};
use dex_indexer::domain::services::{PriceProcessor, SwapProcessor, UtxoCache};
use dex_indexer::infrastructure::chaindata::{
    ChainDataError, ChainDataProvider, HybridResolver,
};
use dex_indexer::infrastructure::persistence::entities::sync_point;
use dex_indexer::infrastructure::persistence::repositories::{
    AssetRepository, PoolReserveRepository, PriceRepository, Repositories, SyncPointRepository,
    TransactionRepository, ViewRepository,
};
use dex_indexer::utils::metrics::PipelineMetrics;

const POLICY: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

fn token_unit() -> String {
    format!("{}{}", POLICY, hex::encode("MIN"))
}

fn asset_pair(unit: &str) -> PlutusData {
    if unit == LOVELACE {
        PlutusData::constr(
            0,
            vec![PlutusData::Bytes(vec![]), PlutusData::Bytes(vec![])],
        )
    } else {
        let (policy, name) = unit.split_at(56);
        PlutusData::constr(
            0,
            vec![PlutusData::bytes_hex(policy), PlutusData::bytes_hex(name)],
        )
    }
}

fn minswap_pool_datum() -> PlutusData {
    PlutusData::constr(
        0,
        vec![
            asset_pair(LOVELACE),
            asset_pair(&token_unit()),
            PlutusData::Int(0),
            PlutusData::Int(0),
        ],
    )
}

fn pool_output(lovelace: u64, tokens: u64) -> TransactionOutput {
    TransactionOutput::new(
        "addr1pool",
        Some(minswap::POOL_SCRIPT_HASHES[0].to_string()),
        vec![
            TxAmount::lovelace(lovelace),
            TxAmount::new(token_unit(), tokens),
        ],
        Datum::Inline(minswap_pool_datum()),
    )
}

fn empty_block(slot: u64) -> Block {
    Block {
        hash: format!("hash-{}", slot),
        parent_hash: format!("hash-{}", slot.saturating_sub(1)),
        slot,
        number: slot,
        transactions: vec![],
    }
}

/// A block with one transaction swapping against the Minswap pool:
/// pool before (100 ADA, 500 MIN), after as given
fn swap_block(slot: u64, tx_hash: &str, lovelace_after: u64, tokens_after: u64) -> Block {
    Block {
        hash: format!("hash-{}", slot),
        parent_hash: format!("hash-{}", slot.saturating_sub(1)),
        slot,
        number: slot,
        transactions: vec![TransactionBody::new(
            tx_hash,
            vec![OutputRef::new(format!("{}-prev", tx_hash), 0)],
            vec![pool_output(lovelace_after, tokens_after)],
        )],
    }
}

/// Chain-data provider resolving from a fixed map
struct StubChainData {
    outputs: HashMap<String, TransactionOutput>,
    nearest: ChainPoint,
}

impl StubChainData {
    fn new(nearest: ChainPoint) -> Self {
        Self {
            outputs: HashMap::new(),
            nearest,
        }
    }

    fn with_pool_input(mut self, tx_hash: &str) -> Self {
        self.outputs.insert(
            OutputRef::new(format!("{}-prev", tx_hash), 0).key(),
            pool_output(100_000_000, 500),
        );
        self
    }
}

#[async_trait]
impl ChainDataProvider for StubChainData {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn resolve_inputs(
        &self,
        references: &[OutputRef],
    ) -> Result<Vec<ResolvedInput>, ChainDataError> {
        Ok(references
            .iter()
            .filter_map(|reference| {
                self.outputs
                    .get(&reference.key())
                    .map(|output| ResolvedInput::new(reference.clone(), output.clone()))
            })
            .collect())
    }

    async fn find_block_nearest(&self, _slot: u64) -> Result<ChainPoint, ChainDataError> {
        Ok(self.nearest.clone())
    }
}

/// Block source replaying a fixed script, then idling forever
struct ScriptedSource {
    events: Vec<SyncEvent>,
}

#[async_trait]
impl BlockSource for ScriptedSource {
    async fn next_event(&mut self) -> Result<SyncEvent, ChainSyncError> {
        if self.events.is_empty() {
            std::future::pending::<()>().await;
        }
        Ok(self.events.remove(0))
    }
}

/// Factory recording every session start; the first session replays the
/// script, later sessions idle
struct ScriptedFactory {
    script: Mutex<Vec<SyncEvent>>,
    starts: Mutex<Vec<ChainPoint>>,
}

impl ScriptedFactory {
    fn new(events: Vec<SyncEvent>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(events),
            starts: Mutex::new(Vec::new()),
        })
    }

    fn starts(&self) -> Vec<ChainPoint> {
        self.starts.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlockSourceFactory for ScriptedFactory {
    async fn create(&self, from: ChainPoint) -> Result<Box<dyn BlockSource>, ChainSyncError> {
        self.starts.lock().unwrap().push(from);
        let events = std::mem::take(&mut *self.script.lock().unwrap());
        Ok(Box::new(ScriptedSource { events }))
    }
}

fn roll_forward(block: Block) -> SyncEvent {
    SyncEvent::RollForward {
        tip_slot: block.slot,
        block,
    }
}

struct Harness {
    chain_service: Arc<ChainService>,
    metrics: Arc<PipelineMetrics>,
}

/// Assemble the full pipeline over the given mock connection. Input
/// resolution runs through the hybrid resolver, as in production.
fn build_pipeline(
    conn: DatabaseConnection,
    provider: StubChainData,
    factory: Arc<ScriptedFactory>,
) -> Harness {
    let conn = Arc::new(conn);
    let metrics = Arc::new(PipelineMetrics::new());
    let cache = Arc::new(UtxoCache::new(1000));
    let provider: Arc<dyn ChainDataProvider> = Arc::new(HybridResolver::new(
        cache.clone(),
        Arc::new(provider),
        metrics.clone(),
    ));

    let asset = AssetRepository::new(conn.clone());
    let transaction = TransactionRepository::new(conn.clone());
    let repositories = Repositories::new(
        asset.clone(),
        transaction.clone(),
        PriceRepository::new(conn.clone(), asset.clone(), transaction.clone()),
        PoolReserveRepository::new(conn.clone(), asset.clone(), transaction, 0),
        SyncPointRepository::new(conn.clone()),
        ViewRepository::new(conn, vec![]),
    );

    let registry = Arc::new(ClassifierRegistry::new(&[DexCode::Minswap]));
    let swap_processor = Arc::new(SwapProcessor::new(registry, provider.clone()));
    let price_processor = Arc::new(PriceProcessor::new(Arc::new(asset), 0));

    let (bus, receiver) = EventBus::new(50);
    let chain_service = Arc::new(ChainService::new(factory, provider, bus.clone(), 0));

    let dispatcher = EventDispatcher::new(
        receiver,
        bus,
        cache,
        swap_processor,
        price_processor,
        repositories,
        chain_service.clone(),
        None,
        metrics.clone(),
        0,
    );
    tokio::spawn(dispatcher.run());

    Harness {
        chain_service,
        metrics,
    }
}

async fn wait_for_blocks(metrics: &PipelineMetrics, expected: u64) {
    for _ in 0..500 {
        if metrics.blocks_processed() >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "Timed out waiting for {} processed blocks (saw {})",
        expected,
        metrics.blocks_processed()
    );
}

fn exec_ok() -> MockExecResult {
    MockExecResult {
        last_insert_id: 0,
        rows_affected: 1,
    }
}

fn id_row(id: i64, column: &'static str, value: &str) -> BTreeMap<&'static str, Value> {
    let mut row = BTreeMap::new();
    row.insert("id", Value::from(id));
    row.insert(column, Value::from(value));
    row
}

/// One scripted query returning no rows
fn no_rows() -> Vec<Vec<BTreeMap<&'static str, Value>>> {
    vec![vec![]]
}

#[tokio::test]
async fn empty_block_completes_exactly_once_without_writes() {
    // The only statement is the sync point save on completion
    let conn = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results(vec![exec_ok()])
        .into_connection();

    let factory = ScriptedFactory::new(vec![roll_forward(empty_block(1_000_000))]);
    let harness = build_pipeline(conn, StubChainData::new(ChainPoint::origin()), factory);

    harness
        .chain_service
        .start(ChainPoint::origin())
        .await
        .unwrap();

    wait_for_blocks(&harness.metrics, 1).await;

    // Give the pipeline a moment to (incorrectly) signal twice
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(harness.metrics.blocks_processed(), 1);
    assert_eq!(harness.metrics.event_processing_failed(), 0);
}

#[tokio::test]
async fn single_swap_persists_reserves_and_prices() {
    let token = token_unit();

    let conn = MockDatabase::new(DatabaseBackend::Postgres)
        // Price processor decimals lookup: token precision unknown
        .append_query_results(no_rows())
        // Reserve persistence: asset ids, then tx ids
        .append_query_results(vec![
            vec![id_row(1, "unit", LOVELACE), id_row(2, "unit", &token)],
            vec![id_row(1, "hash", "tx1")],
        ])
        // Price persistence: asset ids, then tx ids
        .append_query_results(vec![
            vec![id_row(1, "unit", LOVELACE), id_row(2, "unit", &token)],
            vec![id_row(1, "hash", "tx1")],
        ])
        // Execs: reserve asset+tx inserts and CTE, price asset+tx inserts
        // and CTE, sync point save
        .append_exec_results(vec![exec_ok(); 7])
        .into_connection();

    // Trader sells 10 ADA into the pool for 50 MIN
    let factory = ScriptedFactory::new(vec![roll_forward(swap_block(
        1_000_000,
        "tx1",
        110_000_000,
        450,
    ))]);
    let provider = StubChainData::new(ChainPoint::origin()).with_pool_input("tx1");
    let harness = build_pipeline(conn, provider, factory);

    harness
        .chain_service
        .start(ChainPoint::origin())
        .await
        .unwrap();

    wait_for_blocks(&harness.metrics, 1).await;

    assert_eq!(harness.metrics.event_processing_failed(), 0);

    let text = harness.metrics.render_prometheus();
    assert!(text.contains("dex_indexer_swaps_computed 1\n"));
    assert!(text.contains("dex_indexer_pool_reserves_persisted 1\n"));
    assert!(text.contains("dex_indexer_prices_persisted 1\n"));
}

#[tokio::test]
async fn two_updates_to_one_pool_collapse_to_final_state() {
    let token = token_unit();

    let conn = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(no_rows())
        .append_query_results(vec![
            vec![id_row(1, "unit", LOVELACE), id_row(2, "unit", &token)],
            vec![id_row(1, "hash", "tx1"), id_row(2, "hash", "tx2")],
        ])
        .append_query_results(vec![
            vec![id_row(1, "unit", LOVELACE), id_row(2, "unit", &token)],
            vec![id_row(1, "hash", "tx1"), id_row(2, "hash", "tx2")],
        ])
        .append_exec_results(vec![exec_ok(); 7])
        .into_connection();

    // Two transactions touch the same pool within one block; the second
    // leaves it at (90 ADA, 520 MIN)
    let slot = 1_000_000;
    let tx1 = TransactionBody::new(
        "tx1",
        vec![OutputRef::new("tx1-prev", 0)],
        vec![pool_output(110_000_000, 450)],
    );
    let tx2 = TransactionBody::new(
        "tx2",
        vec![OutputRef::new("tx1", 0)],
        vec![pool_output(90_000_000, 520)],
    );
    let block = Block {
        hash: format!("hash-{}", slot),
        parent_hash: format!("hash-{}", slot - 1),
        slot,
        number: slot,
        transactions: vec![tx1, tx2],
    };

    // tx2 spends tx1's pool output, which the cache serves; only tx1's
    // input needs the provider
    let provider = StubChainData::new(ChainPoint::origin()).with_pool_input("tx1");
    let factory = ScriptedFactory::new(vec![roll_forward(block)]);
    let harness = build_pipeline(conn, provider, factory);

    harness
        .chain_service
        .start(ChainPoint::origin())
        .await
        .unwrap();

    wait_for_blocks(&harness.metrics, 1).await;

    let text = harness.metrics.render_prometheus();
    // Two swaps, but a single reserve row for the (pool, time) key
    assert!(text.contains("dex_indexer_swaps_computed 2\n"));
    assert!(text.contains("dex_indexer_pool_reserves_persisted 1\n"));
    assert_eq!(harness.metrics.event_processing_failed(), 0);
}

#[tokio::test]
async fn rollback_restarts_from_earlier_of_sync_point_and_rollback_point() {
    let now = chrono::Utc::now().into();

    let conn = MockDatabase::new(DatabaseBackend::Postgres)
        // Block 100 completion writes the sync point
        .append_exec_results(vec![exec_ok()])
        // Rollback handling reads it back
        .append_query_results(vec![vec![sync_point::Model {
            id: 1,
            slot: 100,
            hash: "hash-100".to_string(),
            time: 100,
            updated_at: now,
        }]])
        .into_connection();

    let factory = ScriptedFactory::new(vec![
        roll_forward(empty_block(100)),
        SyncEvent::RollBack {
            point: ChainPoint::new(90, "hash-90"),
        },
    ]);

    // The provider maps the re-initialization time to slot 88
    let provider = StubChainData::new(ChainPoint::new(88, "hash-88"));
    let harness = build_pipeline(conn, provider, factory.clone());

    harness
        .chain_service
        .start(ChainPoint::origin())
        .await
        .unwrap();

    wait_for_blocks(&harness.metrics, 1).await;

    // Wait for the session restart triggered by the rollback
    for _ in 0..500 {
        if factory.starts().len() >= 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let starts = factory.starts();
    assert_eq!(starts.len(), 2, "expected a restarted session");
    // min(persisted time 100, rollback time 90) = 90, resolved by the
    // provider to the block at slot 88
    assert_eq!(starts[1].slot, 88);
    assert_eq!(starts[1].hash, "hash-88");
    assert!(starts[1].slot <= 90);

    let text = harness.metrics.render_prometheus();
    assert!(text.contains("dex_indexer_rollbacks_processed 1\n"));
}

#[tokio::test]
async fn prices_path_failure_still_completes_the_block_exactly_once() {
    let token = token_unit();

    let conn = MockDatabase::new(DatabaseBackend::Postgres)
        // The decimals lookup fails, killing the prices path before it
        // can publish
        .append_query_errors(vec![sea_orm::DbErr::Custom(
            "connection reset".to_string(),
        )])
        // Reserve persistence still runs: asset ids, then tx ids
        .append_query_results(vec![
            vec![id_row(1, "unit", LOVELACE), id_row(2, "unit", &token)],
            vec![id_row(1, "hash", "tx1")],
        ])
        // Execs: sync point save (completion from the swaps arm), reserve
        // asset+tx inserts and CTE
        .append_exec_results(vec![exec_ok(); 4])
        .into_connection();

    let factory = ScriptedFactory::new(vec![roll_forward(swap_block(
        1_000_000,
        "tx1",
        110_000_000,
        450,
    ))]);
    let provider = StubChainData::new(ChainPoint::origin()).with_pool_input("tx1");
    let harness = build_pipeline(conn, provider, factory);

    harness
        .chain_service
        .start(ChainPoint::origin())
        .await
        .unwrap();

    wait_for_blocks(&harness.metrics, 1).await;

    // The reserves arm ran with has_swaps=true and must not signal again
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(harness.metrics.blocks_processed(), 1);
    assert!(harness.metrics.event_processing_failed() >= 1);

    let text = harness.metrics.render_prometheus();
    assert!(text.contains("dex_indexer_prices_persisted 0\n"));
    assert!(text.contains("dex_indexer_pool_reserves_persisted 1\n"));
}
