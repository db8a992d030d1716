//! Wiring of the inventory services over in-memory infrastructure.

use std::sync::Arc;

use anyhow::Context;

use stockledger_inventory::{
    AbcClassifier, AlertEngine, BatchExecutor, CatalogService, EventPublisher, InventoryAnalytics,
    InventoryConfig, LotTracker, StockLedger, TransactionJournal, ValuationEngine,
};
use stockledger_observability::LogConfig;

use crate::batch_store::InMemoryBatchStore;
use crate::publisher::{BusPublisher, InventoryBus};
use crate::store::InMemoryStore;
use crate::transfer_log::InMemoryTransferLog;

/// Every inventory service, sharing one store, one bus and one transfer log.
pub struct InventoryServices {
    pub config: InventoryConfig,
    pub store: Arc<InMemoryStore>,
    pub bus: Arc<InventoryBus>,
    pub transfers: Arc<InMemoryTransferLog>,
    pub catalog: CatalogService,
    pub journal: TransactionJournal,
    pub alerts: AlertEngine,
    pub ledger: Arc<StockLedger>,
    pub lots: LotTracker,
    pub batches: BatchExecutor,
    pub valuation: ValuationEngine,
    pub abc: AbcClassifier,
    pub analytics: InventoryAnalytics,
}

impl InventoryServices {
    /// Logging and configuration from `STOCKLEDGER_*` variables, in-memory
    /// backends.
    pub fn from_env() -> anyhow::Result<Self> {
        let logging = LogConfig::from_env()?;
        stockledger_observability::init(&logging).context("initializing logging")?;
        let config = InventoryConfig::from_env().context("loading inventory configuration")?;
        Ok(Self::in_memory(config))
    }

    /// Services publishing to an in-process bus (see [`Self::bus`]).
    pub fn in_memory(config: InventoryConfig) -> Self {
        let bus = Arc::new(InventoryBus::new());
        let publisher: Arc<dyn EventPublisher> = Arc::new(BusPublisher::new(bus.clone()));
        Self::assemble(config, bus, publisher)
    }

    /// Services publishing through `publisher` instead of the bus.
    pub fn in_memory_with_publisher(
        config: InventoryConfig,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self::assemble(config, Arc::new(InventoryBus::new()), publisher)
    }

    fn assemble(
        config: InventoryConfig,
        bus: Arc<InventoryBus>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let transfers = Arc::new(InMemoryTransferLog::new());

        let catalog = CatalogService::new(store.clone(), config.history_default_limit);
        let journal =
            TransactionJournal::new(store.clone(), store.clone(), config.history_default_limit);
        let alerts = AlertEngine::new(store.clone(), store.clone(), config.low_stock_threshold)
            .with_publisher(publisher.clone());
        let ledger = Arc::new(
            StockLedger::new(
                store.clone(),
                store.clone(),
                journal.clone(),
                alerts.clone(),
                &config,
            )
            .with_publisher(publisher)
            .with_transfer_log(transfers.clone()),
        );
        let lots = LotTracker::new(
            store.clone(),
            store.clone(),
            journal.clone(),
            config.history_scan_limit,
        );
        let batches = BatchExecutor::new(ledger.clone())
            .with_store(Arc::new(InMemoryBatchStore::new(config.batch_history_capacity)));
        let valuation = ValuationEngine::new(
            store.clone(),
            store.clone(),
            journal.clone(),
            config.history_scan_limit,
        );
        let abc = AbcClassifier::new(store.clone(), store.clone(), &config);
        let analytics = InventoryAnalytics::new(
            store.clone(),
            store.clone(),
            journal.clone(),
            valuation.clone(),
            abc.clone(),
            config.history_scan_limit,
        );

        tracing::debug!(
            allow_negative_stock = config.allow_negative_stock,
            low_stock_threshold = config.low_stock_threshold,
            "inventory services assembled"
        );

        Self {
            config,
            store,
            bus,
            transfers,
            catalog,
            journal,
            alerts,
            ledger,
            lots,
            batches,
            valuation,
            abc,
            analytics,
        }
    }
}
