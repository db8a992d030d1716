//! Inventory domain: stock ledger, journal, alerts, lots, valuation and
//! analytics.
//!
//! Services here talk to storage only through the ports in [`storage`] and to
//! subscribers only through [`events::EventPublisher`]. Concrete backends and
//! wiring live in `stockledger-infra`.

pub mod abc;
pub mod alert;
pub mod analytics;
pub mod batch;
pub mod catalog;
pub mod config;
pub mod events;
pub mod journal;
pub mod ledger;
pub mod lot;
pub mod stock;
pub mod storage;
pub mod transfer;
pub mod validation;
pub mod valuation;

pub use abc::{AbcClass, AbcClassifier, AbcEntry};
pub use alert::{AlertEngine, AlertKind, StockAlert};
pub use analytics::{InventoryAnalytics, ReportType};
pub use batch::{
    BatchExecutor, BatchOperation, BatchOperationError, BatchStatus, InventoryOperation,
    OperationType,
};
pub use catalog::{CatalogService, Item, Location};
pub use config::{ConfigError, InventoryConfig};
pub use events::{
    ChangeKind, EventPublisher, InventoryEvent, ItemTransferred, LowStockAlertRaised,
    PublishError, StockChanged,
};
pub use journal::{JournalEntry, Metadata, MovementType, NewJournalEntry, TransactionJournal};
pub use ledger::{Receipt, StockLedger, TransferOutcome};
pub use lot::{Lot, LotAuditTrail, LotMovement, LotTracker};
pub use stock::StockRecord;
pub use storage::{
    AlertStore, BatchStore, CatalogStore, JournalStore, LotStore, StockStore, Storage,
    StorageHealth, TransferLog,
};
pub use transfer::{TransferIntent, TransferState};
pub use valuation::{CostLayer, ItemValuation, ValuationEngine, ValuationMethod};
