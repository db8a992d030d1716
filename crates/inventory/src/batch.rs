//! Batch execution of ledger operations.
//!
//! Operations run in order, each through the ledger independently. A failing
//! operation is recorded with its index and the rest keep running; nothing is
//! rolled back.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{Actor, BatchId, DomainError, DomainResult, Entity, EntityKind, ItemId, LocationId};

use crate::ledger::StockLedger;
use crate::storage::BatchStore;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    Add,
    Remove,
    Transfer,
    Adjust,
}

/// One requested ledger operation. For `Adjust`, `quantity` is the new
/// on-hand quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryOperation {
    #[serde(rename = "type")]
    pub kind: OperationType,
    pub item_id: ItemId,
    pub location_id: LocationId,
    pub quantity: i64,
    #[serde(default)]
    pub reference: String,
    /// Destination, required for transfers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_location_id: Option<LocationId>,
}

impl InventoryOperation {
    fn new(kind: OperationType, item_id: ItemId, location_id: LocationId, quantity: i64, reference: &str) -> Self {
        Self {
            kind,
            item_id,
            location_id,
            quantity,
            reference: reference.to_string(),
            to_location_id: None,
        }
    }

    pub fn add(item_id: ItemId, location_id: LocationId, quantity: i64, reference: &str) -> Self {
        Self::new(OperationType::Add, item_id, location_id, quantity, reference)
    }

    pub fn remove(item_id: ItemId, location_id: LocationId, quantity: i64, reference: &str) -> Self {
        Self::new(OperationType::Remove, item_id, location_id, quantity, reference)
    }

    pub fn adjust(item_id: ItemId, location_id: LocationId, new_quantity: i64, reference: &str) -> Self {
        Self::new(OperationType::Adjust, item_id, location_id, new_quantity, reference)
    }

    pub fn transfer(
        item_id: ItemId,
        from: LocationId,
        to: LocationId,
        quantity: i64,
        reference: &str,
    ) -> Self {
        Self {
            to_location_id: Some(to),
            ..Self::new(OperationType::Transfer, item_id, from, quantity, reference)
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOperationError {
    pub operation_index: usize,
    pub error: String,
}

/// Outcome of a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOperation {
    pub id: BatchId,
    pub operations: Vec<InventoryOperation>,
    pub status: BatchStatus,
    pub success_count: usize,
    pub failure_count: usize,
    pub errors: Vec<BatchOperationError>,
    pub actor: Actor,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl BatchOperation {
    pub fn new(operations: Vec<InventoryOperation>, actor: Actor) -> Self {
        Self {
            id: BatchId::new(),
            operations,
            status: BatchStatus::Pending,
            success_count: 0,
            failure_count: 0,
            errors: Vec::new(),
            actor,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn record_outcome(&mut self, index: usize, outcome: DomainResult<()>) {
        match outcome {
            Ok(()) => self.success_count += 1,
            Err(e) => {
                self.failure_count += 1;
                self.errors.push(BatchOperationError {
                    operation_index: index,
                    error: e.to_string(),
                });
            }
        }
    }

    /// Completed iff no operation failed.
    pub fn finish(&mut self, at: DateTime<Utc>) {
        self.status = if self.failure_count == 0 {
            BatchStatus::Completed
        } else {
            BatchStatus::Failed
        };
        self.completed_at = Some(at);
    }
}

impl Entity for BatchOperation {
    type Id = BatchId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

pub struct BatchExecutor {
    ledger: Arc<StockLedger>,
    store: Option<Arc<dyn BatchStore>>,
}

impl BatchExecutor {
    pub fn new(ledger: Arc<StockLedger>) -> Self {
        Self {
            ledger,
            store: None,
        }
    }

    /// Keep batch results for [`status`](Self::status) lookups.
    pub fn with_store(mut self, store: Arc<dyn BatchStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn execute(&self, operations: Vec<InventoryOperation>, actor: Actor) -> BatchOperation {
        let mut batch = BatchOperation::new(operations, actor);
        self.save_quietly(&batch);

        let span = tracing::info_span!("batch", batch_id = %batch.id, operations = batch.operations.len());
        let _guard = span.enter();

        for index in 0..batch.operations.len() {
            let outcome = self.apply(&batch.operations[index], actor);
            if let Err(error) = &outcome {
                tracing::warn!(%error, operation_index = index, "batch operation failed");
            }
            batch.record_outcome(index, outcome);
        }
        batch.finish(Utc::now());

        tracing::info!(
            success_count = batch.success_count,
            failure_count = batch.failure_count,
            status = ?batch.status,
            "batch finished"
        );
        self.save_quietly(&batch);
        batch
    }

    /// A previously executed batch. Without a batch store nothing is kept and
    /// every lookup is `NotFound`.
    pub fn status(&self, id: &BatchId) -> DomainResult<BatchOperation> {
        let Some(store) = &self.store else {
            return Err(DomainError::not_found(EntityKind::Batch));
        };
        store.get(id).map_err(|e| DomainError::store("get_batch", e))
    }

    fn apply(&self, op: &InventoryOperation, actor: Actor) -> DomainResult<()> {
        let ledger = &self.ledger;
        match op.kind {
            OperationType::Add => ledger
                .add(&op.item_id, &op.location_id, op.quantity, &op.reference, actor)
                .map(|_| ()),
            OperationType::Remove => ledger
                .remove(&op.item_id, &op.location_id, op.quantity, &op.reference, actor)
                .map(|_| ()),
            OperationType::Adjust => ledger
                .adjust(&op.item_id, &op.location_id, op.quantity, &op.reference, actor)
                .map(|_| ()),
            OperationType::Transfer => {
                let to = op.to_location_id.as_ref().ok_or_else(|| {
                    DomainError::validation(
                        "to_location_id",
                        "transfer requires a destination",
                        "none",
                    )
                })?;
                ledger
                    .transfer(&op.item_id, &op.location_id, to, op.quantity, &op.reference, actor)
                    .map(|_| ())
            }
        }
    }

    fn save_quietly(&self, batch: &BatchOperation) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(error) = store.save(batch) {
            tracing::error!(%error, batch_id = %batch.id, "failed to save batch");
        }
    }
}
