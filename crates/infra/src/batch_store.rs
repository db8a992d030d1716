use std::collections::{BTreeMap, VecDeque};
use std::sync::RwLock;

use stockledger_core::{BatchId, EntityKind, StoreError};
use stockledger_inventory::{BatchOperation, BatchStore};

#[derive(Debug, Default)]
struct Retained {
    batches: BTreeMap<BatchId, BatchOperation>,
    order: VecDeque<BatchId>,
}

/// Keeps the most recent `capacity` batches; older ones are evicted.
#[derive(Debug)]
pub struct InMemoryBatchStore {
    retained: RwLock<Retained>,
    capacity: usize,
}

impl InMemoryBatchStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            retained: RwLock::new(Retained::default()),
            capacity: capacity.max(1),
        }
    }
}

impl BatchStore for InMemoryBatchStore {
    fn save(&self, batch: &BatchOperation) -> Result<(), StoreError> {
        let mut r = self.retained.write().map_err(|_| StoreError::Poisoned)?;
        if r.batches.insert(batch.id, batch.clone()).is_none() {
            r.order.push_back(batch.id);
        }
        while r.order.len() > self.capacity {
            if let Some(evicted) = r.order.pop_front() {
                r.batches.remove(&evicted);
            }
        }
        Ok(())
    }

    fn get(&self, id: &BatchId) -> Result<BatchOperation, StoreError> {
        self.retained
            .read()
            .map_err(|_| StoreError::Poisoned)?
            .batches
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound(EntityKind::Batch))
    }
}
