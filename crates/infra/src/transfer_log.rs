use std::collections::BTreeMap;
use std::sync::RwLock;

use stockledger_core::{EntityKind, StoreError, TransferId};
use stockledger_inventory::{TransferIntent, TransferLog, TransferState};

/// In-memory transfer intent log.
#[derive(Debug, Default)]
pub struct InMemoryTransferLog {
    intents: RwLock<BTreeMap<TransferId, TransferIntent>>,
}

impl InMemoryTransferLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransferLog for InMemoryTransferLog {
    fn record(&self, intent: &TransferIntent) -> Result<(), StoreError> {
        let mut intents = self.intents.write().map_err(|_| StoreError::Poisoned)?;
        if intents.contains_key(&intent.id) {
            return Err(StoreError::Duplicate(EntityKind::Transfer));
        }
        intents.insert(intent.id, intent.clone());
        Ok(())
    }

    fn get(&self, id: &TransferId) -> Result<TransferIntent, StoreError> {
        self.intents
            .read()
            .map_err(|_| StoreError::Poisoned)?
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound(EntityKind::Transfer))
    }

    fn transition(&self, intent: &TransferIntent, from: TransferState) -> Result<(), StoreError> {
        let mut intents = self.intents.write().map_err(|_| StoreError::Poisoned)?;
        let slot = intents
            .get_mut(&intent.id)
            .ok_or(StoreError::NotFound(EntityKind::Transfer))?;
        if slot.state != from {
            return Err(StoreError::Conflict(format!(
                "transfer {} is {}, expected {}",
                intent.id, slot.state, from
            )));
        }
        *slot = intent.clone();
        Ok(())
    }

    fn unresolved(&self) -> Result<Vec<TransferIntent>, StoreError> {
        let mut pending: Vec<TransferIntent> = self
            .intents
            .read()
            .map_err(|_| StoreError::Poisoned)?
            .values()
            .filter(|i| i.state.is_unresolved())
            .cloned()
            .collect();
        pending.sort_by_key(|i| i.created_at);
        Ok(pending)
    }
}
