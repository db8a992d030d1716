//! Fault injection for exercising failure paths against the in-memory store.

use std::collections::HashMap;
use std::sync::Mutex;

use stockledger_core::{LocationId, StoreError};

/// A storage call that can be made to fail.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fault {
    /// `JournalStore::append`.
    JournalAppend,
    /// `AlertStore::create_alert`.
    AlertCreate,
    /// `create_stock` / `update_stock` for records at this location.
    StockWrite(LocationId),
}

#[derive(Debug, Clone, Copy)]
struct Arming {
    skip: u32,
    fail: u32,
}

/// Armed faults, each with a number of calls to let through and then a
/// number of calls to fail.
#[derive(Debug, Default)]
pub struct FaultPlan {
    armed: Mutex<HashMap<Fault, Arming>>,
}

impl FaultPlan {
    /// Fail the next `times` calls.
    pub fn arm(&self, fault: Fault, times: u32) {
        self.arm_after(fault, 0, times);
    }

    /// Let `skip` calls through, then fail the following `times`.
    pub fn arm_after(&self, fault: Fault, skip: u32, times: u32) {
        if let Ok(mut armed) = self.armed.lock() {
            armed.insert(fault, Arming { skip, fail: times });
        }
    }

    pub fn clear(&self) {
        if let Ok(mut armed) = self.armed.lock() {
            armed.clear();
        }
    }

    pub(crate) fn trip(&self, fault: &Fault) -> Result<(), StoreError> {
        let mut armed = self.armed.lock().map_err(|_| StoreError::Poisoned)?;
        let Some(arming) = armed.get_mut(fault) else {
            return Ok(());
        };
        if arming.skip > 0 {
            arming.skip -= 1;
            return Ok(());
        }
        if arming.fail == 0 {
            return Ok(());
        }
        arming.fail -= 1;
        Err(StoreError::Backend(format!("injected fault: {fault:?}")))
    }
}
