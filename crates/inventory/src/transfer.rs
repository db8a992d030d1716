//! Transfer intents: the durable record that makes a two-leg transfer
//! recoverable.
//!
//! A transfer debits the source and credits the destination as two separate
//! committed writes. The intent is written before the first leg and advanced
//! after each step, so a transfer interrupted between legs can be found
//! (`StockLedger::pending_transfers`) and compensated later.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{Actor, DomainError, DomainResult, Entity, ItemId, LocationId, TransferId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferState {
    /// Recorded; nothing moved yet.
    Pending,
    /// The source leg failed; nothing moved.
    Aborted,
    /// Source debited, destination not yet credited.
    SourceDebited,
    /// Both legs committed.
    Completed,
    /// Destination leg failed and the source was credited back.
    Compensated,
    /// Destination leg failed and so did the compensating credit.
    CompensationFailed,
}

impl TransferState {
    /// Whether the intent still needs attention.
    pub fn is_unresolved(self) -> bool {
        matches!(
            self,
            TransferState::Pending | TransferState::SourceDebited | TransferState::CompensationFailed
        )
    }

    /// Whether stock left the source without reaching the destination.
    pub fn needs_compensation(self) -> bool {
        matches!(
            self,
            TransferState::SourceDebited | TransferState::CompensationFailed
        )
    }

    fn can_become(self, next: TransferState) -> bool {
        use TransferState::*;
        matches!(
            (self, next),
            (Pending, Aborted)
                | (Pending, SourceDebited)
                | (SourceDebited, Completed)
                | (SourceDebited, Compensated)
                | (SourceDebited, CompensationFailed)
                | (CompensationFailed, Compensated)
                | (CompensationFailed, Completed)
        )
    }
}

impl core::fmt::Display for TransferState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            TransferState::Pending => "pending",
            TransferState::Aborted => "aborted",
            TransferState::SourceDebited => "source_debited",
            TransferState::Completed => "completed",
            TransferState::Compensated => "compensated",
            TransferState::CompensationFailed => "compensation_failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferIntent {
    pub id: TransferId,
    pub item_id: ItemId,
    pub from_location: LocationId,
    pub to_location: LocationId,
    pub quantity: i64,
    pub reference: String,
    pub state: TransferState,
    /// Last failure seen while executing or compensating.
    pub last_error: Option<String>,
    pub actor: Actor,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TransferIntent {
    pub fn new(
        item_id: ItemId,
        from_location: LocationId,
        to_location: LocationId,
        quantity: i64,
        reference: &str,
        actor: Actor,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: TransferId::new(),
            item_id,
            from_location,
            to_location,
            quantity,
            reference: reference.to_string(),
            state: TransferState::Pending,
            last_error: None,
            actor,
            created_at: now,
            updated_at: now,
        }
    }

    /// Copy of the intent moved to `next`, rejecting illegal transitions.
    pub fn advanced(&self, next: TransferState, error: Option<String>) -> DomainResult<Self> {
        if !self.state.can_become(next) {
            return Err(DomainError::business_rule(
                "transfer_state",
                format!("cannot move transfer from {} to {}", self.state, next),
                self.id.to_string(),
            ));
        }
        Ok(Self {
            state: next,
            last_error: error.or_else(|| self.last_error.clone()),
            updated_at: Utc::now(),
            ..self.clone()
        })
    }

    /// Reference used for the compensating credit back to the source.
    pub fn rollback_reference(&self) -> String {
        rollback_reference(&self.reference)
    }
}

/// Reference of the credit that undoes a transfer's source debit.
pub fn rollback_reference(reference: &str) -> String {
    format!("{reference}_ROLLBACK")
}

impl Entity for TransferIntent {
    type Id = TransferId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
