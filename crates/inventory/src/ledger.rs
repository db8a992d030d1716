//! The stock ledger: every quantity-changing operation.
//!
//! Each operation validates its input, checks the catalog, reads the current
//! record, computes the next one and commits it with a compare-and-swap on the
//! version it read. A lost race surfaces as `DomainError::VersionMismatch`;
//! retrying is the caller's decision.
//!
//! Once the stock write has committed, the journal entry, the notification and
//! any alert are best effort: their failures are logged and the operation still
//! succeeds.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use stockledger_core::{
    Actor, DomainError, DomainResult, ExpectedVersion, ItemId, LocationId, StoreError, TransferId,
    Versioned,
};

use crate::alert::AlertEngine;
use crate::config::InventoryConfig;
use crate::events::{
    ChangeKind, EventPublisher, InventoryEvent, ItemTransferred, StockChanged, publish_quietly,
};
use crate::journal::{Metadata, MovementType, NewJournalEntry, TransactionJournal};
use crate::stock::StockRecord;
use crate::storage::{CatalogStore, StockStore, TransferLog};
use crate::transfer::{self, TransferIntent, TransferState};
use crate::validation;

/// Cost and lot details of a receipt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Receipt {
    pub unit_cost: Option<Decimal>,
    pub lot_number: Option<String>,
    pub expiry_date: Option<DateTime<Utc>>,
}

impl Receipt {
    pub fn costed(unit_cost: Decimal) -> Self {
        Self {
            unit_cost: Some(unit_cost),
            ..Self::default()
        }
    }

    pub fn with_lot(mut self, lot_number: impl Into<String>, expiry: Option<DateTime<Utc>>) -> Self {
        self.lot_number = Some(lot_number.into());
        self.expiry_date = expiry;
        self
    }
}

/// Records left behind by a successful transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    /// Set when a transfer log is configured.
    pub transfer_id: Option<TransferId>,
    pub source: StockRecord,
    pub destination: StockRecord,
}

/// One side of a movement.
struct Leg<'a> {
    item: &'a ItemId,
    location: &'a LocationId,
    quantity: i64,
    reference: &'a str,
    metadata: Metadata,
}

const TRANSFER_ID_KEY: &str = "transfer_id";

fn transfer_tag(intent: Option<&TransferIntent>) -> Metadata {
    let mut metadata = Metadata::new();
    if let Some(intent) = intent {
        metadata.insert(TRANSFER_ID_KEY.to_string(), intent.id.to_string());
    }
    metadata
}

pub struct StockLedger {
    catalog: Arc<dyn CatalogStore>,
    stocks: Arc<dyn StockStore>,
    journal: TransactionJournal,
    alerts: AlertEngine,
    publisher: Option<Arc<dyn EventPublisher>>,
    transfers: Option<Arc<dyn TransferLog>>,
    allow_negative_stock: bool,
    scan_limit: usize,
}

impl StockLedger {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        stocks: Arc<dyn StockStore>,
        journal: TransactionJournal,
        alerts: AlertEngine,
        config: &InventoryConfig,
    ) -> Self {
        Self {
            catalog,
            stocks,
            journal,
            alerts,
            publisher: None,
            transfers: None,
            allow_negative_stock: config.allow_negative_stock,
            scan_limit: config.history_scan_limit,
        }
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Record transfer intents so interrupted transfers can be recovered.
    pub fn with_transfer_log(mut self, log: Arc<dyn TransferLog>) -> Self {
        self.transfers = Some(log);
        self
    }

    /// Receive `quantity` units at `location`.
    pub fn add(
        &self,
        item: &ItemId,
        location: &LocationId,
        quantity: i64,
        reference: &str,
        actor: Actor,
    ) -> DomainResult<StockRecord> {
        self.receive(item, location, quantity, reference, Receipt::default(), actor)
    }

    /// [`add`](Self::add) carrying unit cost and lot details into the journal,
    /// where valuation picks them up as cost layers.
    pub fn receive(
        &self,
        item: &ItemId,
        location: &LocationId,
        quantity: i64,
        reference: &str,
        receipt: Receipt,
        actor: Actor,
    ) -> DomainResult<StockRecord> {
        validation::positive_quantity(quantity)?;
        validation::reference(reference)?;
        if let Some(cost) = receipt.unit_cost {
            validation::unit_cost(cost)?;
        }
        if let Some(number) = &receipt.lot_number {
            validation::lot_number(number)?;
        }
        self.ensure_item(item)?;
        self.ensure_location(location)?;

        let leg = Leg {
            item,
            location,
            quantity,
            reference,
            metadata: Metadata::new(),
        };
        self.credit(leg, receipt, actor)
    }

    /// Ship `quantity` units out of the available stock at `location`.
    pub fn remove(
        &self,
        item: &ItemId,
        location: &LocationId,
        quantity: i64,
        reference: &str,
        actor: Actor,
    ) -> DomainResult<StockRecord> {
        validation::positive_quantity(quantity)?;
        validation::reference(reference)?;
        self.ensure_item(item)?;
        self.ensure_location(location)?;

        let leg = Leg {
            item,
            location,
            quantity,
            reference,
            metadata: Metadata::new(),
        };
        self.debit(leg, actor)
    }

    /// Move stock between locations as a debit followed by a credit.
    ///
    /// If the credit fails, the source is credited back under
    /// `"{reference}_ROLLBACK"` and the credit's error is returned. With a
    /// transfer log configured, each step is recorded on a [`TransferIntent`].
    pub fn transfer(
        &self,
        item: &ItemId,
        from: &LocationId,
        to: &LocationId,
        quantity: i64,
        reference: &str,
        actor: Actor,
    ) -> DomainResult<TransferOutcome> {
        validation::positive_quantity(quantity)?;
        validation::reference(reference)?;
        if from == to {
            return Err(DomainError::validation(
                "to_location",
                "must differ from the source location",
                to,
            ));
        }
        self.ensure_item(item)?;
        self.ensure_location(from)?;
        self.ensure_location(to)?;

        let mut intent = self.open_intent(item, from, to, quantity, reference, actor)?;
        let tag = transfer_tag(intent.as_ref());

        let debit = Leg {
            item,
            location: from,
            quantity,
            reference,
            metadata: tag.clone(),
        };
        let source = match self.debit(debit, actor) {
            Ok(record) => record,
            Err(e) => {
                self.note_transfer(intent.as_mut(), TransferState::Aborted, Some(e.to_string()));
                return Err(e);
            }
        };
        self.note_transfer(intent.as_mut(), TransferState::SourceDebited, None);

        let credit = Leg {
            item,
            location: to,
            quantity,
            reference,
            metadata: tag.clone(),
        };
        let destination = match self.credit(credit, Receipt::default(), actor) {
            Ok(record) => record,
            Err(e) => {
                self.roll_back(intent.as_mut(), item, from, quantity, reference, &e, actor);
                return Err(e);
            }
        };
        self.note_transfer(intent.as_mut(), TransferState::Completed, None);

        let entry = NewJournalEntry::transfer(
            item.clone(),
            from.clone(),
            to.clone(),
            quantity,
            reference,
            actor,
        )
        .with_metadata(tag);
        let transaction_id = entry.id;
        let occurred_at = entry.recorded_at;
        self.journal_quietly(entry);
        publish_quietly(
            self.publisher.as_ref(),
            InventoryEvent::ItemTransferred(ItemTransferred {
                transaction_id,
                item_id: item.clone(),
                from_location: from.clone(),
                to_location: to.clone(),
                quantity,
                reference: reference.to_string(),
                occurred_at,
            }),
            actor,
        );

        tracing::info!(
            item_id = %item,
            from = %from,
            to = %to,
            quantity,
            reference,
            %actor,
            "stock transferred"
        );
        Ok(TransferOutcome {
            transfer_id: intent.map(|i| i.id),
            source,
            destination,
        })
    }

    /// Set the on-hand quantity at `location` to `new_quantity`.
    pub fn adjust(
        &self,
        item: &ItemId,
        location: &LocationId,
        new_quantity: i64,
        reference: &str,
        actor: Actor,
    ) -> DomainResult<StockRecord> {
        validation::quantity_in_range(new_quantity)?;
        validation::reference(reference)?;
        if new_quantity < 0 && !self.allow_negative_stock {
            return Err(DomainError::validation(
                "quantity",
                "negative stock is not allowed",
                new_quantity,
            ));
        }
        self.ensure_item(item)?;
        self.ensure_location(location)?;

        let now = Utc::now();
        let previous = self.load(item, location)?;
        let next = match &previous {
            Some(record) => record.adjusted(new_quantity, actor, now),
            None => StockRecord::open(item.clone(), location.clone(), new_quantity, actor, now),
        };
        self.commit(previous.as_ref(), &next)?;

        let old_quantity = previous.as_ref().map_or(0, StockRecord::quantity);
        let entry = NewJournalEntry::adjustment(
            item.clone(),
            location.clone(),
            new_quantity - old_quantity,
            reference,
            actor,
        );
        self.after_change(entry, ChangeKind::Adjust, old_quantity, &next, actor);

        tracing::info!(
            item_id = %item,
            location_id = %location,
            old_quantity,
            new_quantity,
            reference,
            %actor,
            "stock adjusted"
        );
        Ok(next)
    }

    /// Earmark `quantity` available units.
    pub fn reserve(
        &self,
        item: &ItemId,
        location: &LocationId,
        quantity: i64,
        reference: &str,
        actor: Actor,
    ) -> DomainResult<StockRecord> {
        validation::positive_quantity(quantity)?;
        validation::reference(reference)?;
        self.ensure_item(item)?;
        self.ensure_location(location)?;

        let Some(previous) = self.load(item, location)? else {
            return Err(DomainError::InsufficientStock {
                requested: quantity,
                available: 0,
            });
        };
        let next = previous.reserve(quantity, actor, Utc::now())?;
        self.commit(Some(&previous), &next)?;
        tracing::info!(
            item_id = %item,
            location_id = %location,
            quantity,
            reserved = next.reserved(),
            reference,
            %actor,
            "stock reserved"
        );
        Ok(next)
    }

    pub fn release_reservation(
        &self,
        item: &ItemId,
        location: &LocationId,
        quantity: i64,
        reference: &str,
        actor: Actor,
    ) -> DomainResult<StockRecord> {
        validation::positive_quantity(quantity)?;
        validation::reference(reference)?;
        self.ensure_item(item)?;
        self.ensure_location(location)?;

        let Some(previous) = self.load(item, location)? else {
            return Err(DomainError::InsufficientReservation {
                requested: quantity,
                reserved: 0,
            });
        };
        let next = previous.release(quantity, actor, Utc::now())?;
        self.commit(Some(&previous), &next)?;
        tracing::info!(
            item_id = %item,
            location_id = %location,
            quantity,
            reserved = next.reserved(),
            reference,
            %actor,
            "reservation released"
        );
        Ok(next)
    }

    pub fn get_stock(&self, item: &ItemId, location: &LocationId) -> DomainResult<StockRecord> {
        self.stocks
            .get_stock(item, location)
            .map_err(|e| DomainError::store("get_stock", e))
    }

    /// On-hand quantity of an item across all locations.
    pub fn total_stock(&self, item: &ItemId) -> DomainResult<i64> {
        self.ensure_item(item)?;
        self.stocks
            .total_stock(item)
            .map_err(|e| DomainError::storage("total_stock", e))
    }

    pub fn stock_by_location(&self, location: &LocationId) -> DomainResult<Vec<StockRecord>> {
        self.ensure_location(location)?;
        self.stocks
            .stock_by_location(location)
            .map_err(|e| DomainError::storage("stock_by_location", e))
    }

    /// Transfers that are pending, stranded between legs, or whose
    /// compensation failed. Empty when no transfer log is configured.
    pub fn pending_transfers(&self) -> DomainResult<Vec<TransferIntent>> {
        match &self.transfers {
            Some(log) => log
                .unresolved()
                .map_err(|e| DomainError::storage("unresolved_transfers", e)),
            None => Ok(Vec::new()),
        }
    }

    /// Drive an unresolved transfer to a terminal state.
    ///
    /// The journal decides what actually happened: a transfer whose source
    /// debit never landed is aborted, one whose destination credit landed is
    /// completed, and anything stranded in between is compensated by crediting
    /// the source back.
    pub fn recover_transfer(&self, id: &TransferId, actor: Actor) -> DomainResult<TransferIntent> {
        let log = self.transfers.as_ref().ok_or_else(|| {
            DomainError::business_rule("transfer_log", "no transfer log configured", id.to_string())
        })?;
        let mut intent = log
            .get(id)
            .map_err(|e| DomainError::store("get_transfer", e))?;

        if intent.state == TransferState::Pending {
            let debited =
                self.leg_recorded(&intent.from_location, MovementType::Outbound, &intent.id)?;
            if !debited {
                self.transition(&mut intent, TransferState::Aborted, None)?;
                tracing::info!(transfer_id = %id, "transfer aborted during recovery");
                return Ok(intent);
            }
            self.transition(&mut intent, TransferState::SourceDebited, None)?;
        }

        if intent.state == TransferState::SourceDebited
            && self.leg_recorded(&intent.to_location, MovementType::Inbound, &intent.id)?
        {
            self.transition(&mut intent, TransferState::Completed, None)?;
            tracing::info!(transfer_id = %id, "transfer completed during recovery");
            return Ok(intent);
        }

        if !intent.state.needs_compensation() {
            return Err(DomainError::business_rule(
                "transfer_state",
                format!("transfer is already {}", intent.state),
                id.to_string(),
            ));
        }

        let rollback_reference = intent.rollback_reference();
        let leg = Leg {
            item: &intent.item_id,
            location: &intent.from_location,
            quantity: intent.quantity,
            reference: &rollback_reference,
            metadata: transfer_tag(Some(&intent)),
        };
        match self.credit(leg, Receipt::default(), actor) {
            Ok(_) => {
                self.transition(&mut intent, TransferState::Compensated, None)?;
                tracing::warn!(transfer_id = %id, "transfer compensated during recovery");
                Ok(intent)
            }
            Err(e) => {
                if let Err(log_error) = self.transition(
                    &mut intent,
                    TransferState::CompensationFailed,
                    Some(e.to_string()),
                ) {
                    tracing::error!(%log_error, transfer_id = %id, "failed to record transfer state");
                }
                Err(e)
            }
        }
    }

    fn credit(&self, leg: Leg<'_>, receipt: Receipt, actor: Actor) -> DomainResult<StockRecord> {
        let now = Utc::now();
        let previous = self.load(leg.item, leg.location)?;
        let next = match &previous {
            Some(record) => record.credited(leg.quantity, actor, now)?,
            None => StockRecord::open(leg.item.clone(), leg.location.clone(), leg.quantity, actor, now),
        };
        self.commit(previous.as_ref(), &next)?;

        let old_quantity = previous.as_ref().map_or(0, StockRecord::quantity);
        let entry = NewJournalEntry::inbound(
            leg.item.clone(),
            leg.location.clone(),
            leg.quantity,
            leg.reference,
            actor,
        )
        .with_unit_cost(receipt.unit_cost)
        .with_lot(receipt.lot_number, receipt.expiry_date)
        .with_metadata(leg.metadata);
        self.after_change(entry, ChangeKind::Add, old_quantity, &next, actor);

        tracing::info!(
            item_id = %leg.item,
            location_id = %leg.location,
            quantity = leg.quantity,
            new_quantity = next.quantity(),
            reference = leg.reference,
            %actor,
            "stock added"
        );
        Ok(next)
    }

    fn debit(&self, leg: Leg<'_>, actor: Actor) -> DomainResult<StockRecord> {
        let Some(previous) = self.load(leg.item, leg.location)? else {
            return Err(DomainError::InsufficientStock {
                requested: leg.quantity,
                available: 0,
            });
        };
        let next = previous.debited(leg.quantity, self.allow_negative_stock, actor, Utc::now())?;
        self.commit(Some(&previous), &next)?;

        let entry = NewJournalEntry::outbound(
            leg.item.clone(),
            leg.location.clone(),
            leg.quantity,
            leg.reference,
            actor,
        )
        .with_metadata(leg.metadata);
        self.after_change(entry, ChangeKind::Remove, previous.quantity(), &next, actor);
        self.alerts.check_low_stock(&next, actor);

        tracing::info!(
            item_id = %leg.item,
            location_id = %leg.location,
            quantity = leg.quantity,
            new_quantity = next.quantity(),
            reference = leg.reference,
            %actor,
            "stock removed"
        );
        Ok(next)
    }

    /// Journal and publish a committed change; failures are only logged.
    fn after_change(
        &self,
        entry: NewJournalEntry,
        change: ChangeKind,
        old_quantity: i64,
        next: &StockRecord,
        actor: Actor,
    ) {
        let event = StockChanged {
            transaction_id: entry.id,
            item_id: entry.item_id.clone(),
            location_id: next.location_id().clone(),
            change,
            old_quantity,
            new_quantity: next.quantity(),
            reference: entry.reference.clone(),
            occurred_at: entry.recorded_at,
        };
        self.journal_quietly(entry);
        publish_quietly(
            self.publisher.as_ref(),
            InventoryEvent::StockChanged(event),
            actor,
        );
    }

    fn journal_quietly(&self, entry: NewJournalEntry) {
        let transaction_id = entry.id;
        let item_id = entry.item_id.clone();
        let movement = entry.movement;
        if let Err(error) = self.journal.record(entry) {
            tracing::error!(
                %error,
                %transaction_id,
                %item_id,
                %movement,
                "failed to record journal entry"
            );
        }
    }

    fn load(&self, item: &ItemId, location: &LocationId) -> DomainResult<Option<StockRecord>> {
        match self.stocks.get_stock(item, location) {
            Ok(record) => Ok(Some(record)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(DomainError::storage("get_stock", e)),
        }
    }

    /// Write `next`, conditional on the store still holding `previous`.
    fn commit(&self, previous: Option<&StockRecord>, next: &StockRecord) -> DomainResult<()> {
        let (operation, result) = match previous {
            None => ("create_stock", self.stocks.create_stock(next)),
            Some(prev) => (
                "update_stock",
                self.stocks
                    .update_stock(next, ExpectedVersion::Exact(prev.version())),
            ),
        };
        result.map_err(|e| match e {
            // Someone else created the record between our read and write.
            StoreError::Duplicate(_) => DomainError::VersionMismatch {
                resource: next.describe(),
                expected: 0,
            },
            StoreError::VersionMismatch { expected, .. } => DomainError::VersionMismatch {
                resource: next.describe(),
                expected,
            },
            other => DomainError::storage(operation, other),
        })
    }

    fn ensure_item(&self, item: &ItemId) -> DomainResult<()> {
        self.catalog
            .get_item(item)
            .map(|_| ())
            .map_err(|e| DomainError::store("get_item", e))
    }

    fn ensure_location(&self, location: &LocationId) -> DomainResult<()> {
        self.catalog
            .get_location(location)
            .map(|_| ())
            .map_err(|e| DomainError::store("get_location", e))
    }

    fn open_intent(
        &self,
        item: &ItemId,
        from: &LocationId,
        to: &LocationId,
        quantity: i64,
        reference: &str,
        actor: Actor,
    ) -> DomainResult<Option<TransferIntent>> {
        let Some(log) = &self.transfers else {
            return Ok(None);
        };
        let intent = TransferIntent::new(
            item.clone(),
            from.clone(),
            to.clone(),
            quantity,
            reference,
            actor,
        );
        log.record(&intent)
            .map_err(|e| DomainError::storage("record_transfer_intent", e))?;
        Ok(Some(intent))
    }

    fn transition(
        &self,
        intent: &mut TransferIntent,
        next: TransferState,
        error: Option<String>,
    ) -> DomainResult<()> {
        let Some(log) = &self.transfers else {
            return Ok(());
        };
        let advanced = intent.advanced(next, error)?;
        log.transition(&advanced, intent.state)
            .map_err(|e| DomainError::store("transition_transfer", e))?;
        *intent = advanced;
        Ok(())
    }

    /// Best-effort variant of [`transition`](Self::transition) used while a
    /// transfer is in flight.
    fn note_transfer(
        &self,
        intent: Option<&mut TransferIntent>,
        next: TransferState,
        error: Option<String>,
    ) {
        let Some(intent) = intent else {
            return;
        };
        if let Err(log_error) = self.transition(intent, next, error) {
            tracing::error!(
                %log_error,
                transfer_id = %intent.id,
                state = %next,
                "failed to record transfer state"
            );
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn roll_back(
        &self,
        intent: Option<&mut TransferIntent>,
        item: &ItemId,
        from: &LocationId,
        quantity: i64,
        reference: &str,
        cause: &DomainError,
        actor: Actor,
    ) {
        let rollback_reference = match intent.as_deref() {
            Some(intent) => intent.rollback_reference(),
            None => transfer::rollback_reference(reference),
        };
        let leg = Leg {
            item,
            location: from,
            quantity,
            reference: &rollback_reference,
            metadata: transfer_tag(intent.as_deref()),
        };
        match self.credit(leg, Receipt::default(), actor) {
            Ok(_) => {
                tracing::warn!(
                    %cause,
                    item_id = %item,
                    from = %from,
                    quantity,
                    reference,
                    "transfer credit failed; source restored"
                );
                self.note_transfer(intent, TransferState::Compensated, Some(cause.to_string()));
            }
            Err(rollback_error) => {
                tracing::error!(
                    %rollback_error,
                    %cause,
                    item_id = %item,
                    from = %from,
                    quantity,
                    reference,
                    "transfer rollback failed; source left debited"
                );
                self.note_transfer(
                    intent,
                    TransferState::CompensationFailed,
                    Some(rollback_error.to_string()),
                );
            }
        }
    }

    /// Whether the journal holds the given leg of a transfer.
    fn leg_recorded(
        &self,
        location: &LocationId,
        movement: MovementType,
        transfer: &TransferId,
    ) -> DomainResult<bool> {
        let entries = self.journal.scan_tagged(TRANSFER_ID_KEY, &transfer.to_string())?;
        Ok(entries
            .iter()
            .any(|e| e.movement == movement && e.involves(location)))
    }
}

impl core::fmt::Debug for StockLedger {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StockLedger")
            .field("allow_negative_stock", &self.allow_negative_stock)
            .field("publisher", &self.publisher.is_some())
            .field("transfer_log", &self.transfers.is_some())
            .finish()
    }
}
