//! Integration tests for the inventory services over the in-memory backends.
//!
//! Covers: ledger operations and their journal/alert/event side effects,
//! optimistic concurrency under contention, transfer compensation and
//! recovery, batch execution, lots, valuation, ABC classification, analytics
//! and catalog management.

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::thread;

    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use stockledger_core::{
        Actor, BatchId, DomainError, EntityKind, ExpectedVersion, ItemId, LocationId, LotId,
        StoreError, TransferId, UserId, Versioned,
    };
    use stockledger_events::{EventBus, EventEnvelope, Subscription};
    use stockledger_inventory::{
        AbcClass, AlertKind, BatchStatus, EventPublisher, InventoryConfig, InventoryEvent,
        InventoryOperation, Item, Location, Lot, LotMovement, Metadata, MovementType,
        NewJournalEntry, PublishError, Receipt, ReportType, StockLedger, StockRecord, StockStore,
        StorageHealth, TransferIntent, TransferLog, TransferState, ValuationMethod,
    };

    use crate::services::InventoryServices;
    use crate::store::{Fault, InMemoryStore};

    fn item(code: &str) -> ItemId {
        ItemId::parse(code).unwrap()
    }

    fn loc(code: &str) -> LocationId {
        LocationId::parse(code).unwrap()
    }

    fn clerk() -> Actor {
        Actor::user(UserId::new())
    }

    fn seed(s: &InventoryServices) {
        s.catalog
            .create_item(Item::new(item("A"), "Widget").with_unit_cost(dec!(12.50)))
            .unwrap();
        s.catalog
            .create_item(Item::new(item("B"), "Gadget").with_unit_cost(dec!(5.00)))
            .unwrap();
        s.catalog.create_item(Item::new(item("C"), "Sprocket")).unwrap();
        for (code, kind) in [("L1", "warehouse"), ("L2", "store"), ("L3", "warehouse")] {
            s.catalog
                .create_location(Location::new(loc(code), format!("Site {code}"), kind))
                .unwrap();
        }
    }

    fn setup_with(config: InventoryConfig) -> InventoryServices {
        let s = InventoryServices::in_memory(config);
        seed(&s);
        s
    }

    fn setup() -> InventoryServices {
        setup_with(InventoryConfig::default())
    }

    fn drain_events(sub: &Subscription<EventEnvelope<InventoryEvent>>) -> Vec<InventoryEvent> {
        sub.drain().into_iter().map(|e| e.into_payload()).collect()
    }

    /// Transfer id stamped on the outbound leg of the most recent transfer.
    fn last_transfer_id(s: &InventoryServices, item_id: &ItemId) -> TransferId {
        s.journal
            .history_by_item(item_id, 0)
            .unwrap()
            .into_iter()
            .find(|e| e.movement == MovementType::Outbound && e.metadata.contains_key("transfer_id"))
            .map(|e| e.metadata["transfer_id"].parse().unwrap())
            .unwrap()
    }

    struct FailingPublisher;

    impl EventPublisher for FailingPublisher {
        fn publish(&self, _event: InventoryEvent, _actor: Actor) -> Result<(), PublishError> {
            Err(PublishError::Unavailable("broker down".into()))
        }
    }

    // ---------------------------------------------------------------------
    // Add / Remove
    // ---------------------------------------------------------------------

    #[test]
    fn add_creates_then_increments_record() {
        let s = setup();
        let actor = clerk();

        let first = s.ledger.add(&item("A"), &loc("L1"), 10, "PO-1", actor).unwrap();
        assert_eq!(first.quantity(), 10);
        assert_eq!(first.version(), 1);
        assert_eq!(first.updated_by(), actor);

        let second = s.ledger.add(&item("A"), &loc("L1"), 5, "PO-2", actor).unwrap();
        assert_eq!(second.quantity(), 15);
        assert_eq!(second.available(), 15);
        assert_eq!(second.version(), 2);

        let history = s.journal.history_by_item(&item("A"), 0).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].reference, "PO-2");
        assert_eq!(history[0].movement, MovementType::Inbound);
        assert_eq!(history[0].to_location, Some(loc("L1")));
        assert_eq!(history[0].recorded_by, actor);
        assert!(history[0].sequence > history[1].sequence);
    }

    #[test]
    fn add_rejects_bad_input_without_touching_state() {
        let s = setup();

        assert!(matches!(
            s.ledger.add(&item("A"), &loc("L1"), 0, "PO", Actor::System),
            Err(DomainError::Validation { .. })
        ));
        assert_eq!(
            s.ledger.add(&item("ZZZ"), &loc("L1"), 1, "PO", Actor::System),
            Err(DomainError::NotFound(EntityKind::Item))
        );
        assert_eq!(
            s.ledger.add(&item("A"), &loc("NOPE"), 1, "PO", Actor::System),
            Err(DomainError::NotFound(EntityKind::Location))
        );
        assert!(matches!(
            s.ledger
                .add(&item("A"), &loc("L1"), 1, &"x".repeat(501), Actor::System),
            Err(DomainError::Validation { .. })
        ));

        assert_eq!(
            s.ledger.get_stock(&item("A"), &loc("L1")),
            Err(DomainError::NotFound(EntityKind::Stock))
        );
        assert!(s.journal.history_by_item(&item("A"), 0).unwrap().is_empty());
    }

    #[test]
    fn remove_requires_available_stock() {
        let s = setup();

        assert_eq!(
            s.ledger.remove(&item("A"), &loc("L1"), 3, "SO-1", Actor::System),
            Err(DomainError::InsufficientStock {
                requested: 3,
                available: 0
            })
        );

        s.ledger.add(&item("A"), &loc("L1"), 5, "PO-1", Actor::System).unwrap();
        assert_eq!(
            s.ledger.remove(&item("A"), &loc("L1"), 6, "SO-1", Actor::System),
            Err(DomainError::InsufficientStock {
                requested: 6,
                available: 5
            })
        );

        let unchanged = s.ledger.get_stock(&item("A"), &loc("L1")).unwrap();
        assert_eq!(unchanged.version(), 1);
        assert_eq!(unchanged.quantity(), 5);

        let emptied = s.ledger.remove(&item("A"), &loc("L1"), 5, "SO-2", Actor::System).unwrap();
        assert_eq!(emptied.quantity(), 0);

        let history = s.journal.history_by_item(&item("A"), 0).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].movement, MovementType::Outbound);
        assert_eq!(history[0].from_location, Some(loc("L1")));
    }

    #[test]
    fn removal_at_or_below_threshold_raises_low_stock_alert() {
        let s = setup();
        let sub = s.bus.subscribe();

        s.ledger.add(&item("A"), &loc("L1"), 20, "PO", Actor::System).unwrap();
        s.ledger.remove(&item("A"), &loc("L1"), 5, "SO-1", Actor::System).unwrap();
        assert!(s.alerts.active_alerts(Some(&loc("L1"))).unwrap().is_empty());

        s.ledger.remove(&item("A"), &loc("L1"), 5, "SO-2", Actor::System).unwrap();
        let alerts = s.alerts.active_alerts(Some(&loc("L1"))).unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::LowStock);
        assert_eq!(alerts[0].current_quantity, 10);
        assert_eq!(alerts[0].threshold, 10);
        assert!(alerts[0].message.contains("10"));
        assert!(s.alerts.active_alerts(Some(&loc("L2"))).unwrap().is_empty());

        let events = drain_events(&sub);
        let kinds: Vec<&str> = events
            .iter()
            .map(|e| match e {
                InventoryEvent::StockChanged(_) => "changed",
                InventoryEvent::LowStockAlert(_) => "alert",
                InventoryEvent::ItemTransferred(_) => "transferred",
            })
            .collect();
        assert_eq!(kinds, vec!["changed", "changed", "changed", "alert"]);
    }

    #[test]
    fn published_envelopes_carry_actor_and_subject() {
        let s = setup();
        let sub = s.bus.subscribe();
        let actor = clerk();

        s.ledger.add(&item("A"), &loc("L1"), 3, "PO", actor).unwrap();

        let envelopes = sub.drain();
        assert_eq!(envelopes.len(), 1);
        assert_eq!(envelopes[0].actor(), actor);
        assert_eq!(envelopes[0].event_type(), "inventory.stock.changed");
        assert_eq!(envelopes[0].subject(), "stock/A/L1");
        match envelopes[0].payload() {
            InventoryEvent::StockChanged(e) => {
                assert_eq!((e.old_quantity, e.new_quantity), (0, 3));
                assert_eq!(e.reference, "PO");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    // ---------------------------------------------------------------------
    // Adjust / Reserve / Release
    // ---------------------------------------------------------------------

    #[test]
    fn adjust_sets_quantity_and_journals_delta() {
        let s = setup();
        s.ledger.add(&item("A"), &loc("L1"), 10, "PO", Actor::System).unwrap();

        let adjusted = s.ledger.adjust(&item("A"), &loc("L1"), 7, "COUNT-1", Actor::System).unwrap();
        assert_eq!(adjusted.quantity(), 7);
        assert_eq!(adjusted.version(), 2);

        let latest = &s.journal.history_by_item(&item("A"), 1).unwrap()[0];
        assert_eq!(latest.movement, MovementType::Adjustment);
        assert_eq!(latest.quantity, -3);

        assert!(matches!(
            s.ledger.adjust(&item("A"), &loc("L1"), -1, "COUNT-2", Actor::System),
            Err(DomainError::Validation { .. })
        ));

        let fresh = s.ledger.adjust(&item("B"), &loc("L2"), 4, "COUNT-3", Actor::System).unwrap();
        assert_eq!(fresh.version(), 1);
    }

    #[test]
    fn negative_adjustment_allowed_by_policy() {
        let s = setup_with(InventoryConfig {
            allow_negative_stock: true,
            ..InventoryConfig::default()
        });
        let r = s.ledger.adjust(&item("A"), &loc("L1"), -5, "WRITE-OFF", Actor::System).unwrap();
        assert_eq!(r.quantity(), -5);
        assert_eq!(r.available(), -5);
    }

    #[test]
    fn reservations_limit_removals() {
        let s = setup();

        assert_eq!(
            s.ledger.reserve(&item("A"), &loc("L1"), 1, "RES-1", Actor::System),
            Err(DomainError::InsufficientStock {
                requested: 1,
                available: 0
            })
        );
        assert_eq!(
            s.ledger.release_reservation(&item("A"), &loc("L1"), 1, "REL-1", Actor::System),
            Err(DomainError::InsufficientReservation {
                requested: 1,
                reserved: 0
            })
        );

        s.ledger.add(&item("A"), &loc("L1"), 10, "PO", Actor::System).unwrap();
        let r = s.ledger.reserve(&item("A"), &loc("L1"), 4, "RES-4", Actor::System).unwrap();
        assert_eq!((r.quantity(), r.reserved(), r.available()), (10, 4, 6));

        assert_eq!(
            s.ledger.reserve(&item("A"), &loc("L1"), 7, "RES-7", Actor::System),
            Err(DomainError::InsufficientStock {
                requested: 7,
                available: 6
            })
        );
        assert_eq!(
            s.ledger.remove(&item("A"), &loc("L1"), 7, "SO", Actor::System),
            Err(DomainError::InsufficientStock {
                requested: 7,
                available: 6
            })
        );
        assert_eq!(
            s.ledger.release_reservation(&item("A"), &loc("L1"), 5, "REL-5", Actor::System),
            Err(DomainError::InsufficientReservation {
                requested: 5,
                reserved: 4
            })
        );

        let r = s.ledger.release_reservation(&item("A"), &loc("L1"), 4, "REL-4", Actor::System).unwrap();
        assert_eq!((r.reserved(), r.available()), (0, 10));
        assert_eq!(r.version(), 3);

        // Reservations are not movements.
        assert_eq!(s.journal.history_by_item(&item("A"), 0).unwrap().len(), 1);
    }

    #[test]
    fn reserved_stock_is_not_shippable() {
        let s = setup();

        let r = s.ledger.add(&item("A"), &loc("L1"), 100, "ref1", Actor::System).unwrap();
        assert_eq!((r.quantity(), r.version()), (100, 1));

        let r = s.ledger.reserve(&item("A"), &loc("L1"), 30, "res1", Actor::System).unwrap();
        assert_eq!((r.reserved(), r.available()), (30, 70));

        let r = s.ledger.remove(&item("A"), &loc("L1"), 50, "ship1", Actor::System).unwrap();
        assert_eq!((r.quantity(), r.reserved(), r.available()), (50, 30, 20));

        let before = s.ledger.get_stock(&item("A"), &loc("L1")).unwrap();
        assert_eq!(
            s.ledger.remove(&item("A"), &loc("L1"), 30, "ship2", Actor::System),
            Err(DomainError::InsufficientStock {
                requested: 30,
                available: 20
            })
        );
        assert_eq!(s.ledger.get_stock(&item("A"), &loc("L1")).unwrap(), before);
    }

    // ---------------------------------------------------------------------
    // Transfers
    // ---------------------------------------------------------------------

    #[test]
    fn transfer_moves_stock_and_records_every_leg() {
        let s = setup();
        let sub = s.bus.subscribe();
        s.ledger.add(&item("A"), &loc("L1"), 10, "PO", Actor::System).unwrap();

        let outcome = s
            .ledger
            .transfer(&item("A"), &loc("L1"), &loc("L2"), 4, "T-1", Actor::System)
            .unwrap();
        assert_eq!(outcome.source.quantity(), 6);
        assert_eq!(outcome.destination.quantity(), 4);

        let id = outcome.transfer_id.unwrap();
        assert_eq!(s.transfers.get(&id).unwrap().state, TransferState::Completed);
        assert!(s.ledger.pending_transfers().unwrap().is_empty());

        let movements: Vec<MovementType> = s
            .journal
            .history_by_item(&item("A"), 0)
            .unwrap()
            .iter()
            .map(|e| e.movement)
            .collect();
        assert_eq!(
            movements,
            vec![
                MovementType::Transfer,
                MovementType::Inbound,
                MovementType::Outbound,
                MovementType::Inbound
            ]
        );
        assert_eq!(s.journal.history_by_location(&loc("L2"), 0).unwrap().len(), 2);
        assert_eq!(s.ledger.total_stock(&item("A")).unwrap(), 10);

        assert!(drain_events(&sub).iter().any(|e| matches!(
            e,
            InventoryEvent::ItemTransferred(t) if t.quantity == 4 && t.to_location == loc("L2")
        )));
    }

    #[test]
    fn transfer_rejects_same_or_unknown_location() {
        let s = setup();
        s.ledger.add(&item("A"), &loc("L1"), 10, "PO", Actor::System).unwrap();

        assert!(matches!(
            s.ledger.transfer(&item("A"), &loc("L1"), &loc("L1"), 1, "T", Actor::System),
            Err(DomainError::Validation { .. })
        ));
        assert_eq!(
            s.ledger
                .transfer(&item("A"), &loc("L1"), &loc("NOPE"), 1, "T", Actor::System)
                .unwrap_err(),
            DomainError::NotFound(EntityKind::Location)
        );
        assert_eq!(s.ledger.get_stock(&item("A"), &loc("L1")).unwrap().quantity(), 10);
    }

    #[test]
    fn failed_source_leg_aborts_transfer() {
        let s = setup();
        s.ledger.add(&item("A"), &loc("L1"), 2, "PO", Actor::System).unwrap();

        let err = s
            .ledger
            .transfer(&item("A"), &loc("L1"), &loc("L2"), 5, "T-1", Actor::System)
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientStock {
                requested: 5,
                available: 2
            }
        );
        assert!(s.ledger.pending_transfers().unwrap().is_empty());
    }

    #[test]
    fn failed_destination_leg_is_compensated() {
        let s = setup();
        s.ledger.add(&item("A"), &loc("L1"), 10, "PO", Actor::System).unwrap();
        s.store.faults().arm(Fault::StockWrite(loc("L2")), 1);

        let err = s
            .ledger
            .transfer(&item("A"), &loc("L1"), &loc("L2"), 4, "T-1", Actor::System)
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Storage {
                source: StoreError::Backend(_),
                ..
            }
        ));

        let source = s.ledger.get_stock(&item("A"), &loc("L1")).unwrap();
        assert_eq!(source.quantity(), 10);
        assert_eq!(source.version(), 3);
        assert_eq!(
            s.ledger.get_stock(&item("A"), &loc("L2")),
            Err(DomainError::NotFound(EntityKind::Stock))
        );

        let history = s.journal.history_by_item(&item("A"), 0).unwrap();
        assert_eq!(history[0].reference, "T-1_ROLLBACK");
        assert!(!history.iter().any(|e| e.movement == MovementType::Transfer));

        let id = last_transfer_id(&s, &item("A"));
        let intent = s.transfers.get(&id).unwrap();
        assert_eq!(intent.state, TransferState::Compensated);
        assert!(intent.last_error.is_some());
    }

    #[test]
    fn failed_compensation_is_left_for_recovery() {
        let s = setup();
        s.ledger.add(&item("A"), &loc("L1"), 10, "PO", Actor::System).unwrap();
        s.store.faults().arm(Fault::StockWrite(loc("L2")), 1);
        // Let the debit through, fail the compensating credit.
        s.store.faults().arm_after(Fault::StockWrite(loc("L1")), 1, 1);

        assert!(s
            .ledger
            .transfer(&item("A"), &loc("L1"), &loc("L2"), 4, "T-1", Actor::System)
            .is_err());
        assert_eq!(s.ledger.get_stock(&item("A"), &loc("L1")).unwrap().quantity(), 6);

        let pending = s.ledger.pending_transfers().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].state, TransferState::CompensationFailed);

        let recovered = s.ledger.recover_transfer(&pending[0].id, Actor::System).unwrap();
        assert_eq!(recovered.state, TransferState::Compensated);
        assert_eq!(s.ledger.get_stock(&item("A"), &loc("L1")).unwrap().quantity(), 10);
        assert!(s.ledger.pending_transfers().unwrap().is_empty());

        assert!(matches!(
            s.ledger.recover_transfer(&pending[0].id, Actor::System),
            Err(DomainError::BusinessRule { .. })
        ));
    }

    #[test]
    fn recovery_reads_the_journal_to_decide() {
        let s = setup();
        s.ledger.add(&item("A"), &loc("L1"), 10, "PO", Actor::System).unwrap();

        // Interrupted before anything moved.
        let untouched = TransferIntent::new(item("A"), loc("L1"), loc("L2"), 3, "T-1", Actor::System);
        s.transfers.record(&untouched).unwrap();
        let aborted = s.ledger.recover_transfer(&untouched.id, Actor::System).unwrap();
        assert_eq!(aborted.state, TransferState::Aborted);
        assert_eq!(s.ledger.get_stock(&item("A"), &loc("L1")).unwrap().quantity(), 10);

        // Interrupted between the legs.
        let stranded = TransferIntent::new(item("A"), loc("L1"), loc("L2"), 3, "T-2", Actor::System);
        s.transfers.record(&stranded).unwrap();
        s.ledger.remove(&item("A"), &loc("L1"), 3, "T-2", Actor::System).unwrap();
        let mut tag = Metadata::new();
        tag.insert("transfer_id".into(), stranded.id.to_string());
        s.journal
            .record(
                NewJournalEntry::outbound(item("A"), loc("L1"), 3, "T-2", Actor::System)
                    .with_metadata(tag),
            )
            .unwrap();

        let compensated = s.ledger.recover_transfer(&stranded.id, Actor::System).unwrap();
        assert_eq!(compensated.state, TransferState::Compensated);
        assert_eq!(s.ledger.get_stock(&item("A"), &loc("L1")).unwrap().quantity(), 10);

        assert_eq!(
            s.ledger.recover_transfer(&TransferId::new(), Actor::System),
            Err(DomainError::NotFound(EntityKind::Transfer))
        );
    }

    fn tagged(entry: NewJournalEntry, intent: &TransferIntent) -> NewJournalEntry {
        let mut tag = Metadata::new();
        tag.insert("transfer_id".into(), intent.id.to_string());
        entry.with_metadata(tag)
    }

    #[test]
    fn recovery_finds_legs_buried_under_later_movements() {
        let s = setup_with(InventoryConfig {
            history_scan_limit: 5,
            ..InventoryConfig::default()
        });
        s.ledger.add(&item("A"), &loc("L1"), 10, "PO", Actor::System).unwrap();

        // Debited, then the source kept trading past the scan window.
        let stranded = TransferIntent::new(item("A"), loc("L1"), loc("L2"), 3, "T-1", Actor::System);
        s.transfers.record(&stranded).unwrap();
        s.ledger.remove(&item("A"), &loc("L1"), 3, "T-1", Actor::System).unwrap();
        s.journal
            .record(tagged(
                NewJournalEntry::outbound(item("A"), loc("L1"), 3, "T-1", Actor::System),
                &stranded,
            ))
            .unwrap();
        for n in 0..8 {
            s.ledger
                .add(&item("A"), &loc("L1"), 1, &format!("PO-{n}"), Actor::System)
                .unwrap();
        }

        let compensated = s.ledger.recover_transfer(&stranded.id, Actor::System).unwrap();
        assert_eq!(compensated.state, TransferState::Compensated);
        assert_eq!(s.ledger.get_stock(&item("A"), &loc("L1")).unwrap().quantity(), 18);

        // Both legs landed, then the destination kept trading.
        let finished = TransferIntent::new(item("A"), loc("L1"), loc("L2"), 2, "T-2", Actor::System);
        s.transfers.record(&finished).unwrap();
        s.journal
            .record(tagged(
                NewJournalEntry::outbound(item("A"), loc("L1"), 2, "T-2", Actor::System),
                &finished,
            ))
            .unwrap();
        s.journal
            .record(tagged(
                NewJournalEntry::inbound(item("A"), loc("L2"), 2, "T-2", Actor::System),
                &finished,
            ))
            .unwrap();
        for n in 0..8 {
            s.ledger
                .add(&item("A"), &loc("L2"), 1, &format!("PO-L2-{n}"), Actor::System)
                .unwrap();
        }

        let completed = s.ledger.recover_transfer(&finished.id, Actor::System).unwrap();
        assert_eq!(completed.state, TransferState::Completed);
        assert!(s.ledger.pending_transfers().unwrap().is_empty());
    }

    // ---------------------------------------------------------------------
    // Swallowed secondary failures
    // ---------------------------------------------------------------------

    #[test]
    fn journal_failure_does_not_fail_the_mutation() {
        let s = setup();
        s.store.faults().arm(Fault::JournalAppend, 1);

        let r = s.ledger.add(&item("A"), &loc("L1"), 10, "PO-1", Actor::System).unwrap();
        assert_eq!(r.quantity(), 10);
        assert!(s.journal.history_by_item(&item("A"), 0).unwrap().is_empty());

        s.ledger.add(&item("A"), &loc("L1"), 1, "PO-2", Actor::System).unwrap();
        assert_eq!(s.journal.history_by_item(&item("A"), 0).unwrap().len(), 1);
    }

    #[test]
    fn alert_failure_does_not_fail_the_removal() {
        let s = setup();
        s.ledger.add(&item("A"), &loc("L1"), 5, "PO", Actor::System).unwrap();
        s.store.faults().arm(Fault::AlertCreate, 1);

        let r = s.ledger.remove(&item("A"), &loc("L1"), 1, "SO", Actor::System).unwrap();
        assert_eq!(r.quantity(), 4);
        assert!(s.alerts.active_alerts(None).unwrap().is_empty());
    }

    #[test]
    fn publish_failure_does_not_fail_the_mutation() {
        let s = InventoryServices::in_memory_with_publisher(
            InventoryConfig::default(),
            Arc::new(FailingPublisher),
        );
        seed(&s);

        s.ledger.add(&item("A"), &loc("L1"), 5, "PO", Actor::System).unwrap();
        let r = s.ledger.remove(&item("A"), &loc("L1"), 1, "SO", Actor::System).unwrap();
        assert_eq!(r.quantity(), 4);
        // The alert is stored even though its notification was lost.
        assert_eq!(s.alerts.active_alerts(None).unwrap().len(), 1);
        assert_eq!(s.journal.history_by_item(&item("A"), 0).unwrap().len(), 2);
    }

    // ---------------------------------------------------------------------
    // Optimistic concurrency
    // ---------------------------------------------------------------------

    /// Stock store that runs a rival write right after a read, so the
    /// caller's following conditional write sees a moved record.
    struct RivalWrites {
        inner: Arc<InMemoryStore>,
        rival: Mutex<Option<Box<dyn FnOnce() + Send>>>,
    }

    impl RivalWrites {
        fn new(inner: Arc<InMemoryStore>) -> Self {
            Self {
                inner,
                rival: Mutex::new(None),
            }
        }

        fn arm(&self, rival: impl FnOnce() + Send + 'static) {
            *self.rival.lock().unwrap() = Some(Box::new(rival));
        }
    }

    impl StockStore for RivalWrites {
        fn create_stock(&self, record: &StockRecord) -> Result<(), StoreError> {
            self.inner.create_stock(record)
        }

        fn get_stock(&self, item: &ItemId, location: &LocationId) -> Result<StockRecord, StoreError> {
            let read = self.inner.get_stock(item, location);
            let rival = self.rival.lock().unwrap().take();
            if let Some(rival) = rival {
                rival();
            }
            read
        }

        fn update_stock(
            &self,
            record: &StockRecord,
            expected: ExpectedVersion,
        ) -> Result<(), StoreError> {
            self.inner.update_stock(record, expected)
        }

        fn stock_by_location(&self, location: &LocationId) -> Result<Vec<StockRecord>, StoreError> {
            self.inner.stock_by_location(location)
        }

        fn stock_by_item(&self, item: &ItemId) -> Result<Vec<StockRecord>, StoreError> {
            self.inner.stock_by_item(item)
        }
    }

    fn racing_ledger(s: &InventoryServices) -> (StockLedger, Arc<RivalWrites>) {
        let stocks = Arc::new(RivalWrites::new(s.store.clone()));
        let ledger = StockLedger::new(
            s.store.clone(),
            stocks.clone(),
            s.journal.clone(),
            s.alerts.clone(),
            &s.config,
        );
        (ledger, stocks)
    }

    #[test]
    fn losing_the_create_race_is_a_version_mismatch() {
        let s = setup();
        let (racing, stocks) = racing_ledger(&s);
        let rival = s.ledger.clone();
        stocks.arm(move || {
            rival
                .add(&item("A"), &loc("L1"), 7, "PO-WINNER", Actor::System)
                .unwrap();
        });

        let err = racing
            .add(&item("A"), &loc("L1"), 5, "PO-LOSER", Actor::System)
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::VersionMismatch {
                resource: "stock A@L1".into(),
                expected: 0
            }
        );
        assert!(err.is_retryable());

        let record = s.ledger.get_stock(&item("A"), &loc("L1")).unwrap();
        assert_eq!((record.quantity(), record.version()), (7, 1));
        let refs: Vec<String> = s
            .journal
            .history_by_item(&item("A"), 0)
            .unwrap()
            .into_iter()
            .map(|e| e.reference)
            .collect();
        assert_eq!(refs, vec!["PO-WINNER"]);
    }

    #[test]
    fn losing_the_update_race_is_a_version_mismatch() {
        let s = setup();
        s.ledger.add(&item("A"), &loc("L1"), 7, "PO", Actor::System).unwrap();
        let (racing, stocks) = racing_ledger(&s);
        let rival = s.ledger.clone();
        stocks.arm(move || {
            rival
                .remove(&item("A"), &loc("L1"), 2, "SO-WINNER", Actor::System)
                .unwrap();
        });

        assert_eq!(
            racing.remove(&item("A"), &loc("L1"), 3, "SO-LOSER", Actor::System),
            Err(DomainError::VersionMismatch {
                resource: "stock A@L1".into(),
                expected: 1
            })
        );
        let record = s.ledger.get_stock(&item("A"), &loc("L1")).unwrap();
        assert_eq!((record.quantity(), record.version()), (5, 2));
        assert!(!s
            .journal
            .history_by_item(&item("A"), 0)
            .unwrap()
            .iter()
            .any(|e| e.reference == "SO-LOSER"));

        // A re-read picks up the winner's version.
        let retried = racing
            .remove(&item("A"), &loc("L1"), 3, "SO-LOSER", Actor::System)
            .unwrap();
        assert_eq!((retried.quantity(), retried.version()), (2, 3));
    }

    #[test]
    fn reservations_take_a_reference() {
        let s = setup();
        s.ledger.add(&item("A"), &loc("L1"), 10, "PO", Actor::System).unwrap();
        assert!(matches!(
            s.ledger
                .reserve(&item("A"), &loc("L1"), 1, &"x".repeat(501), Actor::System),
            Err(DomainError::Validation { .. })
        ));
        assert!(matches!(
            s.ledger
                .release_reservation(&item("A"), &loc("L1"), 1, &"x".repeat(501), Actor::System),
            Err(DomainError::Validation { .. })
        ));
        assert_eq!(s.ledger.get_stock(&item("A"), &loc("L1")).unwrap().version(), 1);
    }

    #[test]
    fn concurrent_adds_lose_no_updates() {
        let s = setup();
        let threads = 8;
        let per_thread = 25;

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let ledger = s.ledger.clone();
                thread::spawn(move || {
                    for _ in 0..per_thread {
                        loop {
                            match ledger.add(&item("A"), &loc("L1"), 1, "PO", Actor::System) {
                                Ok(_) => break,
                                Err(e) if e.is_retryable() => continue,
                                Err(e) => panic!("unexpected error: {e}"),
                            }
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let total = (threads * per_thread) as i64;
        let record = s.ledger.get_stock(&item("A"), &loc("L1")).unwrap();
        assert_eq!(record.quantity(), total);
        assert_eq!(record.version(), total as u64);
        assert_eq!(
            s.journal.history_by_item(&item("A"), 1_000).unwrap().len(),
            total as usize
        );
    }

    #[test]
    fn concurrent_removals_never_oversell() {
        let s = setup();
        s.ledger.add(&item("A"), &loc("L1"), 100, "PO", Actor::System).unwrap();

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let ledger = s.ledger.clone();
                thread::spawn(move || loop {
                    match ledger.remove(&item("A"), &loc("L1"), 15, "SO", Actor::System) {
                        Ok(_) => return true,
                        Err(e) if e.is_retryable() => continue,
                        Err(DomainError::InsufficientStock { .. }) => return false,
                        Err(e) => panic!("unexpected error: {e}"),
                    }
                })
            })
            .collect();
        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count() as i64;

        let record = s.ledger.get_stock(&item("A"), &loc("L1")).unwrap();
        assert_eq!(successes, 6);
        assert_eq!(record.quantity(), 100 - 15 * successes);
    }

    // ---------------------------------------------------------------------
    // Journal queries
    // ---------------------------------------------------------------------

    #[test]
    fn history_queries_validate_and_order() {
        let s = setup_with(InventoryConfig {
            history_default_limit: 2,
            ..InventoryConfig::default()
        });
        for reference in ["PO-1", "PO-2", "PO-3"] {
            s.ledger.add(&item("A"), &loc("L1"), 1, reference, Actor::System).unwrap();
        }

        let page = s.journal.history_by_item(&item("A"), 0).unwrap();
        let refs: Vec<&str> = page.iter().map(|e| e.reference.as_str()).collect();
        assert_eq!(refs, vec!["PO-3", "PO-2"]);
        assert_eq!(s.journal.history_by_location(&loc("L1"), 10).unwrap().len(), 3);

        assert_eq!(
            s.journal.history_by_location(&loc("NOPE"), 10),
            Err(DomainError::NotFound(EntityKind::Location))
        );
        assert_eq!(
            s.journal.history_by_item(&item("ZZZ"), 10),
            Err(DomainError::NotFound(EntityKind::Item))
        );

        let now = Utc::now();
        assert!(matches!(
            s.journal.history_by_date_range(&item("A"), now, now - Duration::hours(1)),
            Err(DomainError::Validation { .. })
        ));
        let ranged = s
            .journal
            .history_by_date_range(&item("A"), now - Duration::hours(1), now + Duration::hours(1))
            .unwrap();
        assert_eq!(ranged.len(), 3);
        assert_eq!(ranged[0].reference, "PO-3");
        assert!(s
            .journal
            .history_by_date_range(&item("A"), now + Duration::hours(1), now + Duration::hours(2))
            .unwrap()
            .is_empty());
    }

    // ---------------------------------------------------------------------
    // Valuation / ABC / analytics
    // ---------------------------------------------------------------------

    fn stock_two_layers(s: &InventoryServices) {
        s.ledger
            .receive(&item("A"), &loc("L1"), 100, "PO-1", Receipt::costed(dec!(10)), Actor::System)
            .unwrap();
        s.ledger
            .receive(&item("A"), &loc("L1"), 100, "PO-2", Receipt::costed(dec!(20)), Actor::System)
            .unwrap();
        s.ledger.remove(&item("A"), &loc("L1"), 50, "SO-1", Actor::System).unwrap();
    }

    #[test]
    fn valuation_methods_price_the_same_stock_differently() {
        let s = setup();
        stock_two_layers(&s);
        let v = &s.valuation;

        assert_eq!(v.calculate_value(&item("A"), &loc("L1"), ValuationMethod::Fifo).unwrap(), dec!(2000));
        assert_eq!(v.calculate_value(&item("A"), &loc("L1"), ValuationMethod::Lifo).unwrap(), dec!(2500));
        assert_eq!(
            v.calculate_value(&item("A"), &loc("L1"), ValuationMethod::WeightedAverage).unwrap(),
            dec!(2250)
        );
        assert_eq!(
            v.calculate_value(&item("A"), &loc("L1"), ValuationMethod::Standard).unwrap(),
            dec!(1875)
        );
    }

    #[test]
    fn weighted_average_is_item_wide() {
        let s = setup();
        stock_two_layers(&s);
        // Uncosted stock elsewhere is still valued at the item-wide average.
        s.ledger.add(&item("A"), &loc("L2"), 10, "PO-3", Actor::System).unwrap();

        assert_eq!(
            s.valuation
                .calculate_value(&item("A"), &loc("L2"), ValuationMethod::WeightedAverage)
                .unwrap(),
            dec!(150)
        );
        assert_eq!(
            s.valuation
                .calculate_value(&item("A"), &loc("L2"), ValuationMethod::Fifo)
                .unwrap(),
            Decimal::ZERO
        );
    }

    #[test]
    fn valuation_failures_and_totals() {
        let s = setup();
        s.ledger.add(&item("C"), &loc("L1"), 5, "PO", Actor::System).unwrap();

        assert!(matches!(
            s.valuation.average_cost(&item("C")),
            Err(DomainError::InsufficientData(_))
        ));
        assert!(matches!(
            s.valuation
                .calculate_value(&item("C"), &loc("L1"), ValuationMethod::Standard),
            Err(DomainError::BusinessRule { .. })
        ));
        assert_eq!(
            s.valuation
                .calculate_value(&item("A"), &loc("L1"), ValuationMethod::Fifo),
            Err(DomainError::NotFound(EntityKind::Stock))
        );

        // C cannot be valued at standard cost and is skipped.
        s.ledger.add(&item("B"), &loc("L1"), 4, "PO", Actor::System).unwrap();
        assert_eq!(
            s.valuation
                .total_value(&loc("L1"), ValuationMethod::Standard)
                .unwrap(),
            dec!(20)
        );

        s.ledger.adjust(&item("B"), &loc("L1"), 0, "COUNT", Actor::System).unwrap();
        assert_eq!(
            s.valuation
                .calculate_value(&item("B"), &loc("L1"), ValuationMethod::Standard)
                .unwrap(),
            Decimal::ZERO
        );
    }

    #[test]
    fn abc_classification_by_estimated_value() {
        let s = setup();
        for (code, cost) in [("X1", dec!(8.00)), ("X2", dec!(1.50)), ("X3", dec!(0.50))] {
            s.catalog
                .create_item(Item::new(item(code), code).with_unit_cost(cost))
                .unwrap();
            s.ledger.add(&item(code), &loc("L3"), 10, "PO", Actor::System).unwrap();
        }

        let entries = s.abc.classify_location(&loc("L3")).unwrap();
        let classes: Vec<(&str, AbcClass)> = entries
            .iter()
            .map(|e| (e.item_id.as_str(), e.class))
            .collect();
        assert_eq!(
            classes,
            vec![("X1", AbcClass::A), ("X2", AbcClass::B), ("X3", AbcClass::C)]
        );
        assert_eq!(entries[0].annual_value, dec!(8000));

        let map = s.abc.classification_map(&loc("L3")).unwrap();
        assert_eq!(map[&item("X2")], AbcClass::B);
    }

    #[test]
    fn turnover_and_slow_movers() {
        let s = setup();
        s.ledger.add(&item("A"), &loc("L1"), 100, "PO", Actor::System).unwrap();
        s.ledger.add(&item("B"), &loc("L1"), 10, "PO", Actor::System).unwrap();
        s.ledger.remove(&item("A"), &loc("L1"), 10, "SO-1", Actor::System).unwrap();
        s.ledger.remove(&item("A"), &loc("L1"), 10, "SO-2", Actor::System).unwrap();

        let rate = s.analytics.turnover_rate(&item("A"), Duration::days(30)).unwrap();
        assert_eq!(rate, dec!(20) / dec!(80) * dec!(365) / dec!(30));
        assert_eq!(
            s.analytics.turnover_rate(&item("C"), Duration::days(30)).unwrap(),
            Decimal::ZERO
        );
        assert!(s.analytics.turnover_rate(&item("A"), Duration::zero()).is_err());

        let slow = s.analytics.slow_moving_items(&loc("L1"), Duration::days(30)).unwrap();
        assert_eq!(slow, vec![item("B")]);
    }

    #[test]
    fn analytics_periods_at_the_extremes() {
        let s = setup();
        s.ledger.add(&item("A"), &loc("L1"), 100, "PO", Actor::System).unwrap();
        s.ledger.remove(&item("A"), &loc("L1"), 10, "SO-1", Actor::System).unwrap();

        assert!(s
            .analytics
            .turnover_rate(&item("A"), Duration::milliseconds(500))
            .is_ok());
        assert!(matches!(
            s.analytics.turnover_rate(&item("A"), Duration::nanoseconds(500)),
            Err(DomainError::Validation { .. })
        ));
        assert!(matches!(
            s.analytics.turnover_rate(&item("A"), Duration::MAX),
            Err(DomainError::Validation { .. })
        ));
        assert!(matches!(
            s.analytics.slow_moving_items(&loc("L1"), Duration::MAX),
            Err(DomainError::Validation { .. })
        ));
        assert!(matches!(
            s.analytics.slow_moving_items(&loc("L1"), Duration::zero()),
            Err(DomainError::Validation { .. })
        ));
    }

    #[test]
    fn csv_reports() {
        let s = setup();
        stock_two_layers(&s);

        let stock = String::from_utf8(s.analytics.report(&loc("L1"), ReportType::Stock).unwrap()).unwrap();
        let mut lines = stock.lines();
        assert_eq!(
            lines.next(),
            Some("item_id,quantity,reserved,available,version,updated_at")
        );
        assert!(lines.next().unwrap().starts_with("A,150,0,150,3,"));

        let valuation = String::from_utf8(
            s.analytics
                .report(&loc("L1"), ReportType::Valuation(ValuationMethod::Fifo))
                .unwrap(),
        )
        .unwrap();
        assert!(valuation.contains("A,150,2000,FIFO"));

        let movement = String::from_utf8(s.analytics.report(&loc("L1"), ReportType::Movement).unwrap()).unwrap();
        assert_eq!(movement.lines().count(), 4);

        let abc = String::from_utf8(s.analytics.report(&loc("L1"), ReportType::Abc).unwrap()).unwrap();
        assert!(abc.starts_with("item_id,annual_value,cumulative_share,class\n"));

        assert_eq!(
            s.analytics.report(&loc("NOPE"), ReportType::Stock),
            Err(DomainError::NotFound(EntityKind::Location))
        );
    }

    // ---------------------------------------------------------------------
    // Batch
    // ---------------------------------------------------------------------

    #[test]
    fn batch_runs_every_operation_and_reports_failures() {
        let s = setup();
        let mut transfer_without_destination =
            InventoryOperation::transfer(item("A"), loc("L1"), loc("L2"), 1, "T-0");
        transfer_without_destination.to_location_id = None;

        let batch = s.batches.execute(
            vec![
                InventoryOperation::add(item("A"), loc("L1"), 10, "PO-1"),
                InventoryOperation::remove(item("A"), loc("L1"), 50, "SO-1"),
                transfer_without_destination,
                InventoryOperation::transfer(item("A"), loc("L1"), loc("L2"), 3, "T-1"),
                InventoryOperation::adjust(item("B"), loc("L1"), 7, "COUNT-1"),
            ],
            Actor::System,
        );

        assert_eq!(batch.status, BatchStatus::Failed);
        assert_eq!((batch.success_count, batch.failure_count), (3, 2));
        let failed: Vec<usize> = batch.errors.iter().map(|e| e.operation_index).collect();
        assert_eq!(failed, vec![1, 2]);
        assert_eq!(s.ledger.get_stock(&item("A"), &loc("L2")).unwrap().quantity(), 3);
        assert_eq!(s.ledger.get_stock(&item("B"), &loc("L1")).unwrap().quantity(), 7);

        assert_eq!(s.batches.status(&batch.id).unwrap(), batch);
        assert_eq!(
            s.batches.status(&BatchId::new()),
            Err(DomainError::NotFound(EntityKind::Batch))
        );

        let clean = s.batches.execute(
            vec![InventoryOperation::add(item("C"), loc("L3"), 1, "PO-2")],
            Actor::System,
        );
        assert_eq!(clean.status, BatchStatus::Completed);
    }

    // ---------------------------------------------------------------------
    // Lots and expiry alerts
    // ---------------------------------------------------------------------

    #[test]
    fn lot_lifecycle_and_expiry_alerts() {
        let s = setup();
        let now = Utc::now();
        let fresh = s
            .lots
            .create_lot(Lot::new("LOT-1", item("A"), 10, dec!(1.00)).with_expiry(now + Duration::days(3)))
            .unwrap();
        let stale = s
            .lots
            .create_lot(Lot::new("LOT-2", item("A"), 5, dec!(1.00)).with_expiry(now - Duration::days(1)))
            .unwrap();
        let undated = s.lots.create_lot(Lot::new("LOT-3", item("A"), 5, dec!(1.00))).unwrap();

        assert_eq!(
            s.lots.create_lot(Lot::new("LOT-1", item("A"), 1, dec!(1.00))),
            Err(DomainError::Duplicate(EntityKind::Lot))
        );
        assert_eq!(
            s.lots.create_lot(Lot::new("LOT-9", item("ZZZ"), 1, dec!(1.00))),
            Err(DomainError::NotFound(EntityKind::Item))
        );

        let expiring: Vec<String> = s
            .lots
            .expiring_lots(Duration::days(7))
            .unwrap()
            .into_iter()
            .map(|l| l.number)
            .collect();
        assert_eq!(expiring, vec!["LOT-1"]);
        assert_eq!(s.lots.expired_lots().unwrap()[0].id, stale.id);
        assert_eq!(s.lots.lots_for_item(&item("A")).unwrap().len(), 3);

        assert!(s.lots.validate_lot_expiry(&fresh.id).is_ok());
        assert_eq!(
            s.lots.validate_lot_expiry(&stale.id),
            Err(DomainError::ExpiredLot("LOT-2".into()))
        );

        let expiring_alert = s.alerts.raise_expiry_alert(&fresh.id, 3, Actor::System).unwrap();
        assert_eq!(expiring_alert.kind, AlertKind::Expiring);
        assert_eq!(expiring_alert.location_id, None);
        assert!(expiring_alert.message.contains("LOT-1"));
        assert!(expiring_alert.message.contains('3'));

        let expired_alert = s.alerts.raise_expiry_alert(&stale.id, -1, Actor::System).unwrap();
        assert_eq!(expired_alert.kind, AlertKind::Expired);

        assert!(matches!(
            s.alerts.raise_expiry_alert(&undated.id, 5, Actor::System),
            Err(DomainError::BusinessRule { .. })
        ));
        assert_eq!(
            s.alerts.raise_expiry_alert(&LotId::new(), 5, Actor::System),
            Err(DomainError::NotFound(EntityKind::Lot))
        );

        // Lot-wide alerts show up for every location.
        assert_eq!(s.alerts.active_alerts(Some(&loc("L2"))).unwrap().len(), 2);

        s.alerts.resolve(&expired_alert.id).unwrap();
        assert_eq!(s.alerts.active_alerts(None).unwrap().len(), 1);
        assert!(matches!(
            s.alerts.resolve(&expired_alert.id),
            Err(DomainError::AlertNotActive(_))
        ));
    }

    #[test]
    fn lot_movements_and_audit_trail() {
        let s = setup();
        s.lots
            .create_lot(Lot::new("LOT-1", item("A"), 10, dec!(1.00)))
            .unwrap();

        let entry = s
            .lots
            .track_movement(
                LotMovement {
                    item_id: item("A"),
                    lot_number: "LOT-1".into(),
                    from_location: None,
                    to_location: Some(loc("L1")),
                    quantity: 10,
                    reference: "RCV-1".into(),
                },
                Actor::System,
            )
            .unwrap();
        assert_eq!(entry.movement, MovementType::Inbound);
        assert_eq!(entry.metadata.get("lot_tracking").map(String::as_str), Some("enabled"));
        assert_eq!(entry.lot_number.as_deref(), Some("LOT-1"));

        assert!(matches!(
            s.lots.track_movement(
                LotMovement {
                    item_id: item("A"),
                    lot_number: "LOT-1".into(),
                    from_location: None,
                    to_location: None,
                    quantity: 1,
                    reference: "X".into(),
                },
                Actor::System,
            ),
            Err(DomainError::Validation { .. })
        ));

        s.ledger.add(&item("A"), &loc("L1"), 1, "PO", Actor::System).unwrap();
        assert_eq!(s.lots.lot_history(&item("A"), "LOT-1").unwrap().len(), 1);

        let now = Utc::now();
        let trail = s
            .lots
            .audit_trail(&item("A"), now - Duration::hours(1), now + Duration::hours(1))
            .unwrap();
        assert_eq!(trail.entries.len(), 2);
        assert_eq!(trail.lots.len(), 1);
    }

    // ---------------------------------------------------------------------
    // Catalog and health
    // ---------------------------------------------------------------------

    #[test]
    fn catalog_management() {
        let s = setup();

        assert_eq!(
            s.catalog.create_item(Item::new(item("A"), "Again")),
            Err(DomainError::Duplicate(EntityKind::Item))
        );
        assert_eq!(
            s.catalog
                .create_location(Location::new(loc("L1"), "Again", "warehouse")),
            Err(DomainError::Duplicate(EntityKind::Location))
        );

        let found = s.catalog.search_items("gad").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, item("B"));

        let original = s.catalog.get_item(&item("C")).unwrap();
        let updated = s
            .catalog
            .update_item(Item::new(item("C"), "Sprocket XL").with_category("parts"))
            .unwrap();
        assert_eq!(updated.created_at, original.created_at);
        assert_eq!(s.catalog.get_item(&item("C")).unwrap().name, "Sprocket XL");

        assert_eq!(s.catalog.list_items(1, 1).unwrap()[0].id, item("B"));
        assert_eq!(s.catalog.list_locations().unwrap().len(), 3);

        s.ledger.add(&item("A"), &loc("L1"), 1, "PO", Actor::System).unwrap();
        assert!(matches!(
            s.catalog.delete_item(&item("A")),
            Err(DomainError::Storage {
                source: StoreError::Conflict(_),
                ..
            })
        ));
        s.catalog.delete_item(&item("C")).unwrap();
        assert_eq!(
            s.catalog.get_item(&item("C")),
            Err(DomainError::NotFound(EntityKind::Item))
        );
    }

    #[test]
    fn stock_queries_span_locations() {
        let s = setup();
        s.ledger.add(&item("A"), &loc("L1"), 3, "PO", Actor::System).unwrap();
        s.ledger.add(&item("A"), &loc("L2"), 4, "PO", Actor::System).unwrap();
        s.ledger.add(&item("B"), &loc("L1"), 5, "PO", Actor::System).unwrap();

        assert_eq!(s.ledger.total_stock(&item("A")).unwrap(), 7);
        assert_eq!(s.ledger.stock_by_location(&loc("L1")).unwrap().len(), 2);
        assert_eq!(
            s.ledger.total_stock(&item("ZZZ")),
            Err(DomainError::NotFound(EntityKind::Item))
        );
    }

    #[test]
    fn closed_store_rejects_operations() {
        let s = setup();
        s.store.ping().unwrap();
        s.store.close().unwrap();

        assert!(matches!(
            s.ledger.add(&item("A"), &loc("L1"), 1, "PO", Actor::System),
            Err(DomainError::Storage {
                source: StoreError::Unavailable(_),
                ..
            })
        ));
    }
}
