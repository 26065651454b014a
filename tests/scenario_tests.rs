//! End-to-end scenarios through the library, persisted to a real data directory

use std::sync::Arc;

use chrono::{Duration, Utc};
use tempfile::TempDir;

use materiel::core::autosave::Session;
use materiel::core::linkage::{LinkState, OwnerRef};
use materiel::core::persistence::JsonDirStore;
use materiel::core::quota::{QuotaCategory, QuotaGate, QuotaLimits};
use materiel::core::status::EquipmentStatus;
use materiel::core::InventoryError;
use materiel::entities::{Borrow, Equipment, Person, RentalTerms, PricingType};

fn open(tmp: &TempDir, quota: QuotaGate) -> Session {
    let store = JsonDirStore::open(tmp.path()).unwrap();
    Session::with_store(Arc::new(store), quota, None).unwrap()
}

#[test]
fn test_loan_round_trip() {
    let tmp = TempDir::new().unwrap();
    let session = open(&tmp, QuotaGate::unlimited());
    let now = Utc::now();

    let (drill, loan) = session.write(|inv| {
        let drill = inv.add_equipment(Equipment::new("Drill", "Tools")).unwrap();
        let ana = inv.add_person(Person::new("Ana", "Lima")).unwrap();
        let loan = inv.create_loan(&drill, &ana, now, now + Duration::days(7)).unwrap();
        (drill, loan)
    });
    assert_eq!(session.read(|inv| inv.resolve_status(&drill)), EquipmentStatus::OnLoan);

    session.write(|inv| inv.return_loan(&loan, Utc::now())).unwrap();
    session.read(|inv| {
        assert_eq!(inv.resolve_status(&drill), EquipmentStatus::Available);
        assert!(inv.get_loan(&loan).unwrap().returned_at.is_some());
    });
    session.close().unwrap();

    // Everything survives a reload
    let session = open(&tmp, QuotaGate::unlimited());
    session.read(|inv| {
        assert_eq!(inv.equipment().len(), 1);
        assert!(inv.get_loan(&loan).unwrap().returned_at.is_some());
        assert_eq!(inv.resolve_status(&drill), EquipmentStatus::Available);
    });
}

#[test]
fn test_borrow_relend_round_trip() {
    let tmp = TempDir::new().unwrap();
    let session = open(&tmp, QuotaGate::unlimited());
    let now = Utc::now();

    let (borrow, friend) = session.write(|inv| {
        let lender = inv.add_person(Person::new("Lea", "Nord")).unwrap();
        let friend = inv.add_person(Person::new("Bo", "Berg")).unwrap();
        let borrow = inv.add_borrow(Borrow::new("Trailer", lender, now)).unwrap();
        (borrow, friend)
    });
    let owner = OwnerRef::Borrow(borrow);
    assert_eq!(session.read(|inv| inv.link_state(owner)).unwrap(), LinkState::NoShadow);

    let loan = session
        .write(|inv| inv.relend(owner, &friend, now, now + Duration::days(3)))
        .unwrap();
    let shadow = session.read(|inv| {
        let b = inv.get_borrow(&borrow).unwrap();
        assert_eq!(b.links.active_loan_id, Some(loan));
        let shadow = b.links.linked_equipment_id.unwrap();
        assert_eq!(inv.get_loan(&loan).unwrap().equipment_id, shadow);
        assert_eq!(inv.resolve_status(&shadow), EquipmentStatus::OnLoan);
        shadow
    });
    assert_eq!(session.read(|inv| inv.link_state(owner)).unwrap(), LinkState::ShadowLoaned);

    session.write(|inv| inv.return_relend(owner, Utc::now())).unwrap();
    session.read(|inv| {
        assert!(inv.get_loan(&loan).unwrap().returned_at.is_some());
        assert_eq!(inv.get_borrow(&borrow).unwrap().links.active_loan_id, None);
        assert!(inv.get_equipment(&shadow).is_ok());
    });

    let removed = session.write(|inv| inv.close_borrow(&borrow, Utc::now())).unwrap();
    assert_eq!(removed, Some(shadow));
    session.close().unwrap();

    let session = open(&tmp, QuotaGate::unlimited());
    session.read(|inv| {
        let b = inv.get_borrow(&borrow).unwrap();
        assert!(b.links.linked_equipment_id.is_none());
        assert!(b.returned_at.is_some());
        assert!(inv.get_equipment(&shadow).is_err());
        // The closed loan stays in the history
        assert!(inv.get_loan(&loan).is_ok());
    });
}

#[test]
fn test_quota_counters_survive_restart() {
    let tmp = TempDir::new().unwrap();
    let gate = || QuotaGate::new(false, QuotaLimits::uniform(2));

    let session = open(&tmp, gate());
    let first = session.write(|inv| inv.add_equipment(Equipment::new("A", "General"))).unwrap();
    session.write(|inv| inv.add_equipment(Equipment::new("B", "General"))).unwrap();
    session.write(|inv| inv.delete_equipment(&first)).unwrap();
    session.close().unwrap();

    let session = open(&tmp, gate());
    assert_eq!(session.read(|inv| inv.quota().lifetime(QuotaCategory::Equipment)), 2);
    let refused = session.write(|inv| inv.add_equipment(Equipment::new("C", "General")));
    assert!(matches!(refused, Err(InventoryError::QuotaExceeded { .. })));
}

#[test]
fn test_export_import_into_fresh_store() {
    let source_dir = TempDir::new().unwrap();
    let source = open(&source_dir, QuotaGate::unlimited());
    let now = Utc::now();
    source.write(|inv| {
        let drill = inv.add_equipment(Equipment::new("Drill", "Tools")).unwrap();
        let ana = inv.add_person(Person::new("Ana", "Lima")).unwrap();
        let rental = inv
            .create_rental(
                &drill,
                &ana,
                RentalTerms {
                    start: now,
                    end: now + Duration::days(2),
                    pricing: PricingType::Flat,
                    unit_price: 60.0,
                    deposit: 0.0,
                },
            )
            .unwrap();
        inv.set_rental_paid(&rental, true).unwrap();
    });
    let json = source.read(|inv| inv.export_json()).unwrap();

    let target_dir = TempDir::new().unwrap();
    let target = open(&target_dir, QuotaGate::new(false, QuotaLimits::uniform(0)));
    let report = target.write(|inv| inv.import_json(&json)).unwrap();
    assert_eq!(report.added(), 4);
    target.read(|inv| {
        assert_eq!(inv.rentals().len(), 1);
        assert_eq!(inv.ledger().summary(Default::default()).revenue, 60.0);
        // Imported records do not count against the quota
        assert_eq!(inv.quota().lifetime(QuotaCategory::Equipment), 0);
    });
}
