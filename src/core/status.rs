//! Status resolution - custody state computed on demand from the activity tables
//!
//! Nothing here is cached. Equipment status checks loans, rentals and repairs in
//! that order and the first open record wins, so inconsistent data still yields
//! exactly one state.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::entity::Lifecycle;
use crate::core::identity::EntityId;
use crate::core::inventory::Inventory;
use crate::core::linkage::OwnerRef;
use crate::entities::{DerivedLinks, Loan, Rental, Repair};

/// Custody state of an equipment item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentStatus {
    OnLoan,
    RentedOut,
    InRepair,
    Available,
}

impl std::fmt::Display for EquipmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EquipmentStatus::OnLoan => write!(f, "on-loan"),
            EquipmentStatus::RentedOut => write!(f, "rented-out"),
            EquipmentStatus::InRepair => write!(f, "in-repair"),
            EquipmentStatus::Available => write!(f, "available"),
        }
    }
}

impl Inventory {
    /// Current custody state of an equipment item
    pub fn resolve_status(&self, equipment_id: &EntityId) -> EquipmentStatus {
        if self.open_loan_on(equipment_id).is_some() {
            EquipmentStatus::OnLoan
        } else if self.open_rental_on(equipment_id).is_some() {
            EquipmentStatus::RentedOut
        } else if self.open_repair_on(equipment_id).is_some() {
            EquipmentStatus::InRepair
        } else {
            EquipmentStatus::Available
        }
    }

    /// First open loan of an equipment item
    pub fn open_loan_on(&self, equipment_id: &EntityId) -> Option<&Loan> {
        self.loans
            .iter()
            .find(|l| l.is_open() && l.equipment_id == *equipment_id)
    }

    /// First open rental of an equipment item
    pub fn open_rental_on(&self, equipment_id: &EntityId) -> Option<&Rental> {
        self.rentals
            .iter()
            .find(|r| r.is_open() && r.equipment_id == *equipment_id)
    }

    /// First open repair of an equipment item
    pub fn open_repair_on(&self, equipment_id: &EntityId) -> Option<&Repair> {
        self.repairs
            .iter()
            .find(|r| r.is_open() && r.equipment_id == *equipment_id)
    }

    /// Whether any open loan holds the item, whatever else is open on it
    pub fn equipment_on_loan(&self, equipment_id: &EntityId) -> bool {
        self.open_loan_on(equipment_id).is_some()
    }

    // =========================================================================
    // Dual-path lookup for borrows and incoming rentals
    // =========================================================================

    /// Open loan derived from a borrow or incoming rental
    ///
    /// The back-reference is tried first; loans created by picking the shadow
    /// equipment directly carry no back-reference and are found by equipment id.
    pub fn active_loan_for(&self, owner: OwnerRef) -> Option<&Loan> {
        let links = self.owner_links(owner)?;
        links
            .active_loan_id
            .and_then(|id| self.loans.iter().find(|l| l.id == id && l.is_open()))
            .or_else(|| {
                links
                    .linked_equipment_id
                    .and_then(|shadow| self.open_loan_on(&shadow))
            })
    }

    /// Open sub-rental derived from a borrow or incoming rental
    pub fn active_rental_for(&self, owner: OwnerRef) -> Option<&Rental> {
        let links = self.owner_links(owner)?;
        links
            .active_rental_id
            .and_then(|id| self.rentals.iter().find(|r| r.id == id && r.is_open()))
            .or_else(|| {
                links
                    .linked_equipment_id
                    .and_then(|shadow| self.open_rental_on(&shadow))
            })
    }

    /// Open repair derived from a borrow or incoming rental
    pub fn active_repair_for(&self, owner: OwnerRef) -> Option<&Repair> {
        let links = self.owner_links(owner)?;
        links
            .active_repair_id
            .and_then(|id| self.repairs.iter().find(|r| r.id == id && r.is_open()))
            .or_else(|| {
                links
                    .linked_equipment_id
                    .and_then(|shadow| self.open_repair_on(&shadow))
            })
    }

    pub(crate) fn owner_links(&self, owner: OwnerRef) -> Option<&DerivedLinks> {
        match owner {
            OwnerRef::Borrow(id) => self.borrows.iter().find(|b| b.id == id).map(|b| &b.links),
            OwnerRef::MyRental(id) => self
                .my_rentals
                .iter()
                .find(|r| r.id == id)
                .map(|r| &r.links),
        }
    }

    /// Borrow or incoming rental whose shadow record is `equipment_id`
    pub fn owner_of_equipment(&self, equipment_id: &EntityId) -> Option<OwnerRef> {
        let shadow = Some(*equipment_id);
        self.borrows
            .iter()
            .find(|b| b.links.linked_equipment_id == shadow)
            .map(|b| OwnerRef::Borrow(b.id))
            .or_else(|| {
                self.my_rentals
                    .iter()
                    .find(|r| r.links.linked_equipment_id == shadow)
                    .map(|r| OwnerRef::MyRental(r.id))
            })
    }

    // =========================================================================
    // Lateness
    // =========================================================================

    pub fn overdue_loans(&self, now: DateTime<Utc>) -> Vec<&Loan> {
        self.loans.iter().filter(|l| l.is_overdue(now)).collect()
    }

    pub fn overdue_rentals(&self, now: DateTime<Utc>) -> Vec<&Rental> {
        self.rentals.iter().filter(|r| r.is_overdue(now)).collect()
    }

    pub fn overdue_repairs(&self, now: DateTime<Utc>) -> Vec<&Repair> {
        self.repairs.iter().filter(|r| r.is_overdue(now)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::quota::QuotaGate;
    use crate::entities::{
        Borrow, Equipment, Person, PricingType, RentalTerms, RepairTerms,
    };
    use chrono::Duration;

    fn setup() -> (Inventory, EntityId, EntityId) {
        let mut inv = Inventory::new(QuotaGate::unlimited());
        let eq = inv.add_equipment(Equipment::new("Generator", "Power")).unwrap();
        let p = inv.add_person(Person::new("Ana", "Lima")).unwrap();
        (inv, eq, p)
    }

    fn terms() -> RentalTerms {
        let now = Utc::now();
        RentalTerms {
            start: now,
            end: now + Duration::days(3),
            pricing: PricingType::PerDay,
            unit_price: 15.0,
            deposit: 100.0,
        }
    }

    #[test]
    fn test_available_by_default() {
        let (inv, eq, _) = setup();
        assert_eq!(inv.resolve_status(&eq), EquipmentStatus::Available);
    }

    #[test]
    fn test_loan_wins_over_rental_and_repair() {
        let (mut inv, eq, p) = setup();
        let now = Utc::now();
        inv.create_repair(&eq, now, RepairTerms::default(), None).unwrap();
        inv.create_rental(&eq, &p, terms()).unwrap();
        inv.create_loan(&eq, &p, now, now + Duration::days(1)).unwrap();

        for _ in 0..3 {
            assert_eq!(inv.resolve_status(&eq), EquipmentStatus::OnLoan);
        }
    }

    #[test]
    fn test_rental_then_repair_priority() {
        let (mut inv, eq, p) = setup();
        let now = Utc::now();
        inv.create_repair(&eq, now, RepairTerms::default(), None).unwrap();
        assert_eq!(inv.resolve_status(&eq), EquipmentStatus::InRepair);

        let rental = inv.create_rental(&eq, &p, terms()).unwrap();
        assert_eq!(inv.resolve_status(&eq), EquipmentStatus::RentedOut);

        inv.return_rental(&rental, now).unwrap();
        assert_eq!(inv.resolve_status(&eq), EquipmentStatus::InRepair);
    }

    #[test]
    fn test_closed_records_do_not_count() {
        let (mut inv, eq, p) = setup();
        let now = Utc::now();
        let loan = inv.create_loan(&eq, &p, now, now + Duration::days(1)).unwrap();
        assert!(inv.equipment_on_loan(&eq));
        inv.return_loan(&loan, now).unwrap();
        assert_eq!(inv.resolve_status(&eq), EquipmentStatus::Available);
        assert!(!inv.equipment_on_loan(&eq));
    }

    #[test]
    fn test_overdue_queries() {
        let (mut inv, eq, p) = setup();
        let now = Utc::now();
        inv.create_loan(&eq, &p, now - Duration::days(5), now - Duration::days(1))
            .unwrap();
        inv.create_repair(
            &eq,
            now - Duration::days(5),
            RepairTerms {
                expected_end: Some(now - Duration::days(2)),
                ..Default::default()
            },
            None,
        )
        .unwrap();
        assert_eq!(inv.overdue_loans(now).len(), 1);
        assert_eq!(inv.overdue_repairs(now).len(), 1);
        assert!(inv.overdue_rentals(now).is_empty());
    }

    #[test]
    fn test_loan_on_shadow_found_without_back_reference() {
        let (mut inv, _, p) = setup();
        let now = Utc::now();
        let borrow = inv.add_borrow(Borrow::new("Trailer", p, now)).unwrap();
        let owner = OwnerRef::Borrow(borrow);
        let shadow = inv.create_shadow_equipment(owner).unwrap();

        // Picked from the general equipment list: no back-reference is set
        let loan = inv
            .create_loan(&shadow, &p, now, now + Duration::days(2))
            .unwrap();

        assert_eq!(inv.get_borrow(&borrow).unwrap().links.active_loan_id, None);
        assert_eq!(inv.active_loan_for(owner).map(|l| l.id), Some(loan));
        assert_eq!(inv.owner_of_equipment(&shadow), Some(owner));
    }

    #[test]
    fn test_rental_and_repair_on_shadow_found_without_back_reference() {
        let (mut inv, _, p) = setup();
        let now = Utc::now();
        let borrow = inv.add_borrow(Borrow::new("Trailer", p, now)).unwrap();
        let owner = OwnerRef::Borrow(borrow);
        let shadow = inv.create_shadow_equipment(owner).unwrap();

        let rental = inv.create_rental(&shadow, &p, terms()).unwrap();
        let repair = inv
            .create_repair(&shadow, now, RepairTerms::default(), None)
            .unwrap();

        let links = &inv.get_borrow(&borrow).unwrap().links;
        assert_eq!(links.active_rental_id, None);
        assert_eq!(links.active_repair_id, None);
        assert_eq!(inv.active_rental_for(owner).map(|r| r.id), Some(rental));
        assert_eq!(inv.active_repair_for(owner).map(|r| r.id), Some(repair));
    }
}
