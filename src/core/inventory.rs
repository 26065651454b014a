//! Inventory - the aggregate owning every collection
//!
//! All mutations go through command methods on [`Inventory`] that return a
//! `Result`. Each successful mutation bumps the version counter observed by the
//! autosaver. Status queries live in `status`, borrow/incoming-rental linkage
//! in `linkage`, person merging in `dedup` and ledger-gated updates in `ledger`.

use chrono::{DateTime, Utc};
use miette::Diagnostic;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::entity::{find, find_mut, Entity, Lifecycle};
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::ledger::Ledger;
use crate::core::quota::{QuotaCategory, QuotaGate};
use crate::core::status::EquipmentStatus;
use crate::entities::{
    Borrow, Equipment, Loan, MyRental, Person, PersonRole, Rental, RentalTerms, Repair,
    RepairOrigin, RepairTerms, StorageLocation, Worksite,
};

/// Errors returned by inventory commands
#[derive(Debug, Error, Diagnostic, PartialEq)]
pub enum InventoryError {
    #[error("Creation quota reached for {category} ({limit} max)")]
    #[diagnostic(
        code(materiel::quota_exceeded),
        help("Enable premium in config.yaml to lift creation limits")
    )]
    QuotaExceeded { category: QuotaCategory, limit: u64 },

    #[error("{kind} not found: {id}")]
    #[diagnostic(code(materiel::not_found))]
    NotFound { kind: &'static str, id: EntityId },

    #[error("{0} already has a shadow equipment record")]
    #[diagnostic(code(materiel::already_linked))]
    AlreadyLinked(EntityId),

    #[error("{0} is already lent out")]
    #[diagnostic(code(materiel::already_loaned))]
    AlreadyLoaned(EntityId),

    #[error("{0} is already sub-rented")]
    #[diagnostic(code(materiel::already_sub_rented))]
    AlreadySubRented(EntityId),

    #[error("{0} is already in repair")]
    #[diagnostic(code(materiel::already_in_repair))]
    AlreadyInRepair(EntityId),

    #[error("{0} is already closed")]
    #[diagnostic(code(materiel::already_closed))]
    AlreadyClosed(EntityId),

    #[error("{owner} has no open {kind}")]
    #[diagnostic(code(materiel::no_active_transaction))]
    NoActiveTransaction { owner: EntityId, kind: &'static str },

    #[error("Invalid merge: {0}")]
    #[diagnostic(code(materiel::invalid_merge))]
    InvalidMerge(String),

    #[error("Invalid value: {0}")]
    #[diagnostic(code(materiel::invalid_value))]
    InvalidValue(String),
}

pub type InventoryResult<T> = Result<T, InventoryError>;

pub(crate) fn not_found(kind: &'static str, id: &EntityId) -> InventoryError {
    InventoryError::NotFound { kind, id: *id }
}

/// Every collection, the ledger and the quota gate
#[derive(Debug, Default)]
pub struct Inventory {
    pub(crate) equipment: Vec<Equipment>,
    pub(crate) persons: Vec<Person>,
    pub(crate) storage_locations: Vec<StorageLocation>,
    pub(crate) worksites: Vec<Worksite>,
    pub(crate) loans: Vec<Loan>,
    pub(crate) borrows: Vec<Borrow>,
    pub(crate) rentals: Vec<Rental>,
    pub(crate) my_rentals: Vec<MyRental>,
    pub(crate) repairs: Vec<Repair>,
    pub(crate) ledger: Ledger,
    pub(crate) quota: QuotaGate,
    version: u64,
}

impl Inventory {
    /// Empty inventory governed by `quota`
    pub fn new(quota: QuotaGate) -> Self {
        Self {
            quota,
            ..Default::default()
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Change counter, bumped by every successful mutation
    pub fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn touch(&mut self) {
        self.version += 1;
    }

    pub fn equipment(&self) -> &[Equipment] {
        &self.equipment
    }

    pub fn persons(&self) -> &[Person] {
        &self.persons
    }

    pub fn storage_locations(&self) -> &[StorageLocation] {
        &self.storage_locations
    }

    pub fn worksites(&self) -> &[Worksite] {
        &self.worksites
    }

    pub fn loans(&self) -> &[Loan] {
        &self.loans
    }

    pub fn borrows(&self) -> &[Borrow] {
        &self.borrows
    }

    pub fn rentals(&self) -> &[Rental] {
        &self.rentals
    }

    pub fn my_rentals(&self) -> &[MyRental] {
        &self.my_rentals
    }

    pub fn repairs(&self) -> &[Repair] {
        &self.repairs
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn quota(&self) -> &QuotaGate {
        &self.quota
    }

    pub fn quota_mut(&mut self) -> &mut QuotaGate {
        &mut self.quota
    }

    pub fn get_equipment(&self, id: &EntityId) -> InventoryResult<&Equipment> {
        find(&self.equipment, id).ok_or_else(|| not_found("Equipment", id))
    }

    pub fn get_person(&self, id: &EntityId) -> InventoryResult<&Person> {
        find(&self.persons, id).ok_or_else(|| not_found("Person", id))
    }

    pub fn get_loan(&self, id: &EntityId) -> InventoryResult<&Loan> {
        find(&self.loans, id).ok_or_else(|| not_found("Loan", id))
    }

    pub fn get_borrow(&self, id: &EntityId) -> InventoryResult<&Borrow> {
        find(&self.borrows, id).ok_or_else(|| not_found("Borrow", id))
    }

    pub fn get_rental(&self, id: &EntityId) -> InventoryResult<&Rental> {
        find(&self.rentals, id).ok_or_else(|| not_found("Rental", id))
    }

    pub fn get_my_rental(&self, id: &EntityId) -> InventoryResult<&MyRental> {
        find(&self.my_rentals, id).ok_or_else(|| not_found("Incoming rental", id))
    }

    pub fn get_repair(&self, id: &EntityId) -> InventoryResult<&Repair> {
        find(&self.repairs, id).ok_or_else(|| not_found("Repair", id))
    }

    pub fn get_worksite(&self, id: &EntityId) -> InventoryResult<&Worksite> {
        find(&self.worksites, id).ok_or_else(|| not_found("Worksite", id))
    }

    pub fn get_storage_location(&self, id: &EntityId) -> InventoryResult<&StorageLocation> {
        find(&self.storage_locations, id).ok_or_else(|| not_found("Storage location", id))
    }

    /// Full name of a person, if they still exist
    pub fn person_name(&self, id: &EntityId) -> Option<String> {
        find(&self.persons, id).map(Person::full_name)
    }

    /// Name of an equipment item, if it still exists
    pub fn equipment_name(&self, id: &EntityId) -> Option<String> {
        find(&self.equipment, id).map(|e| e.name.clone())
    }

    // =========================================================================
    // Quota
    // =========================================================================

    /// Fail with `QuotaExceeded` unless `category` may grow
    pub fn check_quota(&self, category: QuotaCategory) -> InventoryResult<()> {
        if self.quota.can_create(category) {
            Ok(())
        } else {
            warn!(%category, "creation refused by quota");
            Err(InventoryError::QuotaExceeded {
                category,
                limit: self.quota.limits().limit(category),
            })
        }
    }

    pub(crate) fn admitted(&mut self, category: QuotaCategory) {
        self.quota.record_creation(category);
        self.touch();
    }

    /// Records currently counting towards a category's seed value
    fn seed_count(&self, category: QuotaCategory) -> u64 {
        let open_only = category.has_lifecycle();
        fn count<T: Lifecycle>(items: &[T], open_only: bool) -> u64 {
            items.iter().filter(|i| !open_only || i.is_open()).count() as u64
        }
        match category {
            QuotaCategory::Equipment => self.equipment.len() as u64,
            QuotaCategory::Person => self.persons.len() as u64,
            QuotaCategory::Storage => self.storage_locations.len() as u64,
            QuotaCategory::Worksite => self.worksites.len() as u64,
            QuotaCategory::Loan => count(&self.loans, open_only),
            QuotaCategory::Borrow => count(&self.borrows, open_only),
            QuotaCategory::Rental => count(&self.rentals, open_only),
            QuotaCategory::MyRental => count(&self.my_rentals, open_only),
            QuotaCategory::Repair => count(&self.repairs, open_only),
        }
    }

    /// Seed zero lifetime counters from the data already present
    ///
    /// Lifecycle categories count only records that are still open.
    pub fn reconcile_quota(&mut self) {
        for &category in QuotaCategory::all() {
            let existing = self.seed_count(category);
            self.quota.seed_if_zero(category, existing);
        }
    }

    // =========================================================================
    // Creation
    // =========================================================================

    pub fn add_equipment(&mut self, equipment: Equipment) -> InventoryResult<EntityId> {
        self.check_quota(QuotaCategory::Equipment)?;
        if let Some(location) = &equipment.storage_location_id {
            self.get_storage_location(location)?;
        }
        let id = equipment.id;
        info!(%id, name = %equipment.name, "equipment added");
        self.equipment.push(equipment);
        self.admitted(QuotaCategory::Equipment);
        Ok(id)
    }

    pub fn add_person(&mut self, person: Person) -> InventoryResult<EntityId> {
        self.check_quota(QuotaCategory::Person)?;
        if let Some(site) = person.worksite_id() {
            self.get_worksite(&site)?;
        }
        let id = person.id;
        info!(%id, name = %person.full_name(), "person added");
        self.persons.push(person);
        self.admitted(QuotaCategory::Person);
        Ok(id)
    }

    pub fn add_storage_location(&mut self, location: StorageLocation) -> InventoryResult<EntityId> {
        self.check_quota(QuotaCategory::Storage)?;
        let id = location.id;
        info!(%id, name = %location.name, "storage location added");
        self.storage_locations.push(location);
        self.admitted(QuotaCategory::Storage);
        Ok(id)
    }

    pub fn add_worksite(&mut self, worksite: Worksite) -> InventoryResult<EntityId> {
        self.check_quota(QuotaCategory::Worksite)?;
        if let Some(contact) = &worksite.contact_person_id {
            self.get_person(contact)?;
        }
        let id = worksite.id;
        info!(%id, name = %worksite.name, "worksite added");
        self.worksites.push(worksite);
        self.admitted(QuotaCategory::Worksite);
        Ok(id)
    }

    pub fn add_borrow(&mut self, borrow: Borrow) -> InventoryResult<EntityId> {
        self.check_quota(QuotaCategory::Borrow)?;
        self.get_person(&borrow.lender_id)?;
        let id = borrow.id;
        info!(%id, name = %borrow.name, "borrow recorded");
        self.borrows.push(borrow);
        self.admitted(QuotaCategory::Borrow);
        Ok(id)
    }

    pub fn add_my_rental(&mut self, rental: MyRental) -> InventoryResult<EntityId> {
        self.check_quota(QuotaCategory::MyRental)?;
        self.get_person(&rental.agency_id)?;
        let id = rental.id;
        info!(%id, name = %rental.name, "incoming rental recorded");
        self.my_rentals.push(rental);
        self.admitted(QuotaCategory::MyRental);
        Ok(id)
    }

    /// Lend equipment to a person
    pub fn create_loan(
        &mut self,
        equipment_id: &EntityId,
        person_id: &EntityId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> InventoryResult<EntityId> {
        self.check_quota(QuotaCategory::Loan)?;
        self.get_equipment(equipment_id)?;
        self.get_person(person_id)?;
        self.warn_if_busy(equipment_id);

        let loan = Loan::new(*equipment_id, *person_id, start, end);
        let id = loan.id;
        info!(%id, equipment = %equipment_id, person = %person_id, "loan created");
        self.loans.push(loan);
        self.admitted(QuotaCategory::Loan);
        Ok(id)
    }

    /// Rent equipment out
    pub fn create_rental(
        &mut self,
        equipment_id: &EntityId,
        renter_id: &EntityId,
        terms: RentalTerms,
    ) -> InventoryResult<EntityId> {
        self.check_quota(QuotaCategory::Rental)?;
        self.get_equipment(equipment_id)?;
        self.get_person(renter_id)?;
        self.warn_if_busy(equipment_id);

        let rental = Rental::new(*equipment_id, *renter_id, terms);
        let id = rental.id;
        info!(%id, equipment = %equipment_id, renter = %renter_id, total = rental.total_price, "rental created");
        self.rentals.push(rental);
        self.admitted(QuotaCategory::Rental);
        Ok(id)
    }

    /// Send equipment to repair, optionally raised from a loan or rental
    pub fn create_repair(
        &mut self,
        equipment_id: &EntityId,
        start: DateTime<Utc>,
        terms: RepairTerms,
        origin: Option<RepairOrigin>,
    ) -> InventoryResult<EntityId> {
        self.check_quota(QuotaCategory::Repair)?;
        self.get_equipment(equipment_id)?;
        if let Some(repairer) = &terms.repairer_id {
            self.get_person(repairer)?;
        }
        match &origin {
            Some(RepairOrigin::Loan(id)) => {
                self.get_loan(id)?;
            }
            Some(RepairOrigin::Rental(id)) => {
                self.get_rental(id)?;
            }
            None => {}
        }

        let mut repair = Repair::new(*equipment_id, start, terms);
        repair.origin = origin;
        let id = repair.id;
        info!(%id, equipment = %equipment_id, free = repair.free, "repair opened");
        self.repairs.push(repair);
        self.admitted(QuotaCategory::Repair);
        Ok(id)
    }

    fn warn_if_busy(&self, equipment_id: &EntityId) {
        let status = self.resolve_status(equipment_id);
        if status != EquipmentStatus::Available {
            warn!(equipment = %equipment_id, %status, "equipment is not available");
        }
    }

    // =========================================================================
    // Closing
    // =========================================================================

    /// Mark a loan returned
    pub fn return_loan(&mut self, loan_id: &EntityId, at: DateTime<Utc>) -> InventoryResult<()> {
        let loan = find_mut(&mut self.loans, loan_id).ok_or_else(|| not_found("Loan", loan_id))?;
        if !loan.is_open() {
            return Err(InventoryError::AlreadyClosed(*loan_id));
        }
        loan.returned_at = Some(at);
        info!(id = %loan_id, "loan returned");
        self.release_derived(loan_id);
        self.touch();
        Ok(())
    }

    /// Mark a rental returned
    pub fn return_rental(&mut self, rental_id: &EntityId, at: DateTime<Utc>) -> InventoryResult<()> {
        let rental =
            find_mut(&mut self.rentals, rental_id).ok_or_else(|| not_found("Rental", rental_id))?;
        if !rental.is_open() {
            return Err(InventoryError::AlreadyClosed(*rental_id));
        }
        rental.returned_at = Some(at);
        info!(id = %rental_id, "rental returned");
        self.release_derived(rental_id);
        self.touch();
        Ok(())
    }

    /// Mark a repair completed, optionally with its final cost
    pub fn complete_repair(
        &mut self,
        repair_id: &EntityId,
        at: DateTime<Utc>,
        final_cost: Option<f64>,
    ) -> InventoryResult<()> {
        let repair =
            find_mut(&mut self.repairs, repair_id).ok_or_else(|| not_found("Repair", repair_id))?;
        if !repair.is_open() {
            return Err(InventoryError::AlreadyClosed(*repair_id));
        }
        repair.completed_at = Some(at);
        if !repair.free {
            if let Some(cost) = final_cost {
                repair.final_cost = Some(cost);
            }
        }
        info!(id = %repair_id, "repair completed");
        self.release_derived(repair_id);
        self.touch();
        Ok(())
    }

    // =========================================================================
    // Updates
    // =========================================================================

    pub fn set_person_role(&mut self, person_id: &EntityId, role: PersonRole) -> InventoryResult<()> {
        if let PersonRole::Employee {
            worksite_id: Some(site),
        } = &role
        {
            self.get_worksite(site)?;
        }
        let person =
            find_mut(&mut self.persons, person_id).ok_or_else(|| not_found("Person", person_id))?;
        person.role = role;
        self.touch();
        Ok(())
    }

    pub fn mark_contacted(&mut self, person_id: &EntityId, at: DateTime<Utc>) -> InventoryResult<()> {
        let person =
            find_mut(&mut self.persons, person_id).ok_or_else(|| not_found("Person", person_id))?;
        person.last_contacted = Some(at);
        self.touch();
        Ok(())
    }

    pub fn move_equipment(
        &mut self,
        equipment_id: &EntityId,
        location: Option<EntityId>,
    ) -> InventoryResult<()> {
        if let Some(location) = &location {
            self.get_storage_location(location)?;
        }
        let equipment = find_mut(&mut self.equipment, equipment_id)
            .ok_or_else(|| not_found("Equipment", equipment_id))?;
        equipment.storage_location_id = location;
        self.touch();
        Ok(())
    }

    /// Replace the free-text notes of any record that has them
    pub fn annotate(&mut self, id: &EntityId, notes: impl Into<String>) -> InventoryResult<()> {
        let notes = notes.into();
        let slot: Option<&mut String> = match id.prefix() {
            EntityPrefix::Mat => {
                let equipment =
                    find_mut(&mut self.equipment, id).ok_or_else(|| not_found("Equipment", id))?;
                equipment.notes = Some(notes).filter(|n| !n.is_empty());
                self.touch();
                return Ok(());
            }
            EntityPrefix::Per => find_mut(&mut self.persons, id).map(|p| &mut p.notes),
            EntityPrefix::Sto => find_mut(&mut self.storage_locations, id).map(|s| &mut s.notes),
            EntityPrefix::Loan => find_mut(&mut self.loans, id).map(|l| &mut l.notes),
            EntityPrefix::Brw => find_mut(&mut self.borrows, id).map(|b| &mut b.notes),
            EntityPrefix::Rent => find_mut(&mut self.rentals, id).map(|r| &mut r.notes),
            EntityPrefix::Rin => find_mut(&mut self.my_rentals, id).map(|r| &mut r.notes),
            EntityPrefix::Site | EntityPrefix::Rep | EntityPrefix::Acc => {
                return Err(InventoryError::InvalidValue(format!(
                    "{} records have no notes",
                    id.prefix()
                )));
            }
        };
        *slot.ok_or_else(|| not_found("Record", id))? = notes;
        self.touch();
        Ok(())
    }

    /// Flag a worksite finished, whatever its dates say
    pub fn finish_worksite(&mut self, worksite_id: &EntityId) -> InventoryResult<()> {
        let site = find_mut(&mut self.worksites, worksite_id)
            .ok_or_else(|| not_found("Worksite", worksite_id))?;
        if site.finished {
            return Err(InventoryError::AlreadyClosed(*worksite_id));
        }
        site.finished = true;
        info!(id = %worksite_id, "worksite finished");
        self.touch();
        Ok(())
    }

    // =========================================================================
    // Deletion
    // =========================================================================

    /// Delete an equipment item with its loans and repairs
    ///
    /// Rentals of the item are kept.
    pub fn delete_equipment(&mut self, equipment_id: &EntityId) -> InventoryResult<()> {
        let index = position(&self.equipment, equipment_id)
            .ok_or_else(|| not_found("Equipment", equipment_id))?;
        self.equipment.remove(index);

        let removed: Vec<EntityId> = self
            .loans
            .iter()
            .filter(|l| l.equipment_id == *equipment_id)
            .map(|l| l.id)
            .chain(
                self.repairs
                    .iter()
                    .filter(|r| r.equipment_id == *equipment_id)
                    .map(|r| r.id),
            )
            .collect();
        self.loans.retain(|l| l.equipment_id != *equipment_id);
        self.repairs.retain(|r| r.equipment_id != *equipment_id);
        for id in &removed {
            self.release_derived(id);
        }

        info!(id = %equipment_id, cascaded = removed.len(), "equipment deleted");
        self.touch();
        Ok(())
    }

    /// Delete a person; their loans and borrows become orphans
    pub fn delete_person(&mut self, person_id: &EntityId) -> InventoryResult<()> {
        let index =
            position(&self.persons, person_id).ok_or_else(|| not_found("Person", person_id))?;
        self.persons.remove(index);
        info!(id = %person_id, "person deleted");
        self.touch();
        Ok(())
    }

    /// Delete a worksite, unassigning its employees
    pub fn delete_worksite(&mut self, worksite_id: &EntityId) -> InventoryResult<()> {
        let index = position(&self.worksites, worksite_id)
            .ok_or_else(|| not_found("Worksite", worksite_id))?;
        self.worksites.remove(index);

        let mut unassigned = 0;
        for person in &mut self.persons {
            if let PersonRole::Employee { worksite_id: site } = &mut person.role {
                if site.as_ref() == Some(worksite_id) {
                    *site = None;
                    unassigned += 1;
                }
            }
        }
        info!(id = %worksite_id, unassigned, "worksite deleted");
        self.touch();
        Ok(())
    }

    /// Delete a storage location, clearing it on stored equipment
    pub fn delete_storage_location(&mut self, location_id: &EntityId) -> InventoryResult<()> {
        let index = position(&self.storage_locations, location_id)
            .ok_or_else(|| not_found("Storage location", location_id))?;
        self.storage_locations.remove(index);
        for equipment in &mut self.equipment {
            if equipment.storage_location_id.as_ref() == Some(location_id) {
                equipment.storage_location_id = None;
            }
        }
        info!(id = %location_id, "storage location deleted");
        self.touch();
        Ok(())
    }

    pub fn delete_loan(&mut self, loan_id: &EntityId) -> InventoryResult<()> {
        let index = position(&self.loans, loan_id).ok_or_else(|| not_found("Loan", loan_id))?;
        self.loans.remove(index);
        self.release_derived(loan_id);
        debug!(id = %loan_id, "loan deleted");
        self.touch();
        Ok(())
    }

    pub fn delete_rental(&mut self, rental_id: &EntityId) -> InventoryResult<()> {
        let index =
            position(&self.rentals, rental_id).ok_or_else(|| not_found("Rental", rental_id))?;
        self.rentals.remove(index);
        self.release_derived(rental_id);
        debug!(id = %rental_id, "rental deleted");
        self.touch();
        Ok(())
    }

    pub fn delete_repair(&mut self, repair_id: &EntityId) -> InventoryResult<()> {
        let index =
            position(&self.repairs, repair_id).ok_or_else(|| not_found("Repair", repair_id))?;
        self.repairs.remove(index);
        self.release_derived(repair_id);
        debug!(id = %repair_id, "repair deleted");
        self.touch();
        Ok(())
    }

    /// Resolve a user-supplied reference (full id or unique id fragment)
    pub fn resolve_reference<T: Entity>(items: &[T], reference: &str) -> Option<EntityId> {
        if let Ok(id) = reference.parse::<EntityId>() {
            return find(items, &id).map(|item| *item.id());
        }
        let needle = reference.to_uppercase();
        let mut matches = items
            .iter()
            .filter(|item| item.id().to_string().contains(&needle));
        match (matches.next(), matches.next()) {
            (Some(item), None) => Some(*item.id()),
            _ => None,
        }
    }
}

pub(crate) fn position<T: Entity>(items: &[T], id: &EntityId) -> Option<usize> {
    items.iter().position(|item| item.id() == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::quota::QuotaLimits;
    use chrono::Duration;

    fn inventory() -> Inventory {
        Inventory::new(QuotaGate::unlimited())
    }

    #[test]
    fn test_quota_counter_survives_deletions() {
        let mut inv = Inventory::new(QuotaGate::new(false, QuotaLimits::uniform(2)));
        let a = inv.add_equipment(Equipment::new("A", "x")).unwrap();
        let b = inv.add_equipment(Equipment::new("B", "x")).unwrap();
        inv.delete_equipment(&a).unwrap();
        inv.delete_equipment(&b).unwrap();

        assert_eq!(inv.quota().lifetime(QuotaCategory::Equipment), 2);
        let err = inv.add_equipment(Equipment::new("C", "x")).unwrap_err();
        assert_eq!(
            err,
            InventoryError::QuotaExceeded {
                category: QuotaCategory::Equipment,
                limit: 2
            }
        );
        assert!(inv.equipment().is_empty());
    }

    #[test]
    fn test_version_bumps_on_mutation_only() {
        let mut inv = inventory();
        let v0 = inv.version();
        let id = inv.add_person(Person::new("Ana", "Lima")).unwrap();
        assert!(inv.version() > v0);

        let v1 = inv.version();
        assert!(inv.delete_person(&EntityId::new(EntityPrefix::Per)).is_err());
        assert_eq!(inv.version(), v1);
        inv.delete_person(&id).unwrap();
        assert!(inv.version() > v1);
    }

    #[test]
    fn test_delete_equipment_cascades_loans_and_repairs_not_rentals() {
        let mut inv = inventory();
        let now = Utc::now();
        let eq = inv.add_equipment(Equipment::new("Mixer", "Concrete")).unwrap();
        let p = inv.add_person(Person::new("Ana", "Lima")).unwrap();
        inv.create_loan(&eq, &p, now, now + Duration::days(2)).unwrap();
        inv.create_repair(&eq, now, RepairTerms::default(), None).unwrap();
        inv.create_rental(
            &eq,
            &p,
            RentalTerms {
                start: now,
                end: now + Duration::days(1),
                pricing: crate::entities::PricingType::Flat,
                unit_price: 50.0,
                deposit: 0.0,
            },
        )
        .unwrap();

        inv.delete_equipment(&eq).unwrap();

        assert!(inv.loans().is_empty());
        assert!(inv.repairs().is_empty());
        assert_eq!(inv.rentals().len(), 1);
        assert_eq!(inv.rentals()[0].equipment_id, eq);
    }

    #[test]
    fn test_delete_person_leaves_loans() {
        let mut inv = inventory();
        let now = Utc::now();
        let eq = inv.add_equipment(Equipment::new("Saw", "Tools")).unwrap();
        let p = inv.add_person(Person::new("Ana", "Lima")).unwrap();
        inv.create_loan(&eq, &p, now, now + Duration::days(2)).unwrap();

        inv.delete_person(&p).unwrap();
        assert_eq!(inv.loans().len(), 1);
        assert_eq!(inv.loans()[0].person_id, p);
    }

    #[test]
    fn test_delete_worksite_unassigns_employees() {
        let mut inv = inventory();
        let site = inv.add_worksite(Worksite::new("Dock", Utc::now())).unwrap();
        let mut worker = Person::new("Ana", "Lima");
        worker.role = PersonRole::Employee {
            worksite_id: Some(site),
        };
        let worker = inv.add_person(worker).unwrap();

        inv.delete_worksite(&site).unwrap();

        let person = inv.get_person(&worker).unwrap();
        assert_eq!(
            person.role,
            PersonRole::Employee { worksite_id: None }
        );
    }

    #[test]
    fn test_annotate() {
        let mut inv = inventory();
        let eq = inv.add_equipment(Equipment::new("Saw", "Tools")).unwrap();
        let p = inv.add_person(Person::new("Ana", "Lima")).unwrap();
        inv.annotate(&eq, "blade dull").unwrap();
        inv.annotate(&p, "prefers phone").unwrap();
        assert_eq!(inv.get_equipment(&eq).unwrap().notes.as_deref(), Some("blade dull"));
        assert_eq!(inv.get_person(&p).unwrap().notes, "prefers phone");

        inv.annotate(&eq, "").unwrap();
        assert_eq!(inv.get_equipment(&eq).unwrap().notes, None);

        let ghost = EntityId::new(EntityPrefix::Loan);
        assert!(matches!(
            inv.annotate(&ghost, "x"),
            Err(InventoryError::NotFound { .. })
        ));
        let entry = EntityId::new(EntityPrefix::Acc);
        assert!(matches!(
            inv.annotate(&entry, "x"),
            Err(InventoryError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_finish_worksite() {
        let mut inv = inventory();
        let now = Utc::now();
        let site = inv.add_worksite(Worksite::new("Dock", now)).unwrap();
        inv.finish_worksite(&site).unwrap();
        assert_eq!(
            inv.get_worksite(&site).unwrap().status_at(now),
            crate::entities::WorksiteStatus::Finished
        );
        assert_eq!(
            inv.finish_worksite(&site),
            Err(InventoryError::AlreadyClosed(site))
        );
    }

    #[test]
    fn test_delete_storage_clears_equipment_location() {
        let mut inv = inventory();
        let shed = inv.add_storage_location(StorageLocation::new("Shed")).unwrap();
        let mut eq = Equipment::new("Rake", "Garden");
        eq.storage_location_id = Some(shed);
        let eq = inv.add_equipment(eq).unwrap();

        inv.delete_storage_location(&shed).unwrap();
        assert_eq!(inv.get_equipment(&eq).unwrap().storage_location_id, None);
    }

    #[test]
    fn test_create_loan_requires_existing_refs() {
        let mut inv = inventory();
        let p = inv.add_person(Person::new("Ana", "Lima")).unwrap();
        let ghost = EntityId::new(EntityPrefix::Mat);
        let now = Utc::now();
        let err = inv.create_loan(&ghost, &p, now, now).unwrap_err();
        assert!(matches!(err, InventoryError::NotFound { kind: "Equipment", .. }));
        assert!(inv.loans().is_empty());
    }

    #[test]
    fn test_return_loan_twice_fails() {
        let mut inv = inventory();
        let now = Utc::now();
        let eq = inv.add_equipment(Equipment::new("Saw", "Tools")).unwrap();
        let p = inv.add_person(Person::new("Ana", "Lima")).unwrap();
        let loan = inv.create_loan(&eq, &p, now, now + Duration::days(1)).unwrap();
        inv.return_loan(&loan, now).unwrap();
        assert_eq!(
            inv.return_loan(&loan, now),
            Err(InventoryError::AlreadyClosed(loan))
        );
    }

    #[test]
    fn test_reconcile_seeds_from_open_records() {
        let mut inv = inventory();
        let now = Utc::now();
        let eq = inv.add_equipment(Equipment::new("Saw", "Tools")).unwrap();
        let p = inv.add_person(Person::new("Ana", "Lima")).unwrap();
        let l1 = inv.create_loan(&eq, &p, now, now).unwrap();
        inv.create_loan(&eq, &p, now, now).unwrap();
        inv.return_loan(&l1, now).unwrap();

        // Simulate a fresh install holding data but no counters
        inv.quota = QuotaGate::new(false, QuotaLimits::default());
        inv.reconcile_quota();

        assert_eq!(inv.quota().lifetime(QuotaCategory::Equipment), 1);
        assert_eq!(inv.quota().lifetime(QuotaCategory::Person), 1);
        assert_eq!(inv.quota().lifetime(QuotaCategory::Loan), 1);
        assert_eq!(inv.quota().lifetime(QuotaCategory::Repair), 0);
    }

    #[test]
    fn test_resolve_reference_by_fragment() {
        let mut inv = inventory();
        let id = inv.add_equipment(Equipment::new("Saw", "Tools")).unwrap();
        inv.add_equipment(Equipment::new("Drill", "Tools")).unwrap();

        let full = id.to_string();
        assert_eq!(Inventory::resolve_reference(inv.equipment(), &full), Some(id));
        let tail = &full[full.len() - 10..];
        assert_eq!(
            Inventory::resolve_reference(inv.equipment(), &tail.to_lowercase()),
            Some(id)
        );
        // "MAT-" matches both items
        assert_eq!(Inventory::resolve_reference(inv.equipment(), "MAT-"), None);
    }
}
