//! Linkage between borrows / incoming rentals and the records derived from them
//!
//! An external object (borrowed or rented in) gets a shadow equipment record
//! the first time it needs to flow through the loan, rental or repair tables.
//! The owner keeps a back-reference to each derived record it spawned. Closing
//! a derived record clears that back-reference and leaves the shadow in place;
//! closing the owner deletes the shadow.
//!
//! Borrows and incoming rentals share one implementation through
//! [`ExternalSource`]; callers address an owner with [`OwnerRef`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::core::entity::{find, find_mut, Entity, Lifecycle};
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::inventory::{not_found, position, Inventory, InventoryError, InventoryResult};
use crate::core::quota::QuotaCategory;
use crate::entities::equipment::{SHADOW_CATEGORY_BORROWED, SHADOW_CATEGORY_RENTED};
use crate::entities::{
    Borrow, DerivedLinks, Equipment, Loan, MyRental, Rental, RentalTerms, Repair, RepairTerms,
};

/// A borrow or an incoming rental
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum OwnerRef {
    Borrow(EntityId),
    MyRental(EntityId),
}

impl OwnerRef {
    pub fn id(&self) -> EntityId {
        match self {
            OwnerRef::Borrow(id) | OwnerRef::MyRental(id) => *id,
        }
    }

    /// Owner reference for an id, based on its prefix
    pub fn from_id(id: EntityId) -> Option<Self> {
        match id.prefix() {
            EntityPrefix::Brw => Some(OwnerRef::Borrow(id)),
            EntityPrefix::Rin => Some(OwnerRef::MyRental(id)),
            _ => None,
        }
    }
}

impl std::fmt::Display for OwnerRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Where an owner stands with respect to its shadow equipment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    NoShadow,
    ShadowFree,
    ShadowLoaned,
    ShadowRented,
    ShadowInRepair,
}

impl std::fmt::Display for LinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkState::NoShadow => write!(f, "no shadow"),
            LinkState::ShadowFree => write!(f, "shadow free"),
            LinkState::ShadowLoaned => write!(f, "shadow loaned"),
            LinkState::ShadowRented => write!(f, "shadow rented"),
            LinkState::ShadowInRepair => write!(f, "shadow in repair"),
        }
    }
}

/// A transaction holding an external object that can spawn derived records
pub trait ExternalSource: Entity + Lifecycle {
    /// Category given to its shadow equipment
    const SHADOW_CATEGORY: &'static str;

    /// Name used in errors
    const KIND: &'static str;

    fn owner(id: EntityId) -> OwnerRef;

    fn links(&self) -> &DerivedLinks;

    fn links_mut(&mut self) -> &mut DerivedLinks;

    /// Equipment record standing in for the external object
    fn shadow_equipment(&self) -> Equipment;

    /// Stamp the closing date
    fn close(&mut self, at: DateTime<Utc>);

    fn records(inventory: &Inventory) -> &[Self];

    fn records_mut(inventory: &mut Inventory) -> &mut Vec<Self>;
}

impl ExternalSource for Borrow {
    const SHADOW_CATEGORY: &'static str = SHADOW_CATEGORY_BORROWED;
    const KIND: &'static str = "Borrow";

    fn owner(id: EntityId) -> OwnerRef {
        OwnerRef::Borrow(id)
    }

    fn links(&self) -> &DerivedLinks {
        &self.links
    }

    fn links_mut(&mut self) -> &mut DerivedLinks {
        &mut self.links
    }

    fn shadow_equipment(&self) -> Equipment {
        let mut equipment = Equipment::new(self.name.clone(), Self::SHADOW_CATEGORY);
        equipment.description = self.description.clone();
        equipment.acquired = Some(self.start);
        equipment.image = self.image.clone();
        equipment
    }

    fn close(&mut self, at: DateTime<Utc>) {
        self.returned_at = Some(at);
    }

    fn records(inventory: &Inventory) -> &[Self] {
        &inventory.borrows
    }

    fn records_mut(inventory: &mut Inventory) -> &mut Vec<Self> {
        &mut inventory.borrows
    }
}

impl ExternalSource for MyRental {
    const SHADOW_CATEGORY: &'static str = SHADOW_CATEGORY_RENTED;
    const KIND: &'static str = "Incoming rental";

    fn owner(id: EntityId) -> OwnerRef {
        OwnerRef::MyRental(id)
    }

    fn links(&self) -> &DerivedLinks {
        &self.links
    }

    fn links_mut(&mut self) -> &mut DerivedLinks {
        &mut self.links
    }

    fn shadow_equipment(&self) -> Equipment {
        let mut equipment = Equipment::new(self.name.clone(), Self::SHADOW_CATEGORY);
        equipment.description = self.description.clone();
        equipment.acquired = Some(self.start);
        equipment.image = self.image.clone();
        equipment
    }

    /// Unit-priced rentals are billed for the time actually kept
    fn close(&mut self, at: DateTime<Utc>) {
        self.returned_at = Some(at);
        if self.pricing.is_unit_based() {
            self.total_price = self.pricing.total_for(self.unit_price, self.start, at);
        }
    }

    fn records(inventory: &Inventory) -> &[Self] {
        &inventory.my_rentals
    }

    fn records_mut(inventory: &mut Inventory) -> &mut Vec<Self> {
        &mut inventory.my_rentals
    }
}

macro_rules! dispatch {
    ($self:ident, $owner:expr, $method:ident($($arg:expr),*)) => {
        match $owner {
            OwnerRef::Borrow(id) => $self.$method::<Borrow>(&id, $($arg),*),
            OwnerRef::MyRental(id) => $self.$method::<MyRental>(&id, $($arg),*),
        }
    };
}

impl Inventory {
    // =========================================================================
    // Public entry points
    // =========================================================================

    /// Create the shadow equipment for an owner that has none
    pub fn create_shadow_equipment(&mut self, owner: OwnerRef) -> InventoryResult<EntityId> {
        dispatch!(self, owner, create_shadow_in())
    }

    /// Lend the external object to a person
    pub fn relend(
        &mut self,
        owner: OwnerRef,
        person_id: &EntityId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> InventoryResult<EntityId> {
        dispatch!(self, owner, relend_in(person_id, start, end))
    }

    /// Close the loan made from the external object
    pub fn return_relend(&mut self, owner: OwnerRef, at: DateTime<Utc>) -> InventoryResult<EntityId> {
        dispatch!(self, owner, return_relend_in(at))
    }

    /// Rent the external object out to a renter
    pub fn sub_rent(
        &mut self,
        owner: OwnerRef,
        renter_id: &EntityId,
        terms: RentalTerms,
    ) -> InventoryResult<EntityId> {
        dispatch!(self, owner, sub_rent_in(renter_id, terms))
    }

    /// Close the sub-rental made from the external object
    pub fn return_sub_rent(&mut self, owner: OwnerRef, at: DateTime<Utc>) -> InventoryResult<EntityId> {
        dispatch!(self, owner, return_sub_rent_in(at))
    }

    /// Send the external object to repair
    pub fn send_owner_to_repair(
        &mut self,
        owner: OwnerRef,
        start: DateTime<Utc>,
        terms: RepairTerms,
    ) -> InventoryResult<EntityId> {
        dispatch!(self, owner, repair_in(start, terms))
    }

    /// Complete the repair of the external object
    pub fn complete_owner_repair(
        &mut self,
        owner: OwnerRef,
        at: DateTime<Utc>,
        final_cost: Option<f64>,
    ) -> InventoryResult<EntityId> {
        dispatch!(self, owner, complete_repair_in(at, final_cost))
    }

    /// Return a borrowed object to its owner, deleting its shadow equipment
    ///
    /// Derived records still open are left as they are.
    pub fn close_borrow(
        &mut self,
        borrow_id: &EntityId,
        at: DateTime<Utc>,
    ) -> InventoryResult<Option<EntityId>> {
        self.close_in::<Borrow>(borrow_id, at)
    }

    /// Hand a rented-in object back to the agency, deleting its shadow equipment
    pub fn close_my_rental(
        &mut self,
        rental_id: &EntityId,
        at: DateTime<Utc>,
    ) -> InventoryResult<Option<EntityId>> {
        self.close_in::<MyRental>(rental_id, at)
    }

    /// Delete a borrow along with its shadow equipment
    pub fn delete_borrow(&mut self, borrow_id: &EntityId) -> InventoryResult<()> {
        self.delete_source::<Borrow>(borrow_id)
    }

    /// Delete an incoming rental along with its shadow equipment
    pub fn delete_my_rental(&mut self, rental_id: &EntityId) -> InventoryResult<()> {
        self.delete_source::<MyRental>(rental_id)
    }

    /// Shadow/derived state of an owner
    pub fn link_state(&self, owner: OwnerRef) -> InventoryResult<LinkState> {
        let links = self
            .owner_links(owner)
            .ok_or_else(|| not_found("Owner", &owner.id()))?;
        let state = if self.live_shadow(links).is_none() {
            LinkState::NoShadow
        } else if self.active_loan_for(owner).is_some() {
            LinkState::ShadowLoaned
        } else if self.active_rental_for(owner).is_some() {
            LinkState::ShadowRented
        } else if self.active_repair_for(owner).is_some() {
            LinkState::ShadowInRepair
        } else {
            LinkState::ShadowFree
        };
        Ok(state)
    }

    /// Let a renter sub-rent an outgoing rental onward
    pub fn create_sub_rental(
        &mut self,
        parent_id: &EntityId,
        renter_id: &EntityId,
        terms: RentalTerms,
    ) -> InventoryResult<EntityId> {
        let parent = self.get_rental(parent_id)?;
        if !parent.is_open() {
            return Err(InventoryError::AlreadyClosed(*parent_id));
        }
        if self.active_sub_rental(parent_id).is_some() {
            return Err(InventoryError::AlreadySubRented(*parent_id));
        }
        let equipment_id = parent.equipment_id;
        self.get_person(renter_id)?;
        self.check_quota(QuotaCategory::Rental)?;

        let rental = Rental::new(equipment_id, *renter_id, terms);
        let rental_id = rental.id;
        self.rentals.push(rental);
        if let Some(parent) = find_mut(&mut self.rentals, parent_id) {
            parent.sub_rental_id = Some(rental_id);
        }
        info!(parent = %parent_id, id = %rental_id, "sub-rental created");
        self.admitted(QuotaCategory::Rental);
        Ok(rental_id)
    }

    /// Open sub-rental of an outgoing rental
    pub fn active_sub_rental(&self, parent_id: &EntityId) -> Option<&Rental> {
        let sub_id = find(&self.rentals, parent_id)?.sub_rental_id?;
        self.rentals.iter().find(|r| r.id == sub_id && r.is_open())
    }

    /// Clear back-references to a derived record that was closed or deleted
    pub(crate) fn release_derived(&mut self, derived_id: &EntityId) {
        for borrow in &mut self.borrows {
            borrow.links.clear_reference(derived_id);
        }
        for rental in &mut self.my_rentals {
            rental.links.clear_reference(derived_id);
        }
        for rental in &mut self.rentals {
            if rental.sub_rental_id.as_ref() == Some(derived_id) {
                rental.sub_rental_id = None;
            }
        }
    }

    // =========================================================================
    // Generic implementation
    // =========================================================================

    fn source<S: ExternalSource>(&self, id: &EntityId) -> InventoryResult<&S> {
        find(S::records(self), id).ok_or_else(|| not_found(S::KIND, id))
    }

    fn source_mut<S: ExternalSource>(&mut self, id: &EntityId) -> InventoryResult<&mut S> {
        find_mut(S::records_mut(self), id).ok_or_else(|| not_found(S::KIND, id))
    }

    fn open_source<S: ExternalSource>(&self, id: &EntityId) -> InventoryResult<&S> {
        let source = self.source::<S>(id)?;
        if source.is_open() {
            Ok(source)
        } else {
            Err(InventoryError::AlreadyClosed(*id))
        }
    }

    /// Shadow id, if the link is set and the equipment still exists
    fn live_shadow(&self, links: &DerivedLinks) -> Option<EntityId> {
        links
            .linked_equipment_id
            .filter(|id| find(&self.equipment, id).is_some())
    }

    /// Reuse the shadow equipment or create it; a dangling link counts as none
    fn ensure_shadow<S: ExternalSource>(&mut self, id: &EntityId) -> InventoryResult<EntityId> {
        let source = self.source::<S>(id)?;
        if let Some(shadow) = self.live_shadow(source.links()) {
            return Ok(shadow);
        }
        if let Some(stale) = source.links().linked_equipment_id {
            warn!(owner = %id, %stale, "shadow equipment missing, recreating");
        }
        let equipment = source.shadow_equipment();
        let shadow = equipment.id;
        self.equipment.push(equipment);
        self.source_mut::<S>(id)?.links_mut().linked_equipment_id = Some(shadow);
        info!(owner = %id, %shadow, "shadow equipment created");
        Ok(shadow)
    }

    fn create_shadow_in<S: ExternalSource>(&mut self, id: &EntityId) -> InventoryResult<EntityId> {
        let source = self.open_source::<S>(id)?;
        if self.live_shadow(source.links()).is_some() {
            return Err(InventoryError::AlreadyLinked(*id));
        }
        let shadow = self.ensure_shadow::<S>(id)?;
        self.touch();
        Ok(shadow)
    }

    fn relend_in<S: ExternalSource>(
        &mut self,
        id: &EntityId,
        person_id: &EntityId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> InventoryResult<EntityId> {
        self.open_source::<S>(id)?;
        self.get_person(person_id)?;
        self.check_quota(QuotaCategory::Loan)?;
        let owner = S::owner(*id);
        if self.active_loan_for(owner).is_some() {
            return Err(InventoryError::AlreadyLoaned(*id));
        }
        if self.active_rental_for(owner).is_some() {
            return Err(InventoryError::AlreadySubRented(*id));
        }

        let shadow = self.ensure_shadow::<S>(id)?;
        let loan = Loan::new(shadow, *person_id, start, end);
        let loan_id = loan.id;
        self.loans.push(loan);
        self.source_mut::<S>(id)?.links_mut().active_loan_id = Some(loan_id);
        info!(owner = %id, loan = %loan_id, person = %person_id, "external object re-lent");
        self.admitted(QuotaCategory::Loan);
        Ok(loan_id)
    }

    fn return_relend_in<S: ExternalSource>(
        &mut self,
        id: &EntityId,
        at: DateTime<Utc>,
    ) -> InventoryResult<EntityId> {
        self.source::<S>(id)?;
        let loan_id = self
            .active_loan_for(S::owner(*id))
            .map(|l| l.id)
            .ok_or(InventoryError::NoActiveTransaction {
                owner: *id,
                kind: "loan",
            })?;
        if let Some(loan) = find_mut(&mut self.loans, &loan_id) {
            loan.returned_at = Some(at);
        }
        self.source_mut::<S>(id)?.links_mut().active_loan_id = None;
        self.release_derived(&loan_id);
        info!(owner = %id, loan = %loan_id, "re-loan returned");
        self.touch();
        Ok(loan_id)
    }

    fn sub_rent_in<S: ExternalSource>(
        &mut self,
        id: &EntityId,
        renter_id: &EntityId,
        terms: RentalTerms,
    ) -> InventoryResult<EntityId> {
        self.open_source::<S>(id)?;
        self.get_person(renter_id)?;
        self.check_quota(QuotaCategory::Rental)?;
        let owner = S::owner(*id);
        if self.active_loan_for(owner).is_some() {
            return Err(InventoryError::AlreadyLoaned(*id));
        }
        if self.active_rental_for(owner).is_some() {
            return Err(InventoryError::AlreadySubRented(*id));
        }

        let shadow = self.ensure_shadow::<S>(id)?;
        let rental = Rental::new(shadow, *renter_id, terms);
        let rental_id = rental.id;
        self.rentals.push(rental);
        self.source_mut::<S>(id)?.links_mut().active_rental_id = Some(rental_id);
        info!(owner = %id, rental = %rental_id, renter = %renter_id, "external object sub-rented");
        self.admitted(QuotaCategory::Rental);
        Ok(rental_id)
    }

    fn return_sub_rent_in<S: ExternalSource>(
        &mut self,
        id: &EntityId,
        at: DateTime<Utc>,
    ) -> InventoryResult<EntityId> {
        self.source::<S>(id)?;
        let rental_id = self
            .active_rental_for(S::owner(*id))
            .map(|r| r.id)
            .ok_or(InventoryError::NoActiveTransaction {
                owner: *id,
                kind: "sub-rental",
            })?;
        if let Some(rental) = find_mut(&mut self.rentals, &rental_id) {
            rental.returned_at = Some(at);
        }
        self.source_mut::<S>(id)?.links_mut().active_rental_id = None;
        self.release_derived(&rental_id);
        info!(owner = %id, rental = %rental_id, "sub-rental returned");
        self.touch();
        Ok(rental_id)
    }

    fn repair_in<S: ExternalSource>(
        &mut self,
        id: &EntityId,
        start: DateTime<Utc>,
        terms: RepairTerms,
    ) -> InventoryResult<EntityId> {
        self.open_source::<S>(id)?;
        if let Some(repairer) = &terms.repairer_id {
            self.get_person(repairer)?;
        }
        self.check_quota(QuotaCategory::Repair)?;
        if self.active_repair_for(S::owner(*id)).is_some() {
            return Err(InventoryError::AlreadyInRepair(*id));
        }

        let shadow = self.ensure_shadow::<S>(id)?;
        let repair = Repair::new(shadow, start, terms);
        let repair_id = repair.id;
        let free = repair.free;
        self.repairs.push(repair);
        self.source_mut::<S>(id)?.links_mut().active_repair_id = Some(repair_id);
        info!(owner = %id, repair = %repair_id, free, "external object sent to repair");
        self.admitted(QuotaCategory::Repair);
        Ok(repair_id)
    }

    fn complete_repair_in<S: ExternalSource>(
        &mut self,
        id: &EntityId,
        at: DateTime<Utc>,
        final_cost: Option<f64>,
    ) -> InventoryResult<EntityId> {
        self.source::<S>(id)?;
        let repair_id = self
            .active_repair_for(S::owner(*id))
            .map(|r| r.id)
            .ok_or(InventoryError::NoActiveTransaction {
                owner: *id,
                kind: "repair",
            })?;
        self.complete_repair(&repair_id, at, final_cost)?;
        Ok(repair_id)
    }

    fn close_in<S: ExternalSource>(
        &mut self,
        id: &EntityId,
        at: DateTime<Utc>,
    ) -> InventoryResult<Option<EntityId>> {
        let source = self.source_mut::<S>(id)?;
        if !source.is_open() {
            return Err(InventoryError::AlreadyClosed(*id));
        }
        let shadow = source.links_mut().linked_equipment_id.take();
        source.close(at);

        if let Some(shadow) = &shadow {
            if let Some(index) = position(&self.equipment, shadow) {
                self.equipment.remove(index);
            }
        }
        info!(id = %id, shadow = ?shadow, "external object returned");
        self.touch();
        Ok(shadow)
    }

    fn delete_source<S: ExternalSource>(&mut self, id: &EntityId) -> InventoryResult<()> {
        let index = position(S::records(self), id).ok_or_else(|| not_found(S::KIND, id))?;
        let removed = S::records_mut(self).remove(index);
        if let Some(shadow) = removed.links().linked_equipment_id {
            self.equipment.retain(|e| e.id != shadow);
        }
        info!(id = %id, "external transaction deleted");
        self.touch();
        Ok(())
    }
}
