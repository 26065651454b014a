//! Borrow and incoming-rental entity types - external objects held temporarily
//!
//! Both carry the same set of links: an optional shadow equipment record that
//! stands in for the external object, and the open loan, sub-rental and repair
//! created against that shadow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::{Entity, Lifecycle};
use crate::core::identity::{EntityId, EntityPrefix};
use crate::entities::rental::PricingType;

/// Links from an external transaction to the records derived from it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedLinks {
    /// Shadow equipment standing in for the external object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_equipment_id: Option<EntityId>,

    /// Loan created by re-lending the object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_loan_id: Option<EntityId>,

    /// Rental created by sub-renting the object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_rental_id: Option<EntityId>,

    /// Repair the object was sent to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_repair_id: Option<EntityId>,
}

impl DerivedLinks {
    /// Drop every back-reference pointing at `id`
    pub fn clear_reference(&mut self, id: &EntityId) -> bool {
        let mut cleared = false;
        for slot in [
            &mut self.active_loan_id,
            &mut self.active_rental_id,
            &mut self.active_repair_id,
        ] {
            if slot.as_ref() == Some(id) {
                *slot = None;
                cleared = true;
            }
        }
        cleared
    }
}

/// An object borrowed from a person
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Borrow {
    pub id: EntityId,

    /// Name of the borrowed object
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Person the object was borrowed from
    pub lender_id: EntityId,

    #[serde(with = "crate::core::dates")]
    pub start: DateTime<Utc>,

    /// Date the object is due back to its owner
    #[serde(
        default,
        with = "crate::core::dates::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub due: Option<DateTime<Utc>>,

    /// Returned to its owner; `None` while the borrow is open
    #[serde(
        default,
        with = "crate::core::dates::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub returned_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Vec<u8>>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,

    #[serde(default)]
    pub links: DerivedLinks,

    #[serde(with = "crate::core::dates")]
    pub created: DateTime<Utc>,
}

impl Entity for Borrow {
    const PREFIX: EntityPrefix = EntityPrefix::Brw;
    const LIST_KEY: &'static str = "borrows";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn title(&self) -> String {
        self.name.clone()
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }
}

impl Lifecycle for Borrow {
    fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.returned_at
    }
}

impl Borrow {
    pub fn new(name: impl Into<String>, lender_id: EntityId, start: DateTime<Utc>) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Brw),
            name: name.into(),
            description: String::new(),
            lender_id,
            start,
            due: None,
            returned_at: None,
            image: None,
            notes: String::new(),
            links: DerivedLinks::default(),
            created: Utc::now(),
        }
    }
}

/// Equipment rented in from an agency
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MyRental {
    pub id: EntityId,

    /// Name of the rented object
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Rental agency
    pub agency_id: EntityId,

    #[serde(with = "crate::core::dates")]
    pub start: DateTime<Utc>,

    #[serde(with = "crate::core::dates")]
    pub end: DateTime<Utc>,

    /// Handed back to the agency; `None` while the rental is open
    #[serde(
        default,
        with = "crate::core::dates::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub returned_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub pricing: PricingType,

    #[serde(default)]
    pub unit_price: f64,

    /// Total owed; recomputed from the real duration on close
    #[serde(default)]
    pub total_price: f64,

    #[serde(default)]
    pub deposit: f64,

    #[serde(default)]
    pub payment_made: bool,

    /// Expense already written to the ledger
    #[serde(default)]
    pub expense_recorded: bool,

    /// Running total of deposit recovered from the agency
    #[serde(default)]
    pub deposit_recovered: f64,

    /// Running total of deposit lost to the agency
    #[serde(default)]
    pub deposit_lost: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Vec<u8>>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,

    #[serde(default)]
    pub links: DerivedLinks,

    #[serde(with = "crate::core::dates")]
    pub created: DateTime<Utc>,
}

impl Entity for MyRental {
    const PREFIX: EntityPrefix = EntityPrefix::Rin;
    const LIST_KEY: &'static str = "my_rentals";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn title(&self) -> String {
        self.name.clone()
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }
}

impl Lifecycle for MyRental {
    fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.returned_at
    }
}

impl MyRental {
    pub fn new(
        name: impl Into<String>,
        agency_id: EntityId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        pricing: PricingType,
        unit_price: f64,
    ) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Rin),
            name: name.into(),
            description: String::new(),
            agency_id,
            start,
            end,
            returned_at: None,
            pricing,
            unit_price,
            total_price: pricing.total_for(unit_price, start, end),
            deposit: 0.0,
            payment_made: false,
            expense_recorded: false,
            deposit_recovered: 0.0,
            deposit_lost: 0.0,
            image: None,
            notes: String::new(),
            links: DerivedLinks::default(),
            created: Utc::now(),
        }
    }

    /// Deposit neither recovered nor lost yet
    pub fn deposit_outstanding(&self) -> f64 {
        (self.deposit - self.deposit_recovered - self.deposit_lost).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_reference_only_matching_slot() {
        let loan = EntityId::new(EntityPrefix::Loan);
        let repair = EntityId::new(EntityPrefix::Rep);
        let mut links = DerivedLinks {
            linked_equipment_id: Some(EntityId::new(EntityPrefix::Mat)),
            active_loan_id: Some(loan),
            active_rental_id: None,
            active_repair_id: Some(repair),
        };

        assert!(links.clear_reference(&loan));
        assert_eq!(links.active_loan_id, None);
        assert_eq!(links.active_repair_id, Some(repair));
        assert!(links.linked_equipment_id.is_some());
        assert!(!links.clear_reference(&loan));
    }

    #[test]
    fn test_my_rental_initial_total() {
        let start = Utc::now();
        let r = MyRental::new(
            "Scaffold",
            EntityId::new(EntityPrefix::Per),
            start,
            start + chrono::Duration::days(3),
            PricingType::PerDay,
            20.0,
        );
        assert_eq!(r.total_price, 60.0);
        assert!(r.is_open());
    }
}
