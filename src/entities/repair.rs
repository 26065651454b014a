//! Repair entity type

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::{Entity, Lifecycle};
use crate::core::identity::{EntityId, EntityPrefix};

/// Transaction a repair was raised from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum RepairOrigin {
    Loan(EntityId),
    Rental(EntityId),
}

/// Terms used when opening a repair
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepairTerms {
    pub repairer_id: Option<EntityId>,
    pub description: String,
    pub expected_end: Option<DateTime<Utc>>,
    pub estimated_cost: Option<f64>,
    /// Free repair: no cost, counted as paid
    pub free: bool,
}

/// A Repair of one equipment item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repair {
    pub id: EntityId,

    pub equipment_id: EntityId,

    /// Mechanic or shop doing the work
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repairer_id: Option<EntityId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<RepairOrigin>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(with = "crate::core::dates")]
    pub start: DateTime<Utc>,

    #[serde(
        default,
        with = "crate::core::dates::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub expected_end: Option<DateTime<Utc>>,

    /// Completion; `None` while the repair is in progress
    #[serde(
        default,
        with = "crate::core::dates::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_cost: Option<f64>,

    /// The repairer has been paid
    #[serde(default)]
    pub paid: bool,

    #[serde(default)]
    pub free: bool,

    /// Expense already written to the ledger
    #[serde(default)]
    pub expense_recorded: bool,

    #[serde(with = "crate::core::dates")]
    pub created: DateTime<Utc>,
}

impl Entity for Repair {
    const PREFIX: EntityPrefix = EntityPrefix::Rep;
    const LIST_KEY: &'static str = "repairs";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn title(&self) -> String {
        if self.description.is_empty() {
            self.id.to_string()
        } else {
            self.description.clone()
        }
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }
}

impl Lifecycle for Repair {
    fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }
}

impl Repair {
    pub fn new(equipment_id: EntityId, start: DateTime<Utc>, terms: RepairTerms) -> Self {
        let mut repair = Self {
            id: EntityId::new(EntityPrefix::Rep),
            equipment_id,
            repairer_id: terms.repairer_id,
            origin: None,
            description: terms.description,
            start,
            expected_end: terms.expected_end,
            completed_at: None,
            estimated_cost: terms.estimated_cost,
            final_cost: None,
            paid: false,
            free: false,
            expense_recorded: false,
            created: Utc::now(),
        };
        if terms.free {
            repair.make_free();
        }
        repair
    }

    /// Mark as free of charge: costs cleared and counted as paid together
    pub fn make_free(&mut self) {
        self.free = true;
        self.estimated_cost = None;
        self.final_cost = None;
        self.paid = true;
    }

    /// Amount charged: final cost if known, else the estimate
    ///
    /// `None` for free repairs and when no cost was ever given.
    pub fn cost(&self) -> Option<f64> {
        if self.free {
            return None;
        }
        self.final_cost.or(self.estimated_cost)
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_open() && self.expected_end.is_some_and(|end| end < now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_repair_is_paid_with_no_cost() {
        let repair = Repair::new(
            EntityId::new(EntityPrefix::Mat),
            Utc::now(),
            RepairTerms {
                estimated_cost: Some(80.0),
                free: true,
                ..Default::default()
            },
        );
        assert!(repair.paid);
        assert!(repair.free);
        assert_eq!(repair.estimated_cost, None);
        assert_eq!(repair.cost(), None);
    }

    #[test]
    fn test_cost_prefers_final() {
        let mut repair = Repair::new(
            EntityId::new(EntityPrefix::Mat),
            Utc::now(),
            RepairTerms {
                estimated_cost: Some(80.0),
                ..Default::default()
            },
        );
        assert_eq!(repair.cost(), Some(80.0));
        repair.final_cost = Some(95.5);
        assert_eq!(repair.cost(), Some(95.5));

        repair.estimated_cost = None;
        repair.final_cost = None;
        assert_eq!(repair.cost(), None);
    }

    #[test]
    fn test_origin_serialization() {
        let loan = EntityId::new(EntityPrefix::Loan);
        let json = serde_json::to_string(&RepairOrigin::Loan(loan)).unwrap();
        assert_eq!(json, format!(r#"{{"kind":"loan","id":"{}"}}"#, loan));
    }
}
