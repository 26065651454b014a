//! Loan entity type - equipment lent to a person

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::{Entity, Lifecycle};
use crate::core::identity::{EntityId, EntityPrefix};

/// A Loan of one equipment item to one person
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    pub id: EntityId,

    /// Equipment lent out
    pub equipment_id: EntityId,

    /// Borrower
    pub person_id: EntityId,

    #[serde(with = "crate::core::dates")]
    pub start: DateTime<Utc>,

    /// Expected return date
    #[serde(with = "crate::core::dates")]
    pub end: DateTime<Utc>,

    /// Actual return; `None` while the loan is open
    #[serde(
        default,
        with = "crate::core::dates::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub returned_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,

    #[serde(with = "crate::core::dates")]
    pub created: DateTime<Utc>,
}

impl Entity for Loan {
    const PREFIX: EntityPrefix = EntityPrefix::Loan;
    const LIST_KEY: &'static str = "loans";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn title(&self) -> String {
        self.id.to_string()
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }
}

impl Lifecycle for Loan {
    fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.returned_at
    }
}

impl Loan {
    pub fn new(
        equipment_id: EntityId,
        person_id: EntityId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Loan),
            equipment_id,
            person_id,
            start,
            end,
            returned_at: None,
            notes: String::new(),
            created: Utc::now(),
        }
    }

    /// Open and past its expected return date
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_open() && self.end < now
    }
}
