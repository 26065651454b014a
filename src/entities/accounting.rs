//! Accounting entry - immutable ledger line

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::Entity;
use crate::core::identity::{EntityId, EntityPrefix};

/// Kind of ledger operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Payment received for a rental
    RentalRevenue,
    /// Renter's deposit kept (fully or partially)
    DepositKept,
    /// Repair paid
    RepairExpense,
    /// Payment made for an incoming rental
    IncomingRentalExpense,
    /// Deposit lost on an incoming rental
    DepositLost,
}

impl EntryKind {
    pub fn is_revenue(&self) -> bool {
        matches!(self, EntryKind::RentalRevenue | EntryKind::DepositKept)
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryKind::RentalRevenue => write!(f, "rental_revenue"),
            EntryKind::DepositKept => write!(f, "deposit_kept"),
            EntryKind::RepairExpense => write!(f, "repair_expense"),
            EntryKind::IncomingRentalExpense => write!(f, "incoming_rental_expense"),
            EntryKind::DepositLost => write!(f, "deposit_lost"),
        }
    }
}

/// One ledger line; never modified once written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountingEntry {
    pub id: EntityId,

    #[serde(with = "crate::core::dates")]
    pub date: DateTime<Utc>,

    pub kind: EntryKind,

    pub amount: f64,

    #[serde(default)]
    pub description: String,

    /// Equipment name at the time of the operation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment_name: Option<String>,

    /// Person name at the time of the operation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person_name: Option<String>,

    /// Source transaction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<EntityId>,
}

impl Entity for AccountingEntry {
    const PREFIX: EntityPrefix = EntityPrefix::Acc;
    const LIST_KEY: &'static str = "accounting";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn title(&self) -> String {
        self.description.clone()
    }

    fn created(&self) -> DateTime<Utc> {
        self.date
    }
}

impl AccountingEntry {
    /// Amount with its sign: revenue positive, expense negative
    pub fn signed_amount(&self) -> f64 {
        if self.kind.is_revenue() {
            self.amount
        } else {
            -self.amount
        }
    }
}
