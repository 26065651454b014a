//! Filter enums for list commands

use chrono::{DateTime, Utc};
use clap::ValueEnum;

use crate::core::status::EquipmentStatus;
use crate::entities::PersonRole;

/// Equipment custody filter
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum EquipmentFilter {
    Available,
    OnLoan,
    RentedOut,
    InRepair,
    /// Anything not available
    Busy,
    #[default]
    All,
}

impl EquipmentFilter {
    pub fn matches(&self, status: EquipmentStatus) -> bool {
        match self {
            EquipmentFilter::Available => status == EquipmentStatus::Available,
            EquipmentFilter::OnLoan => status == EquipmentStatus::OnLoan,
            EquipmentFilter::RentedOut => status == EquipmentStatus::RentedOut,
            EquipmentFilter::InRepair => status == EquipmentStatus::InRepair,
            EquipmentFilter::Busy => status != EquipmentStatus::Available,
            EquipmentFilter::All => true,
        }
    }
}

impl std::fmt::Display for EquipmentFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EquipmentFilter::Available => write!(f, "available"),
            EquipmentFilter::OnLoan => write!(f, "on-loan"),
            EquipmentFilter::RentedOut => write!(f, "rented-out"),
            EquipmentFilter::InRepair => write!(f, "in-repair"),
            EquipmentFilter::Busy => write!(f, "busy"),
            EquipmentFilter::All => write!(f, "all"),
        }
    }
}

/// Filter for records that are opened and later closed
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum TransactionFilter {
    /// Not yet returned or completed (default)
    #[default]
    Open,
    /// Open and past their due date
    Overdue,
    Closed,
    All,
}

impl TransactionFilter {
    /// `due` is the end date an open record is measured against, if any
    pub fn matches(&self, closed_at: Option<DateTime<Utc>>, due: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        let open = closed_at.is_none();
        match self {
            TransactionFilter::Open => open,
            TransactionFilter::Overdue => open && due.is_some_and(|d| d < now),
            TransactionFilter::Closed => !open,
            TransactionFilter::All => true,
        }
    }
}

impl std::fmt::Display for TransactionFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionFilter::Open => write!(f, "open"),
            TransactionFilter::Overdue => write!(f, "overdue"),
            TransactionFilter::Closed => write!(f, "closed"),
            TransactionFilter::All => write!(f, "all"),
        }
    }
}

/// Person role filter
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum RoleFilter {
    Unassigned,
    Client,
    Mechanic,
    Employee,
    RentalAgency,
    #[default]
    All,
}

impl RoleFilter {
    pub fn matches(&self, role: &PersonRole) -> bool {
        match self {
            RoleFilter::Unassigned => *role == PersonRole::Unassigned,
            RoleFilter::Client => *role == PersonRole::Client,
            RoleFilter::Mechanic => *role == PersonRole::Mechanic,
            RoleFilter::Employee => matches!(role, PersonRole::Employee { .. }),
            RoleFilter::RentalAgency => *role == PersonRole::RentalAgency,
            RoleFilter::All => true,
        }
    }
}

impl std::fmt::Display for RoleFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoleFilter::Unassigned => write!(f, "unassigned"),
            RoleFilter::Client => write!(f, "client"),
            RoleFilter::Mechanic => write!(f, "mechanic"),
            RoleFilter::Employee => write!(f, "employee"),
            RoleFilter::RentalAgency => write!(f, "rental-agency"),
            RoleFilter::All => write!(f, "all"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_equipment_filter() {
        assert!(EquipmentFilter::Busy.matches(EquipmentStatus::InRepair));
        assert!(!EquipmentFilter::Busy.matches(EquipmentStatus::Available));
        assert!(EquipmentFilter::All.matches(EquipmentStatus::OnLoan));
        assert!(!EquipmentFilter::RentedOut.matches(EquipmentStatus::OnLoan));
    }

    #[test]
    fn test_transaction_filter() {
        let now = Utc::now();
        let past = Some(now - Duration::days(1));
        let future = Some(now + Duration::days(1));

        assert!(TransactionFilter::Open.matches(None, future, now));
        assert!(TransactionFilter::Overdue.matches(None, past, now));
        assert!(!TransactionFilter::Overdue.matches(None, future, now));
        assert!(!TransactionFilter::Overdue.matches(None, None, now));
        assert!(!TransactionFilter::Overdue.matches(Some(now), past, now));
        assert!(TransactionFilter::Closed.matches(Some(now), None, now));
    }

    #[test]
    fn test_role_filter() {
        let employee = PersonRole::Employee { worksite_id: None };
        assert!(RoleFilter::Employee.matches(&employee));
        assert!(!RoleFilter::Client.matches(&employee));
        assert!(RoleFilter::All.matches(&PersonRole::Unassigned));
    }
}
