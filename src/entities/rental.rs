//! Rental entity type - equipment rented out, and the pricing shared with
//! incoming rentals

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::{Entity, Lifecycle};
use crate::core::identity::{EntityId, EntityPrefix};

/// How a rental is priced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingType {
    /// One price for the whole period
    #[default]
    Flat,
    PerDay,
    PerWeek,
    PerMonth,
}

impl PricingType {
    /// Everything except flat pricing depends on the duration
    pub fn is_unit_based(&self) -> bool {
        !matches!(self, PricingType::Flat)
    }

    /// Price for the period `[start, end]`
    ///
    /// Partial units are billed as whole units, with a minimum of one.
    pub fn total_for(&self, unit_price: f64, start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
        let hours = (end - start).num_hours().max(0);
        let days = ((hours + 23) / 24).max(1);
        let units = match self {
            PricingType::Flat => return unit_price,
            PricingType::PerDay => days,
            PricingType::PerWeek => (days + 6) / 7,
            PricingType::PerMonth => (days + 29) / 30,
        };
        unit_price * units as f64
    }
}

impl std::fmt::Display for PricingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PricingType::Flat => write!(f, "flat"),
            PricingType::PerDay => write!(f, "per_day"),
            PricingType::PerWeek => write!(f, "per_week"),
            PricingType::PerMonth => write!(f, "per_month"),
        }
    }
}

/// What happened to the renter's deposit
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DepositStatus {
    /// Still held, not settled
    #[default]
    Pending,
    Returned,
    Kept,
    PartiallyKept { amount: f64 },
}

impl DepositStatus {
    /// Amount kept out of a deposit of `deposit`
    ///
    /// A partial amount is taken as given; it is checked against the deposit
    /// when the status is set.
    pub fn kept_amount(&self, deposit: f64) -> f64 {
        match self {
            DepositStatus::Pending | DepositStatus::Returned => 0.0,
            DepositStatus::Kept => deposit,
            DepositStatus::PartiallyKept { amount } => *amount,
        }
    }
}

/// Terms used when creating a rental
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RentalTerms {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub pricing: PricingType,
    pub unit_price: f64,
    pub deposit: f64,
}

impl RentalTerms {
    pub fn total(&self) -> f64 {
        self.pricing.total_for(self.unit_price, self.start, self.end)
    }
}

/// A Rental of one equipment item to a renter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rental {
    pub id: EntityId,

    pub equipment_id: EntityId,

    pub renter_id: EntityId,

    #[serde(with = "crate::core::dates")]
    pub start: DateTime<Utc>,

    #[serde(with = "crate::core::dates")]
    pub end: DateTime<Utc>,

    /// Actual return; `None` while the rental is active
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

    #[serde(default)]
    pub total_price: f64,

    #[serde(default)]
    pub deposit: f64,

    #[serde(default)]
    pub deposit_status: DepositStatus,

    #[serde(default)]
    pub payment_received: bool,

    /// Revenue already written to the ledger
    #[serde(default)]
    pub revenue_recorded: bool,

    /// Kept deposit already written to the ledger
    #[serde(default)]
    pub deposit_recorded: bool,

    /// The renter sub-renting this item onward
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_rental_id: Option<EntityId>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,

    #[serde(with = "crate::core::dates")]
    pub created: DateTime<Utc>,
}

impl Entity for Rental {
    const PREFIX: EntityPrefix = EntityPrefix::Rent;
    const LIST_KEY: &'static str = "rentals";

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

impl Lifecycle for Rental {
    fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.returned_at
    }
}

impl Rental {
    pub fn new(equipment_id: EntityId, renter_id: EntityId, terms: RentalTerms) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Rent),
            equipment_id,
            renter_id,
            start: terms.start,
            end: terms.end,
            returned_at: None,
            pricing: terms.pricing,
            unit_price: terms.unit_price,
            total_price: terms.total(),
            deposit: terms.deposit,
            deposit_status: DepositStatus::Pending,
            payment_received: false,
            revenue_recorded: false,
            deposit_recorded: false,
            sub_rental_id: None,
            notes: String::new(),
            created: Utc::now(),
        }
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_open() && self.end < now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, d, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_flat_ignores_duration() {
        assert_eq!(PricingType::Flat.total_for(120.0, day(1), day(20)), 120.0);
    }

    #[test]
    fn test_unit_pricing_rounds_up() {
        assert_eq!(PricingType::PerDay.total_for(10.0, day(1), day(4)), 30.0);
        assert_eq!(
            PricingType::PerDay.total_for(10.0, day(1), day(4) + Duration::hours(2)),
            40.0
        );
        assert_eq!(PricingType::PerWeek.total_for(50.0, day(1), day(9)), 100.0);
        assert_eq!(PricingType::PerMonth.total_for(300.0, day(1), day(20)), 300.0);
    }

    #[test]
    fn test_minimum_one_unit() {
        assert_eq!(PricingType::PerDay.total_for(10.0, day(1), day(1)), 10.0);
    }

    #[test]
    fn test_deposit_kept_amount() {
        assert_eq!(DepositStatus::Pending.kept_amount(200.0), 0.0);
        assert_eq!(DepositStatus::Kept.kept_amount(200.0), 200.0);
        assert_eq!(
            DepositStatus::PartiallyKept { amount: 50.0 }.kept_amount(200.0),
            50.0
        );
    }
}
