//! Creation quotas per entity category
//!
//! Quotas count how many records were ever created in a category, not how many
//! exist now. Deleting a record never frees quota. A premium installation
//! bypasses every limit.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Entity categories subject to a creation quota
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaCategory {
    Equipment,
    Person,
    Storage,
    Worksite,
    Loan,
    Borrow,
    Rental,
    MyRental,
    Repair,
}

impl QuotaCategory {
    pub fn all() -> &'static [QuotaCategory] {
        &[
            QuotaCategory::Equipment,
            QuotaCategory::Person,
            QuotaCategory::Storage,
            QuotaCategory::Worksite,
            QuotaCategory::Loan,
            QuotaCategory::Borrow,
            QuotaCategory::Rental,
            QuotaCategory::MyRental,
            QuotaCategory::Repair,
        ]
    }

    /// Whether records of this category are opened and later closed
    pub fn has_lifecycle(&self) -> bool {
        matches!(
            self,
            QuotaCategory::Loan
                | QuotaCategory::Borrow
                | QuotaCategory::Rental
                | QuotaCategory::MyRental
                | QuotaCategory::Repair
        )
    }
}

impl std::fmt::Display for QuotaCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuotaCategory::Equipment => write!(f, "equipment"),
            QuotaCategory::Person => write!(f, "person"),
            QuotaCategory::Storage => write!(f, "storage"),
            QuotaCategory::Worksite => write!(f, "worksite"),
            QuotaCategory::Loan => write!(f, "loan"),
            QuotaCategory::Borrow => write!(f, "borrow"),
            QuotaCategory::Rental => write!(f, "rental"),
            QuotaCategory::MyRental => write!(f, "my_rental"),
            QuotaCategory::Repair => write!(f, "repair"),
        }
    }
}

/// Free-tier creation limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaLimits {
    pub equipment: u64,
    pub person: u64,
    pub storage: u64,
    pub worksite: u64,
    pub loan: u64,
    pub borrow: u64,
    pub rental: u64,
    pub my_rental: u64,
    pub repair: u64,
}

impl Default for QuotaLimits {
    fn default() -> Self {
        Self {
            equipment: 20,
            person: 20,
            storage: 5,
            worksite: 3,
            loan: 15,
            borrow: 10,
            rental: 10,
            my_rental: 10,
            repair: 10,
        }
    }
}

impl QuotaLimits {
    /// Same limit for every category
    pub fn uniform(limit: u64) -> Self {
        Self {
            equipment: limit,
            person: limit,
            storage: limit,
            worksite: limit,
            loan: limit,
            borrow: limit,
            rental: limit,
            my_rental: limit,
            repair: limit,
        }
    }

    pub fn limit(&self, category: QuotaCategory) -> u64 {
        match category {
            QuotaCategory::Equipment => self.equipment,
            QuotaCategory::Person => self.person,
            QuotaCategory::Storage => self.storage,
            QuotaCategory::Worksite => self.worksite,
            QuotaCategory::Loan => self.loan,
            QuotaCategory::Borrow => self.borrow,
            QuotaCategory::Rental => self.rental,
            QuotaCategory::MyRental => self.my_rental,
            QuotaCategory::Repair => self.repair,
        }
    }
}

/// Lifetime creation counters, persisted separately from the entity lists
pub type LifetimeCounters = BTreeMap<QuotaCategory, u64>;

/// Gate consulted before any record is admitted
#[derive(Debug, Clone, Default)]
pub struct QuotaGate {
    premium: bool,
    limits: QuotaLimits,
    counters: LifetimeCounters,
}

impl QuotaGate {
    pub fn new(premium: bool, limits: QuotaLimits) -> Self {
        Self {
            premium,
            limits,
            counters: LifetimeCounters::new(),
        }
    }

    /// Gate with no effective limit
    pub fn unlimited() -> Self {
        Self::new(true, QuotaLimits::default())
    }

    pub fn with_counters(mut self, counters: LifetimeCounters) -> Self {
        self.counters = counters;
        self
    }

    pub fn is_premium(&self) -> bool {
        self.premium
    }

    pub fn limits(&self) -> &QuotaLimits {
        &self.limits
    }

    pub fn counters(&self) -> &LifetimeCounters {
        &self.counters
    }

    /// Number of records ever created in `category`
    pub fn lifetime(&self, category: QuotaCategory) -> u64 {
        self.counters.get(&category).copied().unwrap_or(0)
    }

    /// Premium, or still below the free limit
    pub fn can_create(&self, category: QuotaCategory) -> bool {
        self.premium || self.lifetime(category) < self.limits.limit(category)
    }

    /// Remaining creations before the limit (None when premium)
    pub fn remaining(&self, category: QuotaCategory) -> Option<u64> {
        if self.premium {
            None
        } else {
            Some(
                self.limits
                    .limit(category)
                    .saturating_sub(self.lifetime(category)),
            )
        }
    }

    /// Count one successful creation
    pub fn record_creation(&mut self, category: QuotaCategory) {
        let counter = self.counters.entry(category).or_insert(0);
        *counter += 1;
        debug!(%category, lifetime = *counter, "quota counter incremented");
    }

    /// Seed a zero counter from existing data (first start with imported data)
    ///
    /// Returns true when the counter was changed.
    pub fn seed_if_zero(&mut self, category: QuotaCategory, existing: u64) -> bool {
        if self.lifetime(category) == 0 && existing > 0 {
            self.counters.insert(category, existing);
            debug!(%category, existing, "quota counter seeded from existing records");
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_closes_exactly_at_limit() {
        let mut gate = QuotaGate::new(false, QuotaLimits::uniform(3));
        for _ in 0..3 {
            assert!(gate.can_create(QuotaCategory::Loan));
            gate.record_creation(QuotaCategory::Loan);
        }
        assert_eq!(gate.lifetime(QuotaCategory::Loan), 3);
        assert!(!gate.can_create(QuotaCategory::Loan));
        assert_eq!(gate.remaining(QuotaCategory::Loan), Some(0));
        // Other categories are independent
        assert!(gate.can_create(QuotaCategory::Rental));
    }

    #[test]
    fn test_premium_overrides_limits() {
        let mut gate = QuotaGate::new(true, QuotaLimits::uniform(0));
        assert!(gate.can_create(QuotaCategory::Equipment));
        gate.record_creation(QuotaCategory::Equipment);
        assert!(gate.can_create(QuotaCategory::Equipment));
        assert_eq!(gate.remaining(QuotaCategory::Equipment), None);
    }

    #[test]
    fn test_seed_only_when_zero() {
        let mut gate = QuotaGate::new(false, QuotaLimits::default());
        assert!(gate.seed_if_zero(QuotaCategory::Person, 4));
        assert_eq!(gate.lifetime(QuotaCategory::Person), 4);
        assert!(!gate.seed_if_zero(QuotaCategory::Person, 9));
        assert_eq!(gate.lifetime(QuotaCategory::Person), 4);
        assert!(!gate.seed_if_zero(QuotaCategory::Loan, 0));
    }

    #[test]
    fn test_lifecycle_categories() {
        let with_lifecycle: Vec<_> = QuotaCategory::all()
            .iter()
            .filter(|c| c.has_lifecycle())
            .map(|c| c.to_string())
            .collect();
        assert_eq!(with_lifecycle, ["loan", "borrow", "rental", "my_rental", "repair"]);
    }

    #[test]
    fn test_counters_roundtrip_json() {
        let mut gate = QuotaGate::new(false, QuotaLimits::default());
        gate.record_creation(QuotaCategory::MyRental);
        let json = serde_json::to_string(gate.counters()).unwrap();
        assert_eq!(json, r#"{"my_rental":1}"#);
        let back: LifetimeCounters = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get(&QuotaCategory::MyRental), Some(&1));
    }
}
