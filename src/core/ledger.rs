//! Ledger - append-only accounting entries
//!
//! `Ledger::record` is a plain append. The "exactly once" guarantee lives in the
//! `Inventory` setters below: each one looks at the flag it is about to change
//! and at the `*_recorded` marker of the transaction, and only appends on the
//! first qualifying edge.

use std::io::Write;

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::entity::find_mut;
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::inventory::{not_found, Inventory, InventoryError, InventoryResult};
use crate::entities::{AccountingEntry, DepositStatus, EntryKind};

/// Period filter for ledger queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LedgerPeriod {
    #[default]
    All,
    Year(i32),
    Month { year: i32, month: u32 },
}

impl LedgerPeriod {
    pub fn contains(&self, date: DateTime<Utc>) -> bool {
        match *self {
            LedgerPeriod::All => true,
            LedgerPeriod::Year(year) => date.year() == year,
            LedgerPeriod::Month { year, month } => date.year() == year && date.month() == month,
        }
    }
}

/// Totals over a period
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct LedgerSummary {
    pub revenue: f64,
    pub expense: f64,
    pub net: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Ledger {
    entries: Vec<AccountingEntry>,
}

impl Ledger {
    pub fn from_entries(entries: Vec<AccountingEntry>) -> Self {
        Self { entries }
    }

    /// Append an entry dated now
    pub fn record(
        &mut self,
        kind: EntryKind,
        amount: f64,
        description: impl Into<String>,
        equipment_name: Option<String>,
        person_name: Option<String>,
        reference: Option<EntityId>,
    ) -> EntityId {
        let entry = AccountingEntry {
            id: EntityId::new(EntityPrefix::Acc),
            date: Utc::now(),
            kind,
            amount,
            description: description.into(),
            equipment_name,
            person_name,
            reference_id: reference,
        };
        let id = entry.id;
        info!(%id, %kind, amount, "ledger entry recorded");
        self.entries.push(entry);
        id
    }

    /// Append an existing entry unless its id is already present
    pub fn push(&mut self, entry: AccountingEntry) -> bool {
        if self.contains(&entry.id) {
            debug!(id = %entry.id, "ledger entry already present");
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.entries.iter().any(|e| e.id == *id)
    }

    pub fn all(&self) -> &[AccountingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries dated within `period`, oldest first
    pub fn entries(&self, period: LedgerPeriod) -> Vec<&AccountingEntry> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .filter(|e| period.contains(e.date))
            .collect();
        entries.sort_by_key(|e| e.date);
        entries
    }

    /// Entries about one transaction
    pub fn entries_for(&self, reference: &EntityId) -> Vec<&AccountingEntry> {
        self.entries
            .iter()
            .filter(|e| e.reference_id.as_ref() == Some(reference))
            .collect()
    }

    pub fn summary(&self, period: LedgerPeriod) -> LedgerSummary {
        let mut summary = LedgerSummary::default();
        for entry in self.entries(period) {
            if entry.kind.is_revenue() {
                summary.revenue += entry.amount;
            } else {
                summary.expense += entry.amount;
            }
        }
        summary.net = summary.revenue - summary.expense;
        summary
    }

    /// Write the entries of `period` as CSV
    pub fn write_csv<W: Write>(&self, period: LedgerPeriod, writer: W) -> Result<(), csv::Error> {
        let mut wtr = csv::Writer::from_writer(writer);
        for entry in self.entries(period) {
            wtr.serialize(CsvRow::from(entry))?;
        }
        wtr.flush()?;
        Ok(())
    }
}

#[derive(Serialize)]
struct CsvRow<'a> {
    id: String,
    date: String,
    kind: String,
    amount: f64,
    signed_amount: f64,
    description: &'a str,
    equipment: &'a str,
    person: &'a str,
    reference: String,
}

impl<'a> From<&'a AccountingEntry> for CsvRow<'a> {
    fn from(entry: &'a AccountingEntry) -> Self {
        Self {
            id: entry.id.to_string(),
            date: entry.date.format("%Y-%m-%d").to_string(),
            kind: entry.kind.to_string(),
            amount: entry.amount,
            signed_amount: entry.signed_amount(),
            description: &entry.description,
            equipment: entry.equipment_name.as_deref().unwrap_or(""),
            person: entry.person_name.as_deref().unwrap_or(""),
            reference: entry
                .reference_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
        }
    }
}

// =========================================================================
// Ledger-gated updates
// =========================================================================

impl Inventory {
    /// Set the payment-received flag of a rental
    ///
    /// Revenue is recorded on the first false → true edge only. Returns whether
    /// an entry was appended.
    pub fn set_rental_paid(&mut self, rental_id: &EntityId, paid: bool) -> InventoryResult<bool> {
        let rental = self.get_rental(rental_id)?;
        let should_record = paid && !rental.payment_received && !rental.revenue_recorded;
        let (equipment_id, renter_id, amount) =
            (rental.equipment_id, rental.renter_id, rental.total_price);
        let equipment_name = self.equipment_name(&equipment_id);
        let person_name = self.person_name(&renter_id);

        let rental = find_mut(&mut self.rentals, rental_id)
            .ok_or_else(|| not_found("Rental", rental_id))?;
        rental.payment_received = paid;
        if should_record {
            rental.revenue_recorded = true;
            self.ledger.record(
                EntryKind::RentalRevenue,
                amount,
                "Rental payment received",
                equipment_name,
                person_name,
                Some(*rental_id),
            );
        }
        self.touch();
        Ok(should_record)
    }

    /// Settle the renter's deposit
    ///
    /// A kept amount is recorded the first time the deposit leaves the
    /// pending/returned states.
    pub fn settle_rental_deposit(
        &mut self,
        rental_id: &EntityId,
        status: DepositStatus,
    ) -> InventoryResult<bool> {
        let rental = self.get_rental(rental_id)?;
        if let DepositStatus::PartiallyKept { amount } = status {
            if amount <= 0.0 {
                return Err(InventoryError::InvalidValue(format!(
                    "partially kept amount must be positive, got {amount}"
                )));
            }
            if amount > rental.deposit {
                return Err(InventoryError::InvalidValue(format!(
                    "partially kept amount {amount} exceeds the deposit of {}",
                    rental.deposit
                )));
            }
        }
        let kept = status.kept_amount(rental.deposit);
        let should_record = kept > 0.0 && !rental.deposit_recorded;
        let (equipment_id, renter_id) = (rental.equipment_id, rental.renter_id);
        let equipment_name = self.equipment_name(&equipment_id);
        let person_name = self.person_name(&renter_id);

        let rental = find_mut(&mut self.rentals, rental_id)
            .ok_or_else(|| not_found("Rental", rental_id))?;
        rental.deposit_status = status;
        if should_record {
            rental.deposit_recorded = true;
            self.ledger.record(
                EntryKind::DepositKept,
                kept,
                "Deposit kept",
                equipment_name,
                person_name,
                Some(*rental_id),
            );
        }
        self.touch();
        Ok(should_record)
    }

    /// Set the paid flag of a repair; free repairs are always paid
    pub fn set_repair_paid(&mut self, repair_id: &EntityId, paid: bool) -> InventoryResult<bool> {
        let repair = self.get_repair(repair_id)?;
        if repair.free {
            if !paid {
                return Err(InventoryError::InvalidValue(
                    "a free repair cannot be marked unpaid".to_string(),
                ));
            }
            return Ok(false);
        }
        let amount = repair.cost();
        let should_record = paid && !repair.paid && !repair.expense_recorded && amount.is_some();
        if paid && amount.is_none() {
            warn!(repair = %repair_id, "repair paid without a known cost, no expense recorded");
        }
        let equipment_name = self.equipment_name(&repair.equipment_id);
        let person_name = repair.repairer_id.and_then(|id| self.person_name(&id));

        let repair = find_mut(&mut self.repairs, repair_id)
            .ok_or_else(|| not_found("Repair", repair_id))?;
        repair.paid = paid;
        if should_record {
            repair.expense_recorded = true;
            self.ledger.record(
                EntryKind::RepairExpense,
                amount.unwrap_or_default(),
                "Repair paid",
                equipment_name,
                person_name,
                Some(*repair_id),
            );
        }
        self.touch();
        Ok(should_record)
    }

    /// Set the payment-made flag of an incoming rental
    pub fn set_my_rental_paid(&mut self, rental_id: &EntityId, paid: bool) -> InventoryResult<bool> {
        let rental = self.get_my_rental(rental_id)?;
        let should_record = paid && !rental.payment_made && !rental.expense_recorded;
        let amount = rental.total_price;
        let equipment_name = Some(rental.name.clone());
        let person_name = self.person_name(&rental.agency_id);

        let rental = find_mut(&mut self.my_rentals, rental_id)
            .ok_or_else(|| not_found("Incoming rental", rental_id))?;
        rental.payment_made = paid;
        if should_record {
            rental.expense_recorded = true;
            self.ledger.record(
                EntryKind::IncomingRentalExpense,
                amount,
                "Incoming rental paid",
                equipment_name,
                person_name,
                Some(*rental_id),
            );
        }
        self.touch();
        Ok(should_record)
    }

    /// Record part of an incoming rental's deposit as lost
    ///
    /// Each increment is its own ledger entry.
    pub fn record_deposit_lost(&mut self, rental_id: &EntityId, amount: f64) -> InventoryResult<()> {
        let rental = self.get_my_rental(rental_id)?;
        check_deposit_amount(amount, rental.deposit_outstanding())?;
        let equipment_name = Some(rental.name.clone());
        let person_name = self.person_name(&rental.agency_id);

        let rental = find_mut(&mut self.my_rentals, rental_id)
            .ok_or_else(|| not_found("Incoming rental", rental_id))?;
        rental.deposit_lost += amount;
        self.ledger.record(
            EntryKind::DepositLost,
            amount,
            "Deposit lost",
            equipment_name,
            person_name,
            Some(*rental_id),
        );
        self.touch();
        Ok(())
    }

    /// Record part of an incoming rental's deposit as recovered (no ledger entry)
    pub fn record_deposit_recovered(
        &mut self,
        rental_id: &EntityId,
        amount: f64,
    ) -> InventoryResult<()> {
        let outstanding = self.get_my_rental(rental_id)?.deposit_outstanding();
        check_deposit_amount(amount, outstanding)?;
        let rental = find_mut(&mut self.my_rentals, rental_id)
            .ok_or_else(|| not_found("Incoming rental", rental_id))?;
        rental.deposit_recovered += amount;
        debug!(id = %rental_id, amount, "deposit recovered");
        self.touch();
        Ok(())
    }
}

fn check_deposit_amount(amount: f64, outstanding: f64) -> InventoryResult<()> {
    if amount <= 0.0 || amount > outstanding {
        return Err(InventoryError::InvalidValue(format!(
            "deposit amount {amount} must be positive and at most {outstanding}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::quota::QuotaGate;
    use crate::entities::{
        Equipment, MyRental, Person, PricingType, RentalTerms, RepairTerms,
    };
    use chrono::{Duration, TimeZone};

    fn rental_fixture() -> (Inventory, EntityId) {
        let mut inv = Inventory::new(QuotaGate::unlimited());
        let eq = inv.add_equipment(Equipment::new("Excavator", "Heavy")).unwrap();
        let p = inv.add_person(Person::new("Marc", "Blanc")).unwrap();
        let now = Utc::now();
        let rental = inv
            .create_rental(
                &eq,
                &p,
                RentalTerms {
                    start: now,
                    end: now + Duration::days(2),
                    pricing: PricingType::PerDay,
                    unit_price: 150.0,
                    deposit: 500.0,
                },
            )
            .unwrap();
        (inv, rental)
    }

    #[test]
    fn test_rental_revenue_recorded_once_across_toggles() {
        let (mut inv, rental) = rental_fixture();
        assert!(inv.set_rental_paid(&rental, true).unwrap());
        assert!(!inv.set_rental_paid(&rental, false).unwrap());
        assert!(!inv.set_rental_paid(&rental, true).unwrap());

        let entries = inv.ledger().entries_for(&rental);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, EntryKind::RentalRevenue);
        assert_eq!(entries[0].amount, 300.0);
        assert_eq!(entries[0].equipment_name.as_deref(), Some("Excavator"));
        assert_eq!(entries[0].person_name.as_deref(), Some("Marc Blanc"));
        assert!(inv.get_rental(&rental).unwrap().payment_received);
    }

    #[test]
    fn test_deposit_kept_partially_once() {
        let (mut inv, rental) = rental_fixture();
        assert!(!inv
            .settle_rental_deposit(&rental, DepositStatus::Returned)
            .unwrap());
        assert!(inv
            .settle_rental_deposit(&rental, DepositStatus::PartiallyKept { amount: 120.0 })
            .unwrap());
        assert!(!inv
            .settle_rental_deposit(&rental, DepositStatus::Kept)
            .unwrap());

        let summary = inv.ledger().summary(LedgerPeriod::All);
        assert_eq!(summary.revenue, 120.0);
        assert_eq!(
            inv.get_rental(&rental).unwrap().deposit_status,
            DepositStatus::Kept
        );
    }

    #[test]
    fn test_partial_deposit_must_fit_the_deposit() {
        let (mut inv, rental) = rental_fixture();
        for amount in [0.0, -5.0, 500.5] {
            let result =
                inv.settle_rental_deposit(&rental, DepositStatus::PartiallyKept { amount });
            assert!(matches!(result, Err(InventoryError::InvalidValue(_))));
        }
        assert_eq!(
            inv.get_rental(&rental).unwrap().deposit_status,
            DepositStatus::Pending
        );
        assert!(inv.ledger().is_empty());

        // The whole deposit is accepted as a partial amount
        assert!(inv
            .settle_rental_deposit(&rental, DepositStatus::PartiallyKept { amount: 500.0 })
            .unwrap());
        assert_eq!(inv.ledger().summary(LedgerPeriod::All).revenue, 500.0);
    }

    #[test]
    fn test_repair_without_cost_records_nothing() {
        let mut inv = Inventory::new(QuotaGate::unlimited());
        let eq = inv.add_equipment(Equipment::new("Pump", "Water")).unwrap();
        let now = Utc::now();
        let repair = inv
            .create_repair(&eq, now, RepairTerms::default(), None)
            .unwrap();
        assert!(!inv.set_repair_paid(&repair, true).unwrap());
        assert!(inv.get_repair(&repair).unwrap().paid);
        assert!(inv.ledger().is_empty());

        // Once a cost is known, paying again records it
        inv.complete_repair(&repair, now, Some(60.0)).unwrap();
        inv.set_repair_paid(&repair, false).unwrap();
        assert!(inv.set_repair_paid(&repair, true).unwrap());
        assert_eq!(inv.ledger().summary(LedgerPeriod::All).expense, 60.0);
    }

    #[test]
    fn test_free_repair_never_records() {
        let mut inv = Inventory::new(QuotaGate::unlimited());
        let eq = inv.add_equipment(Equipment::new("Pump", "Water")).unwrap();
        let repair = inv
            .create_repair(
                &eq,
                Utc::now(),
                RepairTerms {
                    free: true,
                    ..Default::default()
                },
                None,
            )
            .unwrap();
        assert!(!inv.set_repair_paid(&repair, true).unwrap());
        assert!(inv.set_repair_paid(&repair, false).is_err());
        assert!(inv.ledger().is_empty());
    }

    #[test]
    fn test_repair_expense_uses_final_cost() {
        let mut inv = Inventory::new(QuotaGate::unlimited());
        let eq = inv.add_equipment(Equipment::new("Pump", "Water")).unwrap();
        let now = Utc::now();
        let repair = inv
            .create_repair(
                &eq,
                now,
                RepairTerms {
                    estimated_cost: Some(200.0),
                    ..Default::default()
                },
                None,
            )
            .unwrap();
        inv.complete_repair(&repair, now, Some(180.0)).unwrap();
        assert!(inv.set_repair_paid(&repair, true).unwrap());
        inv.set_repair_paid(&repair, false).unwrap();
        inv.set_repair_paid(&repair, true).unwrap();

        let summary = inv.ledger().summary(LedgerPeriod::All);
        assert_eq!(summary.expense, 180.0);
        assert_eq!(summary.net, -180.0);
    }

    #[test]
    fn test_incoming_rental_deposit_flow() {
        let mut inv = Inventory::new(QuotaGate::unlimited());
        let agency = inv.add_person(Person::new("Rent", "All")).unwrap();
        let now = Utc::now();
        let mut rental = MyRental::new(
            "Scissor lift",
            agency,
            now,
            now + Duration::days(1),
            PricingType::Flat,
            90.0,
        );
        rental.deposit = 300.0;
        let id = inv.add_my_rental(rental).unwrap();

        assert!(inv.set_my_rental_paid(&id, true).unwrap());
        inv.record_deposit_lost(&id, 50.0).unwrap();
        inv.record_deposit_lost(&id, 25.0).unwrap();
        inv.record_deposit_recovered(&id, 200.0).unwrap();
        assert!(inv.record_deposit_recovered(&id, 100.0).is_err());

        let r = inv.get_my_rental(&id).unwrap();
        assert_eq!(r.deposit_lost, 75.0);
        assert_eq!(r.deposit_recovered, 200.0);
        assert_eq!(r.deposit_outstanding(), 25.0);

        let lost: Vec<_> = inv
            .ledger()
            .all()
            .iter()
            .filter(|e| e.kind == EntryKind::DepositLost)
            .collect();
        assert_eq!(lost.len(), 2);
        assert_eq!(inv.ledger().summary(LedgerPeriod::All).expense, 165.0);
    }

    #[test]
    fn test_period_filter() {
        let mut ledger = Ledger::default();
        let entry = |year, month, amount| AccountingEntry {
            id: EntityId::new(EntityPrefix::Acc),
            date: Utc.with_ymd_and_hms(year, month, 10, 12, 0, 0).unwrap(),
            kind: EntryKind::RentalRevenue,
            amount,
            description: String::new(),
            equipment_name: None,
            person_name: None,
            reference_id: None,
        };
        let a = entry(2023, 12, 10.0);
        let b = entry(2024, 1, 20.0);
        let c = entry(2024, 2, 40.0);
        ledger.push(c);
        ledger.push(a.clone());
        ledger.push(b);
        assert!(!ledger.push(a));

        assert_eq!(ledger.entries(LedgerPeriod::All).len(), 3);
        assert_eq!(ledger.summary(LedgerPeriod::Year(2024)).revenue, 60.0);
        assert_eq!(
            ledger
                .summary(LedgerPeriod::Month {
                    year: 2024,
                    month: 1
                })
                .revenue,
            20.0
        );
        // Oldest first
        assert_eq!(ledger.entries(LedgerPeriod::All)[0].amount, 10.0);
    }

    #[test]
    fn test_csv_export() {
        let (mut inv, rental) = rental_fixture();
        inv.set_rental_paid(&rental, true).unwrap();
        let mut out = Vec::new();
        inv.ledger().write_csv(LedgerPeriod::All, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("id,date,kind,amount,signed_amount,description,equipment,person,reference")
        );
        let row = lines.next().unwrap();
        assert!(row.contains("rental_revenue"));
        assert!(row.contains("Excavator"));
        assert!(row.contains(&rental.to_string()));
    }
}
