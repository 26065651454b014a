//! Entity type definitions

pub mod accounting;
pub mod borrow;
pub mod equipment;
pub mod loan;
pub mod person;
pub mod rental;
pub mod repair;
pub mod site;

pub use accounting::{AccountingEntry, EntryKind};
pub use borrow::{Borrow, DerivedLinks, MyRental};
pub use equipment::Equipment;
pub use loan::Loan;
pub use person::{Person, PersonRole};
pub use rental::{DepositStatus, PricingType, Rental, RentalTerms};
pub use repair::{Repair, RepairOrigin, RepairTerms};
pub use site::{StorageLocation, Worksite, WorksiteStatus};
