//! CLI command implementations

pub mod borrow;
pub mod completions;
pub mod equipment;
pub mod incoming;
pub mod ledger;
pub mod loan;
pub mod owner;
pub mod person;
pub mod quota;
pub mod rental;
pub mod repair;
pub mod shared;
pub mod storage;
pub mod transfer;
pub mod worksite;
