//! Materiel: custody tracking for equipment
//!
//! Keeps a record of owned equipment and of every transaction that moves it:
//! loans, rentals out, rentals in from agencies, objects borrowed from other
//! people, and repairs, with a small ledger of what they earned or cost.

pub mod cli;
pub mod core;
pub mod entities;
