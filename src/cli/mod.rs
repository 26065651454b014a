//! CLI module - argument parsing and command dispatch

pub mod args;
pub mod commands;
pub mod context;
pub mod filters;
pub mod helpers;
pub mod output;
pub mod table;

pub use args::{Cli, Commands, GlobalOpts, OutputFormat};
pub use context::CommandContext;
pub use filters::{EquipmentFilter, RoleFilter, TransactionFilter};
