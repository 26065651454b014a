//! Command-line argument definitions

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use crate::cli::commands::{
    borrow::BorrowCommands, equipment::EquipmentCommands, incoming::IncomingCommands,
    ledger::LedgerCommands, loan::LoanCommands, person::PersonCommands, rental::RentalCommands,
    repair::RepairCommands, storage::StorageCommands, transfer::ExportArgs, transfer::ImportArgs,
    worksite::WorksiteCommands,
};
use crate::cli::commands::completions::CompletionsArgs;
use crate::cli::commands::quota::QuotaArgs;

#[derive(Parser, Debug)]
#[command(name = "materiel")]
#[command(author, version, about = "Track who holds your equipment")]
#[command(long_about = "Keep track of owned equipment, loans, rentals in and out, \
objects borrowed from others, repairs and the money they bring in or cost.")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Args, Debug, Clone)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, value_enum, default_value_t = OutputFormat::Auto)]
    pub format: OutputFormat,

    /// Data directory (overrides config and MATERIEL_DATA_DIR)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Table for lists, details for single records
    #[default]
    Auto,
    /// Bordered table
    Table,
    /// Tab-separated values
    Tsv,
    Json,
    Yaml,
    /// Full ids only, one per line
    Id,
    /// Short ids only (MAT@1)
    ShortId,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Owned equipment
    #[command(subcommand, visible_alias = "eq")]
    Equipment(EquipmentCommands),

    /// People: clients, mechanics, employees, rental agencies
    #[command(subcommand)]
    Person(PersonCommands),

    /// Storage locations
    #[command(subcommand)]
    Storage(StorageCommands),

    /// Worksites
    #[command(subcommand)]
    Worksite(WorksiteCommands),

    /// Loans of equipment to people
    #[command(subcommand)]
    Loan(LoanCommands),

    /// Objects borrowed from other people
    #[command(subcommand)]
    Borrow(BorrowCommands),

    /// Equipment rented out
    #[command(subcommand)]
    Rental(RentalCommands),

    /// Equipment rented in from an agency
    #[command(subcommand)]
    Incoming(IncomingCommands),

    /// Repairs
    #[command(subcommand)]
    Repair(RepairCommands),

    /// Accounting entries
    #[command(subcommand)]
    Ledger(LedgerCommands),

    /// Export every record as one JSON document
    Export(ExportArgs),

    /// Merge records from an exported JSON document
    Import(ImportArgs),

    /// Show creation limits and usage
    Quota(QuotaArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}
