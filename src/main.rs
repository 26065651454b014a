use clap::Parser;
use miette::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use materiel::cli::commands;
use materiel::cli::{Cli, Commands};
use materiel::core::config::{Config, LOG_ENV};

fn main() -> Result<()> {
    // Install miette's fancy error handler for beautiful diagnostics
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    let global = &cli.global;
    match cli.command {
        Commands::Equipment(cmd) => commands::equipment::run(cmd, global),
        Commands::Person(cmd) => commands::person::run(cmd, global),
        Commands::Storage(cmd) => commands::storage::run(cmd, global),
        Commands::Worksite(cmd) => commands::worksite::run(cmd, global),
        Commands::Loan(cmd) => commands::loan::run(cmd, global),
        Commands::Borrow(cmd) => commands::borrow::run(cmd, global),
        Commands::Rental(cmd) => commands::rental::run(cmd, global),
        Commands::Incoming(cmd) => commands::incoming::run(cmd, global),
        Commands::Repair(cmd) => commands::repair::run(cmd, global),
        Commands::Ledger(cmd) => commands::ledger::run(cmd, global),
        Commands::Export(args) => commands::transfer::run_export(args, global),
        Commands::Import(args) => commands::transfer::run_import(args, global),
        Commands::Quota(args) => commands::quota::run(args, global),
        Commands::Completions(args) => commands::completions::run(args),
    }
}

/// `MATERIEL_LOG` wins, then `-v`, then the configured level
fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        let level = match verbose {
            0 => Config::try_load()
                .map(|c| c.log_level)
                .unwrap_or_else(|_| "warn".to_string()),
            1 => "info".to_string(),
            _ => "debug".to_string(),
        };
        EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("warn"))
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}
