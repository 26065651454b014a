//! `materiel export` / `materiel import` - Moving data between installations

use std::fs;
use std::path::PathBuf;

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::output::{print_done, print_structured};
use crate::cli::{CommandContext, GlobalOpts};

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    /// Output file (default stdout)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// Export file from this or an older version
    pub file: PathBuf,
}

/// Write the whole inventory as one JSON document
pub fn run_export(args: ExportArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = CommandContext::open(global)?;
    let json = ctx.read(|inv| inv.export_json())?;
    match &args.output {
        Some(path) => {
            fs::write(path, json).into_diagnostic()?;
            print_done(format!("Exported to {}", style(path.display()).cyan()));
        }
        None => println!("{json}"),
    }
    ctx.finish()
}

/// Merge an export file into the inventory, keeping existing records
pub fn run_import(args: ImportArgs, global: &GlobalOpts) -> Result<()> {
    let content = fs::read_to_string(&args.file).into_diagnostic()?;
    let ctx = CommandContext::open(global)?;
    let report = ctx.write(|inv| inv.import_json(&content))?;

    if !print_structured(&report, global.format)? {
        print_done(format!(
            "Imported {} ({}, dates as {})",
            style(args.file.display()).cyan(),
            report.shape,
            report.strategy
        ));
        for (list, count) in &report.counts {
            if count.added == 0 && count.skipped == 0 {
                continue;
            }
            println!(
                "   {:<18} {} added, {} skipped",
                list,
                style(count.added).green(),
                style(count.skipped).dim()
            );
        }
        println!(
            "   {} records added, {} already present",
            report.added(),
            report.skipped()
        );
    }
    ctx.finish()
}
