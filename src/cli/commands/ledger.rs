//! `materiel ledger` command - Revenue and expense entries

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{format_money, truncate_str};
use crate::cli::output::{effective_format, print_done, print_field, print_rule, print_structured};
use crate::cli::table::{TableFormatter, TableRow};
use crate::cli::{CommandContext, GlobalOpts};
use crate::core::ledger::LedgerPeriod;
use crate::entities::AccountingEntry;

#[derive(Subcommand, Debug)]
pub enum LedgerCommands {
    /// List ledger entries
    List(PeriodArgs),

    /// Revenue, expense and net over a period
    Summary(PeriodArgs),

    /// Export entries as CSV
    Csv(CsvArgs),
}

#[derive(clap::Args, Debug, Clone, Copy)]
pub struct PeriodArgs {
    /// Only entries of this year
    #[arg(long, short = 'y')]
    pub year: Option<i32>,

    /// Only entries of this month (1-12, needs --year)
    #[arg(long, short = 'm', requires = "year", value_parser = clap::value_parser!(u32).range(1..=12))]
    pub month: Option<u32>,
}

impl PeriodArgs {
    pub fn period(&self) -> LedgerPeriod {
        match (self.year, self.month) {
            (Some(year), Some(month)) => LedgerPeriod::Month { year, month },
            (Some(year), None) => LedgerPeriod::Year(year),
            _ => LedgerPeriod::All,
        }
    }

    fn label(&self) -> String {
        match (self.year, self.month) {
            (Some(year), Some(month)) => format!("{year}-{month:02}"),
            (Some(year), None) => year.to_string(),
            _ => "all time".to_string(),
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct CsvArgs {
    #[command(flatten)]
    pub period: PeriodArgs,

    /// Output file (default stdout)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

const COLUMNS: &[&str] = &["DATE", "KIND", "AMOUNT", "EQUIPMENT", "PERSON", "DESCRIPTION"];

/// Run a ledger subcommand
pub fn run(cmd: LedgerCommands, global: &GlobalOpts) -> Result<()> {
    let mut ctx = CommandContext::open(global)?;
    match cmd {
        LedgerCommands::List(args) => run_list(&mut ctx, args, global)?,
        LedgerCommands::Summary(args) => {
            let summary = ctx.read(|inv| inv.ledger().summary(args.period()));
            if !print_structured(&summary, global.format)? {
                print_rule();
                print_field("Period", args.label());
                print_field("Revenue", style(format_money(summary.revenue)).green());
                print_field("Expense", style(format_money(summary.expense)).red());
                let net = format_money(summary.net);
                if summary.net < 0.0 {
                    print_field("Net", style(net).red().bold());
                } else {
                    print_field("Net", style(net).bold());
                }
                print_rule();
            }
        }
        LedgerCommands::Csv(args) => {
            let period = args.period.period();
            match &args.output {
                Some(path) => {
                    let file = File::create(path).into_diagnostic()?;
                    let written = ctx.read(|inv| {
                        inv.ledger()
                            .write_csv(period, BufWriter::new(file))
                            .map(|()| inv.ledger().entries(period).len())
                    });
                    let count = written.into_diagnostic()?;
                    print_done(format!("Wrote {} entries to {}", count, style(path.display()).cyan()));
                }
                None => {
                    ctx.read(|inv| inv.ledger().write_csv(period, io::stdout().lock()))
                        .into_diagnostic()?;
                }
            }
        }
    }
    ctx.finish()
}

fn run_list(ctx: &mut CommandContext, args: PeriodArgs, global: &GlobalOpts) -> Result<()> {
    let entries: Vec<AccountingEntry> =
        ctx.read(|inv| inv.ledger().entries(args.period()).into_iter().cloned().collect());

    if entries.is_empty() {
        println!("No ledger entries found.");
        return Ok(());
    }

    let format = effective_format(global.format, true);
    if print_structured(&entries, format)? {
        return Ok(());
    }
    let rows: Vec<TableRow> = ctx.with_aliases(|_, short_ids| {
        entries
            .iter()
            .map(|e| {
                TableRow::new(e.id, short_ids)
                    .date(e.date)
                    .cell(e.kind.to_string())
                    .money(e.signed_amount())
                    .cell(e.equipment_name.clone().unwrap_or_else(|| "-".into()))
                    .cell(e.person_name.clone().unwrap_or_else(|| "-".into()))
                    .cell(truncate_str(&e.description, 40))
            })
            .collect()
    });
    TableFormatter::new(COLUMNS, "ledger entry").output(rows, format);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_from_args() {
        let all = PeriodArgs { year: None, month: None };
        assert_eq!(all.period(), LedgerPeriod::All);
        assert_eq!(all.label(), "all time");

        let year = PeriodArgs { year: Some(2024), month: None };
        assert_eq!(year.period(), LedgerPeriod::Year(2024));

        let month = PeriodArgs { year: Some(2024), month: Some(3) };
        assert_eq!(month.period(), LedgerPeriod::Month { year: 2024, month: 3 });
        assert_eq!(month.label(), "2024-03");
    }
}
