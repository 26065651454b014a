//! `materiel repair` command - Equipment sent to repair

use chrono::{DateTime, Utc};
use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::commands::shared::RepairTermsArgs;
use crate::cli::filters::TransactionFilter;
use crate::cli::helpers::{format_date, format_money, format_opt_date, parse_amount, parse_date};
use crate::cli::output::{effective_format, print_created, print_done, print_field, print_rule, print_structured};
use crate::cli::table::{TableFormatter, TableRow};
use crate::cli::{CommandContext, GlobalOpts};
use crate::core::inventory::Inventory;
use crate::entities::{Repair, RepairOrigin};

#[derive(Subcommand, Debug)]
pub enum RepairCommands {
    /// List repairs
    List(ListArgs),

    /// Send an item to repair
    New(NewArgs),

    /// Show repair details
    Show(IdArgs),

    /// Mark a repair completed
    Complete(CompleteArgs),

    /// Mark a repair as paid (records an expense once)
    Paid(PaidArgs),

    /// Delete a repair record
    Delete(IdArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Which repairs to show
    #[arg(long, short = 's', default_value = "open")]
    pub state: TransactionFilter,

    /// Only repairs not paid yet
    #[arg(long)]
    pub unpaid: bool,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Equipment ID or short ID (MAT@N)
    #[arg(long, short = 'e')]
    pub equipment: String,

    #[command(flatten)]
    pub terms: RepairTermsArgs,

    /// Loan the damage was found on (LOAN@N)
    #[arg(long, conflicts_with = "from_rental")]
    pub from_loan: Option<String>,

    /// Rental the damage was found on (RENT@N)
    #[arg(long)]
    pub from_rental: Option<String>,

    /// Start date (default now)
    #[arg(long, value_parser = parse_date)]
    pub start: Option<DateTime<Utc>>,
}

#[derive(clap::Args, Debug)]
pub struct IdArgs {
    /// Repair ID or short ID (REP@N)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct CompleteArgs {
    /// Repair ID or short ID (REP@N)
    pub id: String,

    /// Final cost (ignored for free repairs)
    #[arg(long, value_parser = parse_amount)]
    pub cost: Option<f64>,

    /// Completion date (default now)
    #[arg(long, value_parser = parse_date)]
    pub at: Option<DateTime<Utc>>,
}

#[derive(clap::Args, Debug)]
pub struct PaidArgs {
    /// Repair ID or short ID (REP@N)
    pub id: String,

    /// Clear the paid flag instead
    #[arg(long)]
    pub unpaid: bool,
}

const COLUMNS: &[&str] = &["EQUIPMENT", "REPAIRER", "START", "EXPECTED", "DONE", "COST", "PAID"];

/// Run a repair subcommand
pub fn run(cmd: RepairCommands, global: &GlobalOpts) -> Result<()> {
    let mut ctx = CommandContext::open(global)?;
    match cmd {
        RepairCommands::List(args) => run_list(&mut ctx, args, global)?,
        RepairCommands::New(args) => run_new(&mut ctx, args, global)?,
        RepairCommands::Show(args) => run_show(&mut ctx, args, global)?,
        RepairCommands::Complete(args) => {
            let id = ctx.resolve(&args.id, Inventory::repairs)?;
            let at = args.at.unwrap_or_else(Utc::now);
            ctx.write(|inv| inv.complete_repair(&id, at, args.cost))?;
            print_done(format!("Repair {} completed", style(ctx.display_id(&id)).cyan()));
        }
        RepairCommands::Paid(args) => {
            let id = ctx.resolve(&args.id, Inventory::repairs)?;
            let recorded = ctx.write(|inv| inv.set_repair_paid(&id, !args.unpaid))?;
            let state = if args.unpaid { "unpaid" } else { "paid" };
            print_done(format!("Marked {} {}", style(ctx.display_id(&id)).cyan(), state));
            if recorded {
                println!("   {}", style("expense recorded in the ledger").dim());
            }
        }
        RepairCommands::Delete(args) => {
            let id = ctx.resolve(&args.id, Inventory::repairs)?;
            ctx.write(|inv| inv.delete_repair(&id))?;
            print_done(format!("Deleted repair {}", style(args.id).cyan()));
        }
    }
    ctx.finish()
}

fn run_new(ctx: &mut CommandContext, args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let equipment = ctx.resolve(&args.equipment, Inventory::equipment)?;
    let terms = args.terms.terms(ctx)?;
    let origin = match (&args.from_loan, &args.from_rental) {
        (Some(loan), _) => Some(RepairOrigin::Loan(ctx.resolve(loan, Inventory::loans)?)),
        (None, Some(rental)) => Some(RepairOrigin::Rental(ctx.resolve(rental, Inventory::rentals)?)),
        (None, None) => None,
    };
    let start = args.start.unwrap_or_else(Utc::now);

    let id = ctx.write(|inv| inv.create_repair(&equipment, start, terms, origin))?;
    let title = ctx.read(|inv| inv.equipment_name(&equipment)).unwrap_or_default();
    let short_id = ctx.alias(id);
    print_created("repair", &id, &short_id, &title, global);
    Ok(())
}

fn run_list(ctx: &mut CommandContext, args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let now = Utc::now();
    let mut repairs: Vec<Repair> = ctx.read(|inv| {
        let candidates: Vec<&Repair> = match args.state {
            TransactionFilter::Overdue => inv.overdue_repairs(now),
            state => inv
                .repairs()
                .iter()
                .filter(|r| state.matches(r.completed_at, r.expected_end, now))
                .collect(),
        };
        candidates
            .into_iter()
            .filter(|r| !args.unpaid || !r.paid)
            .cloned()
            .collect()
    });
    repairs.sort_by_key(|r| r.start);

    if args.count {
        println!("{}", repairs.len());
        return Ok(());
    }
    if repairs.is_empty() {
        println!("No repairs found.");
        return Ok(());
    }

    let format = effective_format(global.format, true);
    if print_structured(&repairs, format)? {
        return Ok(());
    }
    let rows: Vec<TableRow> = ctx.with_aliases(|inv, short_ids| {
        repairs
            .iter()
            .map(|r| {
                let repairer = r
                    .repairer_id
                    .and_then(|id| inv.person_name(&id))
                    .unwrap_or_else(|| "-".into());
                let cost = match r.cost() {
                    _ if r.free => "free".to_string(),
                    Some(cost) => format_money(cost),
                    None => "-".to_string(),
                };
                TableRow::new(r.id, short_ids)
                    .cell(inv.equipment_name(&r.equipment_id).unwrap_or_else(|| "-".into()))
                    .cell(repairer)
                    .date(r.start)
                    .opt_date(r.expected_end)
                    .opt_date(r.completed_at)
                    .cell(cost)
                    .cell(if r.paid { "yes" } else { "no" })
            })
            .collect()
    });
    TableFormatter::new(COLUMNS, "repair").output(rows, format);
    Ok(())
}

fn run_show(ctx: &mut CommandContext, args: IdArgs, global: &GlobalOpts) -> Result<()> {
    let id = ctx.resolve(&args.id, Inventory::repairs)?;
    let repair = ctx.read(|inv| inv.get_repair(&id).cloned())?;
    if print_structured(&repair, global.format)? {
        return Ok(());
    }

    let short_id = ctx.alias(id);
    let (equipment, repairer) = ctx.read(|inv| {
        (
            inv.equipment_name(&repair.equipment_id).unwrap_or_else(|| "-".into()),
            repair.repairer_id.and_then(|id| inv.person_name(&id)),
        )
    });
    print_rule();
    print_field("ID", style(id.to_string()).cyan());
    print_field("Short", style(&short_id).cyan());
    print_field("Equipment", style(equipment).yellow());
    print_field("Repairer", repairer.unwrap_or_else(|| "-".to_string()));
    match repair.origin {
        Some(RepairOrigin::Loan(loan)) => print_field("From loan", ctx.display_id(&loan)),
        Some(RepairOrigin::Rental(rental)) => print_field("From rental", ctx.display_id(&rental)),
        None => {}
    }
    print_field("Started", format_date(repair.start));
    print_field("Expected", format_opt_date(repair.expected_end));
    print_field("Completed", format_opt_date(repair.completed_at));
    if repair.free {
        print_field("Cost", style("free").green());
    } else {
        let estimate = repair.estimated_cost.map(format_money).unwrap_or_else(|| "-".into());
        let final_cost = repair.final_cost.map(format_money).unwrap_or_else(|| "-".into());
        print_field("Cost", format!("estimate {estimate}, final {final_cost}"));
    }
    print_field("Paid", if repair.paid { style("yes").green() } else { style("no").red() });
    if repair.is_overdue(Utc::now()) {
        print_field("Status", style("overdue").red().bold());
    }
    print_rule();
    if !repair.description.is_empty() {
        println!();
        println!("{}", repair.description);
    }
    Ok(())
}
