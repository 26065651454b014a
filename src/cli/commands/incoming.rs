//! `materiel incoming` command - Equipment we rent from agencies

use chrono::{DateTime, Utc};
use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::commands::owner::{self, LinkCommands};
use crate::cli::commands::shared::TermsArgs;
use crate::cli::filters::TransactionFilter;
use crate::cli::helpers::{format_date, format_money, format_opt_date, parse_amount, parse_date};
use crate::cli::output::{effective_format, print_created, print_done, print_field, print_rule, print_structured};
use crate::cli::table::{TableFormatter, TableRow};
use crate::cli::{CommandContext, GlobalOpts};
use crate::core::inventory::Inventory;
use crate::core::linkage::OwnerRef;
use crate::entities::MyRental;

#[derive(Subcommand, Debug)]
pub enum IncomingCommands {
    /// List incoming rentals
    List(ListArgs),

    /// Record equipment rented from an agency
    New(NewArgs),

    /// Show an incoming rental, its deposit and what it is used for
    Show(IdArgs),

    /// Give the equipment back to the agency (removes its shadow equipment)
    Return(ReturnArgs),

    /// Mark the rental as paid (records an expense once)
    Paid(PaidArgs),

    /// Record part of the deposit as lost
    DepositLost(DepositArgs),

    /// Record part of the deposit as recovered
    DepositRecovered(DepositArgs),

    /// Delete an incoming rental and its shadow equipment
    Delete(IdArgs),

    #[command(flatten)]
    Link(LinkCommands),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Which rentals to show
    #[arg(long, short = 's', default_value = "open")]
    pub state: TransactionFilter,

    /// Only rentals not paid yet
    #[arg(long)]
    pub unpaid: bool,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// What was rented
    #[arg(long, short = 'n')]
    pub name: String,

    /// Rental agency ID or short ID (PER@N)
    #[arg(long, short = 'a')]
    pub agency: String,

    #[command(flatten)]
    pub terms: TermsArgs,

    #[arg(long, short = 'd')]
    pub description: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct IdArgs {
    /// Incoming rental ID or short ID (RIN@N)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct ReturnArgs {
    /// Incoming rental ID or short ID (RIN@N)
    pub id: String,

    /// Return date (default now)
    #[arg(long, value_parser = parse_date)]
    pub at: Option<DateTime<Utc>>,
}

#[derive(clap::Args, Debug)]
pub struct PaidArgs {
    /// Incoming rental ID or short ID (RIN@N)
    pub id: String,

    /// Clear the paid flag instead
    #[arg(long)]
    pub unpaid: bool,
}

#[derive(clap::Args, Debug)]
pub struct DepositArgs {
    /// Incoming rental ID or short ID (RIN@N)
    pub id: String,

    /// Amount, at most the outstanding deposit
    #[arg(value_parser = parse_amount)]
    pub amount: f64,
}

const COLUMNS: &[&str] = &["OBJECT", "AGENCY", "START", "END", "TOTAL", "PAID", "USE"];

fn resolve_owner(ctx: &CommandContext, reference: &str) -> Result<OwnerRef> {
    ctx.resolve(reference, Inventory::my_rentals)
        .map(OwnerRef::MyRental)
}

/// Run an incoming rental subcommand
pub fn run(cmd: IncomingCommands, global: &GlobalOpts) -> Result<()> {
    let mut ctx = CommandContext::open(global)?;
    match cmd {
        IncomingCommands::List(args) => run_list(&mut ctx, args, global)?,
        IncomingCommands::New(args) => run_new(&mut ctx, args, global)?,
        IncomingCommands::Show(args) => run_show(&mut ctx, args, global)?,
        IncomingCommands::Return(args) => {
            let id = ctx.resolve(&args.id, Inventory::my_rentals)?;
            let at = args.at.unwrap_or_else(Utc::now);
            let shadow = ctx.write(|inv| inv.close_my_rental(&id, at))?;
            print_done(format!("Returned {} to the agency", style(ctx.display_id(&id)).cyan()));
            if let Some(shadow) = shadow {
                println!("   {} {}", style("removed").dim(), style(ctx.display_id(&shadow)).dim());
            }
        }
        IncomingCommands::Paid(args) => {
            let id = ctx.resolve(&args.id, Inventory::my_rentals)?;
            let recorded = ctx.write(|inv| inv.set_my_rental_paid(&id, !args.unpaid))?;
            let state = if args.unpaid { "unpaid" } else { "paid" };
            print_done(format!("Marked {} {}", style(ctx.display_id(&id)).cyan(), state));
            if recorded {
                println!("   {}", style("expense recorded in the ledger").dim());
            }
        }
        IncomingCommands::DepositLost(args) => {
            let id = ctx.resolve(&args.id, Inventory::my_rentals)?;
            ctx.write(|inv| inv.record_deposit_lost(&id, args.amount))?;
            print_done(format!(
                "Recorded {} of deposit lost on {}",
                format_money(args.amount),
                style(ctx.display_id(&id)).cyan()
            ));
        }
        IncomingCommands::DepositRecovered(args) => {
            let id = ctx.resolve(&args.id, Inventory::my_rentals)?;
            ctx.write(|inv| inv.record_deposit_recovered(&id, args.amount))?;
            print_done(format!(
                "Recorded {} of deposit recovered on {}",
                format_money(args.amount),
                style(ctx.display_id(&id)).cyan()
            ));
        }
        IncomingCommands::Delete(args) => {
            let id = ctx.resolve(&args.id, Inventory::my_rentals)?;
            ctx.write(|inv| inv.delete_my_rental(&id))?;
            print_done(format!("Deleted incoming rental {}", style(args.id).cyan()));
        }
        IncomingCommands::Link(cmd) => owner::run(cmd, &mut ctx, resolve_owner)?,
    }
    ctx.finish()
}

fn run_new(ctx: &mut CommandContext, args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let agency = ctx.resolve(&args.agency, Inventory::persons)?;
    let terms = args.terms.terms();
    let mut rental = MyRental::new(
        args.name.trim(),
        agency,
        terms.start,
        terms.end,
        terms.pricing,
        terms.unit_price,
    );
    rental.deposit = terms.deposit;
    rental.description = args.description.unwrap_or_default();
    rental.notes = args.notes.unwrap_or_default();
    let title = format!("{} ({})", rental.name, format_money(rental.total_price));

    let id = ctx.write(|inv| inv.add_my_rental(rental))?;
    let short_id = ctx.alias(id);
    print_created("incoming rental", &id, &short_id, &title, global);
    Ok(())
}

fn run_list(ctx: &mut CommandContext, args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let now = Utc::now();
    let mut rentals: Vec<MyRental> = ctx.read(|inv| {
        inv.my_rentals()
            .iter()
            .filter(|r| args.state.matches(r.returned_at, Some(r.end), now))
            .filter(|r| !args.unpaid || !r.payment_made)
            .cloned()
            .collect()
    });
    rentals.sort_by_key(|r| r.end);

    if args.count {
        println!("{}", rentals.len());
        return Ok(());
    }
    if rentals.is_empty() {
        println!("No incoming rentals found.");
        return Ok(());
    }

    let format = effective_format(global.format, true);
    if print_structured(&rentals, format)? {
        return Ok(());
    }
    let rows: Vec<TableRow> = ctx.with_aliases(|inv, short_ids| {
        rentals
            .iter()
            .map(|r| {
                let state = inv
                    .link_state(OwnerRef::MyRental(r.id))
                    .map(|s| s.to_string())
                    .unwrap_or_default();
                TableRow::new(r.id, short_ids)
                    .cell(r.name.clone())
                    .cell(inv.person_name(&r.agency_id).unwrap_or_else(|| "(deleted)".into()))
                    .date(r.start)
                    .date(r.end)
                    .money(r.total_price)
                    .cell(if r.payment_made { "yes" } else { "no" })
                    .cell(state)
            })
            .collect()
    });
    TableFormatter::new(COLUMNS, "incoming rental").output(rows, format);
    Ok(())
}

fn run_show(ctx: &mut CommandContext, args: IdArgs, global: &GlobalOpts) -> Result<()> {
    let id = ctx.resolve(&args.id, Inventory::my_rentals)?;
    let rental = ctx.read(|inv| inv.get_my_rental(&id).cloned())?;
    if print_structured(&rental, global.format)? {
        return Ok(());
    }

    let short_id = ctx.alias(id);
    let agency = ctx
        .read(|inv| inv.person_name(&rental.agency_id))
        .unwrap_or_else(|| "(deleted)".to_string());
    print_rule();
    print_field("ID", style(id.to_string()).cyan());
    print_field("Short", style(&short_id).cyan());
    print_field("Object", style(&rental.name).yellow());
    print_field("Agency", agency);
    print_field(
        "Period",
        format!("{} to {}", format_date(rental.start), format_date(rental.end)),
    );
    print_field("Returned", format_opt_date(rental.returned_at));
    print_field(
        "Price",
        format!(
            "{} ({} at {})",
            format_money(rental.total_price),
            rental.pricing,
            format_money(rental.unit_price)
        ),
    );
    print_field("Paid", if rental.payment_made { style("yes").green() } else { style("no").red() });
    if rental.deposit > 0.0 {
        print_field(
            "Deposit",
            format!(
                "{} (recovered {}, lost {}, outstanding {})",
                format_money(rental.deposit),
                format_money(rental.deposit_recovered),
                format_money(rental.deposit_lost),
                format_money(rental.deposit_outstanding())
            ),
        );
    }
    if let Some(shadow) = rental.links.linked_equipment_id {
        print_field("Shadow", ctx.display_id(&shadow));
    }
    owner::print_links(ctx, OwnerRef::MyRental(id))?;
    print_rule();
    if !rental.description.is_empty() {
        println!();
        println!("{}", rental.description);
    }
    if !rental.notes.is_empty() {
        println!();
        print_field("Notes", &rental.notes);
    }
    Ok(())
}
