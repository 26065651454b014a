//! `materiel rental` command - Equipment rented out

use chrono::{DateTime, Utc};
use clap::{Subcommand, ValueEnum};
use console::style;
use miette::{miette, Result};

use crate::cli::commands::shared::TermsArgs;
use crate::cli::filters::TransactionFilter;
use crate::cli::helpers::{format_date, format_money, format_opt_date, or_dash, parse_amount, parse_date};
use crate::cli::output::{effective_format, print_created, print_done, print_field, print_rule, print_structured};
use crate::cli::table::{TableFormatter, TableRow};
use crate::cli::{CommandContext, GlobalOpts};
use crate::core::inventory::Inventory;
use crate::entities::{DepositStatus, Rental};

#[derive(Subcommand, Debug)]
pub enum RentalCommands {
    /// List rentals
    List(ListArgs),

    /// Rent an item out
    New(NewArgs),

    /// Show rental details
    Show(IdArgs),

    /// Mark a rental returned
    Return(ReturnArgs),

    /// Mark a rental as paid (records revenue once)
    Paid(PaidArgs),

    /// Settle the renter's deposit
    Deposit(DepositArgs),

    /// Let the renter rent the item on to someone else
    SubRent(SubRentArgs),

    /// Delete a rental record
    Delete(IdArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Which rentals to show
    #[arg(long, short = 's', default_value = "open")]
    pub state: TransactionFilter,

    /// Only rentals to this person (ID or short ID)
    #[arg(long, short = 'r')]
    pub renter: Option<String>,

    /// Only rentals not paid yet
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

    /// Renter ID or short ID (PER@N)
    #[arg(long, short = 'r')]
    pub renter: String,

    #[command(flatten)]
    pub terms: TermsArgs,

    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct IdArgs {
    /// Rental ID or short ID (RENT@N)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct ReturnArgs {
    /// Rental ID or short ID (RENT@N)
    pub id: String,

    /// Return date (default now)
    #[arg(long, value_parser = parse_date)]
    pub at: Option<DateTime<Utc>>,
}

#[derive(clap::Args, Debug)]
pub struct PaidArgs {
    /// Rental ID or short ID (RENT@N)
    pub id: String,

    /// Clear the payment flag instead
    #[arg(long)]
    pub unpaid: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum DepositArg {
    /// Deposit still held
    Pending,
    /// Given back to the renter
    Returned,
    /// Kept in full
    Kept,
    /// Part kept, see --amount
    Partial,
}

#[derive(clap::Args, Debug)]
pub struct DepositArgs {
    /// Rental ID or short ID (RENT@N)
    pub id: String,

    /// What happened to the deposit
    pub state: DepositArg,

    /// Amount kept (required with `partial`)
    #[arg(long, value_parser = parse_amount)]
    pub amount: Option<f64>,
}

#[derive(clap::Args, Debug)]
pub struct SubRentArgs {
    /// Parent rental ID or short ID (RENT@N)
    pub id: String,

    /// Sub-renter ID or short ID (PER@N)
    #[arg(long, short = 'r')]
    pub renter: String,

    #[command(flatten)]
    pub terms: TermsArgs,
}

impl DepositArgs {
    fn status(&self) -> Result<DepositStatus> {
        Ok(match self.state {
            DepositArg::Pending => DepositStatus::Pending,
            DepositArg::Returned => DepositStatus::Returned,
            DepositArg::Kept => DepositStatus::Kept,
            DepositArg::Partial => {
                let amount = self
                    .amount
                    .ok_or_else(|| miette!(help = "Pass --amount", "A partial settlement needs the kept amount"))?;
                DepositStatus::PartiallyKept { amount }
            }
        })
    }
}

fn describe_deposit(status: &DepositStatus) -> String {
    match status {
        DepositStatus::Pending => "pending".to_string(),
        DepositStatus::Returned => "returned".to_string(),
        DepositStatus::Kept => "kept".to_string(),
        DepositStatus::PartiallyKept { amount } => format!("partially kept ({})", format_money(*amount)),
    }
}

const COLUMNS: &[&str] = &["EQUIPMENT", "RENTER", "START", "END", "TOTAL", "PAID", "LATE"];

/// Run a rental subcommand
pub fn run(cmd: RentalCommands, global: &GlobalOpts) -> Result<()> {
    let mut ctx = CommandContext::open(global)?;
    match cmd {
        RentalCommands::List(args) => run_list(&mut ctx, args, global)?,
        RentalCommands::New(args) => run_new(&mut ctx, args, global)?,
        RentalCommands::Show(args) => run_show(&mut ctx, args, global)?,
        RentalCommands::Return(args) => {
            let id = ctx.resolve(&args.id, Inventory::rentals)?;
            ctx.write(|inv| inv.return_rental(&id, args.at.unwrap_or_else(Utc::now)))?;
            print_done(format!("Rental {} returned", style(ctx.display_id(&id)).cyan()));
        }
        RentalCommands::Paid(args) => {
            let id = ctx.resolve(&args.id, Inventory::rentals)?;
            let recorded = ctx.write(|inv| inv.set_rental_paid(&id, !args.unpaid))?;
            let state = if args.unpaid { "unpaid" } else { "paid" };
            print_done(format!("Marked {} {}", style(ctx.display_id(&id)).cyan(), state));
            if recorded {
                println!("   {}", style("revenue recorded in the ledger").dim());
            }
        }
        RentalCommands::Deposit(args) => {
            let id = ctx.resolve(&args.id, Inventory::rentals)?;
            let status = args.status()?;
            let recorded = ctx.write(|inv| inv.settle_rental_deposit(&id, status))?;
            print_done(format!(
                "Deposit of {} {}",
                style(ctx.display_id(&id)).cyan(),
                describe_deposit(&status)
            ));
            if recorded {
                println!("   {}", style("kept amount recorded in the ledger").dim());
            }
        }
        RentalCommands::SubRent(args) => {
            let parent = ctx.resolve(&args.id, Inventory::rentals)?;
            let renter = ctx.resolve(&args.renter, Inventory::persons)?;
            let terms = args.terms.terms();
            let id = ctx.write(|inv| inv.create_sub_rental(&parent, &renter, terms))?;
            let title = ctx.read(|inv| inv.person_name(&renter)).unwrap_or_default();
            let short_id = ctx.alias(id);
            print_created("sub-rental", &id, &short_id, &title, global);
        }
        RentalCommands::Delete(args) => {
            let id = ctx.resolve(&args.id, Inventory::rentals)?;
            ctx.write(|inv| inv.delete_rental(&id))?;
            print_done(format!("Deleted rental {}", style(args.id).cyan()));
        }
    }
    ctx.finish()
}

fn run_new(ctx: &mut CommandContext, args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let equipment = ctx.resolve(&args.equipment, Inventory::equipment)?;
    let renter = ctx.resolve(&args.renter, Inventory::persons)?;
    let terms = args.terms.terms();

    let id = ctx.write(|inv| {
        let id = inv.create_rental(&equipment, &renter, terms)?;
        if let Some(notes) = args.notes {
            inv.annotate(&id, notes)?;
        }
        Ok::<_, crate::core::inventory::InventoryError>(id)
    })?;
    let title = ctx.read(|inv| {
        format!(
            "{} → {} ({})",
            inv.equipment_name(&equipment).unwrap_or_default(),
            inv.person_name(&renter).unwrap_or_default(),
            format_money(terms.total())
        )
    });
    let short_id = ctx.alias(id);
    print_created("rental", &id, &short_id, &title, global);
    Ok(())
}

fn run_list(ctx: &mut CommandContext, args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let renter = args
        .renter
        .as_deref()
        .map(|r| ctx.resolve(r, Inventory::persons))
        .transpose()?;
    let now = Utc::now();
    let mut rentals: Vec<Rental> = ctx.read(|inv| {
        let candidates: Vec<&Rental> = match args.state {
            TransactionFilter::Overdue => inv.overdue_rentals(now),
            state => inv
                .rentals()
                .iter()
                .filter(|r| state.matches(r.returned_at, Some(r.end), now))
                .collect(),
        };
        candidates
            .into_iter()
            .filter(|r| renter.is_none_or(|p| r.renter_id == p))
            .filter(|r| !args.unpaid || !r.payment_received)
            .cloned()
            .collect()
    });
    rentals.sort_by_key(|r| r.end);

    if args.count {
        println!("{}", rentals.len());
        return Ok(());
    }
    if rentals.is_empty() {
        println!("No rentals found.");
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
                TableRow::new(r.id, short_ids)
                    .cell(inv.equipment_name(&r.equipment_id).unwrap_or_else(|| "-".into()))
                    .cell(inv.person_name(&r.renter_id).unwrap_or_else(|| "(deleted)".into()))
                    .date(r.start)
                    .date(r.end)
                    .money(r.total_price)
                    .cell(if r.payment_received { "yes" } else { "no" })
                    .cell(if r.is_overdue(now) { "yes" } else { "" })
            })
            .collect()
    });
    TableFormatter::new(COLUMNS, "rental").output(rows, format);
    Ok(())
}

fn run_show(ctx: &mut CommandContext, args: IdArgs, global: &GlobalOpts) -> Result<()> {
    let id = ctx.resolve(&args.id, Inventory::rentals)?;
    let rental = ctx.read(|inv| inv.get_rental(&id).cloned())?;
    if print_structured(&rental, global.format)? {
        return Ok(());
    }

    let short_id = ctx.alias(id);
    let (equipment, renter) = ctx.read(|inv| {
        (
            inv.equipment_name(&rental.equipment_id).unwrap_or_else(|| "-".into()),
            inv.person_name(&rental.renter_id).unwrap_or_else(|| "(deleted)".into()),
        )
    });
    print_rule();
    print_field("ID", style(id.to_string()).cyan());
    print_field("Short", style(&short_id).cyan());
    print_field("Equipment", style(equipment).yellow());
    print_field("Renter", renter);
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
    print_field(
        "Paid",
        if rental.payment_received { style("yes").green() } else { style("no").red() },
    );
    if rental.deposit > 0.0 {
        print_field(
            "Deposit",
            format!("{} ({})", format_money(rental.deposit), describe_deposit(&rental.deposit_status)),
        );
    }
    if let Some(sub) = rental.sub_rental_id {
        print_field("Sub-rental", ctx.display_id(&sub));
    }
    print_rule();
    if !rental.notes.is_empty() {
        println!();
        print_field("Notes", or_dash(&rental.notes));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_deposit_needs_amount() {
        let args = DepositArgs {
            id: "RENT@1".to_string(),
            state: DepositArg::Partial,
            amount: None,
        };
        assert!(args.status().is_err());

        let args = DepositArgs {
            amount: Some(25.0),
            ..args
        };
        assert_eq!(args.status().unwrap(), DepositStatus::PartiallyKept { amount: 25.0 });
    }

    #[test]
    fn test_describe_deposit() {
        assert_eq!(describe_deposit(&DepositStatus::Kept), "kept");
        assert_eq!(
            describe_deposit(&DepositStatus::PartiallyKept { amount: 10.0 }),
            "partially kept (10.00)"
        );
    }
}
