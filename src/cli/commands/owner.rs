//! Subcommands shared by `borrow` and `incoming`: acting on an object we
//! hold but do not own through its shadow equipment record

use chrono::{DateTime, Utc};
use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::commands::shared::{RepairTermsArgs, TermsArgs};
use crate::cli::helpers::{format_date, parse_amount, parse_date};
use crate::cli::output::{print_done, print_field};
use crate::cli::CommandContext;
use crate::core::inventory::Inventory;
use crate::core::linkage::OwnerRef;

#[derive(Subcommand, Debug)]
pub enum LinkCommands {
    /// Create the equipment record standing in for the object
    Shadow(OwnerArgs),

    /// Lend the object on to a person
    Relend(RelendArgs),

    /// Record the onward loan as returned
    ReturnRelend(CloseArgs),

    /// Rent the object on to a renter
    SubRent(SubRentArgs),

    /// Record the onward rental as returned
    ReturnSubRent(CloseArgs),

    /// Send the object to repair
    Repair(RepairArgs),

    /// Record the object's repair as completed
    CompleteRepair(CompleteRepairArgs),
}

#[derive(clap::Args, Debug)]
pub struct OwnerArgs {
    /// Borrow or incoming rental ID or short ID
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct RelendArgs {
    /// Borrow or incoming rental ID or short ID
    pub id: String,

    /// Person ID or short ID (PER@N)
    #[arg(long, short = 'p')]
    pub person: String,

    /// Expected return date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub until: DateTime<Utc>,

    /// Start date (default now)
    #[arg(long, value_parser = parse_date)]
    pub start: Option<DateTime<Utc>>,
}

#[derive(clap::Args, Debug)]
pub struct CloseArgs {
    /// Borrow or incoming rental ID or short ID
    pub id: String,

    /// Date (default now)
    #[arg(long, value_parser = parse_date)]
    pub at: Option<DateTime<Utc>>,
}

#[derive(clap::Args, Debug)]
pub struct SubRentArgs {
    /// Borrow or incoming rental ID or short ID
    pub id: String,

    /// Renter ID or short ID (PER@N)
    #[arg(long, short = 'r')]
    pub renter: String,

    #[command(flatten)]
    pub terms: TermsArgs,
}

#[derive(clap::Args, Debug)]
pub struct RepairArgs {
    /// Borrow or incoming rental ID or short ID
    pub id: String,

    /// Start date (default now)
    #[arg(long, value_parser = parse_date)]
    pub start: Option<DateTime<Utc>>,

    #[command(flatten)]
    pub terms: RepairTermsArgs,
}

#[derive(clap::Args, Debug)]
pub struct CompleteRepairArgs {
    /// Borrow or incoming rental ID or short ID
    pub id: String,

    /// Final cost
    #[arg(long, value_parser = parse_amount)]
    pub cost: Option<f64>,

    /// Completion date (default now)
    #[arg(long, value_parser = parse_date)]
    pub at: Option<DateTime<Utc>>,
}

/// Resolves a user reference to the owner kind of the calling command
pub type OwnerResolver = fn(&CommandContext, &str) -> Result<OwnerRef>;

pub fn run(cmd: LinkCommands, ctx: &mut CommandContext, resolve: OwnerResolver) -> Result<()> {
    match cmd {
        LinkCommands::Shadow(args) => {
            let owner = resolve(ctx, &args.id)?;
            let shadow = ctx.write(|inv| inv.create_shadow_equipment(owner))?;
            let alias = ctx.alias(shadow);
            print_done(format!("Shadow equipment {} created", style(alias).cyan()));
        }
        LinkCommands::Relend(args) => {
            let owner = resolve(ctx, &args.id)?;
            let person = ctx.resolve(&args.person, Inventory::persons)?;
            let start = args.start.unwrap_or_else(Utc::now);
            let loan = ctx.write(|inv| inv.relend(owner, &person, start, args.until))?;
            let alias = ctx.alias(loan);
            let name = ctx.read(|inv| inv.person_name(&person)).unwrap_or_default();
            print_done(format!(
                "Lent on to {} until {} as {}",
                style(name).yellow(),
                format_date(args.until),
                style(alias).cyan()
            ));
        }
        LinkCommands::ReturnRelend(args) => {
            let owner = resolve(ctx, &args.id)?;
            let loan = ctx.write(|inv| inv.return_relend(owner, args.at.unwrap_or_else(Utc::now)))?;
            print_done(format!("Loan {} returned", style(ctx.display_id(&loan)).cyan()));
        }
        LinkCommands::SubRent(args) => {
            let owner = resolve(ctx, &args.id)?;
            let renter = ctx.resolve(&args.renter, Inventory::persons)?;
            let terms = args.terms.terms();
            let rental = ctx.write(|inv| inv.sub_rent(owner, &renter, terms))?;
            let alias = ctx.alias(rental);
            let total = ctx.read(|inv| inv.get_rental(&rental).map(|r| r.total_price))?;
            print_done(format!(
                "Rented on as {} for {:.2}",
                style(alias).cyan(),
                total
            ));
        }
        LinkCommands::ReturnSubRent(args) => {
            let owner = resolve(ctx, &args.id)?;
            let rental =
                ctx.write(|inv| inv.return_sub_rent(owner, args.at.unwrap_or_else(Utc::now)))?;
            print_done(format!("Rental {} returned", style(ctx.display_id(&rental)).cyan()));
        }
        LinkCommands::Repair(args) => {
            let owner = resolve(ctx, &args.id)?;
            let terms = args.terms.terms(ctx)?;
            let start = args.start.unwrap_or_else(Utc::now);
            let repair = ctx.write(|inv| inv.send_owner_to_repair(owner, start, terms))?;
            let alias = ctx.alias(repair);
            print_done(format!("Sent to repair as {}", style(alias).cyan()));
        }
        LinkCommands::CompleteRepair(args) => {
            let owner = resolve(ctx, &args.id)?;
            let at = args.at.unwrap_or_else(Utc::now);
            let repair = ctx.write(|inv| inv.complete_owner_repair(owner, at, args.cost))?;
            print_done(format!("Repair {} completed", style(ctx.display_id(&repair)).cyan()));
        }
    }
    Ok(())
}

/// Shadow record and open derived records of an owner
pub fn print_links(ctx: &CommandContext, owner: OwnerRef) -> Result<()> {
    let state = ctx.read(|inv| inv.link_state(owner))?;
    print_field("Link state", style(state).green());
    ctx.read(|inv| {
        if let Some(loan) = inv.active_loan_for(owner) {
            let name = inv.person_name(&loan.person_id).unwrap_or_default();
            print_field(
                "Lent to",
                format!("{} until {} ({})", name, format_date(loan.end), ctx.display_id(&loan.id)),
            );
        }
        if let Some(rental) = inv.active_rental_for(owner) {
            let name = inv.person_name(&rental.renter_id).unwrap_or_default();
            print_field(
                "Rented to",
                format!("{} until {} ({})", name, format_date(rental.end), ctx.display_id(&rental.id)),
            );
        }
        if let Some(repair) = inv.active_repair_for(owner) {
            print_field(
                "In repair",
                format!("since {} ({})", format_date(repair.start), ctx.display_id(&repair.id)),
            );
        }
    });
    Ok(())
}
