//! `materiel borrow` command - Objects borrowed from other people

use chrono::{DateTime, Utc};
use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::commands::owner::{self, LinkCommands};
use crate::cli::filters::TransactionFilter;
use crate::cli::helpers::{format_date, format_opt_date, or_dash, parse_date};
use crate::cli::output::{effective_format, print_created, print_done, print_field, print_rule, print_structured};
use crate::cli::table::{TableFormatter, TableRow};
use crate::cli::{CommandContext, GlobalOpts};
use crate::core::inventory::Inventory;
use crate::core::linkage::OwnerRef;
use crate::entities::Borrow;

#[derive(Subcommand, Debug)]
pub enum BorrowCommands {
    /// List borrowed objects
    List(ListArgs),

    /// Record an object borrowed from someone
    New(NewArgs),

    /// Show a borrowed object and what it is used for
    Show(IdArgs),

    /// Give the object back to its owner (removes its shadow equipment)
    Return(ReturnArgs),

    /// Delete a borrow record and its shadow equipment
    Delete(IdArgs),

    #[command(flatten)]
    Link(LinkCommands),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Which borrows to show
    #[arg(long, short = 's', default_value = "open")]
    pub state: TransactionFilter,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// What was borrowed
    #[arg(long, short = 'n')]
    pub name: String,

    /// Lender ID or short ID (PER@N)
    #[arg(long, short = 'l')]
    pub lender: String,

    /// Date it must go back (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub due: Option<DateTime<Utc>>,

    /// Date received (default now)
    #[arg(long, value_parser = parse_date)]
    pub start: Option<DateTime<Utc>>,

    #[arg(long, short = 'd')]
    pub description: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct IdArgs {
    /// Borrow ID or short ID (BRW@N)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct ReturnArgs {
    /// Borrow ID or short ID (BRW@N)
    pub id: String,

    /// Return date (default now)
    #[arg(long, value_parser = parse_date)]
    pub at: Option<DateTime<Utc>>,
}

const COLUMNS: &[&str] = &["OBJECT", "LENDER", "SINCE", "DUE", "RETURNED", "USE"];

fn resolve_owner(ctx: &CommandContext, reference: &str) -> Result<OwnerRef> {
    ctx.resolve(reference, Inventory::borrows).map(OwnerRef::Borrow)
}

/// Run a borrow subcommand
pub fn run(cmd: BorrowCommands, global: &GlobalOpts) -> Result<()> {
    let mut ctx = CommandContext::open(global)?;
    match cmd {
        BorrowCommands::List(args) => run_list(&mut ctx, args, global)?,
        BorrowCommands::New(args) => run_new(&mut ctx, args, global)?,
        BorrowCommands::Show(args) => run_show(&mut ctx, args, global)?,
        BorrowCommands::Return(args) => {
            let id = ctx.resolve(&args.id, Inventory::borrows)?;
            let shadow = ctx.write(|inv| inv.close_borrow(&id, args.at.unwrap_or_else(Utc::now)))?;
            print_done(format!("Returned {} to its owner", style(ctx.display_id(&id)).cyan()));
            if let Some(shadow) = shadow {
                println!("   {} {}", style("removed").dim(), style(ctx.display_id(&shadow)).dim());
            }
        }
        BorrowCommands::Delete(args) => {
            let id = ctx.resolve(&args.id, Inventory::borrows)?;
            ctx.write(|inv| inv.delete_borrow(&id))?;
            print_done(format!("Deleted borrow {}", style(args.id).cyan()));
        }
        BorrowCommands::Link(cmd) => owner::run(cmd, &mut ctx, resolve_owner)?,
    }
    ctx.finish()
}

fn run_new(ctx: &mut CommandContext, args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let lender = ctx.resolve(&args.lender, Inventory::persons)?;
    let mut borrow = Borrow::new(args.name.trim(), lender, args.start.unwrap_or_else(Utc::now));
    borrow.due = args.due;
    borrow.description = args.description.unwrap_or_default();
    borrow.notes = args.notes.unwrap_or_default();
    let title = borrow.name.clone();

    let id = ctx.write(|inv| inv.add_borrow(borrow))?;
    let short_id = ctx.alias(id);
    print_created("borrow", &id, &short_id, &title, global);
    Ok(())
}

fn run_list(ctx: &mut CommandContext, args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let now = Utc::now();
    let mut borrows: Vec<Borrow> = ctx.read(|inv| {
        inv.borrows()
            .iter()
            .filter(|b| args.state.matches(b.returned_at, b.due, now))
            .cloned()
            .collect()
    });
    borrows.sort_by_key(|b| b.start);

    if args.count {
        println!("{}", borrows.len());
        return Ok(());
    }
    if borrows.is_empty() {
        println!("No borrows found.");
        return Ok(());
    }

    let format = effective_format(global.format, true);
    if print_structured(&borrows, format)? {
        return Ok(());
    }
    let rows: Vec<TableRow> = ctx.with_aliases(|inv, short_ids| {
        borrows
            .iter()
            .map(|b| {
                let state = inv
                    .link_state(OwnerRef::Borrow(b.id))
                    .map(|s| s.to_string())
                    .unwrap_or_default();
                TableRow::new(b.id, short_ids)
                    .cell(b.name.clone())
                    .cell(inv.person_name(&b.lender_id).unwrap_or_else(|| "(deleted)".into()))
                    .date(b.start)
                    .opt_date(b.due)
                    .opt_date(b.returned_at)
                    .cell(state)
            })
            .collect()
    });
    TableFormatter::new(COLUMNS, "borrow").output(rows, format);
    Ok(())
}

fn run_show(ctx: &mut CommandContext, args: IdArgs, global: &GlobalOpts) -> Result<()> {
    let id = ctx.resolve(&args.id, Inventory::borrows)?;
    let borrow = ctx.read(|inv| inv.get_borrow(&id).cloned())?;
    if print_structured(&borrow, global.format)? {
        return Ok(());
    }

    let short_id = ctx.alias(id);
    let lender = ctx
        .read(|inv| inv.person_name(&borrow.lender_id))
        .unwrap_or_else(|| "(deleted)".to_string());
    print_rule();
    print_field("ID", style(id.to_string()).cyan());
    print_field("Short", style(&short_id).cyan());
    print_field("Object", style(&borrow.name).yellow());
    print_field("Lender", lender);
    print_field("Since", format_date(borrow.start));
    print_field("Due", format_opt_date(borrow.due));
    print_field("Returned", format_opt_date(borrow.returned_at));
    if let Some(shadow) = borrow.links.linked_equipment_id {
        print_field("Shadow", ctx.display_id(&shadow));
    }
    owner::print_links(ctx, OwnerRef::Borrow(id))?;
    print_rule();
    if !borrow.description.is_empty() {
        println!();
        println!("{}", borrow.description);
    }
    if !borrow.notes.is_empty() {
        println!();
        print_field("Notes", or_dash(&borrow.notes));
    }
    Ok(())
}
