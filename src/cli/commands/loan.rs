//! `materiel loan` command - Equipment lent to people

use chrono::{DateTime, Utc};
use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::filters::TransactionFilter;
use crate::cli::helpers::parse_date;
use crate::cli::output::{effective_format, print_created, print_done, print_structured};
use crate::cli::table::{TableFormatter, TableRow};
use crate::cli::{CommandContext, GlobalOpts};
use crate::core::inventory::Inventory;
use crate::entities::Loan;

#[derive(Subcommand, Debug)]
pub enum LoanCommands {
    /// List loans
    List(ListArgs),

    /// Lend an item to a person
    New(NewArgs),

    /// Mark a loan returned
    Return(ReturnArgs),

    /// Delete a loan record
    Delete(IdArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Which loans to show
    #[arg(long, short = 's', default_value = "open")]
    pub state: TransactionFilter,

    /// Only loans to this person (ID or short ID)
    #[arg(long, short = 'p')]
    pub person: Option<String>,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Equipment ID or short ID (MAT@N)
    #[arg(long, short = 'e')]
    pub equipment: String,

    /// Person ID or short ID (PER@N)
    #[arg(long, short = 'p')]
    pub person: String,

    /// Expected return date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub until: DateTime<Utc>,

    /// Start date (default now)
    #[arg(long, value_parser = parse_date)]
    pub start: Option<DateTime<Utc>>,

    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ReturnArgs {
    /// Loan ID or short ID (LOAN@N)
    pub id: String,

    /// Return date (default now)
    #[arg(long, value_parser = parse_date)]
    pub at: Option<DateTime<Utc>>,
}

#[derive(clap::Args, Debug)]
pub struct IdArgs {
    /// Loan ID or short ID (LOAN@N)
    pub id: String,
}

const COLUMNS: &[&str] = &["EQUIPMENT", "PERSON", "START", "DUE", "RETURNED", "LATE"];

/// Run a loan subcommand
pub fn run(cmd: LoanCommands, global: &GlobalOpts) -> Result<()> {
    let mut ctx = CommandContext::open(global)?;
    match cmd {
        LoanCommands::List(args) => run_list(&mut ctx, args, global)?,
        LoanCommands::New(args) => run_new(&mut ctx, args, global)?,
        LoanCommands::Return(args) => {
            let id = ctx.resolve(&args.id, Inventory::loans)?;
            ctx.write(|inv| inv.return_loan(&id, args.at.unwrap_or_else(Utc::now)))?;
            print_done(format!("Loan {} returned", style(ctx.display_id(&id)).cyan()));
        }
        LoanCommands::Delete(args) => {
            let id = ctx.resolve(&args.id, Inventory::loans)?;
            ctx.write(|inv| inv.delete_loan(&id))?;
            print_done(format!("Deleted loan {}", style(args.id).cyan()));
        }
    }
    ctx.finish()
}

fn run_new(ctx: &mut CommandContext, args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let equipment = ctx.resolve(&args.equipment, Inventory::equipment)?;
    let person = ctx.resolve(&args.person, Inventory::persons)?;
    let start = args.start.unwrap_or_else(Utc::now);

    let id = ctx.write(|inv| {
        let id = inv.create_loan(&equipment, &person, start, args.until)?;
        if let Some(notes) = args.notes {
            inv.annotate(&id, notes)?;
        }
        Ok::<_, crate::core::inventory::InventoryError>(id)
    })?;
    let title = ctx.read(|inv| {
        format!(
            "{} → {}",
            inv.equipment_name(&equipment).unwrap_or_default(),
            inv.person_name(&person).unwrap_or_default()
        )
    });
    let short_id = ctx.alias(id);
    print_created("loan", &id, &short_id, &title, global);
    Ok(())
}

fn run_list(ctx: &mut CommandContext, args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let person = args
        .person
        .as_deref()
        .map(|r| ctx.resolve(r, Inventory::persons))
        .transpose()?;
    let now = Utc::now();
    let mut loans: Vec<Loan> = ctx.read(|inv| {
        let candidates: Vec<&Loan> = match args.state {
            TransactionFilter::Overdue => inv.overdue_loans(now),
            state => inv
                .loans()
                .iter()
                .filter(|l| state.matches(l.returned_at, Some(l.end), now))
                .collect(),
        };
        candidates
            .into_iter()
            .filter(|l| person.is_none_or(|p| l.person_id == p))
            .cloned()
            .collect()
    });
    loans.sort_by_key(|l| l.end);

    if args.count {
        println!("{}", loans.len());
        return Ok(());
    }
    if loans.is_empty() {
        println!("No loans found.");
        return Ok(());
    }

    let format = effective_format(global.format, true);
    if print_structured(&loans, format)? {
        return Ok(());
    }
    let rows: Vec<TableRow> = ctx.with_aliases(|inv, short_ids| {
        loans
            .iter()
            .map(|l| {
                TableRow::new(l.id, short_ids)
                    .cell(inv.equipment_name(&l.equipment_id).unwrap_or_else(|| "-".into()))
                    .cell(inv.person_name(&l.person_id).unwrap_or_else(|| "(deleted)".into()))
                    .date(l.start)
                    .date(l.end)
                    .opt_date(l.returned_at)
                    .cell(if l.is_overdue(now) { "yes" } else { "" })
            })
            .collect()
    });
    TableFormatter::new(COLUMNS, "loan").output(rows, format);
    Ok(())
}
