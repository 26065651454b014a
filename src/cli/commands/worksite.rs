//! `materiel worksite` command - Worksites and their employees

use chrono::{DateTime, Utc};
use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::helpers::{or_dash, parse_date};
use crate::cli::output::{effective_format, print_created, print_done, print_structured};
use crate::cli::table::{TableFormatter, TableRow};
use crate::cli::{CommandContext, GlobalOpts};
use crate::core::inventory::Inventory;
use crate::entities::Worksite;

#[derive(Subcommand, Debug)]
pub enum WorksiteCommands {
    /// List worksites with their status
    List,

    /// Add a worksite
    New(NewArgs),

    /// Mark a worksite finished
    Finish(IdArgs),

    /// Delete a worksite (its employees are unassigned)
    Delete(IdArgs),
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Worksite name
    #[arg(long, short = 'n')]
    pub name: String,

    #[arg(long)]
    pub address: Option<String>,

    /// Contact person ID or short ID (PER@N)
    #[arg(long)]
    pub contact: Option<String>,

    /// Start date (YYYY-MM-DD, default today)
    #[arg(long, value_parser = parse_date)]
    pub start: Option<DateTime<Utc>>,

    /// Planned end date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub end: Option<DateTime<Utc>>,
}

#[derive(clap::Args, Debug)]
pub struct IdArgs {
    /// Worksite ID or short ID (SITE@N)
    pub id: String,
}

const COLUMNS: &[&str] = &["NAME", "STATUS", "START", "END", "CONTACT", "EMPLOYEES"];

/// Run a worksite subcommand
pub fn run(cmd: WorksiteCommands, global: &GlobalOpts) -> Result<()> {
    let mut ctx = CommandContext::open(global)?;
    match cmd {
        WorksiteCommands::List => run_list(&mut ctx, global)?,
        WorksiteCommands::New(args) => run_new(&mut ctx, args, global)?,
        WorksiteCommands::Finish(args) => {
            let id = ctx.resolve(&args.id, Inventory::worksites)?;
            ctx.write(|inv| inv.finish_worksite(&id))?;
            print_done(format!("Worksite {} finished", style(args.id).cyan()));
        }
        WorksiteCommands::Delete(args) => {
            let id = ctx.resolve(&args.id, Inventory::worksites)?;
            ctx.write(|inv| inv.delete_worksite(&id))?;
            print_done(format!("Deleted worksite {}", style(args.id).cyan()));
        }
    }
    ctx.finish()
}

fn run_new(ctx: &mut CommandContext, args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let contact = args
        .contact
        .as_deref()
        .map(|r| ctx.resolve(r, Inventory::persons))
        .transpose()?;
    let mut site = Worksite::new(args.name.trim(), args.start.unwrap_or_else(Utc::now));
    site.address = args.address.unwrap_or_default();
    site.contact_person_id = contact;
    site.end = args.end;
    let title = site.name.clone();

    let id = ctx.write(|inv| inv.add_worksite(site))?;
    let short_id = ctx.alias(id);
    print_created("worksite", &id, &short_id, &title, global);
    Ok(())
}

fn run_list(ctx: &mut CommandContext, global: &GlobalOpts) -> Result<()> {
    let mut sites: Vec<Worksite> = ctx.read(|inv| inv.worksites().to_vec());
    if sites.is_empty() {
        println!("No worksites found.");
        return Ok(());
    }
    sites.sort_by_key(|s| s.start);

    let format = effective_format(global.format, true);
    if print_structured(&sites, format)? {
        return Ok(());
    }
    let now = Utc::now();
    let rows: Vec<TableRow> = ctx.with_aliases(|inv, short_ids| {
        sites
            .iter()
            .map(|s| {
                let employees = inv
                    .persons()
                    .iter()
                    .filter(|p| p.worksite_id() == Some(s.id))
                    .count();
                let contact = s
                    .contact_person_id
                    .and_then(|p| inv.person_name(&p))
                    .unwrap_or_default();
                TableRow::new(s.id, short_ids)
                    .cell(s.name.clone())
                    .cell(s.status_at(now).to_string())
                    .date(s.start)
                    .opt_date(s.end)
                    .cell(or_dash(&contact))
                    .cell(employees.to_string())
            })
            .collect()
    });
    TableFormatter::new(COLUMNS, "worksite").output(rows, format);
    Ok(())
}
