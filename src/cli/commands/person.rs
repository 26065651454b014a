//! `materiel person` command - People, duplicate merging and orphan repair

use chrono::Utc;
use clap::{Subcommand, ValueEnum};
use console::style;
use miette::{miette, Result};

use crate::cli::filters::RoleFilter;
use crate::cli::helpers::{confirm, format_date, format_opt_date, or_dash};
use crate::cli::output::{effective_format, print_created, print_done, print_field, print_rule, print_structured};
use crate::cli::table::{TableFormatter, TableRow};
use crate::cli::{CommandContext, GlobalOpts, OutputFormat};
use crate::core::entity::Lifecycle;
use crate::core::identity::EntityId;
use crate::core::inventory::Inventory;
use crate::entities::{Person, PersonRole};

#[derive(Subcommand, Debug)]
pub enum PersonCommands {
    /// List people
    List(ListArgs),

    /// Add a person
    New(NewArgs),

    /// Show a person and the records that reference them
    Show(ShowArgs),

    /// Change a person's role
    Role(RoleArgs),

    /// Record that a person was contacted now
    Contacted(ShowArgs),

    /// Delete a person (their loans and borrows become orphans)
    Delete(DeleteArgs),

    /// List groups of people sharing the same name
    Dupes,

    /// Merge people into the most complete record
    Merge(MergeArgs),

    /// List loans and borrows whose person no longer exists
    Orphans,

    /// Point an orphaned loan or borrow at another person
    Reassign(ReassignArgs),
}

/// Role to assign
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum RoleArg {
    Unassigned,
    Client,
    Mechanic,
    Employee,
    RentalAgency,
}

impl std::fmt::Display for RoleArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoleArg::Unassigned => write!(f, "unassigned"),
            RoleArg::Client => write!(f, "client"),
            RoleArg::Mechanic => write!(f, "mechanic"),
            RoleArg::Employee => write!(f, "employee"),
            RoleArg::RentalAgency => write!(f, "rental-agency"),
        }
    }
}

const COLUMNS: &[&str] = &["NAME", "ROLE", "ORGANIZATION", "PHONE", "EMAIL"];

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Filter by role
    #[arg(long, short = 'r', default_value = "all")]
    pub role: RoleFilter,

    /// Search in names, organization and email
    #[arg(long)]
    pub search: Option<String>,

    /// Limit number of results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// First name
    #[arg(long)]
    pub first: String,

    /// Surname
    #[arg(long)]
    pub last: String,

    #[arg(long)]
    pub email: Option<String>,

    #[arg(long)]
    pub phone: Option<String>,

    #[arg(long)]
    pub organization: Option<String>,

    #[arg(long)]
    pub address: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,

    /// Role
    #[arg(long, default_value = "unassigned")]
    pub role: RoleArg,

    /// Worksite ID or short ID (SITE@N), employees only
    #[arg(long)]
    pub worksite: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Person ID or short ID (PER@N)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct RoleArgs {
    /// Person ID or short ID (PER@N)
    pub id: String,

    /// New role
    pub role: RoleArg,

    /// Worksite ID or short ID (SITE@N), employees only
    #[arg(long)]
    pub worksite: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct DeleteArgs {
    /// Person ID or short ID (PER@N)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct MergeArgs {
    /// Person IDs or short IDs to merge (at least two)
    #[arg(required_unless_present = "all")]
    pub ids: Vec<String>,

    /// Merge every group reported by `person dupes`
    #[arg(long, conflicts_with = "ids")]
    pub all: bool,

    /// Do not ask for confirmation
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(clap::Args, Debug)]
pub struct ReassignArgs {
    /// Loan or borrow ID or short ID (LOAN@N, BRW@N)
    pub record: String,

    /// Person ID or short ID (PER@N) to assign
    #[arg(long)]
    pub to: String,
}

/// Run a person subcommand
pub fn run(cmd: PersonCommands, global: &GlobalOpts) -> Result<()> {
    let mut ctx = CommandContext::open(global)?;
    match cmd {
        PersonCommands::List(args) => run_list(&mut ctx, args, global)?,
        PersonCommands::New(args) => run_new(&mut ctx, args, global)?,
        PersonCommands::Show(args) => run_show(&mut ctx, args, global)?,
        PersonCommands::Role(args) => run_role(&ctx, args)?,
        PersonCommands::Contacted(args) => run_contacted(&ctx, args)?,
        PersonCommands::Delete(args) => run_delete(&ctx, args)?,
        PersonCommands::Dupes => run_dupes(&mut ctx, global)?,
        PersonCommands::Merge(args) => run_merge(&mut ctx, args)?,
        PersonCommands::Orphans => run_orphans(&mut ctx, global)?,
        PersonCommands::Reassign(args) => run_reassign(&ctx, args)?,
    }
    ctx.finish()
}

fn role_for(ctx: &CommandContext, role: RoleArg, worksite: Option<&str>) -> Result<PersonRole> {
    if worksite.is_some() && role != RoleArg::Employee {
        return Err(miette!("--worksite only applies to employees"));
    }
    Ok(match role {
        RoleArg::Unassigned => PersonRole::Unassigned,
        RoleArg::Client => PersonRole::Client,
        RoleArg::Mechanic => PersonRole::Mechanic,
        RoleArg::RentalAgency => PersonRole::RentalAgency,
        RoleArg::Employee => PersonRole::Employee {
            worksite_id: worksite
                .map(|r| ctx.resolve(r, Inventory::worksites))
                .transpose()?,
        },
    })
}

fn run_list(ctx: &mut CommandContext, args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let search = args.search.as_deref().map(str::to_lowercase);
    let mut persons: Vec<Person> = ctx.read(|inv| {
        inv.persons()
            .iter()
            .filter(|p| args.role.matches(&p.role))
            .filter(|p| {
                search.as_deref().is_none_or(|needle| {
                    p.full_name().to_lowercase().contains(needle)
                        || p.organization.to_lowercase().contains(needle)
                        || p.email.to_lowercase().contains(needle)
                })
            })
            .cloned()
            .collect()
    });
    persons.sort_by_key(|p| (p.surname.to_lowercase(), p.first_name.to_lowercase()));
    if let Some(limit) = args.limit {
        persons.truncate(limit);
    }

    if args.count {
        println!("{}", persons.len());
        return Ok(());
    }
    if persons.is_empty() {
        println!("No people found.");
        return Ok(());
    }

    let format = effective_format(global.format, true);
    if print_structured(&persons, format)? {
        return Ok(());
    }
    let rows: Vec<TableRow> = ctx.with_aliases(|_, short_ids| {
        persons
            .iter()
            .map(|p| {
                TableRow::new(p.id, short_ids)
                    .cell(p.full_name())
                    .cell(p.role.to_string())
                    .cell(or_dash(&p.organization))
                    .cell(or_dash(&p.phone))
                    .cell(or_dash(&p.email))
            })
            .collect()
    });
    TableFormatter::new(COLUMNS, "person").output(rows, format);
    Ok(())
}

fn run_new(ctx: &mut CommandContext, args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let role = role_for(ctx, args.role, args.worksite.as_deref())?;
    let mut person = Person::new(args.first.trim(), args.last.trim());
    person.email = args.email.unwrap_or_default();
    person.phone = args.phone.unwrap_or_default();
    person.organization = args.organization.unwrap_or_default();
    person.address = args.address.unwrap_or_default();
    person.notes = args.notes.unwrap_or_default();
    person.role = role;
    let title = person.full_name();

    let id = ctx.write(|inv| inv.add_person(person))?;
    let short_id = ctx.alias(id);
    print_created("person", &id, &short_id, &title, global);
    Ok(())
}

fn run_show(ctx: &mut CommandContext, args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let id = ctx.resolve(&args.id, Inventory::persons)?;
    let person = ctx.read(|inv| inv.get_person(&id).cloned())?;
    if print_structured(&person, global.format)? {
        return Ok(());
    }
    if global.format == OutputFormat::Id {
        println!("{}", id);
        return Ok(());
    }

    let short_id = ctx.alias(id);
    if global.format == OutputFormat::ShortId {
        println!("{}", short_id);
        return Ok(());
    }
    ctx.read(|inv| {
        print_rule();
        print_field("ID", style(id.to_string()).cyan());
        print_field("Short", style(&short_id).cyan());
        print_field("Name", style(person.full_name()).yellow());
        print_field("Role", &person.role);
        if let Some(site) = person.worksite_id() {
            let name = inv
                .get_worksite(&site)
                .map(|s| s.name.clone())
                .unwrap_or_else(|_| site.to_string());
            print_field("Worksite", name);
        }
        print_field("Organization", or_dash(&person.organization));
        print_field("Email", or_dash(&person.email));
        print_field("Phone", or_dash(&person.phone));
        print_field("Address", or_dash(&person.address));
        print_field("Last contacted", format_opt_date(person.last_contacted));
        print_rule();

        let loans: Vec<_> = inv.loans().iter().filter(|l| l.person_id == id).collect();
        if !loans.is_empty() {
            println!();
            println!("{} ({}):", style("Loans").bold(), loans.len());
            for loan in loans {
                println!(
                    "  • {} until {}{}",
                    inv.equipment_name(&loan.equipment_id).unwrap_or_else(|| "-".into()),
                    format_date(loan.end),
                    if loan.is_open() { " (open)" } else { "" }
                );
            }
        }
        let rentals: Vec<_> = inv.rentals().iter().filter(|r| r.renter_id == id).collect();
        if !rentals.is_empty() {
            println!();
            println!("{} ({}):", style("Rentals").bold(), rentals.len());
            for rental in rentals {
                println!(
                    "  • {} until {}{}",
                    inv.equipment_name(&rental.equipment_id).unwrap_or_else(|| "-".into()),
                    format_date(rental.end),
                    if rental.is_open() { " (open)" } else { "" }
                );
            }
        }
        let borrows: Vec<_> = inv.borrows().iter().filter(|b| b.lender_id == id).collect();
        if !borrows.is_empty() {
            println!();
            println!("{} ({}):", style("Lent to us").bold(), borrows.len());
            for borrow in borrows {
                println!(
                    "  • {}{}",
                    borrow.name,
                    if borrow.is_open() { " (held)" } else { "" }
                );
            }
        }
    });
    Ok(())
}

fn run_role(ctx: &CommandContext, args: RoleArgs) -> Result<()> {
    let id = ctx.resolve(&args.id, Inventory::persons)?;
    let role = role_for(ctx, args.role, args.worksite.as_deref())?;
    ctx.write(|inv| inv.set_person_role(&id, role))?;
    print_done(format!("Role set to {}", style(args.role).cyan()));
    Ok(())
}

fn run_contacted(ctx: &CommandContext, args: ShowArgs) -> Result<()> {
    let id = ctx.resolve(&args.id, Inventory::persons)?;
    ctx.write(|inv| inv.mark_contacted(&id, Utc::now()))?;
    print_done("Contact recorded");
    Ok(())
}

fn run_delete(ctx: &CommandContext, args: DeleteArgs) -> Result<()> {
    let id = ctx.resolve(&args.id, Inventory::persons)?;
    let name = ctx.read(|inv| inv.person_name(&id)).unwrap_or_default();
    ctx.write(|inv| inv.delete_person(&id))?;
    print_done(format!("Deleted {}", style(name).yellow()));
    let orphans = ctx.read(|inv| inv.orphaned_loans().len() + inv.orphaned_borrows().len());
    if orphans > 0 {
        println!(
            "   {} orphaned record(s), see {}",
            style(orphans).yellow(),
            style("materiel person orphans").cyan()
        );
    }
    Ok(())
}

fn run_dupes(ctx: &mut CommandContext, global: &GlobalOpts) -> Result<()> {
    let groups = ctx.read(|inv| inv.find_duplicate_groups());
    if groups.is_empty() {
        println!("No duplicates found.");
        return Ok(());
    }
    if print_structured(&groups, global.format)? {
        return Ok(());
    }
    ctx.with_aliases(|inv, short_ids| {
        for group in &groups {
            println!("{}", style(&group.key).bold());
            for id in &group.person_ids {
                let alias = short_ids.add(*id);
                let detail = inv
                    .get_person(id)
                    .map(|p| format!("{} {}", or_dash(&p.email), or_dash(&p.phone)))
                    .unwrap_or_default();
                println!("  {} {}", style(alias).cyan(), style(detail).dim());
            }
        }
    });
    Ok(())
}

fn run_merge(ctx: &mut CommandContext, args: MergeArgs) -> Result<()> {
    let groups: Vec<Vec<EntityId>> = if args.all {
        ctx.read(|inv| inv.find_duplicate_groups())
            .into_iter()
            .map(|g| g.person_ids)
            .collect()
    } else {
        let ids = args
            .ids
            .iter()
            .map(|r| ctx.resolve(r, Inventory::persons))
            .collect::<Result<Vec<_>>>()?;
        vec![ids]
    };
    if groups.is_empty() {
        println!("No duplicates found.");
        return Ok(());
    }

    let people: usize = groups.iter().map(Vec::len).sum();
    let prompt = format!(
        "Merge {} people into {} record(s)? This cannot be undone",
        people,
        groups.len()
    );
    if !confirm(&prompt, args.yes)? {
        println!("Cancelled.");
        return Ok(());
    }

    for ids in groups {
        let outcome = ctx.write(|inv| inv.merge_persons(&ids))?;
        let name = ctx.read(|inv| inv.person_name(&outcome.survivor)).unwrap_or_default();
        let alias = ctx.alias(outcome.survivor);
        print_done(format!(
            "Merged {} into {} {} ({} reference(s) updated)",
            outcome.removed.len(),
            style(alias).cyan(),
            style(name).yellow(),
            outcome.repointed
        ));
    }
    Ok(())
}

const ORPHAN_COLUMNS: &[&str] = &["KIND", "OBJECT", "START", "MISSING PERSON"];

fn run_orphans(ctx: &mut CommandContext, global: &GlobalOpts) -> Result<()> {
    let format = effective_format(global.format, true);
    let (loans, borrows) = ctx.read(|inv| {
        (
            inv.orphaned_loans().into_iter().cloned().collect::<Vec<_>>(),
            inv.orphaned_borrows().into_iter().cloned().collect::<Vec<_>>(),
        )
    });
    if loans.is_empty() && borrows.is_empty() {
        println!("No orphaned records.");
        return Ok(());
    }
    if matches!(format, OutputFormat::Json | OutputFormat::Yaml) {
        let doc = serde_json::json!({ "loans": loans, "borrows": borrows });
        print_structured(&doc, format)?;
        return Ok(());
    }

    let rows: Vec<TableRow> = ctx.with_aliases(|inv, short_ids| {
        let loan_rows = loans.iter().map(|l| {
            TableRow::new(l.id, short_ids)
                .cell("loan")
                .cell(inv.equipment_name(&l.equipment_id).unwrap_or_else(|| "-".into()))
                .date(l.start)
                .cell(l.person_id.to_string())
        });
        let mut rows: Vec<TableRow> = loan_rows.collect();
        rows.extend(borrows.iter().map(|b| {
            TableRow::new(b.id, short_ids)
                .cell("borrow")
                .cell(b.name.clone())
                .date(b.start)
                .cell(b.lender_id.to_string())
        }));
        rows
    });
    TableFormatter::new(ORPHAN_COLUMNS, "orphan").output(rows, format);
    Ok(())
}

fn run_reassign(ctx: &CommandContext, args: ReassignArgs) -> Result<()> {
    let person = ctx.resolve(&args.to, Inventory::persons)?;
    if let Ok(loan) = ctx.resolve(&args.record, Inventory::loans) {
        ctx.write(|inv| inv.reassign_loan(&loan, &person))?;
    } else {
        let borrow = ctx.resolve(&args.record, Inventory::borrows)?;
        ctx.write(|inv| inv.reassign_borrow(&borrow, &person))?;
    }
    let name = ctx.read(|inv| inv.person_name(&person)).unwrap_or_default();
    print_done(format!("Reassigned to {}", style(name).yellow()));
    Ok(())
}
