//! `materiel equipment` command - Owned equipment and its custody state

use chrono::{DateTime, Utc};
use clap::{Subcommand, ValueEnum};
use console::style;
use miette::Result;

use crate::cli::filters::EquipmentFilter;
use crate::cli::helpers::{format_date, format_money, format_opt_date, or_dash, parse_amount, parse_date};
use crate::cli::output::{effective_format, print_created, print_done, print_field, print_rule, print_structured};
use crate::cli::table::{TableFormatter, TableRow};
use crate::cli::{CommandContext, GlobalOpts, OutputFormat};
use crate::core::entity::Lifecycle;
use crate::core::inventory::Inventory;
use crate::entities::Equipment;

#[derive(Subcommand, Debug)]
pub enum EquipmentCommands {
    /// List equipment with its current status
    List(ListArgs),

    /// Register a new item
    New(NewArgs),

    /// Show an item, what holds it and its history
    Show(ShowArgs),

    /// Move an item to a storage location
    Move(MoveArgs),

    /// Delete an item with its loans and repairs
    Delete(DeleteArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum SortColumn {
    Name,
    Category,
    Value,
    Created,
}

const COLUMNS: &[&str] = &["NAME", "CATEGORY", "STATUS", "LOCATION", "VALUE"];

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Filter by custody state
    #[arg(long, short = 's', default_value = "all")]
    pub status: EquipmentFilter,

    /// Filter by category (case-insensitive)
    #[arg(long, short = 'c')]
    pub category: Option<String>,

    /// Search in name, description and notes
    #[arg(long)]
    pub search: Option<String>,

    /// Hide records standing in for borrowed or rented-in objects
    #[arg(long)]
    pub owned: bool,

    /// Sort by field
    #[arg(long, default_value = "name")]
    pub sort: SortColumn,

    /// Reverse sort order
    #[arg(long, short = 'r')]
    pub reverse: bool,

    /// Limit number of results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Item name
    #[arg(long, short = 'n')]
    pub name: String,

    /// Category
    #[arg(long, short = 'c', default_value = "General")]
    pub category: String,

    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Monetary value
    #[arg(long, value_parser = parse_amount)]
    pub value: Option<f64>,

    /// Storage location ID or short ID (STO@N)
    #[arg(long, short = 'l')]
    pub location: Option<String>,

    /// Acquisition date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub acquired: Option<DateTime<Utc>>,

    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Equipment ID or short ID (MAT@N)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct MoveArgs {
    /// Equipment ID or short ID (MAT@N)
    pub id: String,

    /// Storage location ID or short ID (STO@N); omit to clear
    #[arg(long)]
    pub to: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct DeleteArgs {
    /// Equipment ID or short ID (MAT@N)
    pub id: String,

    /// Do not ask for confirmation
    #[arg(long, short = 'y')]
    pub yes: bool,
}

/// Run an equipment subcommand
pub fn run(cmd: EquipmentCommands, global: &GlobalOpts) -> Result<()> {
    let mut ctx = CommandContext::open(global)?;
    match cmd {
        EquipmentCommands::List(args) => run_list(&mut ctx, args, global)?,
        EquipmentCommands::New(args) => run_new(&mut ctx, args, global)?,
        EquipmentCommands::Show(args) => run_show(&mut ctx, args, global)?,
        EquipmentCommands::Move(args) => run_move(&ctx, args)?,
        EquipmentCommands::Delete(args) => run_delete(&ctx, args)?,
    }
    ctx.finish()
}

fn run_list(ctx: &mut CommandContext, args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let search = args.search.as_deref().map(str::to_lowercase);
    let mut items: Vec<Equipment> = ctx.read(|inv| {
        inv.equipment()
            .iter()
            .filter(|e| args.status.matches(inv.resolve_status(&e.id)))
            .filter(|e| {
                args.category
                    .as_deref()
                    .is_none_or(|c| e.category.eq_ignore_ascii_case(c))
            })
            .filter(|e| !args.owned || inv.owner_of_equipment(&e.id).is_none())
            .filter(|e| {
                search.as_deref().is_none_or(|needle| {
                    e.name.to_lowercase().contains(needle)
                        || e.description.to_lowercase().contains(needle)
                        || e.notes
                            .as_deref()
                            .is_some_and(|n| n.to_lowercase().contains(needle))
                })
            })
            .cloned()
            .collect()
    });

    match args.sort {
        SortColumn::Name => items.sort_by_key(|e| e.name.to_lowercase()),
        SortColumn::Category => items.sort_by(|a, b| a.category.cmp(&b.category)),
        SortColumn::Value => items.sort_by(|a, b| a.value.total_cmp(&b.value)),
        SortColumn::Created => items.sort_by_key(|e| e.created),
    }
    if args.reverse {
        items.reverse();
    }
    if let Some(limit) = args.limit {
        items.truncate(limit);
    }

    if args.count {
        println!("{}", items.len());
        return Ok(());
    }
    if items.is_empty() {
        println!("No equipment found.");
        return Ok(());
    }

    let format = effective_format(global.format, true);
    if print_structured(&items, format)? {
        return Ok(());
    }
    let rows: Vec<TableRow> = ctx.with_aliases(|inv, short_ids| {
        items
            .iter()
            .map(|e| {
                TableRow::new(e.id, short_ids)
                    .cell(e.name.clone())
                    .cell(e.category.clone())
                    .cell(inv.resolve_status(&e.id).to_string())
                    .cell(location_name(inv, e))
                    .money(e.value)
            })
            .collect()
    });
    TableFormatter::new(COLUMNS, "item").output(rows, format);
    Ok(())
}

fn location_name(inv: &Inventory, equipment: &Equipment) -> String {
    equipment
        .storage_location_id
        .and_then(|id| inv.get_storage_location(&id).ok())
        .map(|l| l.name.clone())
        .unwrap_or_else(|| "-".to_string())
}

fn run_new(ctx: &mut CommandContext, args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let location = args
        .location
        .as_deref()
        .map(|r| ctx.resolve(r, Inventory::storage_locations))
        .transpose()?;

    let mut equipment = Equipment::new(args.name.trim(), args.category.trim());
    equipment.description = args.description.unwrap_or_default();
    equipment.value = args.value.unwrap_or_default();
    equipment.storage_location_id = location;
    equipment.acquired = args.acquired;
    equipment.notes = args.notes;
    let title = equipment.name.clone();

    let id = ctx.write(|inv| inv.add_equipment(equipment))?;
    let short_id = ctx.alias(id);
    print_created("equipment", &id, &short_id, &title, global);
    Ok(())
}

fn run_show(ctx: &mut CommandContext, args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let id = ctx.resolve(&args.id, Inventory::equipment)?;
    let equipment = ctx.read(|inv| inv.get_equipment(&id).cloned())?;

    match global.format {
        OutputFormat::Json | OutputFormat::Yaml => {
            print_structured(&equipment, global.format)?;
            return Ok(());
        }
        OutputFormat::Id => {
            println!("{}", equipment.id);
            return Ok(());
        }
        OutputFormat::ShortId => {
            println!("{}", ctx.alias(id));
            return Ok(());
        }
        _ => {}
    }

    let short_id = ctx.alias(id);
    ctx.read(|inv| {
        print_rule();
        print_field("ID", style(equipment.id.to_string()).cyan());
        print_field("Short", style(&short_id).cyan());
        print_field("Name", style(&equipment.name).yellow());
        print_field("Category", &equipment.category);
        print_field("Status", style(inv.resolve_status(&id)).green());
        print_field("Location", location_name(inv, &equipment));
        print_field("Value", format_money(equipment.value));
        print_field("Acquired", format_opt_date(equipment.acquired));
        if let Some(owner) = inv.owner_of_equipment(&id) {
            print_field("Stands in for", owner);
        }
        print_rule();

        if !equipment.description.is_empty() {
            println!();
            println!("{}", equipment.description);
        }
        if let Some(notes) = equipment.notes.as_deref().filter(|n| !n.is_empty()) {
            println!();
            print_field("Notes", notes);
        }

        let loans: Vec<_> = inv.loans().iter().filter(|l| l.equipment_id == id).collect();
        if !loans.is_empty() {
            println!();
            println!("{} ({}):", style("Loans").bold(), loans.len());
            for loan in loans {
                println!(
                    "  • {} {} → {}{}",
                    or_dash(&inv.person_name(&loan.person_id).unwrap_or_default()),
                    format_date(loan.start),
                    format_date(loan.end),
                    if loan.is_open() { " (open)" } else { "" }
                );
            }
        }

        let rentals: Vec<_> = inv.rentals().iter().filter(|r| r.equipment_id == id).collect();
        if !rentals.is_empty() {
            println!();
            println!("{} ({}):", style("Rentals").bold(), rentals.len());
            for rental in rentals {
                println!(
                    "  • {} {} → {} {}{}",
                    or_dash(&inv.person_name(&rental.renter_id).unwrap_or_default()),
                    format_date(rental.start),
                    format_date(rental.end),
                    format_money(rental.total_price),
                    if rental.is_open() { " (open)" } else { "" }
                );
            }
        }

        let repairs: Vec<_> = inv.repairs().iter().filter(|r| r.equipment_id == id).collect();
        if !repairs.is_empty() {
            println!();
            println!("{} ({}):", style("Repairs").bold(), repairs.len());
            for repair in repairs {
                println!(
                    "  • {} {}{}",
                    format_date(repair.start),
                    or_dash(&repair.description),
                    if repair.is_open() { " (in progress)" } else { "" }
                );
            }
        }
    });
    Ok(())
}

fn run_move(ctx: &CommandContext, args: MoveArgs) -> Result<()> {
    let id = ctx.resolve(&args.id, Inventory::equipment)?;
    let location = args
        .to
        .as_deref()
        .map(|r| ctx.resolve(r, Inventory::storage_locations))
        .transpose()?;
    ctx.write(|inv| inv.move_equipment(&id, location))?;
    match location {
        Some(location) => {
            let name = ctx.read(|inv| inv.get_storage_location(&location).map(|l| l.name.clone()))?;
            print_done(format!("Moved to {}", style(name).yellow()));
        }
        None => print_done("Storage location cleared"),
    }
    Ok(())
}

fn run_delete(ctx: &CommandContext, args: DeleteArgs) -> Result<()> {
    let id = ctx.resolve(&args.id, Inventory::equipment)?;
    let (name, loans, repairs) = ctx.read(|inv| {
        (
            inv.equipment_name(&id).unwrap_or_default(),
            inv.loans().iter().filter(|l| l.equipment_id == id).count(),
            inv.repairs().iter().filter(|r| r.equipment_id == id).count(),
        )
    });
    let prompt = format!(
        "Delete '{}' together with {} loan(s) and {} repair(s)?",
        name, loans, repairs
    );
    if !crate::cli::helpers::confirm(&prompt, args.yes)? {
        println!("Cancelled.");
        return Ok(());
    }
    ctx.write(|inv| inv.delete_equipment(&id))?;
    print_done(format!("Deleted equipment {}", style(name).yellow()));
    Ok(())
}
