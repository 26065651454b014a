//! `materiel storage` command - Storage locations

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::helpers::or_dash;
use crate::cli::output::{effective_format, print_created, print_done, print_structured};
use crate::cli::table::{TableFormatter, TableRow};
use crate::cli::{CommandContext, GlobalOpts};
use crate::core::inventory::Inventory;
use crate::entities::StorageLocation;

#[derive(Subcommand, Debug)]
pub enum StorageCommands {
    /// List storage locations with how many items each holds
    List,

    /// Add a storage location
    New(NewArgs),

    /// Delete a storage location (its items lose their location)
    Delete(DeleteArgs),
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Location name
    #[arg(long, short = 'n')]
    pub name: String,

    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct DeleteArgs {
    /// Location ID or short ID (STO@N)
    pub id: String,
}

const COLUMNS: &[&str] = &["NAME", "ITEMS", "NOTES"];

/// Run a storage subcommand
pub fn run(cmd: StorageCommands, global: &GlobalOpts) -> Result<()> {
    let mut ctx = CommandContext::open(global)?;
    match cmd {
        StorageCommands::List => run_list(&mut ctx, global)?,
        StorageCommands::New(args) => {
            let mut location = StorageLocation::new(args.name.trim());
            location.notes = args.notes.unwrap_or_default();
            let title = location.name.clone();
            let id = ctx.write(|inv| inv.add_storage_location(location))?;
            let short_id = ctx.alias(id);
            print_created("storage location", &id, &short_id, &title, global);
        }
        StorageCommands::Delete(args) => {
            let id = ctx.resolve(&args.id, Inventory::storage_locations)?;
            ctx.write(|inv| inv.delete_storage_location(&id))?;
            print_done(format!("Deleted storage location {}", style(args.id).cyan()));
        }
    }
    ctx.finish()
}

fn run_list(ctx: &mut CommandContext, global: &GlobalOpts) -> Result<()> {
    let mut locations: Vec<StorageLocation> = ctx.read(|inv| inv.storage_locations().to_vec());
    if locations.is_empty() {
        println!("No storage locations found.");
        return Ok(());
    }
    locations.sort_by_key(|l| l.name.to_lowercase());

    let format = effective_format(global.format, true);
    if print_structured(&locations, format)? {
        return Ok(());
    }
    let rows: Vec<TableRow> = ctx.with_aliases(|inv, short_ids| {
        locations
            .iter()
            .map(|l| {
                let items = inv
                    .equipment()
                    .iter()
                    .filter(|e| e.storage_location_id == Some(l.id))
                    .count();
                TableRow::new(l.id, short_ids)
                    .cell(l.name.clone())
                    .cell(items.to_string())
                    .cell(or_dash(&l.notes))
            })
            .collect()
    });
    TableFormatter::new(COLUMNS, "location").output(rows, format);
    Ok(())
}
