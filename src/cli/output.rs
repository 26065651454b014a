//! Output formatting utilities

use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;

use crate::cli::helpers::format_short_id;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::identity::EntityId;

/// Determine the effective output format based on context
pub fn effective_format(format: OutputFormat, is_list: bool) -> OutputFormat {
    match format {
        OutputFormat::Auto if is_list => OutputFormat::Table,
        other => other,
    }
}

/// Print `value` as JSON or YAML if that format was asked for
///
/// Returns `false` for every other format, leaving output to the caller.
pub fn print_structured<T: Serialize>(value: &T, format: OutputFormat) -> Result<bool> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(value).into_diagnostic()?;
            print!("{}", yaml);
        }
        _ => return Ok(false),
    }
    Ok(true)
}

/// Report a newly created record
pub fn print_created(kind: &str, id: &EntityId, short_id: &str, title: &str, global: &GlobalOpts) {
    match global.format {
        OutputFormat::Id => println!("{}", id),
        OutputFormat::ShortId => println!("{}", short_id),
        _ => {
            println!(
                "{} Created {} {}",
                style("✓").green(),
                kind,
                style(short_id).cyan()
            );
            println!("   {}", style(format_short_id(id)).dim());
            println!("   {}", style(title).yellow());
        }
    }
}

/// Report a completed action
pub fn print_done(message: impl std::fmt::Display) {
    println!("{} {}", style("✓").green(), message);
}

pub fn print_rule() {
    println!("{}", style("─".repeat(60)).dim());
}

/// One `Label: value` line of a detail view
pub fn print_field(label: &str, value: impl std::fmt::Display) {
    println!("{}: {}", style(label).bold(), value);
}
