//! `materiel quota` command - Creation quota usage

use console::style;
use miette::Result;
use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::cli::output::{effective_format, print_structured};
use crate::cli::{CommandContext, GlobalOpts};
use crate::core::quota::{QuotaCategory, QuotaGate};

#[derive(clap::Args, Debug)]
pub struct QuotaArgs {
    /// Only show categories at their limit
    #[arg(long)]
    pub exhausted: bool,
}

#[derive(Debug, Serialize)]
struct QuotaUsage {
    category: QuotaCategory,
    created: u64,
    limit: Option<u64>,
    remaining: Option<u64>,
}

fn usage(gate: &QuotaGate) -> Vec<QuotaUsage> {
    QuotaCategory::all()
        .iter()
        .map(|&category| QuotaUsage {
            category,
            created: gate.lifetime(category),
            limit: (!gate.is_premium()).then(|| gate.limits().limit(category)),
            remaining: gate.remaining(category),
        })
        .collect()
}

pub fn run(args: QuotaArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = CommandContext::open(global)?;
    let (premium, mut rows) = ctx.read(|inv| (inv.quota().is_premium(), usage(inv.quota())));
    if args.exhausted {
        rows.retain(|r| r.remaining == Some(0));
    }

    let format = effective_format(global.format, true);
    if !print_structured(&rows, format)? {
        if premium {
            println!("{} no creation limits apply", style("Premium:").green().bold());
        }
        let mut builder = Builder::default();
        builder.push_record(["CATEGORY", "CREATED", "LIMIT", "REMAINING"]);
        for row in &rows {
            let limit = row.limit.map(|l| l.to_string()).unwrap_or_else(|| "-".into());
            let remaining = row.remaining.map(|r| r.to_string()).unwrap_or_else(|| "-".into());
            builder.push_record([row.category.to_string(), row.created.to_string(), limit, remaining]);
        }
        let mut table = builder.build();
        table.with(Style::rounded());
        println!("{table}");
    }
    ctx.finish()
}
