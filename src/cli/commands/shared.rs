//! Argument groups shared by several commands

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use miette::Result;

use crate::cli::helpers::{parse_amount, parse_date};
use crate::cli::CommandContext;
use crate::core::inventory::Inventory;
use crate::entities::{PricingType, RentalTerms, RepairTerms};

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum PricingArg {
    /// One price for the whole period
    Flat,
    PerDay,
    PerWeek,
    PerMonth,
}

impl From<PricingArg> for PricingType {
    fn from(arg: PricingArg) -> Self {
        match arg {
            PricingArg::Flat => PricingType::Flat,
            PricingArg::PerDay => PricingType::PerDay,
            PricingArg::PerWeek => PricingType::PerWeek,
            PricingArg::PerMonth => PricingType::PerMonth,
        }
    }
}

/// Period, pricing and deposit of a rental
#[derive(clap::Args, Debug)]
pub struct TermsArgs {
    /// Start date (default now)
    #[arg(long, value_parser = parse_date)]
    pub start: Option<DateTime<Utc>>,

    /// End date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub until: DateTime<Utc>,

    /// How the price is counted
    #[arg(long, default_value = "per-day")]
    pub pricing: PricingArg,

    /// Price per unit, or the whole price with flat pricing
    #[arg(long, value_parser = parse_amount)]
    pub price: f64,

    /// Deposit amount
    #[arg(long, value_parser = parse_amount, default_value = "0")]
    pub deposit: f64,
}

impl TermsArgs {
    pub fn terms(&self) -> RentalTerms {
        RentalTerms {
            start: self.start.unwrap_or_else(Utc::now),
            end: self.until,
            pricing: self.pricing.into(),
            unit_price: self.price,
            deposit: self.deposit,
        }
    }
}

/// Repairer, description and expected cost of a repair
#[derive(clap::Args, Debug)]
pub struct RepairTermsArgs {
    /// Repairer ID or short ID (PER@N)
    #[arg(long)]
    pub repairer: Option<String>,

    /// What needs fixing
    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Expected completion date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub expected: Option<DateTime<Utc>>,

    /// Estimated cost
    #[arg(long, value_parser = parse_amount)]
    pub estimate: Option<f64>,

    /// Repaired at no cost
    #[arg(long, conflicts_with = "estimate")]
    pub free: bool,
}

impl RepairTermsArgs {
    pub fn terms(&self, ctx: &CommandContext) -> Result<RepairTerms> {
        let repairer_id = self
            .repairer
            .as_deref()
            .map(|r| ctx.resolve(r, Inventory::persons))
            .transpose()?;
        Ok(RepairTerms {
            repairer_id,
            description: self.description.clone().unwrap_or_default(),
            expected_end: self.expected,
            estimated_cost: self.estimate,
            free: self.free,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_terms_from_args() {
        let until = Utc::now() + Duration::days(3);
        let args = TermsArgs {
            start: None,
            until,
            pricing: PricingArg::PerWeek,
            price: 40.0,
            deposit: 100.0,
        };
        let terms = args.terms();
        assert_eq!(terms.pricing, PricingType::PerWeek);
        assert_eq!(terms.end, until);
        assert_eq!(terms.total(), 40.0);
    }
}
