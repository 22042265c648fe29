//! GPU pricing reference

use anyhow::Result;
use colored::Colorize;
use spend_lib::format::format_currency;
use spend_lib::models::Provider;
use spend_lib::pricing::{self, Availability, GpuPricing, GPU_PRICING};
use tabled::Tabled;

use crate::output::{self, OutputFormat};

#[derive(Tabled)]
struct PricingRow {
    #[tabled(rename = "Provider")]
    provider: String,
    #[tabled(rename = "GPU")]
    gpu_type: String,
    #[tabled(rename = "$/hour")]
    price: String,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "Compute")]
    compute: String,
    #[tabled(rename = "Availability")]
    availability: String,
}

impl From<&GpuPricing> for PricingRow {
    fn from(row: &GpuPricing) -> Self {
        let cheapest = pricing::cheapest_for(row.gpu_type).is_some_and(|c| c == row);
        let price = format_currency(row.price_per_hour);

        Self {
            provider: row.provider.to_string(),
            gpu_type: row.gpu_type.to_string(),
            price: if cheapest {
                format!("{} *", price).green().to_string()
            } else {
                price
            },
            memory: row.memory.to_string(),
            compute: row.compute_capability.to_string(),
            availability: match row.availability {
                Availability::High => "high".green().to_string(),
                Availability::Medium => "medium".yellow().to_string(),
                Availability::Low => "low".red().to_string(),
            },
        }
    }
}

pub fn show_pricing(provider: Option<Provider>, format: OutputFormat) -> Result<()> {
    let rows: Vec<&GpuPricing> = match provider {
        Some(provider) => pricing::gpus_by_provider(provider),
        None => GPU_PRICING.iter().collect(),
    };

    match format {
        OutputFormat::Json => output::print_json(&rows)?,
        OutputFormat::Table => {
            output::print_heading("GPU Pricing", '=');
            output::print_table(rows.into_iter().map(PricingRow::from).collect());
            println!("{}", "* cheapest provider for this GPU".dimmed());
        }
    }

    Ok(())
}
