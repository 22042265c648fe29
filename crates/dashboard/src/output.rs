//! Output formatting utilities

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use spend_lib::dashboard::BudgetLevel;
use spend_lib::format::{format_percent, EfficiencyRating};
use spend_lib::models::ExperimentStatus;
use spend_lib::simulator::BudgetAlertKind;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Width of the budget bar in cells
const BUDGET_BAR_WIDTH: usize = 40;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Render rows as a rounded table, or a notice when there are none
pub fn print_table<T: Tabled>(rows: Vec<T>) {
    if rows.is_empty() {
        println!("{}", "No items found".yellow());
        return;
    }
    println!("{}", Table::new(rows).with(Style::rounded()));
}

/// Bold title with an underline of `ch`
pub fn print_heading(title: &str, ch: char) {
    println!("{}", title.bold());
    println!("{}", ch.to_string().repeat(60));
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

pub fn color_status(status: ExperimentStatus) -> String {
    let label = status.as_str();
    match status {
        ExperimentStatus::Running => label.blue().to_string(),
        ExperimentStatus::Completed => label.green().to_string(),
        ExperimentStatus::Failed => label.red().to_string(),
        ExperimentStatus::Queued => label.yellow().to_string(),
    }
}

/// Utilization coloured by efficiency rating
pub fn color_utilization(utilization: f64) -> String {
    let formatted = format_percent(utilization);
    match EfficiencyRating::from_utilization(utilization) {
        EfficiencyRating::Excellent => formatted.green().to_string(),
        EfficiencyRating::Good => formatted.yellow().to_string(),
        EfficiencyRating::Fair | EfficiencyRating::Poor => formatted.red().to_string(),
    }
}

pub fn color_alert(kind: BudgetAlertKind, message: &str) -> String {
    match kind {
        BudgetAlertKind::Warning => message.yellow().to_string(),
        BudgetAlertKind::Critical => message.red().to_string(),
        BudgetAlertKind::Exceeded => message.red().bold().to_string(),
    }
}

/// Plain bar for a usage percentage, capped at full
pub fn budget_bar(percentage: f64) -> String {
    let filled = ((percentage.clamp(0.0, 100.0) / 100.0) * BUDGET_BAR_WIDTH as f64).round() as usize;
    format!(
        "[{}{}]",
        "█".repeat(filled),
        "░".repeat(BUDGET_BAR_WIDTH - filled)
    )
}

pub fn color_budget_bar(percentage: f64, level: BudgetLevel) -> String {
    let bar = budget_bar(percentage);
    match level {
        BudgetLevel::Normal => bar.magenta().to_string(),
        BudgetLevel::Warning => bar.yellow().to_string(),
        BudgetLevel::Critical => bar.red().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(bar: &str) -> (usize, usize) {
        (bar.matches('█').count(), bar.matches('░').count())
    }

    #[test]
    fn test_budget_bar_fill() {
        assert_eq!(cells(&budget_bar(0.0)), (0, 40));
        assert_eq!(cells(&budget_bar(50.0)), (20, 20));
        assert_eq!(cells(&budget_bar(100.0)), (40, 0));
    }

    #[test]
    fn test_budget_bar_is_capped() {
        assert_eq!(cells(&budget_bar(180.0)), (40, 0));
        assert_eq!(cells(&budget_bar(-5.0)), (0, 40));
    }

    #[test]
    fn test_color_helpers_keep_text() {
        colored::control::set_override(false);
        assert_eq!(color_status(ExperimentStatus::Failed), "failed");
        assert_eq!(color_utilization(72.34), "72.3%");
        assert_eq!(
            color_alert(BudgetAlertKind::Warning, "You've used 80% of your monthly GPU budget"),
            "You've used 80% of your monthly GPU budget"
        );
    }
}
