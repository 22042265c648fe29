//! Subcommand implementations

pub mod epochs;
pub mod experiments;
pub mod history;
pub mod leaderboard;
pub mod live;
pub mod pricing;
