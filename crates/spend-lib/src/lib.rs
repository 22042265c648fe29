//! Spend library for GPU training cost tracking
//!
//! This crate provides the core functionality for:
//! - Synthetic experiment records, pricing tables and spend history
//! - Live cost simulation of running experiments
//! - Budget threshold alerts with deduplication
//! - Formatting and aggregation helpers for display
//! - Health checks and observability

pub mod aggregate;
pub mod dashboard;
pub mod error;
pub mod format;
pub mod generator;
pub mod health;
pub mod models;
pub mod observability;
pub mod pricing;
pub mod simulator;

pub use dashboard::{BudgetLevel, DashboardState};
pub use error::{Result, SpendError};
pub use generator::{ExperimentCatalog, ExperimentGenerator};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{SpendMetrics, StructuredLogger};
pub use simulator::{
    BudgetAlert, BudgetAlertKind, BudgetMonitor, BudgetThresholds, LiveSimulator,
    SimulatorConfig, UpdateSink,
};
