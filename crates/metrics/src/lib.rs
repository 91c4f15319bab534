//! Positioning metrics for weekly Commitments of Traders data.
//!
//! This crate provides:
//! - [`MetricsBuilder`]: canonical weekly rows to the wide metrics table
//! - [`validation`]: independent checks gating publication of that table
//! - [`qa`]: a hygiene gate for the canonical input
//! - [`signals`]: ACTIVE/PAUSE status derived from speculator flow
//!
//! Everything here is pure: tables in, tables or messages out. Reading and
//! writing files is left to the caller.

pub mod builder;
pub mod error;
pub mod grouping;
pub mod qa;
pub mod schema;
pub mod signals;
pub mod validation;
pub mod windows;

pub use builder::{build_metrics_weekly, MetricsBuilder};
pub use error::MetricsError;
pub use qa::run_canonical_qa;
pub use schema::{expected_columns, GroupSet, TraderGroup};
pub use signals::build_signal_status;
pub use validation::{validate_metrics, validate_metrics_with, ValidationReport, CHECKS};
