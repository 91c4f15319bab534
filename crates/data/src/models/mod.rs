//! Data models for the positioning pipeline.

pub mod canonical;

pub use canonical::{columns, CanonicalRecord};
