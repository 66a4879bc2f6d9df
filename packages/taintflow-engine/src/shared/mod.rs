//! Shared models and utilities

pub mod budget;
pub mod models;

pub use budget::{AnalysisBudget, CancelToken};
