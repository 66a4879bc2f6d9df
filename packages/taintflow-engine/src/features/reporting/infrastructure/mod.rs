//! Reporting infrastructure

pub mod materializer;

pub use materializer::{error_report, Materializer};
