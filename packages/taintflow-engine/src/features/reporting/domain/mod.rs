//! Reporting domain types

pub mod records;

pub use records::{
    Diagnostic, FileReport, Flow, FlowEndpoint, LineHighlight, QualifiedName, SourceLocation,
    Summary,
};
