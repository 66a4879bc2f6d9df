// Result materialization
//
// Converts classification/reachability output into the flow and summary
// records the shared serialization schema expects. Pure formatting.

pub mod domain;
pub mod infrastructure;

pub use domain::{
    Diagnostic, FileReport, Flow, FlowEndpoint, LineHighlight, QualifiedName, SourceLocation,
    Summary,
};
pub use infrastructure::{error_report, Materializer};
