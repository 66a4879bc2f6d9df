//! Shared data model
//!
//! Fact tables and source spans are consumed by every analysis feature, so
//! they live here rather than inside a single feature slice.

pub mod facts;
pub mod span;

pub use facts::{
    call_root, component_matches, component_names, member_parts, member_root, value_components,
    CallArguments, CallFact, FactTable, FunctionFact, VariableFact,
};
pub use span::{Location, Span};
