//! Taint propagation domain types

pub mod highlight;
pub mod state;

pub use highlight::{ClassificationState, HighlightMap};
pub use state::{ChainLink, SinkHit, TaintEntry, TaintState};
