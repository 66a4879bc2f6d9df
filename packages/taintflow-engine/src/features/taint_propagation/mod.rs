// Intraprocedural taint propagation
//
// Worklist pass over the fact tables: seeds from configured source
// identifiers, propagates through assignments, call arguments and return
// values, then checks configured sinks. Produces a per-line classification
// (highlight) plus concrete sink hits with their propagation chains.

pub mod domain;
pub mod infrastructure;

pub use domain::{ChainLink, ClassificationState, HighlightMap, SinkHit, TaintState};
pub use infrastructure::{PropagationOutcome, Propagator};
