// Call-graph reachability
//
// The alternate, graph-native strategy: call sites are indexed once per file
// and candidate connections are re-derived lazily per query by a recursive,
// cycle-guarded search. Used when a pairwise source/sink decision is wanted
// instead of a flat propagation pass.

pub mod domain;
pub mod infrastructure;

pub use domain::{CallIndex, CallSite};
pub use infrastructure::{ReachOutcome, Resolver};
