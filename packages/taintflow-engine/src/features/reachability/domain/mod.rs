//! Reachability domain types

pub mod call_index;
pub mod call_site;

pub use call_index::{CallIndex, VarDef};
pub use call_site::{CallSite, ContextKey};
