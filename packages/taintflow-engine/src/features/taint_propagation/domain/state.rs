//! Taint propagation state
//!
//! Owned, explicit state threaded through one propagation pass. One
//! `TaintState` per configured source identifier: membership in the active
//! set is monotonic within a pass (a name is never un-tainted; a suppression
//! flag only blocks propagation onward from that entry).

use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use super::highlight::HighlightMap;

/// How a name became tainted
#[derive(Debug, Clone)]
pub struct TaintEntry {
    pub name: String,

    /// Predecessor name in the propagation chain (None for seeds)
    pub origin: Option<String>,

    /// Line where the taint was acquired
    pub line: u32,

    /// Scope the tainted name is valid in
    pub scope_start: u32,
    pub scope_end: u32,

    /// Tainted through a sanitizing wrapper; propagation continues for
    /// bookkeeping but the name cannot trigger a sink
    pub suppressed: bool,

    /// Tainted as a callee parameter (scope rules differ: the name is valid
    /// anywhere in the callee body, regardless of the caller's position)
    pub via_parameter: bool,
}

/// One step of a concrete propagation chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainLink {
    pub name: String,
    pub line: u32,
}

/// A sink reached by tainted data
#[derive(Debug, Clone)]
pub struct SinkHit {
    /// Callee of the sink call as written
    pub sink: String,

    /// Sink call line
    pub line: u32,

    /// The argument (or component) that carried the taint
    pub tainted_argument: String,

    /// Source identifier that seeded the taint
    pub source: String,

    /// Line where the source value entered
    pub source_line: u32,

    /// Concrete chain of carriers from seed to sink argument
    pub chain: Vec<ChainLink>,

    /// Sink call arguments, textual
    pub arguments: Vec<String>,
}

/// Active set + worklist + provisional highlights for one source identifier
#[derive(Debug, Default)]
pub struct TaintState {
    entries: FxHashMap<String, TaintEntry>,
    pub worklist: VecDeque<String>,
    pub highlights: HighlightMap,
    pub sink_hits: Vec<SinkHit>,
}

impl TaintState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a name to the active set. Returns false if already present: every
    /// successful mark adds a new name, which bounds the worklist by the
    /// number of distinct names in the file.
    pub fn mark(&mut self, entry: TaintEntry) -> bool {
        if self.entries.contains_key(&entry.name) {
            return false;
        }
        self.worklist.push_back(entry.name.clone());
        self.entries.insert(entry.name.clone(), entry);
        true
    }

    pub fn is_tainted(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&TaintEntry> {
        self.entries.get(name)
    }

    /// First active entry among candidate spellings of an argument component
    pub fn get_any<'a>(&self, candidates: impl IntoIterator<Item = &'a str>) -> Option<&TaintEntry> {
        candidates.into_iter().find_map(|c| self.entries.get(c))
    }

    pub fn active_count(&self) -> usize {
        self.entries.len()
    }

    /// Unwind the origin links of `name` into a seed-to-name chain.
    pub fn chain_for(&self, name: &str) -> Vec<ChainLink> {
        let mut chain = Vec::new();
        let mut current = Some(name.to_string());
        while let Some(n) = current {
            match self.entries.get(&n) {
                Some(entry) => {
                    chain.push(ChainLink {
                        name: entry.name.clone(),
                        line: entry.line,
                    });
                    current = entry.origin.clone();
                }
                None => break,
            }
            // Origin links cannot cycle (marks are insert-once), but cap the
            // unwind anyway so a corrupted chain degrades instead of hanging.
            if chain.len() > self.entries.len() {
                break;
            }
        }
        chain.reverse();
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, origin: Option<&str>, line: u32) -> TaintEntry {
        TaintEntry {
            name: name.to_string(),
            origin: origin.map(str::to_string),
            line,
            scope_start: 1,
            scope_end: 100,
            suppressed: false,
            via_parameter: false,
        }
    }

    #[test]
    fn test_mark_is_insert_once() {
        let mut state = TaintState::new();
        assert!(state.mark(entry("a", None, 1)));
        assert!(!state.mark(entry("a", None, 5)));
        assert_eq!(state.active_count(), 1);
        assert_eq!(state.get("a").unwrap().line, 1);
    }

    #[test]
    fn test_chain_unwinds_to_seed() {
        let mut state = TaintState::new();
        state.mark(entry("a", None, 1));
        state.mark(entry("b", Some("a"), 2));
        state.mark(entry("c", Some("b"), 3));

        let chain = state.chain_for("c");
        let names: Vec<&str> = chain.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_get_any_matches_candidates() {
        let mut state = TaintState::new();
        state.mark(entry("data", None, 1));
        assert!(state.get_any(["x", "data"]).is_some());
        assert!(state.get_any(["x", "y"]).is_none());
    }
}
