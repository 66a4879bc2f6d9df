//! Per-line classification state
//!
//! Every analyzed line ends up in one of six states. Transitions are
//! monotonic: a line only moves up in priority, and `ActiveSink` is terminal.
//! Inert variants are kept for completeness of reporting; they are not
//! findings.

use serde::{Deserialize, Serialize};

use rustc_hash::FxHashMap;

/// Classification of a source line after propagation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassificationState {
    /// Source is present but never reached a sink
    InactiveSource,

    /// Source passed through this variable but never reached a sink
    InactiveVariable,

    /// Carries a source value via assignment
    ActiveVariable,

    /// A function call transports a source value
    ActiveFunction,

    /// Source value freshly introduced
    ActiveSource,

    /// Sink reached by tainted data: the finding
    ActiveSink,
}

impl ClassificationState {
    /// Priority for duplicate collapse: `ActiveSink` > `ActiveSource` >
    /// `ActiveFunction` > `ActiveVariable` > inert.
    pub fn priority(&self) -> u8 {
        match self {
            Self::InactiveVariable => 0,
            Self::InactiveSource => 1,
            Self::ActiveVariable => 2,
            Self::ActiveFunction => 3,
            Self::ActiveSource => 4,
            Self::ActiveSink => 5,
        }
    }

    pub fn is_active(&self) -> bool {
        self.priority() >= 2
    }

    /// Inert counterpart used when a source never reaches any sink
    pub fn downgraded(&self) -> Self {
        match self {
            Self::ActiveSource => Self::InactiveSource,
            Self::ActiveVariable | Self::ActiveFunction => Self::InactiveVariable,
            other => *other,
        }
    }
}

/// Line -> classification, upgrade-only
#[derive(Debug, Clone, Default)]
pub struct HighlightMap {
    map: FxHashMap<u32, ClassificationState>,
}

impl HighlightMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `state` for `line`, keeping the higher-priority classification.
    /// Returns true when the entry changed.
    pub fn upgrade(&mut self, line: u32, state: ClassificationState) -> bool {
        match self.map.get(&line) {
            Some(existing) if existing.priority() >= state.priority() => false,
            _ => {
                self.map.insert(line, state);
                true
            }
        }
    }

    pub fn get(&self, line: u32) -> Option<ClassificationState> {
        self.map.get(&line).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Merge another map in, upgrade-only
    pub fn merge(&mut self, other: &HighlightMap) {
        for (line, state) in &other.map {
            self.upgrade(*line, *state);
        }
    }

    /// Replace each active entry with its inert counterpart
    pub fn downgrade_all(&mut self) {
        for state in self.map.values_mut() {
            *state = state.downgraded();
        }
    }

    /// Entries sorted by line
    pub fn sorted(&self) -> Vec<(u32, ClassificationState)> {
        let mut entries: Vec<_> = self.map.iter().map(|(l, s)| (*l, *s)).collect();
        entries.sort_by_key(|(l, _)| *l);
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upgrade_is_monotonic() {
        let mut map = HighlightMap::new();
        assert!(map.upgrade(3, ClassificationState::ActiveVariable));
        assert!(map.upgrade(3, ClassificationState::ActiveSink));
        // Downgrade attempts are ignored
        assert!(!map.upgrade(3, ClassificationState::ActiveVariable));
        assert_eq!(map.get(3), Some(ClassificationState::ActiveSink));
    }

    #[test]
    fn test_priority_ordering() {
        assert!(
            ClassificationState::ActiveSink.priority()
                > ClassificationState::ActiveFunction.priority()
        );
        assert!(
            ClassificationState::ActiveFunction.priority()
                > ClassificationState::ActiveVariable.priority()
        );
        assert!(
            ClassificationState::ActiveVariable.priority()
                > ClassificationState::InactiveSource.priority()
        );
    }

    #[test]
    fn test_downgrade_all() {
        let mut map = HighlightMap::new();
        map.upgrade(1, ClassificationState::ActiveSource);
        map.upgrade(2, ClassificationState::ActiveVariable);
        map.downgrade_all();
        assert_eq!(map.get(1), Some(ClassificationState::InactiveSource));
        assert_eq!(map.get(2), Some(ClassificationState::InactiveVariable));
    }
}
