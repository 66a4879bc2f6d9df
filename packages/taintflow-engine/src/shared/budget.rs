//! Analysis budget
//!
//! The engine must be abortable at any worklist iteration or recursion point
//! without corrupting partial results. The surrounding driver historically
//! imposed an external per-unit timeout; here the same limit is an explicit
//! deadline plus a cooperative cancel flag, checked at loop heads. Expiry
//! truncates the search; findings computed before it remain valid.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cooperative cancellation handle shared with the caller.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Deadline + cancel flag threaded through one per-file analysis.
#[derive(Debug, Clone)]
pub struct AnalysisBudget {
    deadline: Option<Instant>,
    cancel: CancelToken,
    /// Maximum recursion depth for the reachability search
    pub max_depth: usize,
}

impl AnalysisBudget {
    pub fn new(timeout: Option<Duration>, max_depth: usize) -> Self {
        Self {
            deadline: timeout.map(|t| Instant::now() + t),
            cancel: CancelToken::new(),
            max_depth,
        }
    }

    /// Budget with no deadline (tests, callers owning their own timeout)
    pub fn unlimited() -> Self {
        Self::new(None, usize::MAX)
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// True once the deadline passed or the caller cancelled.
    pub fn exhausted(&self) -> bool {
        if self.cancel.is_cancelled() {
            return true;
        }
        match self.deadline {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }
}

impl Default for AnalysisBudget {
    fn default() -> Self {
        Self::unlimited()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlimited_budget_never_exhausts() {
        let budget = AnalysisBudget::unlimited();
        assert!(!budget.exhausted());
    }

    #[test]
    fn test_cancel_token_exhausts_budget() {
        let cancel = CancelToken::new();
        let budget = AnalysisBudget::unlimited().with_cancel(cancel.clone());
        assert!(!budget.exhausted());
        cancel.cancel();
        assert!(budget.exhausted());
    }

    #[test]
    fn test_zero_timeout_exhausts_immediately() {
        let budget = AnalysisBudget::new(Some(Duration::from_secs(0)), 10);
        assert!(budget.exhausted());
    }
}
