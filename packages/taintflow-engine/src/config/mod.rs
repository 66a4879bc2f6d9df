//! Analysis configuration
//!
//! Identifier lists (sources, sinks, sanitizers) plus the analysis budget.
//! Loadable from YAML or JSON; a malformed list is fatal for the whole run,
//! since without it nothing can be classified.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, TaintflowError};
use crate::shared::AnalysisBudget;

/// Budget limits for one per-file analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Maximum reachability recursion depth
    pub max_depth: usize,

    /// Wall-clock budget per file, seconds. `None` disables the deadline.
    pub timeout_seconds: Option<u64>,

    /// Maximum flows reported per file
    pub max_paths: usize,
}

impl BudgetConfig {
    /// CI-style quick pass
    pub fn fast() -> Self {
        Self {
            max_depth: 10,
            timeout_seconds: Some(10),
            max_paths: 50,
        }
    }

    /// Default: matches the historical per-unit driver timeout
    pub fn balanced() -> Self {
        Self {
            max_depth: 30,
            timeout_seconds: Some(30),
            max_paths: 200,
        }
    }

    /// Audit-style exhaustive pass
    pub fn thorough() -> Self {
        Self {
            max_depth: 100,
            timeout_seconds: Some(300),
            max_paths: 1000,
        }
    }

    pub fn to_budget(&self) -> AnalysisBudget {
        AnalysisBudget::new(
            self.timeout_seconds.map(Duration::from_secs),
            self.max_depth,
        )
    }
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self::balanced()
    }
}

/// Source/sink identifier lists driving an analysis run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// APIs introducing untrusted data
    pub sources: Vec<String>,

    /// APIs where tainted data is dangerous
    pub sinks: Vec<String>,

    /// Sinks dangerous even with a literal parameter containing the source
    #[serde(default)]
    pub constant_param_sinks: Vec<String>,

    /// Calls that neutralize taint (negative sources)
    #[serde(default)]
    pub sanitizers: Vec<String>,

    /// Consumers allowed to see sanitized values as tainted again
    #[serde(default)]
    pub sanitizer_allowlist: Vec<String>,

    #[serde(default)]
    pub budget: BudgetConfig,
}

impl AnalysisConfig {
    pub fn new(sources: Vec<String>, sinks: Vec<String>) -> Self {
        Self {
            sources,
            sinks,
            ..Self::default()
        }
    }

    pub fn from_yaml_str(s: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(s).map_err(|e| TaintflowError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(s).map_err(|e| TaintflowError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a path, dispatching on extension (`.yaml`/`.yml`/`.json`)
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&text),
            Some("json") => Self::from_json_str(&text),
            other => Err(TaintflowError::config(format!(
                "unsupported config extension: {:?}",
                other
            ))),
        }
    }

    /// Reject identifier lists the engine cannot act on.
    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(TaintflowError::config("source identifier list is empty"));
        }
        if self.sinks.is_empty() {
            return Err(TaintflowError::config("sink identifier list is empty"));
        }
        for list in [
            &self.sources,
            &self.sinks,
            &self.constant_param_sinks,
            &self.sanitizers,
            &self.sanitizer_allowlist,
        ] {
            for id in list.iter() {
                if id.trim().is_empty() {
                    return Err(TaintflowError::config("blank identifier in list"));
                }
                if id.trim() != id.as_str() {
                    return Err(TaintflowError::config(format!(
                        "identifier has surrounding whitespace: {:?}",
                        id
                    )));
                }
            }
        }
        for sink in &self.constant_param_sinks {
            if !self.sinks.contains(sink) {
                return Err(TaintflowError::config(format!(
                    "constant-param sink {:?} is not in the sink list",
                    sink
                )));
            }
        }
        Ok(())
    }

    pub fn is_sanitizer(&self, name: &str) -> bool {
        self.sanitizers.iter().any(|s| s == name)
    }

    pub fn is_allowlisted(&self, name: &str) -> bool {
        self.sanitizer_allowlist.iter().any(|s| s == name)
    }

    pub fn is_constant_param_sink(&self, sink: &str) -> bool {
        self.constant_param_sinks.iter().any(|s| s == sink)
    }
}
