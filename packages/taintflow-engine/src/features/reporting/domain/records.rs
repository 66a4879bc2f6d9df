//! Finding records
//!
//! The shapes handed to the shared cross-language serialization schema:
//! `Flow { source, sink }` pairs plus a `Summary` of every source and sink
//! seen. The engine populates these fields; schema evolution is owned
//! elsewhere.

use serde::{Deserialize, Serialize};

use crate::features::taint_propagation::domain::ClassificationState;

/// `base.name` qualified API name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    pub base: String,
    pub name: String,
}

impl QualifiedName {
    /// Split a callee as written: `bar.exec` -> base `bar`, name `exec`.
    /// An unqualified callee gets `default_base` (typically the file stem).
    pub fn from_callee(callee: &str, default_base: &str) -> Self {
        match callee.rsplit_once('.') {
            Some((base, name)) => Self {
                base: base.to_string(),
                name: name.to_string(),
            },
            None => Self {
                base: default_base.to_string(),
                name: callee.to_string(),
            },
        }
    }

    pub fn full(&self) -> String {
        if self.base.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.base, self.name)
        }
    }
}

/// Row plus start/end column of a matched call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub row: u32,
    pub start_column: u32,
    pub end_column: u32,
}

/// One endpoint of a flow (a source or sink occurrence)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowEndpoint {
    pub node: QualifiedName,
    pub location: SourceLocation,
    pub arguments: Vec<String>,
}

/// A source-to-sink finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flow {
    pub source: FlowEndpoint,
    pub sink: FlowEndpoint,
}

/// Every source and sink occurrence observed in a file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub sources: Vec<FlowEndpoint>,
    pub sinks: Vec<FlowEndpoint>,
}

/// Classified line for report rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineHighlight {
    pub line: u32,
    pub state: ClassificationState,
    pub text: String,
}

/// A problem surfaced separately from findings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub message: String,
    pub line: Option<u32>,
}

/// Per-file analysis result. A run always yields one of these, possibly with
/// empty flows; internal errors become diagnostics, never findings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileReport {
    pub file_path: String,
    pub language: String,

    pub flows: Vec<Flow>,
    pub summary: Summary,
    pub highlights: Vec<LineHighlight>,

    /// Any flow was found
    pub malicious: bool,

    /// The analysis budget expired; findings are partial but valid
    pub timed_out: bool,

    pub diagnostics: Vec<Diagnostic>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_name_split() {
        let qn = QualifiedName::from_callee("bar.exec", "mod");
        assert_eq!(qn.base, "bar");
        assert_eq!(qn.name, "exec");
        assert_eq!(qn.full(), "bar.exec");
    }

    #[test]
    fn test_qualified_name_default_base() {
        let qn = QualifiedName::from_callee("eval", "mod");
        assert_eq!(qn.base, "mod");
        assert_eq!(qn.full(), "mod.eval");
    }

    #[test]
    fn test_report_serializes() {
        let report = FileReport {
            file_path: "a.js".into(),
            language: "javascript".into(),
            ..FileReport::default()
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"malicious\":false"));
    }
}
