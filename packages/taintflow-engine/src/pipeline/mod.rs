//! Per-file orchestration and the parallel batch driver
//!
//! One file is analyzed single-threaded: parse -> extract -> propagate (or
//! resolve reachability) -> materialize. Independent files share nothing, so
//! the package driver fans out with rayon and only joins the reports.
//!
//! Error policy: a config error aborts the run; a parse error is file-local
//! and becomes a diagnostic report; propagation/reachability never error,
//! since unprovable reachability is just "not reachable". Budget expiry
//! truncates with partial findings kept.

use std::path::Path;

use rayon::prelude::*;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::AnalysisConfig;
use crate::errors::{Result, TaintflowError};
use crate::features::fact_extraction::FactExtractor;
use crate::features::parsing::domain::ParsedTree;
use crate::features::parsing::infrastructure::{SourceLanguage, TreeSitterParser};
use crate::features::parsing::ports::Parser;
use crate::features::reachability::domain::CallIndex;
use crate::features::reachability::infrastructure::{ReachOutcome, Resolver};
use crate::features::reporting::infrastructure::{error_report, Materializer};
use crate::features::reporting::FileReport;
use crate::features::taint_propagation::infrastructure::Propagator;
use crate::shared::{AnalysisBudget, CancelToken};

/// Which engine strategy drives the per-file analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Intraprocedural worklist propagation (per-line classification)
    #[default]
    Propagation,

    /// Interprocedural pairwise reachability over the call index
    Reachability,
}

/// Batch result: one report per analyzed file
#[derive(Debug, Default)]
pub struct PackageReport {
    pub files: Vec<FileReport>,
}

impl PackageReport {
    /// Files with at least one flow
    pub fn findings(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|f| f.malicious)
    }
}

/// Analyze one already-parsed file with an explicit budget.
pub fn analyze_parsed(
    tree: &ParsedTree,
    config: &AnalysisConfig,
    budget: &AnalysisBudget,
    strategy: Strategy,
) -> Result<FileReport> {
    let table = FactExtractor::extract(tree)?;
    let materializer = Materializer::new(tree);

    let report = match strategy {
        Strategy::Propagation => {
            let outcome = Propagator::new(&table, config, budget).run();
            materializer.from_propagation(&outcome)
        }
        Strategy::Reachability => {
            let index = CallIndex::build(tree, &table);
            let resolver = Resolver::new(&index, budget);

            let mut results: Vec<(
                &crate::features::reachability::domain::CallSite,
                &crate::features::reachability::domain::CallSite,
                ReachOutcome,
            )> = Vec::new();
            let mut reached: Vec<(String, String)> = Vec::new();

            for source_api in &config.sources {
                for sink_api in &config.sinks {
                    for source_site in index.sites_matching(source_api) {
                        for sink_site in index.sites_matching(sink_api) {
                            if source_site.id == sink_site.id {
                                continue;
                            }
                            // A sink earlier in the file than the source
                            // cannot consume its data
                            if sink_site.line < source_site.line {
                                continue;
                            }
                            let outcome = resolver.reachable(source_site, sink_site);
                            if outcome.reachable {
                                let key =
                                    (source_site.text.clone(), sink_site.text.clone());
                                if reached.contains(&key) {
                                    continue;
                                }
                                reached.push(key);
                            }
                            results.push((source_site, sink_site, outcome));
                        }
                    }
                }
            }

            materializer.from_reachability(&index, &results, budget.exhausted())
        }
    };

    debug!(
        file = tree.file_path.as_str(),
        flows = report.flows.len(),
        timed_out = report.timed_out,
        "analysis done"
    );
    Ok(report)
}

/// Analyze raw source text with the config's budget.
pub fn analyze_source(
    source: &str,
    language: SourceLanguage,
    file_path: &str,
    config: &AnalysisConfig,
) -> Result<FileReport> {
    config.validate()?;
    let parser = TreeSitterParser::new(language);
    let tree = parser.parse(source, file_path)?;
    let budget = config.budget.to_budget();
    analyze_parsed(&tree, config, &budget, Strategy::Propagation)
}

/// Analyze raw source text with the reachability strategy.
pub fn analyze_reachability(
    source: &str,
    language: SourceLanguage,
    file_path: &str,
    config: &AnalysisConfig,
) -> Result<FileReport> {
    config.validate()?;
    let parser = TreeSitterParser::new(language);
    let tree = parser.parse(source, file_path)?;
    let budget = config.budget.to_budget();
    analyze_parsed(&tree, config, &budget, Strategy::Reachability)
}

/// Discover and analyze every supported file under `root` in parallel.
///
/// Parse failures do not abort the batch: the affected file gets a
/// diagnostics-only report and the rest proceed.
pub fn analyze_package(
    root: &Path,
    config: &AnalysisConfig,
    strategy: Strategy,
) -> Result<PackageReport> {
    analyze_package_cancellable(root, config, strategy, CancelToken::new())
}

/// `analyze_package` with a caller-owned cancel token; cancelling mid-run
/// keeps the reports finished so far plus truncated partials.
pub fn analyze_package_cancellable(
    root: &Path,
    config: &AnalysisConfig,
    strategy: Strategy,
    cancel: CancelToken,
) -> Result<PackageReport> {
    config.validate()?;

    let targets: Vec<(std::path::PathBuf, SourceLanguage)> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let lang = e
                .path()
                .extension()
                .and_then(|x| x.to_str())
                .and_then(SourceLanguage::from_extension)?;
            Some((e.path().to_path_buf(), lang))
        })
        .collect();

    let files: Vec<FileReport> = targets
        .par_iter()
        .map(|(path, lang)| {
            let display_path = path.display().to_string();
            let source = match std::fs::read_to_string(path) {
                Ok(s) => s,
                Err(e) => {
                    warn!(file = display_path.as_str(), "unreadable file: {}", e);
                    return error_report(&display_path, lang.name(), e.to_string());
                }
            };
            let parser = TreeSitterParser::new(*lang);
            let tree = match parser.parse(&source, &display_path) {
                Ok(t) => t,
                Err(e) => return error_report(&display_path, lang.name(), e.to_string()),
            };
            let budget = config.budget.to_budget().with_cancel(cancel.clone());
            match analyze_parsed(&tree, config, &budget, strategy) {
                Ok(report) => report,
                Err(e) => {
                    // File-local failures surface as diagnostics, not crashes
                    error_report(&display_path, lang.name(), e.to_string())
                }
            }
        })
        .collect();

    Ok(PackageReport { files })
}

/// Guard against misconfigured entry points: language must match extension.
pub fn language_for_path(path: &Path) -> Result<SourceLanguage> {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(SourceLanguage::from_extension)
        .ok_or_else(|| {
            TaintflowError::parse(format!("unsupported file type: {}", path.display()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AnalysisConfig {
        AnalysisConfig::new(vec!["foo.getData".into()], vec!["bar.exec".into()])
    }

    #[test]
    fn test_analyze_source_end_to_end() {
        let report = analyze_source(
            "var a = foo.getData();\nbar.exec(a);\n",
            SourceLanguage::JavaScript,
            "t.js",
            &config(),
        )
        .unwrap();
        assert!(report.malicious);
        assert_eq!(report.flows.len(), 1);
    }

    #[test]
    fn test_analyze_reachability_end_to_end() {
        let report = analyze_reachability(
            "var a = foo.getData();\nbar.exec(a);\n",
            SourceLanguage::JavaScript,
            "t.js",
            &config(),
        )
        .unwrap();
        assert!(report.malicious);
        assert_eq!(report.flows.len(), 1);
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let bad = AnalysisConfig::default();
        let result = analyze_source("x = 1\n", SourceLanguage::Python, "t.py", &bad);
        assert!(matches!(result, Err(TaintflowError::Config(_))));
    }

    #[test]
    fn test_package_batch_survives_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("good.js"),
            "var a = foo.getData();\nbar.exec(a);\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("bad.js"), "function broken( {\n").unwrap();
        std::fs::write(dir.path().join("ignored.txt"), "not code").unwrap();

        let report = analyze_package(dir.path(), &config(), Strategy::Propagation).unwrap();
        assert_eq!(report.files.len(), 2);
        assert_eq!(report.findings().count(), 1);

        let bad = report
            .files
            .iter()
            .find(|f| f.file_path.ends_with("bad.js"))
            .unwrap();
        assert!(!bad.diagnostics.is_empty());
        assert!(!bad.malicious);
    }

    #[test]
    fn test_cancelled_run_returns_partial_reports() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.js"), "bar.exec(x);\n").unwrap();

        let cancel = CancelToken::new();
        cancel.cancel();
        let report =
            analyze_package_cancellable(dir.path(), &config(), Strategy::Propagation, cancel)
                .unwrap();
        // The run still yields a report per file; findings are truncated
        assert_eq!(report.files.len(), 1);
        assert!(report.files[0].timed_out);
    }
}
