//! Result materialization
//!
//! Pure formatting: converts propagation or reachability output into the
//! flow/summary records. Spans are recovered by scanning the raw source line
//! for the matched substring.

use crate::features::parsing::domain::ParsedTree;
use crate::features::reachability::domain::{CallIndex, CallSite};
use crate::features::reachability::infrastructure::ReachOutcome;
use crate::features::reporting::domain::{
    Diagnostic, FileReport, Flow, FlowEndpoint, LineHighlight, QualifiedName, SourceLocation,
    Summary,
};
use crate::features::taint_propagation::domain::ClassificationState;
use crate::features::taint_propagation::infrastructure::PropagationOutcome;

/// Builds `FileReport`s from analysis output
pub struct Materializer<'a> {
    tree: &'a ParsedTree,
    file_stem: String,
}

impl<'a> Materializer<'a> {
    pub fn new(tree: &'a ParsedTree) -> Self {
        let file_stem = std::path::Path::new(&tree.file_path)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("module")
            .to_string();
        Self { tree, file_stem }
    }

    /// Scan the raw line for `needle` to recover the column span.
    fn locate(&self, line: u32, needle: &str) -> SourceLocation {
        let text = self.tree.line_text(line);
        let start = text.find(needle).unwrap_or(0) as u32;
        SourceLocation {
            row: line,
            start_column: start,
            end_column: start + needle.len() as u32,
        }
    }

    fn endpoint(&self, callee: &str, line: u32, arguments: Vec<String>) -> FlowEndpoint {
        FlowEndpoint {
            node: QualifiedName::from_callee(callee, &self.file_stem),
            location: self.locate(line, callee),
            arguments,
        }
    }

    /// Report from an intraprocedural propagation pass.
    pub fn from_propagation(&self, outcome: &PropagationOutcome) -> FileReport {
        let mut flows = Vec::new();
        let mut summary = Summary::default();

        for hit in &outcome.sink_hits {
            let source_ep = self.endpoint(&hit.source, hit.source_line, Vec::new());
            let sink_ep = self.endpoint(&hit.sink, hit.line, hit.arguments.clone());

            if !summary.sources.contains(&source_ep) {
                summary.sources.push(source_ep.clone());
            }
            if !summary.sinks.contains(&sink_ep) {
                summary.sinks.push(sink_ep.clone());
            }
            flows.push(Flow {
                source: source_ep,
                sink: sink_ep,
            });
        }

        let highlights = self.render_highlights(outcome.highlights.sorted());

        FileReport {
            file_path: self.tree.file_path.clone(),
            language: self.tree.language.clone(),
            malicious: !flows.is_empty(),
            timed_out: outcome.truncated,
            flows,
            summary,
            highlights,
            diagnostics: Vec::new(),
        }
    }

    /// Report from pairwise reachability queries.
    pub fn from_reachability(
        &self,
        index: &CallIndex,
        results: &[(&CallSite, &CallSite, ReachOutcome)],
        timed_out: bool,
    ) -> FileReport {
        let mut flows = Vec::new();
        let mut summary = Summary::default();
        let mut highlight_entries = Vec::new();

        for (source, sink, outcome) in results {
            let source_ep = self.endpoint(&source.callee, source.line, source.args.clone());
            let sink_ep = self.endpoint(&sink.callee, sink.line, sink.args.clone());

            if !summary.sources.contains(&source_ep) {
                summary.sources.push(source_ep.clone());
            }
            if !summary.sinks.contains(&sink_ep) {
                summary.sinks.push(sink_ep.clone());
            }

            if outcome.reachable {
                highlight_entries.push((source.line, ClassificationState::ActiveSource));
                highlight_entries.push((sink.line, ClassificationState::ActiveSink));
                // Intermediate sites visited on the successful path
                for site_id in &outcome.path {
                    let site = index.site(*site_id);
                    if site.line != source.line && site.line != sink.line {
                        highlight_entries.push((site.line, ClassificationState::ActiveFunction));
                    }
                }
                flows.push(Flow {
                    source: source_ep,
                    sink: sink_ep,
                });
            } else {
                highlight_entries.push((source.line, ClassificationState::InactiveSource));
            }
        }

        highlight_entries.sort_by_key(|(line, state)| (*line, std::cmp::Reverse(state.priority())));
        highlight_entries.dedup_by_key(|(line, _)| *line);

        FileReport {
            file_path: self.tree.file_path.clone(),
            language: self.tree.language.clone(),
            malicious: !flows.is_empty(),
            timed_out,
            flows,
            summary,
            highlights: self.render_highlights(highlight_entries),
            diagnostics: Vec::new(),
        }
    }

    /// Render line highlights, sink findings swapped to the front.
    fn render_highlights(
        &self,
        entries: Vec<(u32, ClassificationState)>,
    ) -> Vec<LineHighlight> {
        let mut highlights: Vec<LineHighlight> = entries
            .into_iter()
            .map(|(line, state)| LineHighlight {
                line,
                state,
                text: self.tree.line_text(line).trim().to_string(),
            })
            .collect();

        // ActiveSink entries lead the report ordering
        highlights.sort_by_key(|h| {
            (
                h.state != ClassificationState::ActiveSink,
                h.line,
            )
        });
        highlights
    }
}

/// Attach a diagnostic to an otherwise empty report (file-local failures).
pub fn error_report(file_path: &str, language: &str, message: String) -> FileReport {
    FileReport {
        file_path: file_path.to_string(),
        language: language.to_string(),
        diagnostics: vec![Diagnostic {
            message,
            line: None,
        }],
        ..FileReport::default()
    }
}
