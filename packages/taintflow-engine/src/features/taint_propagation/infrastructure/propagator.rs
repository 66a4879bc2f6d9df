//! Worklist taint propagation
//!
//! For each configured source identifier the propagator seeds the active set,
//! drains a worklist across three edge kinds (assignment, call argument,
//! return value), then checks every configured sink. A name enters the active
//! set at most once, so the loop terminates: the set is bounded by the number
//! of distinct names in the file.
//!
//! Scope handling is intentionally conservative. An assignment only inherits
//! taint when it sits in the tainting entry's scope at or after its line, and
//! a reassignment between the tainting site and a use cuts the flow unless
//! the new value itself references an active name. The one exception is a
//! callee parameter: it is valid anywhere in the callee body.

use tracing::debug;

use crate::config::AnalysisConfig;
use crate::features::taint_propagation::domain::{
    ClassificationState, HighlightMap, SinkHit, TaintEntry, TaintState,
};
use crate::shared::models::{
    component_names, value_components, CallFact, FactTable, VariableFact,
};
use crate::shared::AnalysisBudget;

/// Result of one propagation run over a file
#[derive(Debug, Default)]
pub struct PropagationOutcome {
    /// Final per-line classification, merged over every source
    pub highlights: HighlightMap,

    /// Findings, one per (source, sink, argument) reached
    pub sink_hits: Vec<SinkHit>,

    /// The budget expired mid-run; findings so far are still valid
    pub truncated: bool,
}

/// Intraprocedural taint propagator
pub struct Propagator<'a> {
    table: &'a FactTable,
    config: &'a AnalysisConfig,
    budget: &'a AnalysisBudget,

    /// Copy of the variable table with `negative_source` resolved against the
    /// sanitizer list; the input table stays untouched
    variables: Vec<VariableFact>,
}

impl<'a> Propagator<'a> {
    pub fn new(table: &'a FactTable, config: &'a AnalysisConfig, budget: &'a AnalysisBudget) -> Self {
        let variables = table
            .variables
            .iter()
            .map(|v| {
                let mut v = v.clone();
                v.negative_source = Self::is_sanitized(&v.value_expr, config);
                v
            })
            .collect();
        Self {
            table,
            config,
            budget,
            variables,
        }
    }

    /// True when a value expression is wrapped by a deny-listed call
    fn is_sanitized(value_expr: &str, config: &AnalysisConfig) -> bool {
        config
            .sanitizers
            .iter()
            .any(|s| value_expr.contains(&format!("{}(", s)))
    }

    /// Run propagation for every configured source and sink.
    pub fn run(&self) -> PropagationOutcome {
        let mut outcome = PropagationOutcome::default();

        for source in &self.config.sources {
            if self.budget.exhausted() {
                outcome.truncated = true;
                break;
            }

            let mut state = TaintState::new();
            self.seed(source, &mut state);
            if self.propagate(&mut state) {
                outcome.truncated = true;
            }
            self.check_sinks(source, &mut state);

            debug!(
                source = source.as_str(),
                active = state.active_count(),
                hits = state.sink_hits.len(),
                "propagation pass done"
            );

            // A source that reaches nothing is reported inert
            if state.sink_hits.is_empty() {
                state.highlights.downgrade_all();
            }
            outcome.highlights.merge(&state.highlights);
            outcome.sink_hits.append(&mut state.sink_hits);
        }

        outcome
    }

    /// Step 1: seed the active set from direct occurrences of the source.
    fn seed(&self, source: &str, state: &mut TaintState) {
        // Assignments whose value mentions the source API
        for var in &self.variables {
            if !var.value_expr.contains(source) {
                continue;
            }
            let marked = state.mark(TaintEntry {
                name: var.name.clone(),
                origin: None,
                line: var.line,
                scope_start: var.scope_start,
                scope_end: var.scope_end,
                suppressed: var.negative_source,
                via_parameter: false,
            });
            if marked {
                state
                    .highlights
                    .upgrade(var.line, ClassificationState::ActiveSource);
            }
        }

        // Source passed directly as an argument to a user-defined function:
        // its parameter becomes the seed inside the callee
        for call in &self.table.calls {
            for (pos, arg) in call.arguments.variables.iter().enumerate() {
                if !arg.contains(source) {
                    continue;
                }
                state
                    .highlights
                    .upgrade(call.line, ClassificationState::ActiveSource);
                if let Some(func) = self.find_function(&call.callee_name) {
                    if let Some(param) = func.parameters.get(pos) {
                        state.mark(TaintEntry {
                            name: param.clone(),
                            origin: None,
                            line: func.line,
                            scope_start: func.scope_start,
                            scope_end: func.scope_end,
                            suppressed: false,
                            via_parameter: true,
                        });
                    }
                }
            }

            // A bare source call that flows nowhere still shows up in the
            // report, as an inert source once the pass ends
            if call.callee_name.contains(source) {
                state
                    .highlights
                    .upgrade(call.line, ClassificationState::ActiveSource);
            }
        }
    }

    /// Steps 2-5: drain the worklist. Returns true when truncated by budget.
    fn propagate(&self, state: &mut TaintState) -> bool {
        while let Some(name) = state.worklist.pop_front() {
            if self.budget.exhausted() {
                return true;
            }
            let entry = match state.get(&name) {
                Some(e) => e.clone(),
                None => continue,
            };

            self.propagate_assignments(&entry, state);
            self.propagate_call_arguments(&entry, state);
            self.propagate_returns(&entry, state);
        }
        false
    }

    /// Step 2: assignments whose value mentions the tainted name.
    fn propagate_assignments(&self, entry: &TaintEntry, state: &mut TaintState) {
        for var in &self.variables {
            if var.name == entry.name && var.line == entry.line {
                continue;
            }
            let matches = value_components(&var.value_expr)
                .iter()
                .any(|c| component_names(c).contains(&entry.name.as_str()));
            if !matches {
                continue;
            }
            if !self.scope_consistent(entry, var.line, var.scope_start, var.scope_end) {
                continue;
            }

            let suppressed = entry.suppressed || var.negative_source;
            let marked = state.mark(TaintEntry {
                name: var.name.clone(),
                origin: Some(entry.name.clone()),
                line: var.line,
                scope_start: var.scope_start,
                scope_end: var.scope_end,
                suppressed,
                via_parameter: false,
            });
            if marked {
                state
                    .highlights
                    .upgrade(var.line, ClassificationState::ActiveVariable);
            }
        }
    }

    /// Step 3: call arguments carrying the tainted name into callee
    /// parameters, plus the chained-call pipeline idiom.
    fn propagate_call_arguments(&self, entry: &TaintEntry, state: &mut TaintState) {
        for (idx, call) in self.table.calls.iter().enumerate() {
            // The call's own name is tainted (return-value propagation):
            // a pipeline neighbour consumes its output as first argument
            if component_names(&call.callee_name).contains(&entry.name.as_str()) {
                self.propagate_chained(idx, entry, state);
            }

            for (pos, arg) in call.arguments.variables.iter().enumerate() {
                let matches = value_components(arg)
                    .iter()
                    .any(|c| component_names(c).contains(&entry.name.as_str()));
                if !matches {
                    continue;
                }
                if !entry.via_parameter
                    && !self.scope_consistent(entry, call.line, call.scope_start, call.scope_end)
                {
                    continue;
                }

                let callee = self.find_function(&call.callee_name);
                if callee.is_some() {
                    state
                        .highlights
                        .upgrade(call.line, ClassificationState::ActiveFunction);
                }
                if let Some(func) = callee {
                    if let Some(param) = func.parameters.get(pos) {
                        let suppressed =
                            entry.suppressed && !self.config.is_allowlisted(&func.name);
                        state.mark(TaintEntry {
                            name: param.clone(),
                            origin: Some(entry.name.clone()),
                            line: call.line,
                            scope_start: func.scope_start,
                            scope_end: func.scope_end,
                            suppressed,
                            via_parameter: true,
                        });
                    }
                }
            }
        }
    }

    /// `f(); g()` executed back to back models a pipeline: the earlier call's
    /// output lands in the later call's first argument position.
    fn propagate_chained(&self, call_idx: usize, entry: &TaintEntry, state: &mut TaintState) {
        let call = &self.table.calls[call_idx];
        let next = match self.table.calls.get(call_idx + 1) {
            Some(n) => n,
            None => return,
        };
        if next.scope_start != call.scope_start || next.scope_end != call.scope_end {
            return;
        }

        if let Some(first_arg) = next.arguments.variables.first() {
            for candidate in component_names(first_arg) {
                if candidate == next.callee_name {
                    continue;
                }
                let marked = state.mark(TaintEntry {
                    name: candidate.to_string(),
                    origin: Some(entry.name.clone()),
                    line: next.line,
                    scope_start: next.scope_start,
                    scope_end: next.scope_end,
                    suppressed: entry.suppressed,
                    via_parameter: false,
                });
                if marked {
                    state
                        .highlights
                        .upgrade(next.line, ClassificationState::ActiveFunction);
                }
                break;
            }
        }
        if let Some(func) = self.find_function(&next.callee_name) {
            if let Some(param) = func.parameters.first() {
                state.mark(TaintEntry {
                    name: param.clone(),
                    origin: Some(entry.name.clone()),
                    line: next.line,
                    scope_start: func.scope_start,
                    scope_end: func.scope_end,
                    suppressed: entry.suppressed,
                    via_parameter: true,
                });
            }
        }
    }

    /// Step 4: a tainted name in a return expression taints the function
    /// name itself, so callers consuming the result inherit it.
    fn propagate_returns(&self, entry: &TaintEntry, state: &mut TaintState) {
        for func in &self.table.functions {
            let matches = func.returns.iter().any(|ret| {
                value_components(ret)
                    .iter()
                    .any(|c| component_names(c).contains(&entry.name.as_str()))
            });
            if !matches {
                continue;
            }
            let suppressed = entry.suppressed && !self.config.is_allowlisted(&func.name);
            let marked = state.mark(TaintEntry {
                name: func.name.clone(),
                origin: Some(entry.name.clone()),
                // A function result can be consumed anywhere in the file
                line: func.line,
                scope_start: 0,
                scope_end: u32::MAX,
                suppressed,
                via_parameter: false,
            });
            if marked {
                state
                    .highlights
                    .upgrade(func.line, ClassificationState::ActiveFunction);
            }
        }
    }

    /// Step 6: sink check across call arguments, literal parameters and
    /// sink-named assignment targets.
    fn check_sinks(&self, source: &str, state: &mut TaintState) {
        for sink in &self.config.sinks {
            for call in &self.table.calls {
                if !call.callee_name.contains(sink.as_str()) {
                    continue;
                }
                self.check_sink_call(source, sink, call, state);
            }

            // Assignment to a sink-named target (`el.innerHTML = x`)
            for var in &self.variables {
                if !var.name.contains(sink.as_str()) {
                    continue;
                }
                for component in value_components(&var.value_expr) {
                    let hit = component.contains(source)
                        || self
                            .tainted_for_use(state, component, var.line)
                            .is_some_and(|e| !e.suppressed);
                    if hit {
                        self.record_hit(
                            source,
                            &var.name,
                            var.line,
                            component,
                            vec![var.value_expr.clone()],
                            state,
                        );
                        break;
                    }
                }
            }
        }
    }

    fn check_sink_call(&self, source: &str, sink: &str, call: &CallFact, state: &mut TaintState) {
        for arg in &call.arguments.variables {
            for component in value_components(arg) {
                // Direct flow: the source expression is itself the argument
                if component.contains(source) {
                    self.record_hit(source, &call.callee_name, call.line, component, sink_args(call), state);
                    continue;
                }
                if let Some(entry) = self.tainted_for_use(state, component, call.line) {
                    if entry.suppressed {
                        continue;
                    }
                    if !(entry.scope_start <= call.line && call.line <= entry.scope_end) {
                        continue;
                    }
                    self.record_hit(source, &call.callee_name, call.line, component, sink_args(call), state);
                }
            }
        }

        // Constant-parameter-sensitive sinks fire on literals mentioning the
        // source identifier itself
        if self.config.is_constant_param_sink(sink) {
            for literal in &call.arguments.literals {
                for component in value_components(literal) {
                    if component.contains(source) {
                        self.record_hit(
                            source,
                            &call.callee_name,
                            call.line,
                            component,
                            sink_args(call),
                            state,
                        );
                    }
                }
            }
        }
    }

    /// Resolve a sink-argument component to an active entry, honoring the
    /// latest-reassignment rule: if the nearest definition before the use is
    /// a different, clean assignment, the flow was cut.
    fn tainted_for_use<'s>(
        &self,
        state: &'s TaintState,
        component: &str,
        use_line: u32,
    ) -> Option<&'s TaintEntry> {
        let entry = state.get_any(component_names(component))?;
        if use_line < entry.line && !entry.via_parameter {
            return None;
        }

        if let Some(latest) = self.nearest_definition(&entry.name, use_line) {
            if latest.line > entry.line {
                let still_tainted = value_components(&latest.value_expr)
                    .iter()
                    .any(|c| component_names(c).iter().any(|n| state.is_tainted(n)));
                if !still_tainted {
                    return None;
                }
            }
        }
        Some(entry)
    }

    /// Latest definition of `name` at or before `line`
    fn nearest_definition(&self, name: &str, line: u32) -> Option<&VariableFact> {
        self.variables
            .iter()
            .filter(|v| v.name == name && v.line <= line)
            .max_by_key(|v| v.line)
    }

    fn record_hit(
        &self,
        source: &str,
        sink: &str,
        line: u32,
        component: &str,
        arguments: Vec<String>,
        state: &mut TaintState,
    ) {
        state.highlights.upgrade(line, ClassificationState::ActiveSink);

        let mut chain = state.chain_for(component);
        if chain.is_empty() {
            for candidate in component_names(component) {
                chain = state.chain_for(candidate);
                if !chain.is_empty() {
                    break;
                }
            }
        }
        let source_line = chain.first().map(|l| l.line).unwrap_or(line);

        let duplicate = state
            .sink_hits
            .iter()
            .any(|h| h.line == line && h.sink == sink && h.tainted_argument == component);
        if duplicate {
            return;
        }

        state.sink_hits.push(SinkHit {
            sink: sink.to_string(),
            line,
            tainted_argument: component.to_string(),
            source: source.to_string(),
            source_line,
            chain,
            arguments,
        });
    }

    /// Assignment-inheritance scope rule. Parameter entries are valid
    /// anywhere inside the callee body instead.
    fn scope_consistent(
        &self,
        entry: &TaintEntry,
        use_line: u32,
        use_scope_start: u32,
        use_scope_end: u32,
    ) -> bool {
        if entry.via_parameter {
            return entry.scope_start <= use_line && use_line <= entry.scope_end;
        }
        // Same function scope and at-or-after the tainting site
        if use_line < entry.line {
            return false;
        }
        if !(entry.scope_start <= use_line && use_line <= entry.scope_end) {
            return false;
        }
        // Shadowing suppression: an unrelated scope's variable of the same
        // name must not leak taint in
        if use_scope_start > entry.scope_end || use_scope_end < entry.scope_start {
            return false;
        }
        true
    }

    fn find_function(&self, callee_name: &str) -> Option<&crate::shared::models::FunctionFact> {
        let method = callee_name.rsplit('.').next().unwrap_or(callee_name);
        self.table
            .functions
            .iter()
            .find(|f| f.name == callee_name || f.name == method)
    }
}

fn sink_args(call: &CallFact) -> Vec<String> {
    let mut args = call.arguments.variables.clone();
    args.extend(call.arguments.literals.iter().cloned());
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::fact_extraction::FactExtractor;
    use crate::features::parsing::infrastructure::TreeSitterParser;
    use crate::features::parsing::ports::Parser;

    fn analyze(source: &str, config: &AnalysisConfig) -> PropagationOutcome {
        let tree = TreeSitterParser::javascript()
            .parse(source, "test.js")
            .unwrap();
        let table = FactExtractor::extract(&tree).unwrap();
        let budget = AnalysisBudget::unlimited();
        Propagator::new(&table, config, &budget).run()
    }

    fn config() -> AnalysisConfig {
        AnalysisConfig::new(vec!["foo.getData".into()], vec!["bar.exec".into()])
    }

    #[test]
    fn test_direct_assignment_flow() {
        let source = "var a = foo.getData();\nvar unused = 1;\nbar.exec(a);\n";
        let outcome = analyze(source, &config());

        assert_eq!(outcome.sink_hits.len(), 1);
        let hit = &outcome.sink_hits[0];
        assert_eq!(hit.line, 3);
        assert_eq!(hit.sink, "bar.exec");
        assert_eq!(hit.tainted_argument, "a");

        assert_eq!(
            outcome.highlights.get(1),
            Some(ClassificationState::ActiveSource)
        );
        assert_eq!(
            outcome.highlights.get(3),
            Some(ClassificationState::ActiveSink)
        );
    }

    #[test]
    fn test_transitive_assignment_flow() {
        let source = "var a = foo.getData();\nvar b = a;\nvar c = b;\nbar.exec(c);\n";
        let outcome = analyze(source, &config());

        assert_eq!(outcome.sink_hits.len(), 1);
        let names: Vec<&str> = outcome.sink_hits[0]
            .chain
            .iter()
            .map(|l| l.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(
            outcome.highlights.get(2),
            Some(ClassificationState::ActiveVariable)
        );
    }

    #[test]
    fn test_sanitizer_suppresses_flow() {
        let mut cfg = config();
        cfg.sanitizers.push("safe".into());

        let source = "var a = foo.getData();\nvar b = \"safe(\" + a + \")\";\nbar.exec(b);\n";
        let outcome = analyze(source, &cfg);

        assert!(outcome.sink_hits.is_empty());
        // Inert classifications survive for reporting
        assert_eq!(
            outcome.highlights.get(1),
            Some(ClassificationState::InactiveSource)
        );
    }

    #[test]
    fn test_unsanitized_concat_still_flows() {
        let source = "var a = foo.getData();\nvar b = \"pre\" + a;\nbar.exec(b);\n";
        let outcome = analyze(source, &config());
        assert_eq!(outcome.sink_hits.len(), 1);
    }

    #[test]
    fn test_flow_through_function_parameter() {
        let source = "function wrap(x) { return bar.exec(x); }\nwrap(foo.getData());\n";
        let outcome = analyze(source, &config());

        assert_eq!(outcome.sink_hits.len(), 1);
        assert_eq!(outcome.sink_hits[0].tainted_argument, "x");
        assert_eq!(
            outcome.highlights.get(2),
            Some(ClassificationState::ActiveSource)
        );
    }

    #[test]
    fn test_no_connection_no_finding() {
        let source = "bar.exec(\"literal\");\nfoo.getData();\n";
        let outcome = analyze(source, &config());
        assert!(outcome.sink_hits.is_empty());
        // The stranded source is reported inert
        assert_eq!(
            outcome.highlights.get(2),
            Some(ClassificationState::InactiveSource)
        );
    }

    #[test]
    fn test_constant_param_sink() {
        let mut cfg = AnalysisConfig::new(vec!["getData".into()], vec!["eval".into()]);
        cfg.constant_param_sinks.push("eval".into());

        let source = "eval(\"getData()\");\n";
        let outcome = analyze(source, &cfg);
        assert_eq!(outcome.sink_hits.len(), 1);
    }

    #[test]
    fn test_reassignment_cuts_flow() {
        let source = "var a = foo.getData();\nvar a = \"clean\";\nbar.exec(a);\n";
        let outcome = analyze(source, &config());
        assert!(outcome.sink_hits.is_empty());
    }

    #[test]
    fn test_return_value_propagation() {
        let source = "function get() { var d = foo.getData(); return d; }\nvar out = get();\nbar.exec(out);\n";
        let outcome = analyze(source, &config());
        assert_eq!(outcome.sink_hits.len(), 1);
        assert_eq!(outcome.sink_hits[0].tainted_argument, "out");
    }

    #[test]
    fn test_sink_assignment_target() {
        let cfg = AnalysisConfig::new(vec!["foo.getData".into()], vec!["innerHTML".into()]);
        let source = "var a = foo.getData();\nel.innerHTML = a;\n";
        let outcome = analyze(source, &cfg);
        assert_eq!(outcome.sink_hits.len(), 1);
        assert_eq!(outcome.sink_hits[0].line, 2);
    }

    #[test]
    fn test_monotonic_highlights() {
        // The sink line never loses its ActiveSink state to later passes
        let cfg = AnalysisConfig::new(
            vec!["foo.getData".into(), "other.source".into()],
            vec!["bar.exec".into()],
        );
        let source = "var a = foo.getData();\nbar.exec(a);\n";
        let outcome = analyze(source, &cfg);
        assert_eq!(
            outcome.highlights.get(2),
            Some(ClassificationState::ActiveSink)
        );
    }

    #[test]
    fn test_budget_exhaustion_truncates() {
        let table = FactTable::new();
        let cfg = config();
        let budget = AnalysisBudget::new(Some(std::time::Duration::from_secs(0)), 10);
        let outcome = Propagator::new(&table, &cfg, &budget).run();
        assert!(outcome.truncated);
        assert!(outcome.sink_hits.is_empty());
    }
}
