//! Single-pass fact extraction
//!
//! Walks a parsed tree once and fills the three fact tables. Nested calls and
//! assignments inside call arguments are extracted as independent facts, so
//! the argument of an outer call stays discoverable for chained propagation.
//!
//! Extraction is all-or-none per file: a tree with parse errors yields a
//! `Parse` error and no facts.

use tracing::warn;

use crate::errors::{Result, TaintflowError};
use crate::features::parsing::domain::{ParsedTree, SyntaxKind, SyntaxNode};
use crate::shared::models::{CallFact, FactTable, FunctionFact, VariableFact};

/// Lexical scope bounds of the nearest enclosing function
#[derive(Debug, Clone, Copy)]
struct ScopeBounds {
    start: u32,
    end: u32,
}

/// Extracts variable, function and call facts from a parsed tree
pub struct FactExtractor;

impl FactExtractor {
    /// Produce the fact tables for one file.
    pub fn extract(tree: &ParsedTree) -> Result<FactTable> {
        if tree.has_errors {
            let first = tree
                .errors
                .first()
                .map(|e| format!("{} (line {})", e.message, e.span.start_line))
                .unwrap_or_else(|| "unparseable input".to_string());
            return Err(TaintflowError::parse(format!(
                "{}: {}",
                tree.file_path, first
            )));
        }

        let mut table = FactTable::new();
        let file_scope = ScopeBounds {
            start: 1,
            end: (tree.line_count() as u32).max(1),
        };
        Self::walk(&tree.root, file_scope, &mut table);
        Self::drop_inconsistent(&mut table, &tree.file_path);
        Ok(table)
    }

    /// Scope bounds that cannot hold are structurally impossible; such facts
    /// are logged and dropped rather than fed to the analyses.
    fn drop_inconsistent(table: &mut FactTable, file_path: &str) {
        table.variables.retain(|v| {
            let ok = v.scope_start <= v.scope_end;
            if !ok {
                warn!(file = file_path, name = v.name.as_str(), line = v.line,
                    "dropping variable fact with inverted scope bounds");
            }
            ok
        });
        table.calls.retain(|c| {
            let ok = c.scope_start <= c.scope_end;
            if !ok {
                warn!(file = file_path, callee = c.callee_name.as_str(), line = c.line,
                    "dropping call fact with inverted scope bounds");
            }
            ok
        });
        table.functions.retain(|f| {
            let ok = f.scope_start <= f.scope_end;
            if !ok {
                warn!(file = file_path, name = f.name.as_str(), line = f.line,
                    "dropping function fact with inverted scope bounds");
            }
            ok
        });
    }

    fn walk(node: &SyntaxNode, scope: ScopeBounds, table: &mut FactTable) {
        match &node.kind {
            SyntaxKind::FunctionDef => {
                let inner = Self::extract_function(node, None, table);
                for child in &node.children {
                    Self::walk(child, inner, table);
                }
            }
            SyntaxKind::LambdaDef => {
                // Anonymous lambdas get a fact only when an assignment or a
                // call argument names them; their bodies are still walked.
                let inner = ScopeBounds {
                    start: node.span.start_line,
                    end: node.span.end_line,
                };
                for child in &node.children {
                    Self::walk(child, inner, table);
                }
            }
            SyntaxKind::AssignmentStmt => {
                Self::extract_assignment(node, scope, table);
                for child in &node.children {
                    Self::walk(child, scope, table);
                }
            }
            SyntaxKind::CallExpr => {
                Self::extract_call(node, scope, table);
                for child in &node.children {
                    Self::walk(child, scope, table);
                }
            }
            _ => {
                for child in &node.children {
                    Self::walk(child, scope, table);
                }
            }
        }
    }

    /// Record a function declaration. `name_override` supplies the variable
    /// name when a lambda is bound by assignment.
    fn extract_function(
        node: &SyntaxNode,
        name_override: Option<&str>,
        table: &mut FactTable,
    ) -> ScopeBounds {
        let bounds = ScopeBounds {
            start: node.span.start_line,
            end: node.span.end_line,
        };

        let name = name_override
            .map(str::to_string)
            .or_else(|| {
                node.find_child(&SyntaxKind::NameExpr)
                    .map(|n| n.text().to_string())
            })
            .unwrap_or_default();
        if name.is_empty() {
            return bounds;
        }

        let mut fact = FunctionFact::new(name, node.span.start_line, bounds.start, bounds.end);
        fact.parameters = Self::parameter_names(node);
        Self::collect_returns(node, &mut fact.returns);

        table.functions.push(fact);
        bounds
    }

    /// Parameter names of a function or lambda node
    fn parameter_names(node: &SyntaxNode) -> Vec<String> {
        if let Some(params) = node.find_child(&SyntaxKind::ParameterList) {
            return params
                .children
                .iter()
                .filter_map(|p| match &p.kind {
                    SyntaxKind::NameExpr => Some(p.text().to_string()),
                    SyntaxKind::ParameterDecl => p
                        .find_child(&SyntaxKind::NameExpr)
                        .map(|n| n.text().to_string())
                        .or_else(|| Some(p.text().to_string())),
                    _ => None,
                })
                .collect();
        }

        // Single-parameter arrow form: `x => body`
        if node.kind == SyntaxKind::LambdaDef {
            if let Some(first) = node.children.first() {
                if first.kind == SyntaxKind::NameExpr && node.children.len() > 1 {
                    return vec![first.text().to_string()];
                }
            }
        }

        Vec::new()
    }

    /// Collect returned expressions textually, without descending into nested
    /// function definitions.
    fn collect_returns(node: &SyntaxNode, returns: &mut Vec<String>) {
        for child in &node.children {
            match &child.kind {
                SyntaxKind::ReturnStmt => {
                    if let Some(value) = child.children.first() {
                        returns.push(value.text().to_string());
                    }
                }
                SyntaxKind::FunctionDef | SyntaxKind::LambdaDef => {}
                _ => Self::collect_returns(child, returns),
            }
        }

        // Arrow functions with an expression body return it implicitly
        if node.kind == SyntaxKind::LambdaDef {
            if let Some(last) = node.children.last() {
                if last.kind.is_value_expr() {
                    returns.push(last.text().to_string());
                }
            }
        }
    }

    fn extract_assignment(node: &SyntaxNode, scope: ScopeBounds, table: &mut FactTable) {
        if node.children.len() < 2 {
            return;
        }
        let left = &node.children[0];
        let right = &node.children[node.children.len() - 1];

        let name = left.text().to_string();
        if name.is_empty() {
            return;
        }

        if right.kind == SyntaxKind::LambdaDef {
            Self::extract_function(right, Some(&name), table);
            return;
        }

        let fact = VariableFact::new(name, right.text(), node.span.start_line)
            .with_scope(scope.start, scope.end);
        table.variables.push(fact);
    }

    fn extract_call(node: &SyntaxNode, scope: ScopeBounds, table: &mut FactTable) {
        let callee = match node.children.first() {
            Some(c) => c,
            None => return,
        };
        let callee_name = callee.text().to_string();
        if callee_name.is_empty() {
            return;
        }

        let mut fact =
            CallFact::new(callee_name, node.span.start_line).with_scope(scope.start, scope.end);

        if let Some(args) = node.find_child(&SyntaxKind::ArgumentList) {
            for arg in &args.children {
                match &arg.kind {
                    SyntaxKind::LiteralExpr => {
                        fact.arguments.literals.push(arg.text().to_string());
                    }
                    SyntaxKind::LambdaDef => {
                        let params = Self::parameter_names(arg);
                        fact.block_params = Some(params);
                    }
                    kind if kind.is_value_expr() => {
                        fact.arguments.variables.push(arg.text().to_string());
                    }
                    _ => {
                        // Keyword arguments and other shapes stay textual
                        fact.arguments.variables.push(arg.text().to_string());
                    }
                }
            }
        }

        table.calls.push(fact);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::parsing::infrastructure::TreeSitterParser;
    use crate::features::parsing::ports::Parser;

    fn extract_js(source: &str) -> FactTable {
        let tree = TreeSitterParser::javascript()
            .parse(source, "test.js")
            .unwrap();
        FactExtractor::extract(&tree).unwrap()
    }

    fn extract_py(source: &str) -> FactTable {
        let tree = TreeSitterParser::python()
            .parse(source, "test.py")
            .unwrap();
        FactExtractor::extract(&tree).unwrap()
    }

    #[test]
    fn test_extract_assignment_and_call() {
        let table = extract_js("var a = foo.getData();\nbar.exec(a);\n");

        assert_eq!(table.variables.len(), 1);
        let var = &table.variables[0];
        assert_eq!(var.name, "a");
        assert_eq!(var.value_expr, "foo.getData()");
        assert_eq!(var.line, 1);

        let callees: Vec<&str> = table.calls.iter().map(|c| c.callee_name.as_str()).collect();
        assert!(callees.contains(&"foo.getData"));
        assert!(callees.contains(&"bar.exec"));

        let sink = table
            .calls
            .iter()
            .find(|c| c.callee_name == "bar.exec")
            .unwrap();
        assert_eq!(sink.arguments.variables, vec!["a"]);
    }

    #[test]
    fn test_nested_call_extracted_independently() {
        let table = extract_js("bar.exec(foo.getData());\n");

        let callees: Vec<&str> = table.calls.iter().map(|c| c.callee_name.as_str()).collect();
        assert!(callees.contains(&"bar.exec"));
        assert!(callees.contains(&"foo.getData"));

        let outer = table
            .calls
            .iter()
            .find(|c| c.callee_name == "bar.exec")
            .unwrap();
        assert_eq!(outer.arguments.variables, vec!["foo.getData()"]);
    }

    #[test]
    fn test_function_fact_params_and_returns() {
        let table = extract_py("def wrap(x):\n    return bar.exec(x)\n");

        assert_eq!(table.functions.len(), 1);
        let func = &table.functions[0];
        assert_eq!(func.name, "wrap");
        assert_eq!(func.parameters, vec!["x"]);
        assert_eq!(func.returns, vec!["bar.exec(x)"]);
        assert_eq!((func.scope_start, func.scope_end), (1, 2));
    }

    #[test]
    fn test_scope_bounds_of_inner_facts() {
        let table = extract_py("def f(p):\n    y = p\n    g(y)\n");

        let var = &table.variables[0];
        assert_eq!(var.name, "y");
        assert_eq!((var.scope_start, var.scope_end), (1, 3));

        let call = table.calls.iter().find(|c| c.callee_name == "g").unwrap();
        assert_eq!((call.scope_start, call.scope_end), (1, 3));
    }

    #[test]
    fn test_literal_arguments_tracked_separately() {
        let table = extract_js("eval(\"code\", mode);\n");
        let call = &table.calls[0];
        assert_eq!(call.arguments.literals, vec!["\"code\""]);
        assert_eq!(call.arguments.variables, vec!["mode"]);
    }

    #[test]
    fn test_block_params_recorded() {
        let table = extract_js("items.each(function(item) { sink(item); });\n");
        let call = table
            .calls
            .iter()
            .find(|c| c.callee_name == "items.each")
            .unwrap();
        assert_eq!(call.block_params.as_deref(), Some(&["item".to_string()][..]));

        // The call inside the block body is still its own fact
        assert!(table.calls.iter().any(|c| c.callee_name == "sink"));
    }

    #[test]
    fn test_lambda_assignment_becomes_function_fact() {
        let table = extract_js("var wrap = (x) => bar.exec(x);\n");
        let func = table.functions.iter().find(|f| f.name == "wrap").unwrap();
        assert_eq!(func.parameters, vec!["x"]);
        assert_eq!(func.returns, vec!["bar.exec(x)"]);
    }

    #[test]
    fn test_parse_errors_are_all_or_none() {
        let tree = TreeSitterParser::python()
            .parse("def broken(:\n", "bad.py")
            .unwrap();
        assert!(FactExtractor::extract(&tree).is_err());
    }
}
