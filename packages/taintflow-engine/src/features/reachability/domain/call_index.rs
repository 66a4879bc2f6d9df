//! Indexed call sites for reachability queries
//!
//! Candidate call sites are re-derived lazily per query from this index
//! rather than from a precomputed call graph: the resolver asks "which sites
//! call method m" and "which later sites use variable v" on demand.
//!
//! The definition/use registry keys on the line-number heuristic: a call site
//! corresponds to a variable definition when an assignment on the same line
//! has the call's text as its right-hand side.

use ahash::AHashMap;

use crate::features::parsing::domain::{ParsedTree, SyntaxKind, SyntaxNode};
use crate::shared::models::{component_names, FactTable, VariableFact};

use super::call_site::CallSite;

/// A variable definition with its later same-scope uses
#[derive(Debug, Clone)]
pub struct VarDef {
    pub name: String,
    pub line: u32,
    pub scope_start: u32,
    pub scope_end: u32,
    pub value_text: String,

    /// Site ids of later same-scope calls that mention the variable
    pub uses: Vec<usize>,
}

/// All call sites of one file, indexed for the resolver
#[derive(Debug, Default)]
pub struct CallIndex {
    sites: Vec<CallSite>,

    /// Callee method name -> site ids
    by_method: AHashMap<String, Vec<usize>>,

    /// Variable name -> definitions with resolved uses
    defs: AHashMap<String, Vec<VarDef>>,
}

impl CallIndex {
    /// Build the index from a parsed tree plus its fact tables.
    pub fn build(tree: &ParsedTree, table: &FactTable) -> Self {
        let mut index = CallIndex::default();

        let mut walker = IndexWalker {
            index: &mut index,
            class_stack: Vec::new(),
            method_stack: Vec::new(),
            call_stack: Vec::new(),
        };
        walker.walk(&tree.root);

        index.build_method_buckets();
        index.build_def_registry(&table.variables);
        index
    }

    pub fn sites(&self) -> &[CallSite] {
        &self.sites
    }

    pub fn site(&self, id: usize) -> &CallSite {
        &self.sites[id]
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Sites whose callee method matches `method` (callers of it)
    pub fn sites_calling(&self, method: &str) -> Vec<&CallSite> {
        self.by_method
            .get(method)
            .map(|ids| ids.iter().map(|id| &self.sites[*id]).collect())
            .unwrap_or_default()
    }

    /// Sites whose callee text contains `pattern` (API matching for drivers)
    pub fn sites_matching(&self, pattern: &str) -> Vec<&CallSite> {
        self.sites
            .iter()
            .filter(|s| s.callee.contains(pattern))
            .collect()
    }

    /// The variable definition a call site corresponds to, if an assignment
    /// on the same line has this call as its value.
    pub fn def_for_site(&self, site: &CallSite) -> Option<&VarDef> {
        self.defs.values().flatten().find(|def| {
            def.line == site.line && def.value_text == site.text
        })
    }

    /// Uses of `name` whose site text occurs inside the given block body
    pub fn block_uses(&self, name: &str, block_body: &str) -> Vec<&CallSite> {
        self.sites
            .iter()
            .filter(|s| site_mentions(s, name) && block_body.contains(&s.text))
            .collect()
    }

    fn build_method_buckets(&mut self) {
        for (id, site) in self.sites.iter().enumerate() {
            self.by_method
                .entry(site.method_name().to_string())
                .or_default()
                .push(id);
        }
    }

    fn build_def_registry(&mut self, variables: &[VariableFact]) {
        for var in variables {
            let uses: Vec<usize> = self
                .sites
                .iter()
                .enumerate()
                .filter(|(_, s)| {
                    s.line >= var.line
                        && var.scope_start <= s.line
                        && s.line <= var.scope_end
                        && site_mentions(s, &var.name)
                })
                .map(|(id, _)| id)
                .collect();

            self.defs.entry(var.name.clone()).or_default().push(VarDef {
                name: var.name.clone(),
                line: var.line,
                scope_start: var.scope_start,
                scope_end: var.scope_end,
                value_text: var.value_expr.clone(),
                uses,
            });
        }
    }
}

/// Whether a call site reads the given variable name in one of its arguments
fn site_mentions(site: &CallSite, name: &str) -> bool {
    site.args
        .iter()
        .any(|arg| component_names(arg).contains(&name))
}

struct IndexWalker<'a> {
    index: &'a mut CallIndex,
    class_stack: Vec<String>,
    method_stack: Vec<String>,
    call_stack: Vec<String>,
}

impl IndexWalker<'_> {
    fn walk(&mut self, node: &SyntaxNode) {
        match &node.kind {
            SyntaxKind::ClassDef => {
                let name = node
                    .find_child(&SyntaxKind::NameExpr)
                    .map(|n| n.text().to_string());
                if let Some(name) = name {
                    self.class_stack.push(name);
                    for child in &node.children {
                        self.walk(child);
                    }
                    self.class_stack.pop();
                } else {
                    for child in &node.children {
                        self.walk(child);
                    }
                }
            }
            SyntaxKind::FunctionDef => {
                let name = node
                    .find_child(&SyntaxKind::NameExpr)
                    .map(|n| n.text().to_string());
                if let Some(name) = name {
                    self.method_stack.push(name);
                    for child in &node.children {
                        self.walk(child);
                    }
                    self.method_stack.pop();
                } else {
                    for child in &node.children {
                        self.walk(child);
                    }
                }
            }
            SyntaxKind::CallExpr => {
                self.record_call(node);
                self.call_stack.push(node.text().to_string());
                for child in &node.children {
                    self.walk(child);
                }
                self.call_stack.pop();
            }
            _ => {
                for child in &node.children {
                    self.walk(child);
                }
            }
        }
    }

    fn record_call(&mut self, node: &SyntaxNode) {
        let callee = match node.children.first() {
            Some(c) => c.text().to_string(),
            None => return,
        };
        if callee.is_empty() {
            return;
        }

        let mut args = Vec::new();
        let mut block_params = Vec::new();
        let mut block_body = None;

        if let Some(arg_list) = node.find_child(&SyntaxKind::ArgumentList) {
            for arg in &arg_list.children {
                if arg.kind == SyntaxKind::LambdaDef {
                    block_params = lambda_params(arg);
                    block_body = Some(arg.text().to_string());
                } else {
                    args.push(arg.text().to_string());
                }
            }
        }

        let id = self.index.sites.len();
        self.index.sites.push(CallSite {
            id,
            callee,
            text: node.text().to_string(),
            line: node.span.start_line,
            scope_start: node.span.start_line,
            scope_end: node.span.end_line,
            enclosing_class: self.class_stack.last().cloned(),
            enclosing_method: self.method_stack.last().cloned(),
            parent_text: self.call_stack.last().cloned(),
            args,
            block_params,
            block_body,
        });
    }
}

fn lambda_params(node: &SyntaxNode) -> Vec<String> {
    if let Some(params) = node.find_child(&SyntaxKind::ParameterList) {
        return params
            .children
            .iter()
            .filter_map(|p| match &p.kind {
                SyntaxKind::NameExpr => Some(p.text().to_string()),
                SyntaxKind::ParameterDecl => p
                    .find_child(&SyntaxKind::NameExpr)
                    .map(|n| n.text().to_string()),
                _ => None,
            })
            .collect();
    }
    if let Some(first) = node.children.first() {
        if first.kind == SyntaxKind::NameExpr && node.children.len() > 1 {
            return vec![first.text().to_string()];
        }
    }
    Vec::new()
}
