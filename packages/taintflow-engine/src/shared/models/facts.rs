//! Fact tables produced by extraction
//!
//! Three flat tables describe a file: assignments, function definitions and
//! call sites. A fact is one occurrence, not an identity: the same variable
//! name yields one `VariableFact` per assignment site. Every fact carries the
//! line and lexical scope of its nearest enclosing function so that
//! propagation can reason about shadowing and reassignment.
//!
//! Value expressions are kept textual. The splitting helpers below model
//! string concatenation as `+` and member access as `.`. This is a shallow
//! approximation, not an expression grammar, and it misses unusual
//! concatenation syntax.

use serde::{Deserialize, Serialize};

/// One assignment occurrence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableFact {
    /// Assigned variable name
    pub name: String,

    /// Right-hand side, textual
    pub value_expr: String,

    /// Assignment line
    pub line: u32,

    /// Start of the enclosing function scope
    pub scope_start: u32,

    /// End of the enclosing function scope
    pub scope_end: u32,

    /// Value was wrapped by a sanitizing/encoding call; propagation through
    /// this fact is suppressed unless the consumer is allow-listed
    pub negative_source: bool,
}

impl VariableFact {
    pub fn new(name: impl Into<String>, value_expr: impl Into<String>, line: u32) -> Self {
        Self {
            name: name.into(),
            value_expr: value_expr.into(),
            line,
            scope_start: 0,
            scope_end: u32::MAX,
            negative_source: false,
        }
    }

    pub fn with_scope(mut self, scope_start: u32, scope_end: u32) -> Self {
        self.scope_start = scope_start;
        self.scope_end = scope_end;
        self
    }
}

/// One function declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionFact {
    pub name: String,

    /// Declaration line
    pub line: u32,

    /// Lexical extent of the function body
    pub scope_start: u32,
    pub scope_end: u32,

    /// Parameter names in declaration order
    pub parameters: Vec<String>,

    /// Every returned expression, textual
    pub returns: Vec<String>,
}

impl FunctionFact {
    pub fn new(name: impl Into<String>, line: u32, scope_start: u32, scope_end: u32) -> Self {
        Self {
            name: name.into(),
            line,
            scope_start,
            scope_end,
            parameters: Vec::new(),
            returns: Vec::new(),
        }
    }
}

/// Call arguments, identifiers and literals tracked separately.
///
/// Some sinks are only dangerous with a literal parameter (a fixed mode
/// flag), which is why literals get their own table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallArguments {
    /// Identifier-valued arguments (textual form; may be a member path or a
    /// nested call)
    pub variables: Vec<String>,

    /// Literal-valued arguments (raw text)
    pub literals: Vec<String>,
}

/// One call expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallFact {
    /// Callee as written (`obj.method` or `method`)
    pub callee_name: String,

    pub line: u32,

    /// Enclosing function scope
    pub scope_start: u32,
    pub scope_end: u32,

    pub arguments: CallArguments,

    /// Parameter names of a block/closure argument, if the call takes one
    pub block_params: Option<Vec<String>>,
}

impl CallFact {
    pub fn new(callee_name: impl Into<String>, line: u32) -> Self {
        Self {
            callee_name: callee_name.into(),
            line,
            scope_start: 0,
            scope_end: u32::MAX,
            arguments: CallArguments::default(),
            block_params: None,
        }
    }

    pub fn with_scope(mut self, scope_start: u32, scope_end: u32) -> Self {
        self.scope_start = scope_start;
        self.scope_end = scope_end;
        self
    }

    /// Reconstructed textual form of the call
    pub fn text(&self) -> String {
        let mut args: Vec<&str> = Vec::new();
        args.extend(self.arguments.variables.iter().map(String::as_str));
        args.extend(self.arguments.literals.iter().map(String::as_str));
        format!("{}({})", self.callee_name, args.join(", "))
    }

    /// Method component of the callee (`obj.method` -> `method`)
    pub fn method_name(&self) -> &str {
        self.callee_name
            .rsplit('.')
            .next()
            .unwrap_or(&self.callee_name)
    }
}

/// Fact tables for one file. Append-only; re-extraction replaces the whole
/// table for the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FactTable {
    pub variables: Vec<VariableFact>,
    pub functions: Vec<FunctionFact>,
    pub calls: Vec<CallFact>,
}

impl FactTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty() && self.functions.is_empty() && self.calls.is_empty()
    }

    /// Innermost function whose scope contains the line
    pub fn enclosing_function(&self, line: u32) -> Option<&FunctionFact> {
        self.functions
            .iter()
            .filter(|f| f.scope_start <= line && line <= f.scope_end)
            .min_by_key(|f| f.scope_end - f.scope_start)
    }
}

/// Split a value expression into its `+`-delimited components.
pub fn value_components(expr: &str) -> Vec<&str> {
    expr.split('+').map(str::trim).collect()
}

/// Root of a member path (`a.b.c` -> `a`).
pub fn member_root(component: &str) -> &str {
    component.split('.').next().unwrap_or(component).trim()
}

/// Member path segments (`a.b.c` -> [a, b, c]).
pub fn member_parts(component: &str) -> Vec<&str> {
    component.split('.').map(str::trim).collect()
}

/// Callee portion of a call-shaped component (`wrap(x)` -> `wrap`).
pub fn call_root(component: &str) -> &str {
    component.split('(').next().unwrap_or(component).trim()
}

/// Candidate name spellings of one `+`-component: the component itself, its
/// member root, its callee, and the callee's member root.
pub fn component_names(component: &str) -> Vec<&str> {
    let mut names = vec![component];
    for candidate in [
        member_root(component),
        call_root(component),
        member_root(call_root(component)),
    ] {
        if !names.contains(&candidate) {
            names.push(candidate);
        }
    }
    names
}

/// True when `name` appears as a whole `+`-component of `expr`, or as the
/// root of one of its member paths.
pub fn component_matches(expr: &str, name: &str) -> bool {
    value_components(expr)
        .iter()
        .any(|c| *c == name || member_root(c) == name)
}
