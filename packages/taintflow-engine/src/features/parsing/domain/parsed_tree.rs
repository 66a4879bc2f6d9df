//! Parsed tree representation
//!
//! Abstracts the parsed AST for downstream processing.

use super::syntax_node::SyntaxNode;
use crate::shared::models::Span;

/// Parsed syntax tree
#[derive(Debug, Clone)]
pub struct ParsedTree {
    /// Root node of the tree
    pub root: SyntaxNode,

    /// Source code
    pub source: String,

    /// File path (for error messages)
    pub file_path: String,

    /// Language
    pub language: String,

    /// Whether parsing had errors
    pub has_errors: bool,

    /// Parse errors (if any)
    pub errors: Vec<ParseDiagnostic>,
}

/// A parse problem at a specific span
#[derive(Debug, Clone)]
pub struct ParseDiagnostic {
    pub message: String,
    pub span: Span,
}

impl ParsedTree {
    pub fn new(root: SyntaxNode, source: String, file_path: String, language: String) -> Self {
        Self {
            root,
            source,
            file_path,
            language,
            has_errors: false,
            errors: Vec::new(),
        }
    }

    pub fn with_errors(mut self, errors: Vec<ParseDiagnostic>) -> Self {
        self.has_errors = !errors.is_empty();
        self.errors = errors;
        self
    }

    /// Raw text of a 1-based line
    pub fn line_text(&self, line: u32) -> &str {
        self.source
            .lines()
            .nth((line as usize).saturating_sub(1))
            .unwrap_or("")
    }

    pub fn line_count(&self) -> usize {
        self.source.lines().count()
    }

    pub fn is_empty(&self) -> bool {
        self.source.trim().is_empty()
    }
}
