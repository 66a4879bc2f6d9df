//! Language-neutral syntax node representation
//!
//! Abstracts tree-sitter nodes so fact extraction works the same for every
//! supported language.

use crate::shared::models::Span;

/// Syntax node kind (language-neutral)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxKind {
    // Definitions
    FunctionDef,
    ClassDef,
    LambdaDef,

    // Declarations
    ParameterDecl,
    ParameterList,
    ImportDecl,

    // Expressions
    CallExpr,
    ArgumentList,
    NameExpr,
    AttributeExpr,
    LiteralExpr,
    BinaryExpr,
    UnaryExpr,

    // Statements
    AssignmentStmt,
    ReturnStmt,
    IfStmt,
    ForStmt,
    WhileStmt,
    TryStmt,

    // Other
    Block,
    Comment,

    // Unknown
    Other(String),
}

impl SyntaxKind {
    pub fn is_definition(&self) -> bool {
        matches!(
            self,
            SyntaxKind::FunctionDef | SyntaxKind::ClassDef | SyntaxKind::LambdaDef
        )
    }

    /// Kinds whose textual form can appear as a call argument carrying data
    pub fn is_value_expr(&self) -> bool {
        matches!(
            self,
            SyntaxKind::CallExpr
                | SyntaxKind::NameExpr
                | SyntaxKind::AttributeExpr
                | SyntaxKind::BinaryExpr
                | SyntaxKind::UnaryExpr
        )
    }
}

/// Language-neutral syntax node
#[derive(Debug, Clone)]
pub struct SyntaxNode {
    pub kind: SyntaxKind,
    pub span: Span,

    /// Source text of this node. Kept for interior nodes too: the fact
    /// extractor needs the textual form of calls, arguments and right-hand
    /// sides.
    pub text: String,

    pub children: Vec<SyntaxNode>,

    /// Original tree-sitter kind (for debugging)
    pub raw_kind: Option<String>,
}

impl SyntaxNode {
    pub fn new(kind: SyntaxKind, span: Span) -> Self {
        Self {
            kind,
            span,
            text: String::new(),
            children: Vec::new(),
            raw_kind: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_children(mut self, children: Vec<SyntaxNode>) -> Self {
        self.children = children;
        self
    }

    pub fn with_raw_kind(mut self, raw_kind: impl Into<String>) -> Self {
        self.raw_kind = Some(raw_kind.into());
        self
    }

    /// Find first child of given kind
    pub fn find_child(&self, kind: &SyntaxKind) -> Option<&SyntaxNode> {
        self.children.iter().find(|c| &c.kind == kind)
    }

    /// Find all children of given kind
    pub fn find_children(&self, kind: &SyntaxKind) -> Vec<&SyntaxNode> {
        self.children.iter().filter(|c| &c.kind == kind).collect()
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_kind_is_definition() {
        assert!(SyntaxKind::FunctionDef.is_definition());
        assert!(SyntaxKind::LambdaDef.is_definition());
        assert!(!SyntaxKind::CallExpr.is_definition());
    }

    #[test]
    fn test_syntax_kind_is_value_expr() {
        assert!(SyntaxKind::NameExpr.is_value_expr());
        assert!(SyntaxKind::AttributeExpr.is_value_expr());
        assert!(!SyntaxKind::LiteralExpr.is_value_expr());
    }
}
