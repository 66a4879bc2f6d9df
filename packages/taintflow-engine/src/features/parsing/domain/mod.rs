//! Parsing domain types

pub mod parsed_tree;
pub mod syntax_node;

pub use parsed_tree::{ParseDiagnostic, ParsedTree};
pub use syntax_node::{SyntaxKind, SyntaxNode};
