// Source-language frontend
//
// Hexagonal slice:
// - domain: ParsedTree, SyntaxNode (language-neutral)
// - infrastructure: tree-sitter parsers (Python, JavaScript)
// - ports: Parser trait

pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use domain::{ParseDiagnostic, ParsedTree, SyntaxKind, SyntaxNode};
pub use infrastructure::{SourceLanguage, TreeSitterParser};
pub use ports::Parser;
