//! Parsing infrastructure

pub mod tree_sitter_parser;

pub use tree_sitter_parser::{SourceLanguage, TreeSitterParser};
