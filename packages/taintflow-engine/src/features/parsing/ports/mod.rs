//! Parser port
//!
//! Boundary between the engine and the source-language frontends.

use crate::errors::Result;
use crate::features::parsing::domain::ParsedTree;

/// A source-language parser
pub trait Parser {
    /// Parse source text into a language-neutral tree
    fn parse(&self, source: &str, file_path: &str) -> Result<ParsedTree>;

    /// Whether this parser handles the given file extension
    fn supports_extension(&self, ext: &str) -> bool;

    /// Language name for reporting
    fn language_name(&self) -> &'static str;
}
