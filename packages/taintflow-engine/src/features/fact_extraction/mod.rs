// Fact extraction
//
// One traversal of a parsed tree produces the three flat fact tables
// (assignments, function definitions, call sites) that both analysis
// strategies consume. The tables themselves live in shared::models.

pub mod infrastructure;

pub use infrastructure::FactExtractor;
