//! Tree-sitter parser implementation
//!
//! This is where the tree-sitter dependency lives.

use tree_sitter::{Parser as TSParser, Tree};

use crate::errors::{Result, TaintflowError};
use crate::features::parsing::domain::{ParseDiagnostic, ParsedTree, SyntaxKind, SyntaxNode};
use crate::features::parsing::ports::Parser;
use crate::shared::models::Span;

/// Supported tree-sitter languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceLanguage {
    Python,
    JavaScript,
}

impl SourceLanguage {
    /// Detect language from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "py" | "pyi" => Some(Self::Python),
            "js" | "mjs" | "cjs" | "jsx" => Some(Self::JavaScript),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::JavaScript => "javascript",
        }
    }
}

/// Tree-sitter based parser
pub struct TreeSitterParser {
    language: SourceLanguage,
}

impl TreeSitterParser {
    pub fn new(language: SourceLanguage) -> Self {
        Self { language }
    }

    pub fn python() -> Self {
        Self::new(SourceLanguage::Python)
    }

    pub fn javascript() -> Self {
        Self::new(SourceLanguage::JavaScript)
    }

    fn get_ts_language(&self) -> tree_sitter::Language {
        match self.language {
            SourceLanguage::Python => tree_sitter_python::language(),
            SourceLanguage::JavaScript => tree_sitter_javascript::language(),
        }
    }

    /// Convert tree-sitter tree to our domain model
    fn convert_tree(&self, tree: &Tree, source: &str, file_path: &str) -> ParsedTree {
        let root_node = tree.root_node();
        let root = self.convert_node(&root_node, source);

        let mut errors = Vec::new();
        self.collect_errors(&root_node, &mut errors);

        ParsedTree::new(
            root,
            source.to_string(),
            file_path.to_string(),
            self.language_name().to_string(),
        )
        .with_errors(errors)
    }

    /// Convert a tree-sitter node to SyntaxNode.
    ///
    /// Only named children are kept: punctuation and keywords carry no facts.
    fn convert_node(&self, node: &tree_sitter::Node, source: &str) -> SyntaxNode {
        let kind = self.map_node_kind(node.kind());
        let span = Span::new(
            node.start_position().row as u32 + 1,
            node.start_position().column as u32,
            node.end_position().row as u32 + 1,
            node.end_position().column as u32,
        );

        let text = source.get(node.byte_range()).unwrap_or("").to_string();

        let children: Vec<SyntaxNode> = (0..node.named_child_count())
            .filter_map(|i| node.named_child(i))
            .filter(|c| !c.is_extra())
            .map(|c| self.convert_node(&c, source))
            .collect();

        SyntaxNode::new(kind, span)
            .with_raw_kind(node.kind())
            .with_children(children)
            .with_text(text)
    }

    /// Map tree-sitter node kind to our SyntaxKind
    fn map_node_kind(&self, ts_kind: &str) -> SyntaxKind {
        match self.language {
            SourceLanguage::Python => Self::map_python_kind(ts_kind),
            SourceLanguage::JavaScript => Self::map_javascript_kind(ts_kind),
        }
    }

    fn map_python_kind(ts_kind: &str) -> SyntaxKind {
        match ts_kind {
            "function_definition" => SyntaxKind::FunctionDef,
            "class_definition" => SyntaxKind::ClassDef,
            "lambda" => SyntaxKind::LambdaDef,

            "assignment" | "augmented_assignment" => SyntaxKind::AssignmentStmt,
            "parameters" | "lambda_parameters" => SyntaxKind::ParameterList,
            "parameter" | "default_parameter" | "typed_parameter" | "typed_default_parameter" => {
                SyntaxKind::ParameterDecl
            }
            "import_statement" | "import_from_statement" => SyntaxKind::ImportDecl,

            "call" => SyntaxKind::CallExpr,
            "argument_list" => SyntaxKind::ArgumentList,
            "identifier" => SyntaxKind::NameExpr,
            "attribute" => SyntaxKind::AttributeExpr,
            "string" | "concatenated_string" | "integer" | "float" | "true" | "false" | "none" => {
                SyntaxKind::LiteralExpr
            }
            "binary_operator" | "comparison_operator" | "boolean_operator" => {
                SyntaxKind::BinaryExpr
            }
            "unary_operator" | "not_operator" => SyntaxKind::UnaryExpr,

            "return_statement" => SyntaxKind::ReturnStmt,
            "if_statement" => SyntaxKind::IfStmt,
            "for_statement" => SyntaxKind::ForStmt,
            "while_statement" => SyntaxKind::WhileStmt,
            "try_statement" => SyntaxKind::TryStmt,

            "block" | "module" | "expression_statement" => SyntaxKind::Block,
            "comment" => SyntaxKind::Comment,

            other => SyntaxKind::Other(other.to_string()),
        }
    }

    fn map_javascript_kind(ts_kind: &str) -> SyntaxKind {
        match ts_kind {
            "function_declaration" | "generator_function_declaration" | "method_definition" => {
                SyntaxKind::FunctionDef
            }
            "class_declaration" => SyntaxKind::ClassDef,
            "arrow_function" | "function_expression" | "function" => SyntaxKind::LambdaDef,

            // `var x = v` parses as declaration > declarator(name, value);
            // the declarator is the assignment-shaped node
            "variable_declarator" | "assignment_expression" | "augmented_assignment_expression" => {
                SyntaxKind::AssignmentStmt
            }
            "formal_parameters" => SyntaxKind::ParameterList,
            "import_statement" => SyntaxKind::ImportDecl,

            "call_expression" | "new_expression" => SyntaxKind::CallExpr,
            "arguments" => SyntaxKind::ArgumentList,
            "identifier" | "property_identifier" | "shorthand_property_identifier" => {
                SyntaxKind::NameExpr
            }
            "member_expression" => SyntaxKind::AttributeExpr,
            "string" | "template_string" | "number" | "true" | "false" | "null" | "undefined"
            | "regex" => SyntaxKind::LiteralExpr,
            "binary_expression" => SyntaxKind::BinaryExpr,
            "unary_expression" => SyntaxKind::UnaryExpr,

            "return_statement" => SyntaxKind::ReturnStmt,
            "if_statement" => SyntaxKind::IfStmt,
            "for_statement" | "for_in_statement" => SyntaxKind::ForStmt,
            "while_statement" => SyntaxKind::WhileStmt,
            "try_statement" => SyntaxKind::TryStmt,

            "statement_block" | "program" | "expression_statement" | "lexical_declaration"
            | "variable_declaration" => SyntaxKind::Block,
            "comment" => SyntaxKind::Comment,

            other => SyntaxKind::Other(other.to_string()),
        }
    }

    /// Collect parse errors
    fn collect_errors(&self, node: &tree_sitter::Node, errors: &mut Vec<ParseDiagnostic>) {
        if node.is_error() || node.is_missing() {
            let span = Span::new(
                node.start_position().row as u32 + 1,
                node.start_position().column as u32,
                node.end_position().row as u32 + 1,
                node.end_position().column as u32,
            );
            errors.push(ParseDiagnostic {
                message: format!("Parse error at {:?}", node.kind()),
                span,
            });
        }

        for i in 0..node.child_count() {
            if let Some(child) = node.child(i) {
                self.collect_errors(&child, errors);
            }
        }
    }
}

impl Parser for TreeSitterParser {
    fn parse(&self, source: &str, file_path: &str) -> Result<ParsedTree> {
        let mut parser = TSParser::new();
        parser
            .set_language(&self.get_ts_language())
            .map_err(|e| TaintflowError::parse(format!("Failed to set language: {}", e)))?;

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| TaintflowError::parse("Failed to parse source code"))?;

        Ok(self.convert_tree(&tree, source, file_path))
    }

    fn supports_extension(&self, ext: &str) -> bool {
        SourceLanguage::from_extension(ext) == Some(self.language)
    }

    fn language_name(&self) -> &'static str {
        self.language.name()
    }
}
