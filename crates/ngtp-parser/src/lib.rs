//! ngtp Parser
//!
//! Turns template markup into a typed tree of elements, text, comments and
//! bindings. Every binding carries a parsed expression:
//!
//! ```text
//! markup tokens → TemplateParser → (expr_lexer + ExprParser per expression) → Root
//! ```
//!
//! The expression language is described by a PEG grammar (see [`grammar`])
//! that is compiled once per process and shared by every parse.
//!
//! # Example
//!
//! ```
//! use ngtp_parser::{ast::Node, TemplateParser};
//!
//! let root = TemplateParser::parse("<b [title]=\"name\">{{ greeting }}</b>").unwrap();
//! assert!(matches!(root.nodes[0], Node::Element(_)));
//! ```

pub mod ast;
pub mod chars;
pub mod expr_lexer;
pub mod expr_parser;
pub mod grammar;
pub mod interpolation;
pub mod parser;
pub mod peg;
pub mod visitor;

pub use ast::{AstWithSource, Expression, ExprKind, Node, Root};
pub use expr_lexer::{is_identifier, tokenize, tokenize_lossy, Scanner};
pub use expr_parser::ExprParser;
pub use parser::TemplateParser;

use serde::Serialize;

/// Lexical error inside one expression.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[error("Lexer Error: {message} at column {index} in expression [{input}]")]
pub struct LexError {
    pub message: String,
    /// Byte offset of the offending character.
    pub index: usize,
    pub input: String,
}

/// A lexical failure together with the tokens scanned before it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{error}")]
pub struct TokenizeError {
    pub error: LexError,
    pub tokens: Vec<expr_lexer::Token>,
}

/// Expression parse error.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[error("Parse Error: {message} at column {offset} in [{input}]")]
pub struct ParseError {
    pub message: String,
    /// Byte offset where matching gave up.
    pub offset: usize,
    pub input: String,
}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        ParseError {
            message: e.message,
            offset: e.index,
            input: e.input,
        }
    }
}

/// Error in a textual grammar definition.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Grammar error at offset {offset}: {message}")]
pub struct GrammarError {
    pub message: String,
    pub offset: usize,
}

/// Error aborting a whole template parse.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TemplateError {
    #[error(transparent)]
    Markup(#[from] ngtp_markup::MarkupError),

    #[error("Invalid binding `{attribute}`: {error}")]
    Expression { attribute: String, error: ParseError },
}

/// What the walker does with an expression that fails to parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Keep walking; the binding gets an [`ExprKind::Unparsable`] placeholder.
    #[default]
    Placeholder,
    /// Abort the template parse with [`TemplateError::Expression`].
    FailFast,
}

/// Template parse configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    pub error_policy: ErrorPolicy,
    /// Keep whitespace-only text nodes.
    pub preserve_whitespace: bool,
}
