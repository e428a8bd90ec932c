//! ngtp Markup
//!
//! Tokenizes template markup into a pull stream of start tags, end tags,
//! text, comments and doctypes. Attribute names keep their case and order,
//! since binding syntax (`[prop]`, `(event)`, `[(model)]`, `#ref`) lives in them.
//!
//! # Example
//!
//! ```
//! use ngtp_markup::{Scanner, TokenKind};
//!
//! let tokens = Scanner::tokenize("<p>hi</p>").unwrap();
//! assert_eq!(tokens.len(), 3);
//! assert!(matches!(tokens[1].kind, TokenKind::Text(ref t) if t == "hi"));
//! ```

pub mod entities;
pub mod scanner;
pub mod token;

pub use scanner::Scanner;
pub use token::{is_raw_text_element, is_void_element, Attribute, Span, Token, TokenKind};

/// Markup error with position information.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Markup error at line {line}, column {column}: {message}")]
pub struct MarkupError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}
