/// A position in template source, tracking line and column for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }
}

/// A `name="value"` pair on a start tag.
///
/// Valueless attributes (`disabled`, `#ref`) carry an empty value.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
    pub span: Span,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            span,
        }
    }
}

/// Markup token classification.
///
/// Data-carrying variants embed their value directly.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// `<name attr="v">` or `<name/>`
    StartTag {
        name: String,
        attributes: Vec<Attribute>,
        self_closing: bool,
    },

    /// `</name>`
    EndTag { name: String },

    /// Character data between tags, entities decoded.
    Text(String),

    /// `<!-- ... -->`, delimiters stripped.
    Comment(String),

    /// `<!DOCTYPE ...>`, delimiters stripped.
    Doctype(String),
}

/// A token produced by the markup scanner.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// HTML5 void elements (self-closing, no children).
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Elements whose content is raw text up to the matching end tag.
pub const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// Check if a tag name is an HTML5 void element.
pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(tag))
}

/// Check if a tag name holds raw text content.
pub fn is_raw_text_element(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(tag))
}
