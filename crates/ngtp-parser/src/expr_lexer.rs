//! Lexer for template expressions.
//!
//! Tokenizes the expression language used in bound attributes and `{{ }}`
//! interpolations. One [`Scanner`] is created per expression string and
//! advanced monotonically; it owns nothing but its cursor.
//!
//! # Examples
//!
//! ```
//! use ngtp_parser::expr_lexer::{tokenize, Operator, TokenKind};
//!
//! let tokens = tokenize("count + 1").unwrap();
//! assert_eq!(tokens[0].kind, TokenKind::Identifier("count".into()));
//! assert_eq!(tokens[1].kind, TokenKind::Operator(Operator::Plus));
//! assert_eq!(tokens[2].kind, TokenKind::Number(1.0));
//! ```

use serde::Serialize;

use crate::ast::ExprSpan;
use crate::chars;
use crate::{LexError, TokenizeError};

/// A token produced by the expression lexer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: ExprSpan,
}

impl Token {
    pub fn new(kind: TokenKind, start: usize, end: usize) -> Self {
        Self {
            kind,
            span: ExprSpan::new(start, end),
        }
    }

    pub fn is_character(&self, code: char) -> bool {
        self.kind == TokenKind::Character(code)
    }

    pub fn is_operator(&self, op: Operator) -> bool {
        self.kind == TokenKind::Operator(op)
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, TokenKind::Error(_))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self.kind {
            TokenKind::Number(n) => Some(n),
            _ => None,
        }
    }
}

/// Token classification. Data-carrying variants embed their payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum TokenKind {
    /// `( ) { } [ ] , : ; .`
    Character(char),
    Identifier(String),
    /// `#name`, including the `#`.
    PrivateIdentifier(String),
    Keyword(Keyword),
    /// Decoded string contents (quotes and escapes resolved).
    String(String),
    Operator(Operator),
    /// Decoded numeric value, separators stripped.
    Number(f64),
    /// Recovered lexical error (only from [`tokenize_lossy`]).
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Keyword {
    Var,
    Let,
    As,
    Null,
    Undefined,
    True,
    False,
    If,
    Else,
    This,
}

const KEYWORDS: &[(&str, Keyword)] = &[
    ("var", Keyword::Var),
    ("let", Keyword::Let),
    ("as", Keyword::As),
    ("null", Keyword::Null),
    ("undefined", Keyword::Undefined),
    ("true", Keyword::True),
    ("false", Keyword::False),
    ("if", Keyword::If),
    ("else", Keyword::Else),
    ("this", Keyword::This),
];

impl Keyword {
    pub fn lookup(text: &str) -> Option<Self> {
        KEYWORDS
            .iter()
            .find(|(word, _)| *word == text)
            .map(|(_, keyword)| *keyword)
    }

    pub fn as_str(self) -> &'static str {
        KEYWORDS
            .iter()
            .find(|(_, keyword)| *keyword == self)
            .map(|(word, _)| *word)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Operator {
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    Question,
    NullishCoalescing,
    OptionalChain,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Bang,
    NotEq,
    StrictNotEq,
    Assign,
    Eq,
    StrictEq,
    And,
    Pipe,
    Or,
}

impl Operator {
    pub fn from_symbol(text: &str) -> Option<Self> {
        Some(match text {
            "+" => Self::Plus,
            "-" => Self::Minus,
            "*" => Self::Star,
            "/" => Self::Slash,
            "%" => Self::Percent,
            "^" => Self::Caret,
            "?" => Self::Question,
            "??" => Self::NullishCoalescing,
            "?." => Self::OptionalChain,
            "<" => Self::Lt,
            "<=" => Self::LtEq,
            ">" => Self::Gt,
            ">=" => Self::GtEq,
            "!" => Self::Bang,
            "!=" => Self::NotEq,
            "!==" => Self::StrictNotEq,
            "=" => Self::Assign,
            "==" => Self::Eq,
            "===" => Self::StrictEq,
            "&&" => Self::And,
            "|" => Self::Pipe,
            "||" => Self::Or,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::Caret => "^",
            Self::Question => "?",
            Self::NullishCoalescing => "??",
            Self::OptionalChain => "?.",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Bang => "!",
            Self::NotEq => "!=",
            Self::StrictNotEq => "!==",
            Self::Assign => "=",
            Self::Eq => "==",
            Self::StrictEq => "===",
            Self::And => "&&",
            Self::Pipe => "|",
            Self::Or => "||",
        }
    }
}

/// Tokenize a whole expression, stopping at the first lexical error.
///
/// The error keeps the tokens scanned before the failure.
pub fn tokenize(text: &str) -> Result<Vec<Token>, TokenizeError> {
    let mut tokens = Vec::new();
    for item in Scanner::new(text) {
        match item {
            Ok(token) => tokens.push(token),
            Err(error) => return Err(TokenizeError { error, tokens }),
        }
    }
    Ok(tokens)
}

/// Tokenize a whole expression, turning each lexical error into a
/// [`TokenKind::Error`] token and scanning on.
pub fn tokenize_lossy(text: &str) -> Vec<Token> {
    let mut scanner = Scanner::new(text);
    let mut tokens = Vec::new();

    while let Some(item) = scanner.scan_token() {
        match item {
            Ok(token) => tokens.push(token),
            Err(error) => {
                let start = scanner.token_start;
                if scanner.index == start {
                    scanner.advance();
                }
                tokens.push(Token::new(TokenKind::Error(error.message), start, scanner.index));
            }
        }
    }

    tokens
}

/// True iff `text` is exactly one identifier: `[A-Za-z_$][A-Za-z0-9_$]*`.
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if chars::is_identifier_start(first) => chars.all(chars::is_identifier_part),
        _ => false,
    }
}

/// Expression scanner.
///
/// Works on byte offsets into the borrowed input; `peek` is the character
/// at `index`, or [`chars::EOF`] once the input is exhausted.
pub struct Scanner<'a> {
    input: &'a str,
    index: usize,
    peek: char,
    token_start: usize,
    failed: bool,
}

impl<'a> Scanner<'a> {
    /// Create a new scanner for the given source.
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            index: 0,
            peek: input.chars().next().unwrap_or(chars::EOF),
            token_start: 0,
            failed: false,
        }
    }

    /// Scan the next token. `None` means the input is cleanly exhausted.
    pub fn scan_token(&mut self) -> Option<Result<Token, LexError>> {
        loop {
            while !self.is_at_end() && self.peek <= chars::SPACE {
                self.advance();
            }
            if self.is_at_end() {
                return None;
            }
            if self.peek != chars::NBSP {
                break;
            }
            while !self.is_at_end() && chars::is_whitespace(self.peek) {
                self.advance();
            }
        }

        let start = self.index;
        let peek = self.peek;
        self.token_start = start;

        if chars::is_identifier_start(peek) {
            return Some(Ok(self.scan_identifier()));
        }
        if chars::is_digit(peek) {
            return Some(self.scan_number(start));
        }

        let result = match peek {
            chars::PERIOD => {
                self.advance();
                if chars::is_digit(self.peek) {
                    self.scan_number(start)
                } else {
                    Ok(Token::new(TokenKind::Character(chars::PERIOD), start, self.index))
                }
            }
            chars::LPAREN
            | chars::RPAREN
            | chars::LBRACE
            | chars::RBRACE
            | chars::LBRACKET
            | chars::RBRACKET
            | chars::COMMA
            | chars::COLON
            | chars::SEMICOLON => Ok(self.scan_character(start, peek)),
            chars::SQ | chars::DQ | chars::BT => self.scan_string(),
            chars::HASH => self.scan_private_identifier(),
            chars::PLUS
            | chars::MINUS
            | chars::STAR
            | chars::SLASH
            | chars::PERCENT
            | chars::CARET => Ok(self.scan_operator(start, peek)),
            chars::QUESTION => Ok(self.scan_question(start)),
            chars::LT | chars::GT => Ok(self.scan_complex_operator(start, 1)),
            chars::BANG | chars::EQ => Ok(self.scan_complex_operator(start, 2)),
            chars::AMPERSAND if self.peek_next() == chars::AMPERSAND => {
                self.advance();
                self.advance();
                Ok(self.operator_token(start, "&&"))
            }
            chars::BAR => {
                self.advance();
                if self.peek == chars::BAR {
                    self.advance();
                    Ok(self.operator_token(start, "||"))
                } else {
                    Ok(self.operator_token(start, "|"))
                }
            }
            _ => {
                self.advance();
                Err(self.error(format!("Unexpected character [{peek}]"), start))
            }
        };

        Some(result)
    }

    // --- Scanners ---

    fn scan_character(&mut self, start: usize, code: char) -> Token {
        self.advance();
        Token::new(TokenKind::Character(code), start, self.index)
    }

    fn scan_operator(&mut self, start: usize, code: char) -> Token {
        self.advance();
        let mut buf = [0; 4];
        self.operator_token(start, code.encode_utf8(&mut buf))
    }

    /// `?`, `??` or `?.`
    fn scan_question(&mut self, start: usize) -> Token {
        self.advance();
        if self.peek == chars::QUESTION || self.peek == chars::PERIOD {
            self.advance();
        }
        self.operator_token(start, &self.input[start..self.index])
    }

    /// One operator character followed by up to `max_eq` `=` characters: `<=`, `!==`, `===`.
    fn scan_complex_operator(&mut self, start: usize, max_eq: usize) -> Token {
        self.advance();
        for _ in 0..max_eq {
            if self.peek != chars::EQ {
                break;
            }
            self.advance();
        }
        self.operator_token(start, &self.input[start..self.index])
    }

    fn scan_identifier(&mut self) -> Token {
        let start = self.index;
        self.advance();
        while chars::is_identifier_part(self.peek) {
            self.advance();
        }

        let text = &self.input[start..self.index];
        let kind = match Keyword::lookup(text) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Identifier(text.to_string()),
        };
        Token::new(kind, start, self.index)
    }

    /// `#` followed by identifier-part characters. A `#` directly followed
    /// by an identifier-start character is rejected.
    fn scan_private_identifier(&mut self) -> Result<Token, LexError> {
        let start = self.index;
        self.advance();
        if chars::is_identifier_start(self.peek) {
            return Err(self.error("Invalid character [#]".into(), start));
        }
        while chars::is_identifier_part(self.peek) {
            self.advance();
        }

        let name = self.input[start..self.index].to_string();
        Ok(Token::new(TokenKind::PrivateIdentifier(name), start, self.index))
    }

    fn scan_number(&mut self, start: usize) -> Result<Token, LexError> {
        let mut simple = self.index == start;
        let mut seen_period = !simple;
        let mut seen_exponent = false;
        let mut has_separators = false;
        self.advance();

        loop {
            if chars::is_digit(self.peek) {
                // Do nothing.
            } else if self.peek == chars::UNDERSCORE {
                // Separators are only valid between two digits: `1_0_1` is fine,
                // `101_`, `1__0` and `1._5` are not.
                let prev = self.input[..self.index].chars().next_back().unwrap_or(chars::EOF);
                if !chars::is_digit(prev) || !chars::is_digit(self.peek_next()) {
                    let at = self.index;
                    self.advance();
                    return Err(self.error("Invalid numeric separator".into(), at));
                }
                has_separators = true;
            } else if self.peek == chars::PERIOD {
                if seen_period || seen_exponent {
                    break;
                }
                seen_period = true;
                simple = false;
            } else if chars::is_exponent_start(self.peek) && !seen_exponent {
                self.advance();
                if chars::is_exponent_sign(self.peek) {
                    self.advance();
                }
                if !chars::is_digit(self.peek) {
                    return Err(self.error("Invalid exponent".into(), self.index));
                }
                seen_exponent = true;
                simple = false;
            } else {
                break;
            }
            self.advance();
        }

        let raw = &self.input[start..self.index];
        let text = if has_separators {
            raw.replace('_', "")
        } else {
            raw.to_string()
        };

        let parsed = if simple {
            text.parse::<i64>()
                .map(|n| n as f64)
                .or_else(|_| text.parse::<f64>())
        } else {
            text.parse::<f64>()
        };

        match parsed {
            Ok(value) => Ok(Token::new(TokenKind::Number(value), start, self.index)),
            Err(_) => Err(self.error(format!("Invalid number [{raw}]"), start)),
        }
    }

    fn scan_string(&mut self) -> Result<Token, LexError> {
        let start = self.index;
        let quote = self.peek;
        self.advance(); // skip opening quote

        let mut buffer = String::new();
        let mut marker = self.index;

        while self.peek != quote {
            if self.is_at_end() {
                return Err(self.error("Unterminated quote".into(), self.index));
            }

            if self.peek == chars::BACKSLASH {
                buffer.push_str(&self.input[marker..self.index]);
                self.advance();

                if self.is_at_end() {
                    return Err(self.error("Unterminated quote".into(), self.index));
                }

                if self.peek == 'u' {
                    let escape_at = self.index;
                    let hex: String = self.input[self.index + 1..].chars().take(4).collect();
                    let code = (hex.len() == 4 && hex.chars().all(chars::is_ascii_hex_digit))
                        .then(|| u32::from_str_radix(&hex, 16).ok())
                        .flatten()
                        .and_then(char::from_u32);

                    match code {
                        Some(ch) => buffer.push(ch),
                        None => {
                            self.advance();
                            return Err(self.error(
                                format!("Invalid unicode escape [\\u{hex}]"),
                                escape_at,
                            ));
                        }
                    }
                    for _ in 0..5 {
                        self.advance();
                    }
                } else {
                    buffer.push(chars::unescape(self.peek));
                    self.advance();
                }

                marker = self.index;
            } else {
                self.advance();
            }
        }

        buffer.push_str(&self.input[marker..self.index]);
        self.advance(); // skip closing quote

        Ok(Token::new(TokenKind::String(buffer), start, self.index))
    }

    // --- Helpers ---

    fn operator_token(&self, start: usize, text: &str) -> Token {
        match Operator::from_symbol(text) {
            Some(op) => Token::new(TokenKind::Operator(op), start, self.index),
            None => Token::new(
                TokenKind::Error(format!("Unknown operator [{text}]")),
                start,
                self.index,
            ),
        }
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.index += self.peek.len_utf8();
        }
        self.peek = self.input[self.index..].chars().next().unwrap_or(chars::EOF);
    }

    fn peek_next(&self) -> char {
        let mut rest = self.input[self.index..].chars();
        rest.next();
        rest.next().unwrap_or(chars::EOF)
    }

    fn is_at_end(&self) -> bool {
        self.index >= self.input.len()
    }

    fn error(&self, message: String, index: usize) -> LexError {
        LexError {
            message,
            index,
            input: self.input.to_string(),
        }
    }
}

impl Iterator for Scanner<'_> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.scan_token()?;
        self.failed = item.is_err();
        Some(item)
    }
}
