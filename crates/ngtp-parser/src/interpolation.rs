//! `{{ expression }}` interpolation in text.
//!
//! Splitting rules:
//! - An interpolation starts at `{{` and ends at the first `}}` seen at
//!   brace depth zero, so `{{ {a: {b: 1}} }}` holds one map literal.
//! - Quoted strings inside the expression are skipped whole; `}}` inside
//!   them does not close the interpolation.
//! - There is no escaping. A lone `}` at depth zero is ordinary expression
//!   text, which makes `{{ a } b }}` a single (unparsable) expression.
//! - A `{{` without a closing `}}` is an error.

use crate::ast::{ExprKind, ExprSpan, Expression};
use crate::chars;
use crate::expr_parser::ExprParser;
use crate::ParseError;

const START: &str = "{{";
const END: &str = "}}";

/// One interpolated expression: its source and byte offset in the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub source: &'a str,
    pub offset: usize,
}

/// Text split around its interpolations.
///
/// `strings.len() == expressions.len() + 1` always holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split<'a> {
    pub strings: Vec<&'a str>,
    pub expressions: Vec<Segment<'a>>,
}

pub fn has_interpolation(text: &str) -> bool {
    text.contains(START)
}

/// Split `text` into literal strings and expression sources.
pub fn split(text: &str) -> Result<Split<'_>, ParseError> {
    let mut strings = Vec::new();
    let mut expressions = Vec::new();
    let mut pos = 0;

    while let Some(found) = text[pos..].find(START) {
        let open = pos + found;
        let inner = open + START.len();
        let Some(close) = find_end(text, inner) else {
            return Err(ParseError {
                message: "Unterminated interpolation, expected }}".into(),
                offset: open,
                input: text.to_string(),
            });
        };

        strings.push(&text[pos..open]);
        expressions.push(Segment {
            source: &text[inner..close],
            offset: inner,
        });
        pos = close + END.len();
    }
    strings.push(&text[pos..]);

    Ok(Split {
        strings,
        expressions,
    })
}

/// Parse `text` into an [`ExprKind::Interpolation`].
///
/// Spans of the inner expressions are offsets into `text`.
pub fn parse_interpolation(text: &str) -> Result<Expression, ParseError> {
    let split = split(text)?;

    let mut expressions = Vec::with_capacity(split.expressions.len());
    for segment in &split.expressions {
        let mut expression = ExprParser::parse(segment.source).map_err(|e| ParseError {
            message: e.message,
            offset: segment.offset + e.offset,
            input: text.to_string(),
        })?;
        expression.shift(segment.offset);
        expressions.push(expression);
    }

    Ok(Expression::new(
        ExprKind::Interpolation {
            strings: split.strings.into_iter().map(String::from).collect(),
            expressions,
        },
        ExprSpan::new(0, text.len()),
    ))
}

/// Byte offset of the `}}` closing an interpolation whose body starts at `from`.
fn find_end(text: &str, from: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut iter = text[from..].char_indices().peekable();

    while let Some((i, c)) = iter.next() {
        if let Some(q) = quote {
            if c == chars::BACKSLASH {
                iter.next();
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            _ if chars::is_quote(c) => quote = Some(c),
            chars::LBRACE => depth += 1,
            chars::RBRACE if depth > 0 => depth -= 1,
            chars::RBRACE if iter.peek().is_some_and(|&(_, next)| next == chars::RBRACE) => {
                return Some(from + i);
            }
            _ => {}
        }
    }
    None
}
