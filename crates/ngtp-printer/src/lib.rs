//! ngtp Printer
//!
//! The output side of the pipeline. Parsed trees go back out as:
//!
//! ```text
//! Expression → unparse()        → canonical expression source
//! Root       → print_template() → template markup
//! Root       → to_json()        → JSON document
//! ```
//!
//! Canonical source re-parses to the same tree: parentheses are emitted only
//! where precedence requires them.

pub mod html;

pub use html::print_template;

use ngtp_parser::ast::{ExprKind, Expression, LiteralValue};
use ngtp_parser::is_identifier;
use serde::Serialize;

/// Output error.
#[derive(Debug, thiserror::Error)]
pub enum PrintError {
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialize a parsed tree (or any piece of it) as JSON.
pub fn to_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String, PrintError> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}

// =========================================================================
// Expression → source
// =========================================================================

/// Pipes and writes take a whole expression.
const LOWEST: u8 = 0;
/// Conditionals: what a call argument, array item or map value accepts.
const BODY: u8 = 1;
/// Anything but a conditional: the test of a conditional.
const TEST: u8 = 2;
const PRIMARY: u8 = 10;

/// Render an expression as canonical source.
pub fn unparse(expr: &Expression) -> String {
    match &expr.kind {
        ExprKind::LiteralPrimitive(value) => literal(value),
        ExprKind::PropertyRead { name } => name.clone(),
        ExprKind::KeyedRead { receiver, key } => {
            let receiver = match receiver.kind {
                ExprKind::PropertyRead { .. }
                | ExprKind::MethodCall { .. }
                | ExprKind::KeyedRead { .. } => unparse(receiver),
                _ => format!("({})", unparse(receiver)),
            };
            format!("{receiver}[{}]", unparse(key))
        }
        ExprKind::PropertyWrite { name, value } => {
            format!("{name} = {}", wrap(value, LOWEST))
        }
        ExprKind::MethodCall { name, args } => format!("{name}({})", list(args)),
        ExprKind::Binary {
            operation,
            left,
            right,
        } => {
            let level = precedence(expr);
            format!(
                "{} {} {}",
                wrap(left, level),
                operation.as_str(),
                wrap(right, level + 1)
            )
        }
        ExprKind::Conditional {
            condition,
            true_exp,
            false_exp,
        } => format!(
            "{} ? {} : {}",
            wrap(condition, TEST),
            wrap(true_exp, BODY),
            wrap(false_exp, BODY)
        ),
        ExprKind::LiteralArray(items) => format!("[{}]", list(items)),
        ExprKind::LiteralMap { keys, values } => {
            let entries: Vec<String> = keys
                .iter()
                .zip(values)
                .map(|(key, value)| {
                    let key = if is_identifier(key) {
                        key.clone()
                    } else {
                        quote(key)
                    };
                    format!("{key}: {}", wrap(value, BODY))
                })
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
        ExprKind::Pipe { exp, name, args } => {
            let mut out = format!("{} | {name}", wrap(exp, LOWEST));
            for arg in args {
                out.push(':');
                out.push_str(&wrap(arg, BODY));
            }
            out
        }
        ExprKind::Interpolation {
            strings,
            expressions,
        } => {
            let mut out = String::new();
            for (i, text) in strings.iter().enumerate() {
                out.push_str(text);
                if let Some(expr) = expressions.get(i) {
                    out.push_str("{{ ");
                    out.push_str(&unparse(expr));
                    out.push_str(" }}");
                }
            }
            out
        }
        ExprKind::Unparsable => String::new(),
    }
}

fn precedence(expr: &Expression) -> u8 {
    match &expr.kind {
        ExprKind::Pipe { .. } | ExprKind::PropertyWrite { .. } => LOWEST,
        ExprKind::Conditional { .. } => BODY,
        ExprKind::Binary { operation, .. } => TEST + operation.precedence() - 1,
        _ => PRIMARY,
    }
}

fn wrap(expr: &Expression, min: u8) -> String {
    if precedence(expr) < min {
        format!("({})", unparse(expr))
    } else {
        unparse(expr)
    }
}

fn list(items: &[Expression]) -> String {
    items
        .iter()
        .map(|item| wrap(item, BODY))
        .collect::<Vec<_>>()
        .join(", ")
}

fn literal(value: &LiteralValue) -> String {
    match value {
        LiteralValue::Null => "null".into(),
        LiteralValue::Undefined => "undefined".into(),
        LiteralValue::Boolean(b) => b.to_string(),
        LiteralValue::Number(n) => n.to_string(),
        LiteralValue::String(s) => quote(s),
    }
}

/// Single-quote a string with the escapes the expression lexer understands.
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() && (c as u32) <= 0xFFFF => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}
