//! Expression parser.
//!
//! Expressions are matched against [`EXPRESSION_GRAMMAR`], compiled once per
//! process, and the resulting parse tree is folded into [`Expression`] nodes.
//! Source text is run through the expression lexer first so that lexical
//! problems (unterminated strings, bad escapes, stray characters) are
//! reported with the lexer's precise messages.

use std::iter::Peekable;
use std::sync::LazyLock;

use crate::ast::{BinaryOp, ExprKind, ExprSpan, Expression, LiteralValue};
use crate::expr_lexer::{tokenize, Token, TokenKind};
use crate::grammar::Grammar;
use crate::peg::Match;
use crate::{GrammarError, ParseError};

/// The template expression language.
///
/// `root` parses binding expressions; `action` parses event handlers, which
/// may also assign to a property path.
pub const EXPRESSION_GRAMMAR: &str = r##"
GRAMMAR ngtp_expression

root             -> expression EOF;
action           -> _ws (assignment / expression) _ws EOF;
assignment       -> property_literal _ws "=" !"=" _ws expression;

expression       -> _ws _body _ws pipe*;
pipe             -> "|" !"|" _ws identifier (_ws ":" _ws _body)* _ws;

_body            -> conditional / condition / binary / _operand;
conditional      -> _test _ws "?" _ws _body _ws ":" _ws _body;
_test            -> condition / binary / _operand;
condition        -> _comparand (_ws comparison_op _ws _comparand)+;
_comparand       -> binary / _operand;
comparison_op    -> "===" / "!==" / "==" / "!=" / ">=" / "<=" / ">" / "<";
binary           -> _operand (_ws arithmetic_op _ws _operand)+;
arithmetic_op    -> [+\-*/%];

_operand         -> group / method / _value;
group            -> "(" expression ")";
method           -> property_literal _ws "(" _ws _arguments? _ws ")" key_access*;
_arguments       -> _body (_ws "," _ws _body)*;

_value           -> keyword_literal / number / string / property_access / array / map;
property_access  -> property_literal key_access*;
property_literal -> _ident ("." [A-Za-z0-9_$]+)*;
key_access       -> "[" expression "]";

# Keywords must not swallow the start of a longer name: `trueValue`.
keyword_literal  -> ("true" / "false" / "null" / "undefined") ![A-Za-z0-9_$];

number           -> "-"? _int _fraction? _exponent?;
_int             -> "0" / [1-9] ("_"? [0-9])*;
_fraction        -> "." [0-9] ("_"? [0-9])*;
_exponent        -> [eE] [+\-]? [0-9]+;

string           -> "\"" (_escape / [^"\\])* "\"" / "'" (_escape / [^'\\])* "'";
_escape          -> "\\" ("u" _hex _hex _hex _hex / .);
_hex             -> [0-9a-fA-F];

array            -> "[" _ws (_body (_ws "," _ws _body)*)? _ws "]";
map              -> "{" _ws (map_entry (_ws "," _ws map_entry)*)? _ws "}";
map_entry        -> (string / identifier) _ws ":" _ws _body;

identifier       -> _ident;
_ident           -> [A-Za-z_$] [A-Za-z0-9_$]*;
_ws              -> [ \t\n\r\x0B\x0C\xA0]*;
"##;

static GRAMMAR: LazyLock<Result<Grammar, GrammarError>> =
    LazyLock::new(|| Grammar::compile(EXPRESSION_GRAMMAR));

/// The compiled expression grammar, shared by every parse.
pub fn grammar() -> Result<&'static Grammar, GrammarError> {
    GRAMMAR.as_ref().map_err(Clone::clone)
}

/// Builds expression ASTs from grammar matches over one source string.
pub struct ExprParser<'s> {
    source: &'s str,
}

impl<'s> ExprParser<'s> {
    /// Parse a binding expression. The whole source must be consumed.
    pub fn parse(source: &str) -> Result<Expression, ParseError> {
        Self::lex(source)?;
        Self::run("root", source)
    }

    /// Parse an event handler: any expression, or `path = expression`.
    pub fn parse_action(source: &str) -> Result<Expression, ParseError> {
        Self::lex(source)?;
        Self::run("action", source)
    }

    /// Parse the longest expression at the start of `source`.
    ///
    /// Returns the expression and the number of bytes consumed (trailing
    /// whitespace included). Text after the expression is not examined.
    pub fn parse_prefix(source: &str) -> Result<(Expression, usize), ParseError> {
        let grammar = Self::compiled(source)?;
        let tree = grammar.parse("expression", source)?;
        Self::lex(source.get(..tree.end).unwrap_or(source))?;

        let expression = ExprParser { source }.build(&tree)?;
        Ok((expression, tree.end))
    }

    fn run(rule: &str, source: &str) -> Result<Expression, ParseError> {
        let grammar = Self::compiled(source)?;
        let tree = grammar.parse(rule, source)?;
        ExprParser { source }.build(&tree)
    }

    fn lex(source: &str) -> Result<(), ParseError> {
        tokenize(source).map_err(|e| ParseError::from(e.error))?;
        Ok(())
    }

    fn compiled(source: &str) -> Result<&'static Grammar, ParseError> {
        grammar().map_err(|e| ParseError {
            message: format!("Invalid expression grammar: {e}"),
            offset: 0,
            input: source.to_string(),
        })
    }

    // --- Tree folding ---

    fn build(&self, node: &Match<'_>) -> Result<Expression, ParseError> {
        let span = ExprSpan::new(node.start, node.end);
        let kind = match node.rule {
            "root" | "action" | "group" | "key_access" => {
                let [inner] = node.children.as_slice() else {
                    return Err(self.malformed(node));
                };
                return self.build(inner);
            }
            "expression" => return self.pipeline(node),
            "condition" | "binary" => return self.binary(node),
            "method" => return self.method(node),
            "property_access" => return self.property_access(node),
            "assignment" => {
                let [target, value] = node.children.as_slice() else {
                    return Err(self.malformed(node));
                };
                ExprKind::PropertyWrite {
                    name: target.text(self.source).to_string(),
                    value: Box::new(self.build(value)?),
                }
            }
            "conditional" => {
                let [condition, true_exp, false_exp] = node.children.as_slice() else {
                    return Err(self.malformed(node));
                };
                ExprKind::Conditional {
                    condition: Box::new(self.build(condition)?),
                    true_exp: Box::new(self.build(true_exp)?),
                    false_exp: Box::new(self.build(false_exp)?),
                }
            }
            "property_literal" => ExprKind::PropertyRead {
                name: node.text(self.source).to_string(),
            },
            "keyword_literal" => ExprKind::LiteralPrimitive(match node.text(self.source) {
                "true" => LiteralValue::Boolean(true),
                "false" => LiteralValue::Boolean(false),
                "null" => LiteralValue::Null,
                _ => LiteralValue::Undefined,
            }),
            "number" => ExprKind::LiteralPrimitive(LiteralValue::Number(self.number(node)?)),
            "string" => ExprKind::LiteralPrimitive(LiteralValue::String(self.string(node)?)),
            "array" => ExprKind::LiteralArray(self.build_all(&node.children)?),
            "map" => {
                let mut keys = Vec::with_capacity(node.children.len());
                let mut values = Vec::with_capacity(node.children.len());
                for entry in &node.children {
                    let [key, value] = entry.children.as_slice() else {
                        return Err(self.malformed(entry));
                    };
                    keys.push(match key.rule {
                        "string" => self.string(key)?,
                        _ => key.text(self.source).to_string(),
                    });
                    values.push(self.build(value)?);
                }
                ExprKind::LiteralMap { keys, values }
            }
            _ => return Err(self.malformed(node)),
        };

        Ok(Expression::new(kind, span))
    }

    fn build_all(&self, nodes: &[Match<'_>]) -> Result<Vec<Expression>, ParseError> {
        nodes.iter().map(|node| self.build(node)).collect()
    }

    /// `body | name:arg | name`: pipes apply left to right.
    fn pipeline(&self, node: &Match<'_>) -> Result<Expression, ParseError> {
        let Some((body, pipes)) = node.children.split_first() else {
            return Err(self.malformed(node));
        };

        let mut exp = self.build(body)?;
        for pipe in pipes {
            let Some((name, args)) = pipe.children.split_first() else {
                return Err(self.malformed(pipe));
            };
            let args = self.build_all(args)?;
            let span = ExprSpan::new(
                exp.span.start,
                args.last().map_or(name.end, |arg| arg.span.end),
            );
            exp = Expression::new(
                ExprKind::Pipe {
                    exp: Box::new(exp),
                    name: name.text(self.source).to_string(),
                    args,
                },
                span,
            );
        }
        Ok(exp)
    }

    /// Alternating operands and operators, folded by precedence.
    fn binary(&self, node: &Match<'_>) -> Result<Expression, ParseError> {
        let Some((first, rest)) = node.children.split_first() else {
            return Err(self.malformed(node));
        };

        let mut pairs = Vec::with_capacity(rest.len() / 2);
        for pair in rest.chunks(2) {
            let [op, operand] = pair else {
                return Err(self.malformed(node));
            };
            let symbol = op.text(self.source);
            let Some(operation) = BinaryOp::from_symbol(symbol) else {
                return Err(self.error(format!("Unknown operator [{symbol}]"), op.start));
            };
            pairs.push((operation, self.build(operand)?));
        }

        Ok(climb(self.build(first)?, &mut pairs.into_iter().peekable(), 0))
    }

    fn method(&self, node: &Match<'_>) -> Result<Expression, ParseError> {
        let Some((target, rest)) = node.children.split_first() else {
            return Err(self.malformed(node));
        };
        let split = rest
            .iter()
            .position(|child| child.rule == "key_access")
            .unwrap_or(rest.len());
        let (args, keys) = rest.split_at(split);

        let end = keys.first().map_or(node.end, |key| key.start);
        let call = Expression::new(
            ExprKind::MethodCall {
                name: target.text(self.source).to_string(),
                args: self.build_all(args)?,
            },
            ExprSpan::new(node.start, end),
        );
        self.keyed(call, keys)
    }

    fn property_access(&self, node: &Match<'_>) -> Result<Expression, ParseError> {
        let Some((target, keys)) = node.children.split_first() else {
            return Err(self.malformed(node));
        };
        let read = self.build(target)?;
        self.keyed(read, keys)
    }

    fn keyed(&self, mut receiver: Expression, keys: &[Match<'_>]) -> Result<Expression, ParseError> {
        for key in keys {
            let span = ExprSpan::new(receiver.span.start, key.end);
            receiver = Expression::new(
                ExprKind::KeyedRead {
                    receiver: Box::new(receiver),
                    key: Box::new(self.build(key)?),
                },
                span,
            );
        }
        Ok(receiver)
    }

    fn number(&self, node: &Match<'_>) -> Result<f64, ParseError> {
        let text = node.text(self.source).replace('_', "");
        text.parse::<f64>()
            .map_err(|_| self.error(format!("Invalid number [{text}]"), node.start))
    }

    /// Decode a quoted string with the expression lexer's escape rules.
    fn string(&self, node: &Match<'_>) -> Result<String, ParseError> {
        let tokens = tokenize(node.text(self.source))
            .map_err(|e| self.error(e.error.message, node.start + e.error.index))?;
        match tokens.as_slice() {
            [Token {
                kind: TokenKind::String(value),
                ..
            }] => Ok(value.clone()),
            _ => Err(self.malformed(node)),
        }
    }

    fn malformed(&self, node: &Match<'_>) -> ParseError {
        self.error(format!("Unexpected {} node", node.rule), node.start)
    }

    fn error(&self, message: String, offset: usize) -> ParseError {
        ParseError {
            message,
            offset,
            input: self.source.to_string(),
        }
    }
}

/// Precedence climbing over `lhs (op rhs)*`.
fn climb<I>(mut lhs: Expression, rest: &mut Peekable<I>, min_precedence: u8) -> Expression
where
    I: Iterator<Item = (BinaryOp, Expression)>,
{
    loop {
        let Some(&(op, _)) = rest.peek() else {
            break;
        };
        if op.precedence() < min_precedence {
            break;
        }
        let Some((_, mut rhs)) = rest.next() else {
            break;
        };
        while let Some(&(next, _)) = rest.peek() {
            if next.precedence() <= op.precedence() {
                break;
            }
            rhs = climb(rhs, rest, next.precedence());
        }

        let span = ExprSpan::new(lhs.span.start, rhs.span.end);
        lhs = Expression::new(
            ExprKind::Binary {
                operation: op,
                left: Box::new(lhs),
                right: Box::new(rhs),
            },
            span,
        );
    }
    lhs
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Compact rendering for structural assertions.
    fn show(expr: &Expression) -> String {
        let list = |items: &[Expression]| items.iter().map(show).collect::<Vec<_>>().join(", ");
        match &expr.kind {
            ExprKind::LiteralPrimitive(value) => match value {
                LiteralValue::Null => "null".into(),
                LiteralValue::Undefined => "undefined".into(),
                LiteralValue::Boolean(b) => b.to_string(),
                LiteralValue::Number(n) => n.to_string(),
                LiteralValue::String(s) => format!("{s:?}"),
            },
            ExprKind::PropertyRead { name } => name.clone(),
            ExprKind::KeyedRead { receiver, key } => format!("{}[{}]", show(receiver), show(key)),
            ExprKind::PropertyWrite { name, value } => format!("(= {name} {})", show(value)),
            ExprKind::MethodCall { name, args } => format!("{name}({})", list(args)),
            ExprKind::Binary {
                operation,
                left,
                right,
            } => format!("({} {} {})", operation.as_str(), show(left), show(right)),
            ExprKind::Conditional {
                condition,
                true_exp,
                false_exp,
            } => format!("(? {} {} {})", show(condition), show(true_exp), show(false_exp)),
            ExprKind::LiteralArray(items) => format!("[{}]", list(items)),
            ExprKind::LiteralMap { keys, values } => {
                let entries: Vec<String> = keys
                    .iter()
                    .zip(values)
                    .map(|(k, v)| format!("{k}: {}", show(v)))
                    .collect();
                format!("{{{}}}", entries.join(", "))
            }
            ExprKind::Pipe { exp, name, args } => {
                let args: String = args.iter().map(|a| format!(":{}", show(a))).collect();
                format!("(| {} {name}{args})", show(exp))
            }
            ExprKind::Interpolation { .. } => "interpolation".into(),
            ExprKind::Unparsable => "unparsable".into(),
        }
    }

    fn parse(source: &str) -> String {
        show(&ExprParser::parse(source).unwrap())
    }

    fn action(source: &str) -> String {
        show(&ExprParser::parse_action(source).unwrap())
    }

    #[test]
    fn test_grammar_compiles() {
        let grammar = grammar().unwrap();
        assert_eq!(grammar.name(), "ngtp_expression");
        assert!(grammar.rule_id("root").is_some());
        assert!(grammar.rule_id("action").is_some());
    }

    // =========================================================================
    // Literals
    // =========================================================================

    #[test]
    fn test_keyword_literals() {
        assert_eq!(parse("true"), "true");
        assert_eq!(parse("false"), "false");
        assert_eq!(parse("null"), "null");
        assert_eq!(parse("undefined"), "undefined");
    }

    #[test]
    fn test_keyword_prefix_is_property() {
        assert_eq!(parse("trueValue"), "trueValue");
        assert_eq!(parse("nullable.x"), "nullable.x");
    }

    #[test]
    fn test_numbers() {
        assert_eq!(parse("42"), "42");
        assert_eq!(parse("0"), "0");
        assert_eq!(parse("-1.5"), "-1.5");
        assert_eq!(parse("2e3"), "2000");
        assert_eq!(parse("1_000"), "1000");
    }

    #[test]
    fn test_leading_zero_rejected() {
        assert!(ExprParser::parse("01").is_err());
    }

    #[test]
    fn test_strings() {
        assert_eq!(parse("\"double\""), "\"double\"");
        assert_eq!(parse("'single'"), "\"single\"");
        assert_eq!(parse(r"'it\'s'"), "\"it's\"");
        assert_eq!(parse(r"'A\n'"), "\"A\\n\"");
    }

    #[test]
    fn test_arrays_and_maps() {
        assert_eq!(parse("[]"), "[]");
        assert_eq!(parse("[1, 'two', x]"), "[1, \"two\", x]");
        assert_eq!(parse("{}"), "{}");
        assert_eq!(parse("{'a': 1, b: [c]}"), "{a: 1, b: [c]}");
    }

    // =========================================================================
    // Reads and calls
    // =========================================================================

    #[test]
    fn test_dotted_path_is_flat() {
        let expr = ExprParser::parse("user.address.city").unwrap();
        assert_eq!(
            expr.kind,
            ExprKind::PropertyRead {
                name: "user.address.city".into()
            }
        );
        assert_eq!(expr.span, ExprSpan::new(0, 17));
    }

    #[test]
    fn test_keyed_reads() {
        assert_eq!(parse("items[0]"), "items[0]");
        assert_eq!(parse("grid[row][col + 1]"), "grid[row][(+ col 1)]");
        assert_eq!(parse("map['key']"), "map[\"key\"]");
    }

    #[test]
    fn test_method_calls() {
        assert_eq!(parse("save()"), "save()");
        assert_eq!(parse("onClick($event)"), "onClick($event)");
        assert_eq!(parse("user.rename(first, last + 1, 'x')"), "user.rename(first, (+ last 1), \"x\")");
        assert_eq!(parse("rows()[0]"), "rows()[0]");
    }

    #[test]
    fn test_method_span_excludes_key_access() {
        let expr = ExprParser::parse("rows()[0]").unwrap();
        let ExprKind::KeyedRead { receiver, .. } = &expr.kind else {
            panic!("expected keyed read, got {:?}", expr.kind);
        };
        assert_eq!(receiver.span, ExprSpan::new(0, 6));
        assert_eq!(expr.span, ExprSpan::new(0, 9));
    }

    // =========================================================================
    // Operators
    // =========================================================================

    #[test]
    fn test_conditional_with_comparison() {
        let source = "a.b[0] === c ? d : e";
        let (expr, consumed) = ExprParser::parse_prefix(source).unwrap();
        assert_eq!(consumed, source.len());
        assert_eq!(show(&expr), "(? (=== a.b[0] c) d e)");

        let ExprKind::Conditional { condition, .. } = &expr.kind else {
            panic!("expected conditional");
        };
        let ExprKind::Binary { operation, left, .. } = &condition.kind else {
            panic!("expected comparison");
        };
        assert_eq!(*operation, BinaryOp::StrictEq);
        assert!(matches!(left.kind, ExprKind::KeyedRead { .. }));
    }

    #[test]
    fn test_nested_conditional() {
        assert_eq!(parse("a ? b : c ? d : e"), "(? a b (? c d e))");
    }

    #[test]
    fn test_precedence() {
        assert_eq!(parse("a + b * c"), "(+ a (* b c))");
        assert_eq!(parse("a * b + c"), "(+ (* a b) c)");
        assert_eq!(parse("a - b * c + d"), "(+ (- a (* b c)) d)");
        assert_eq!(parse("a % b / c"), "(/ (% a b) c)");
    }

    #[test]
    fn test_left_associative() {
        assert_eq!(parse("a - b - c"), "(- (- a b) c)");
    }

    #[test]
    fn test_parentheses() {
        assert_eq!(parse("(a + b) * c"), "(* (+ a b) c)");
        assert_eq!(parse("((x))"), "x");
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(parse("a + 1 >= b"), "(>= (+ a 1) b)");
        assert_eq!(parse("a != b"), "(!= a b)");
        assert_eq!(parse("a == b == c"), "(== (== a b) c)");
    }

    #[test]
    fn test_negative_operand() {
        assert_eq!(parse("a - -1"), "(- a -1)");
        assert_eq!(parse("a-1"), "(- a 1)");
    }

    #[test]
    fn test_binary_span() {
        let expr = ExprParser::parse(" x + y ").unwrap();
        assert_eq!(expr.span, ExprSpan::new(1, 6));
    }

    // =========================================================================
    // Pipes
    // =========================================================================

    #[test]
    fn test_pipe() {
        assert_eq!(parse("name | uppercase"), "(| name uppercase)");
    }

    #[test]
    fn test_pipe_chain_with_args() {
        assert_eq!(
            parse("when | date:'short':tz | lower"),
            "(| (| when date:\"short\":tz) lower)"
        );
    }

    #[test]
    fn test_pipe_inside_group_and_key() {
        assert_eq!(parse("(a | p) + 1"), "(+ (| a p) 1)");
        assert_eq!(parse("m[k | p]"), "m[(| k p)]");
    }

    #[test]
    fn test_logical_or_is_not_a_pipe() {
        assert!(ExprParser::parse("a || b").is_err());
    }

    // =========================================================================
    // Actions
    // =========================================================================

    #[test]
    fn test_action_assignment() {
        assert_eq!(action("count = count + 1"), "(= count (+ count 1))");
        assert_eq!(action("user.name=$event"), "(= user.name $event)");
    }

    #[test]
    fn test_action_plain_expression() {
        assert_eq!(action("onSave($event)"), "onSave($event)");
        assert_eq!(action("a == b"), "(== a b)");
    }

    #[test]
    fn test_assignment_rejected_in_bindings() {
        assert!(ExprParser::parse("a = 1").is_err());
    }

    // =========================================================================
    // Errors
    // =========================================================================

    #[test]
    fn test_trailing_garbage() {
        let err = ExprParser::parse("a b").unwrap_err();
        assert_eq!(err.offset, 2);
        assert_eq!(err.message, "Unexpected character [b]");
    }

    #[test]
    fn test_empty_source() {
        let err = ExprParser::parse("").unwrap_err();
        assert_eq!(err.message, "Unexpected end of input");
        assert!(ExprParser::parse("   ").is_err());
    }

    #[test]
    fn test_incomplete_expression() {
        let err = ExprParser::parse("a +").unwrap_err();
        assert_eq!(err.offset, 3);
    }

    #[test]
    fn test_lexer_errors_take_precedence() {
        let err = ExprParser::parse("a & b").unwrap_err();
        assert_eq!(err.message, "Unexpected character [&]");
        assert_eq!(err.offset, 2);

        let err = ExprParser::parse("'open").unwrap_err();
        assert_eq!(err.message, "Unterminated quote");
    }

    #[test]
    fn test_parse_prefix_stops_at_garbage() {
        let (expr, consumed) = ExprParser::parse_prefix("a + b }} rest").unwrap();
        assert_eq!(show(&expr), "(+ a b)");
        assert_eq!(consumed, 6);
    }

    #[test]
    fn test_deep_nesting_is_an_error() {
        let source = format!("{}x{}", "(".repeat(100), ")".repeat(100));
        let err = ExprParser::parse(&source).unwrap_err();
        assert_eq!(err.message, "Expression is nested too deeply");
    }
}
