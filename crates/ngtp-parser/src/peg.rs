//! Packrat matcher for compiled grammars.
//!
//! Every rule result is memoized per input position, so backtracking over
//! ordered choices costs linear time. Re-entering a rule at the position it
//! is already being matched at fails instead of recursing, and nesting
//! deeper than the depth limit aborts with a [`ParseError`].

use std::collections::HashMap;

use crate::grammar::{Grammar, Pattern};
use crate::ParseError;

/// Rule nesting allowed before a parse is abandoned.
pub const DEFAULT_DEPTH_LIMIT: usize = 200;

/// A parse tree node: one successful (non-silent) rule match.
#[derive(Debug, Clone, PartialEq)]
pub struct Match<'g> {
    pub rule: &'g str,
    /// Byte offsets into the input.
    pub start: usize,
    pub end: usize,
    pub children: Vec<Match<'g>>,
}

impl<'g> Match<'g> {
    pub fn text<'i>(&self, input: &'i str) -> &'i str {
        input.get(self.start..self.end).unwrap_or_default()
    }

    /// First direct child produced by `rule`.
    pub fn child(&self, rule: &str) -> Option<&Match<'g>> {
        self.children.iter().find(|c| c.rule == rule)
    }
}

impl Grammar {
    /// Match `rule` against the start of `input`.
    ///
    /// The match need not cover the whole input unless the rule ends in `EOF`.
    pub fn parse<'g>(&'g self, rule: &str, input: &str) -> Result<Match<'g>, ParseError> {
        self.parse_with_depth_limit(rule, input, DEFAULT_DEPTH_LIMIT)
    }

    pub fn parse_with_depth_limit<'g>(
        &'g self,
        rule: &str,
        input: &str,
        depth_limit: usize,
    ) -> Result<Match<'g>, ParseError> {
        let Some(id) = self.rule_id(rule) else {
            return Err(ParseError {
                message: format!("Unknown rule [{rule}]"),
                offset: 0,
                input: input.to_string(),
            });
        };

        let mut matcher = Matcher::new(self, input, depth_limit);
        let mut nodes = Vec::new();
        match matcher.match_rule(id, 0, &mut nodes) {
            Ok(Some(end)) => Ok(nodes.pop().unwrap_or(Match {
                rule: "",
                start: 0,
                end,
                children: Vec::new(),
            })),
            Ok(None) => Err(matcher.failure()),
            Err(TooDeep(offset)) => Err(ParseError {
                message: "Expression is nested too deeply".into(),
                offset,
                input: input.to_string(),
            }),
        }
    }
}

/// Depth limit hit at the given offset.
struct TooDeep(usize);

/// `Ok(Some(end))` on a match, `Ok(None)` on a failure.
type Outcome = Result<Option<usize>, TooDeep>;

enum Memo<'g> {
    /// Being matched right now; re-entry fails.
    Active,
    Failed,
    Matched { end: usize, nodes: Vec<Match<'g>> },
}

struct Matcher<'g, 'i> {
    grammar: &'g Grammar,
    input: &'i str,
    memo: HashMap<(usize, usize), Memo<'g>>,
    depth: usize,
    depth_limit: usize,
    /// Farthest position a terminal failed at.
    farthest: usize,
    /// Non-zero inside lookahead, where failures are expected.
    quiet: usize,
}

impl<'g, 'i> Matcher<'g, 'i> {
    fn new(grammar: &'g Grammar, input: &'i str, depth_limit: usize) -> Self {
        Self {
            grammar,
            input,
            memo: HashMap::new(),
            depth: 0,
            depth_limit,
            farthest: 0,
            quiet: 0,
        }
    }

    fn match_rule(&mut self, id: usize, pos: usize, out: &mut Vec<Match<'g>>) -> Outcome {
        match self.memo.get(&(id, pos)) {
            Some(Memo::Active | Memo::Failed) => return Ok(None),
            Some(Memo::Matched { end, nodes }) => {
                out.extend(nodes.iter().cloned());
                return Ok(Some(*end));
            }
            None => {}
        }

        let grammar = self.grammar;
        let Some(rule) = grammar.rule(id) else {
            return Ok(None);
        };
        if self.depth >= self.depth_limit {
            return Err(TooDeep(pos));
        }

        self.memo.insert((id, pos), Memo::Active);
        self.depth += 1;
        let mut children = Vec::new();
        let result = self.match_pattern(&rule.pattern, pos, &mut children);
        self.depth -= 1;

        let Some(end) = result? else {
            self.memo.insert((id, pos), Memo::Failed);
            return Ok(None);
        };

        let nodes = if rule.silent {
            children
        } else {
            vec![Match {
                rule: &rule.name,
                start: pos,
                end,
                children,
            }]
        };
        out.extend(nodes.iter().cloned());
        self.memo.insert((id, pos), Memo::Matched { end, nodes });
        Ok(Some(end))
    }

    fn match_pattern(&mut self, pattern: &'g Pattern, pos: usize, out: &mut Vec<Match<'g>>) -> Outcome {
        match pattern {
            Pattern::Sequence(items) => {
                let mark = out.len();
                let mut cursor = pos;
                for item in items {
                    match self.match_pattern(item, cursor, out)? {
                        Some(next) => cursor = next,
                        None => {
                            out.truncate(mark);
                            return Ok(None);
                        }
                    }
                }
                Ok(Some(cursor))
            }
            Pattern::Choice(alternatives) => {
                for alternative in alternatives {
                    let mark = out.len();
                    if let Some(end) = self.match_pattern(alternative, pos, out)? {
                        return Ok(Some(end));
                    }
                    out.truncate(mark);
                }
                Ok(None)
            }
            Pattern::ZeroOrMore(inner) => Ok(Some(self.repeat(inner, pos, out)?)),
            Pattern::OneOrMore(inner) => match self.match_pattern(inner, pos, out)? {
                Some(next) => Ok(Some(self.repeat(inner, next, out)?)),
                None => Ok(None),
            },
            Pattern::Optional(inner) => {
                let mark = out.len();
                match self.match_pattern(inner, pos, out)? {
                    Some(end) => Ok(Some(end)),
                    None => {
                        out.truncate(mark);
                        Ok(Some(pos))
                    }
                }
            }
            Pattern::And(inner) => {
                let matched = self.lookahead(inner, pos)?;
                Ok(matched.then_some(pos))
            }
            Pattern::Not(inner) => {
                let matched = self.lookahead(inner, pos)?;
                Ok((!matched).then_some(pos))
            }
            Pattern::Literal(text) => {
                if self.rest(pos).starts_with(text.as_str()) {
                    Ok(Some(pos + text.len()))
                } else {
                    Ok(self.fail(pos))
                }
            }
            Pattern::Class(class) => match self.rest(pos).chars().next() {
                Some(c) if class.matches(c) => Ok(Some(pos + c.len_utf8())),
                _ => Ok(self.fail(pos)),
            },
            Pattern::Any => match self.rest(pos).chars().next() {
                Some(c) => Ok(Some(pos + c.len_utf8())),
                None => Ok(self.fail(pos)),
            },
            Pattern::Eof => {
                if pos >= self.input.len() {
                    Ok(Some(pos))
                } else {
                    Ok(self.fail(pos))
                }
            }
            Pattern::Rule(id) => self.match_rule(*id, pos, out),
        }
    }

    /// Greedy repetition. Stops on failure or on a match that consumed nothing.
    fn repeat(&mut self, inner: &'g Pattern, mut pos: usize, out: &mut Vec<Match<'g>>) -> Result<usize, TooDeep> {
        loop {
            let mark = out.len();
            match self.match_pattern(inner, pos, out)? {
                Some(next) if next > pos => pos = next,
                _ => {
                    out.truncate(mark);
                    return Ok(pos);
                }
            }
        }
    }

    fn lookahead(&mut self, inner: &'g Pattern, pos: usize) -> Result<bool, TooDeep> {
        let mut scratch = Vec::new();
        self.quiet += 1;
        let result = self.match_pattern(inner, pos, &mut scratch);
        self.quiet -= 1;
        Ok(result?.is_some())
    }

    fn rest(&self, pos: usize) -> &'i str {
        self.input.get(pos..).unwrap_or_default()
    }

    fn fail(&mut self, pos: usize) -> Option<usize> {
        if self.quiet == 0 && pos > self.farthest {
            self.farthest = pos;
        }
        None
    }

    fn failure(&self) -> ParseError {
        let message = match self.rest(self.farthest).chars().next() {
            Some(c) => format!("Unexpected character [{c}]"),
            None => "Unexpected end of input".to_string(),
        };
        ParseError {
            message,
            offset: self.farthest,
            input: self.input.to_string(),
        }
    }
}
