//! Textual PEG grammar definitions.
//!
//! A grammar is written as a header followed by rules:
//!
//! ```text
//! GRAMMAR digits
//!
//! # comments run to the end of the line
//! number -> "-"? _digit+ ("." _digit+)?;
//! _digit -> [0-9];
//! ```
//!
//! Patterns support juxtaposition (sequence), ordered choice `/`, the
//! suffixes `*` `+` `?`, the lookahead prefixes `&` and `!`, grouping,
//! string literals, character classes (`[a-z_$]`, `[^"\\]`), `.` for any
//! character and `EOF`. Rules whose name starts with `_` are silent: they
//! match like any other rule but contribute their children to the parse
//! tree instead of a node of their own.
//!
//! [`Grammar::compile`] resolves every rule reference to an index, so a
//! compiled grammar never needs name lookups while matching.

use std::collections::HashMap;

use crate::GrammarError;

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Sequence(Vec<Pattern>),
    /// Ordered choice: the first alternative that matches wins.
    Choice(Vec<Pattern>),
    ZeroOrMore(Box<Pattern>),
    OneOrMore(Box<Pattern>),
    Optional(Box<Pattern>),
    /// `&p`: succeeds without consuming if `p` matches.
    And(Box<Pattern>),
    /// `!p`: succeeds without consuming if `p` does not match.
    Not(Box<Pattern>),
    Literal(String),
    Class(CharClass),
    Any,
    Eof,
    /// Reference to a rule by index.
    Rule(usize),
}

/// A bracketed character class such as `[A-Za-z_$]` or `[^"\\]`.
#[derive(Debug, Clone, PartialEq)]
pub struct CharClass {
    pub negated: bool,
    pub ranges: Vec<(char, char)>,
}

impl CharClass {
    pub fn matches(&self, c: char) -> bool {
        let hit = self.ranges.iter().any(|&(lo, hi)| (lo..=hi).contains(&c));
        hit != self.negated
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub name: String,
    pub pattern: Pattern,
    /// Silent rules do not produce parse tree nodes.
    pub silent: bool,
}

/// A compiled grammar: an immutable rule table.
#[derive(Debug, Clone, PartialEq)]
pub struct Grammar {
    name: String,
    rules: Vec<Rule>,
    index: HashMap<String, usize>,
}

impl Grammar {
    /// Compile a grammar from its textual definition.
    pub fn compile(text: &str) -> Result<Self, GrammarError> {
        Compiler::new(text).compile()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rule_id(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn rule(&self, id: usize) -> Option<&Rule> {
        self.rules.get(id)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }
}

struct Compiler {
    chars: Vec<char>,
    pos: usize,
    names: Vec<String>,
    index: HashMap<String, usize>,
    definitions: Vec<Option<Pattern>>,
    /// Offset of the first reference to each rule, for undefined-rule errors.
    first_use: Vec<usize>,
}

impl Compiler {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            names: Vec::new(),
            index: HashMap::new(),
            definitions: Vec::new(),
            first_use: Vec::new(),
        }
    }

    fn compile(mut self) -> Result<Grammar, GrammarError> {
        self.skip_trivia();
        let header = self.identifier()?;
        if header != "GRAMMAR" {
            return Err(self.error_at("Expected GRAMMAR header".into(), 0));
        }
        self.skip_trivia();
        let name = self.identifier()?;
        self.skip_trivia();

        if self.is_at_end() {
            return Err(self.error("Grammar has no rules".into()));
        }
        while !self.is_at_end() {
            self.rule()?;
            self.skip_trivia();
        }

        let mut rules = Vec::with_capacity(self.names.len());
        for (id, (rule_name, definition)) in self.names.into_iter().zip(self.definitions).enumerate() {
            let Some(pattern) = definition else {
                return Err(GrammarError {
                    message: format!("Undefined rule [{rule_name}]"),
                    offset: self.first_use[id],
                });
            };
            rules.push(Rule {
                silent: rule_name.starts_with('_'),
                name: rule_name,
                pattern,
            });
        }

        Ok(Grammar {
            name,
            rules,
            index: self.index,
        })
    }

    // --- Rules and patterns ---

    fn rule(&mut self) -> Result<(), GrammarError> {
        let start = self.pos;
        let name = self.identifier()?;
        if name == "EOF" {
            return Err(self.error_at("EOF is reserved".into(), start));
        }
        self.skip_trivia();
        self.expect("->")?;
        let pattern = self.choice()?;
        self.skip_trivia();
        self.expect(";")?;

        let id = self.intern(&name, start);
        if self.definitions[id].is_some() {
            return Err(self.error_at(format!("Duplicate rule [{name}]"), start));
        }
        self.definitions[id] = Some(pattern);
        Ok(())
    }

    fn choice(&mut self) -> Result<Pattern, GrammarError> {
        let mut alternatives = vec![self.sequence()?];
        loop {
            self.skip_trivia();
            if self.peek() != '/' {
                break;
            }
            self.advance();
            alternatives.push(self.sequence()?);
        }

        Ok(match alternatives.len() {
            1 => alternatives.remove(0),
            _ => Pattern::Choice(alternatives),
        })
    }

    fn sequence(&mut self) -> Result<Pattern, GrammarError> {
        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            if self.is_at_end() || matches!(self.peek(), '/' | ')' | ';') {
                break;
            }
            items.push(self.prefixed()?);
        }

        match items.len() {
            0 => Err(self.error("Expected a pattern".into())),
            1 => Ok(items.remove(0)),
            _ => Ok(Pattern::Sequence(items)),
        }
    }

    fn prefixed(&mut self) -> Result<Pattern, GrammarError> {
        match self.peek() {
            '&' => {
                self.advance();
                self.skip_trivia();
                Ok(Pattern::And(Box::new(self.suffixed()?)))
            }
            '!' => {
                self.advance();
                self.skip_trivia();
                Ok(Pattern::Not(Box::new(self.suffixed()?)))
            }
            _ => self.suffixed(),
        }
    }

    fn suffixed(&mut self) -> Result<Pattern, GrammarError> {
        let primary = self.primary()?;
        let pattern = match self.peek() {
            '*' => Pattern::ZeroOrMore(Box::new(primary)),
            '+' => Pattern::OneOrMore(Box::new(primary)),
            '?' => Pattern::Optional(Box::new(primary)),
            _ => return Ok(primary),
        };
        self.advance();
        Ok(pattern)
    }

    fn primary(&mut self) -> Result<Pattern, GrammarError> {
        let start = self.pos;
        match self.peek() {
            '(' => {
                self.advance();
                let inner = self.choice()?;
                self.skip_trivia();
                self.expect(")")?;
                Ok(inner)
            }
            '"' => self.literal(),
            '[' => self.class(),
            '.' => {
                self.advance();
                Ok(Pattern::Any)
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let name = self.identifier()?;
                if name == "EOF" {
                    return Ok(Pattern::Eof);
                }
                Ok(Pattern::Rule(self.intern(&name, start)))
            }
            c => Err(self.error(format!("Unexpected character '{c}'"))),
        }
    }

    fn literal(&mut self) -> Result<Pattern, GrammarError> {
        let start = self.pos;
        self.advance(); // opening quote
        let mut text = String::new();
        loop {
            match self.peek() {
                _ if self.is_at_end() => {
                    return Err(self.error_at("Unterminated literal".into(), start));
                }
                '"' => break,
                '\\' => {
                    self.advance();
                    text.push(self.escape()?);
                }
                c => {
                    text.push(c);
                    self.advance();
                }
            }
        }
        self.advance(); // closing quote

        if text.is_empty() {
            return Err(self.error_at("Empty literal".into(), start));
        }
        Ok(Pattern::Literal(text))
    }

    fn class(&mut self) -> Result<Pattern, GrammarError> {
        let start = self.pos;
        self.advance(); // [
        let negated = self.peek() == '^';
        if negated {
            self.advance();
        }

        let mut ranges = Vec::new();
        loop {
            if self.is_at_end() {
                return Err(self.error_at("Unterminated character class".into(), start));
            }
            if self.peek() == ']' {
                break;
            }
            let lo = self.class_char()?;
            let hi = if self.peek() == '-' && self.peek_next() != ']' {
                self.advance();
                self.class_char()?
            } else {
                lo
            };
            if hi < lo {
                return Err(self.error(format!("Invalid range {lo}-{hi}")));
            }
            ranges.push((lo, hi));
        }
        self.advance(); // ]

        Ok(Pattern::Class(CharClass { negated, ranges }))
    }

    fn class_char(&mut self) -> Result<char, GrammarError> {
        let c = self.peek();
        self.advance();
        if c == '\\' {
            self.escape()
        } else {
            Ok(c)
        }
    }

    /// Decode the escape whose backslash was just consumed.
    fn escape(&mut self) -> Result<char, GrammarError> {
        if self.is_at_end() {
            return Err(self.error("Unterminated escape".into()));
        }
        let c = self.peek();
        self.advance();
        Ok(match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            'x' => {
                let hex: String = self.chars.iter().skip(self.pos).take(2).collect();
                let code = u8::from_str_radix(&hex, 16)
                    .map_err(|_| self.error(format!("Invalid escape \\x{hex}")))?;
                self.advance();
                self.advance();
                char::from(code)
            }
            other => other,
        })
    }

    // --- Helpers ---

    fn identifier(&mut self) -> Result<String, GrammarError> {
        let start = self.pos;
        if !(self.peek().is_ascii_alphabetic() || self.peek() == '_') {
            return Err(self.error("Expected an identifier".into()));
        }
        while self.peek().is_ascii_alphanumeric() || self.peek() == '_' {
            self.advance();
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn intern(&mut self, name: &str, at: usize) -> usize {
        if let Some(&id) = self.index.get(name) {
            return id;
        }
        let id = self.names.len();
        self.names.push(name.to_string());
        self.definitions.push(None);
        self.first_use.push(at);
        self.index.insert(name.to_string(), id);
        id
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                c if c.is_whitespace() => self.advance(),
                '#' => {
                    while !self.is_at_end() && self.peek() != '\n' {
                        self.advance();
                    }
                }
                _ => return,
            }
        }
    }

    fn expect(&mut self, text: &str) -> Result<(), GrammarError> {
        for expected in text.chars() {
            if self.peek() != expected || self.is_at_end() {
                return Err(self.error(format!("Expected '{text}'")));
            }
            self.advance();
        }
        Ok(())
    }

    fn peek(&self) -> char {
        self.chars.get(self.pos).copied().unwrap_or('\0')
    }

    fn peek_next(&self) -> char {
        self.chars.get(self.pos + 1).copied().unwrap_or('\0')
    }

    fn advance(&mut self) {
        if self.pos < self.chars.len() {
            self.pos += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn error(&self, message: String) -> GrammarError {
        self.error_at(message, self.pos)
    }

    fn error_at(&self, message: String, offset: usize) -> GrammarError {
        GrammarError { message, offset }
    }
}
