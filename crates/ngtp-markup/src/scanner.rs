use crate::entities;
use crate::token::{is_raw_text_element, Attribute, Span, Token, TokenKind};
use crate::MarkupError;

/// Template markup scanner.
///
/// A pull source: each call to [`Scanner::next_token`] yields the next
/// start tag, end tag, text run, comment or doctype. The scanner never
/// builds a tree; nesting is the walker's business.
///
/// - `Vec<char>` source for index-based navigation
/// - Position tracking on every token
/// - Raw-text mode after `<script>`/`<style>`/`<textarea>`/`<title>`
pub struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    raw_text_end: Option<String>,
    failed: bool,
}

impl Scanner {
    /// Create a new scanner for the given source.
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            raw_text_end: None,
            failed: false,
        }
    }

    /// Tokenize the entire source into a vector of tokens.
    pub fn tokenize(source: &str) -> Result<Vec<Token>, MarkupError> {
        Scanner::new(source).collect()
    }

    /// Pull the next token. `Ok(None)` means the source is exhausted.
    pub fn next_token(&mut self) -> Result<Option<Token>, MarkupError> {
        if let Some(tag) = self.raw_text_end.take() {
            if let Some(token) = self.scan_raw_text(&tag) {
                return Ok(Some(token));
            }
        }

        if self.is_at_end() {
            return Ok(None);
        }

        let token = if self.peek() == '<' {
            match self.peek_next() {
                '!' if self.starts_with("<!--") => self.scan_comment()?,
                '!' => self.scan_doctype()?,
                '/' if self.peek_at(2).is_ascii_alphabetic() => self.scan_end_tag()?,
                c if c.is_ascii_alphabetic() => self.scan_start_tag()?,
                _ => self.scan_text(),
            }
        } else {
            self.scan_text()
        };

        Ok(Some(token))
    }

    // --- Scanners ---

    /// Scan character data up to the next tag-like `<`.
    fn scan_text(&mut self) -> Token {
        let (start, line, column) = self.mark();
        let mut raw = String::new();

        // A leading `<` that did not open a tag is literal text.
        raw.push(self.peek());
        self.advance();

        while !self.is_at_end() && !self.at_markup_start() {
            raw.push(self.peek());
            self.advance();
        }

        let span = Span::new(start, self.pos, line, column);
        Token::new(TokenKind::Text(entities::decode(&raw)), span)
    }

    /// Scan the body of a raw-text element up to (not including) its end tag.
    fn scan_raw_text(&mut self, tag: &str) -> Option<Token> {
        let (start, line, column) = self.mark();
        let closing = format!("</{tag}");
        let mut raw = String::new();

        while !self.is_at_end() && !self.starts_with_ignore_case(&closing) {
            raw.push(self.peek());
            self.advance();
        }

        if raw.is_empty() {
            return None;
        }

        let span = Span::new(start, self.pos, line, column);
        Some(Token::new(TokenKind::Text(raw), span))
    }

    /// Scan `<!-- ... -->`.
    fn scan_comment(&mut self) -> Result<Token, MarkupError> {
        let (start, line, column) = self.mark();
        self.advance_n(4); // consume `<!--`

        let mut content = String::new();
        while !self.starts_with("-->") {
            if self.is_at_end() {
                return Err(MarkupError {
                    message: "Unterminated comment".into(),
                    line,
                    column,
                });
            }
            content.push(self.peek());
            self.advance();
        }
        self.advance_n(3); // consume `-->`

        let span = Span::new(start, self.pos, line, column);
        Ok(Token::new(TokenKind::Comment(content), span))
    }

    /// Scan `<!DOCTYPE ...>` and other `<!...>` declarations.
    fn scan_doctype(&mut self) -> Result<Token, MarkupError> {
        let (start, line, column) = self.mark();
        self.advance_n(2); // consume `<!`

        let mut content = String::new();
        while self.peek() != '>' {
            if self.is_at_end() {
                return Err(MarkupError {
                    message: "Unterminated declaration".into(),
                    line,
                    column,
                });
            }
            content.push(self.peek());
            self.advance();
        }
        self.advance(); // consume `>`

        let span = Span::new(start, self.pos, line, column);
        Ok(Token::new(TokenKind::Doctype(content.trim().to_string()), span))
    }

    /// Scan `</name>`.
    fn scan_end_tag(&mut self) -> Result<Token, MarkupError> {
        let (start, line, column) = self.mark();
        self.advance_n(2); // consume `</`

        let name = self.read_tag_name();
        self.skip_whitespace();

        if self.peek() != '>' {
            return Err(MarkupError {
                message: format!("Unterminated end tag </{name}>"),
                line,
                column,
            });
        }
        self.advance(); // consume `>`

        let span = Span::new(start, self.pos, line, column);
        Ok(Token::new(TokenKind::EndTag { name }, span))
    }

    /// Scan `<name attr="value" ...>` or `<name ... />`.
    fn scan_start_tag(&mut self) -> Result<Token, MarkupError> {
        let (start, line, column) = self.mark();
        self.advance(); // consume `<`

        let name = self.read_tag_name();
        let mut attributes = Vec::new();
        let self_closing;

        loop {
            self.skip_whitespace();

            if self.is_at_end() {
                return Err(MarkupError {
                    message: format!("Unterminated start tag <{name}>"),
                    line,
                    column,
                });
            }

            match self.peek() {
                '>' => {
                    self.advance();
                    self_closing = false;
                    break;
                }
                '/' if self.peek_next() == '>' => {
                    self.advance_n(2);
                    self_closing = true;
                    break;
                }
                '/' => self.advance(),
                _ => attributes.push(self.scan_attribute()?),
            }
        }

        if !self_closing && is_raw_text_element(&name) {
            self.raw_text_end = Some(name.clone());
        }

        let span = Span::new(start, self.pos, line, column);
        Ok(Token::new(
            TokenKind::StartTag {
                name,
                attributes,
                self_closing,
            },
            span,
        ))
    }

    /// Scan one attribute. Names keep their case: `[(ngModel)]` must survive intact.
    fn scan_attribute(&mut self) -> Result<Attribute, MarkupError> {
        let (start, line, column) = self.mark();

        let mut name = String::new();
        while !self.is_at_end() && !self.at_attribute_name_end() {
            name.push(self.peek());
            self.advance();
        }

        if name.is_empty() {
            return Err(self.error(format!(
                "Unexpected character in tag: '{}'",
                self.peek()
            )));
        }

        self.skip_whitespace();
        let value = if self.peek() == '=' {
            self.advance(); // consume `=`
            self.skip_whitespace();
            self.scan_attribute_value()?
        } else {
            String::new()
        };

        Ok(Attribute::new(
            name,
            entities::decode(&value),
            Span::new(start, self.pos, line, column),
        ))
    }

    fn scan_attribute_value(&mut self) -> Result<String, MarkupError> {
        let mut value = String::new();

        match self.peek() {
            quote @ ('"' | '\'') => {
                let (_, line, column) = self.mark();
                self.advance(); // consume opening quote

                while self.peek() != quote {
                    if self.is_at_end() {
                        return Err(MarkupError {
                            message: "Unterminated attribute value".into(),
                            line,
                            column,
                        });
                    }
                    value.push(self.peek());
                    self.advance();
                }
                self.advance(); // consume closing quote
            }
            _ => {
                while !self.is_at_end()
                    && !self.peek().is_whitespace()
                    && self.peek() != '>'
                    && !(self.peek() == '/' && self.peek_next() == '>')
                {
                    value.push(self.peek());
                    self.advance();
                }
            }
        }

        Ok(value)
    }

    // --- Helpers ---

    fn read_tag_name(&mut self) -> String {
        let mut name = String::new();
        while !self.is_at_end()
            && !self.peek().is_whitespace()
            && self.peek() != '>'
            && self.peek() != '/'
        {
            name.push(self.peek());
            self.advance();
        }
        name
    }

    fn at_markup_start(&self) -> bool {
        self.peek() == '<'
            && match self.peek_next() {
                '!' => true,
                '/' => self.peek_at(2).is_ascii_alphabetic(),
                c => c.is_ascii_alphabetic(),
            }
    }

    fn at_attribute_name_end(&self) -> bool {
        let c = self.peek();
        c.is_whitespace()
            || c == '='
            || c == '>'
            || c == '"'
            || c == '\''
            || (c == '/' && self.peek_next() == '>')
    }

    fn mark(&self) -> (usize, usize, usize) {
        (self.pos, self.line, self.column)
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars()
            .enumerate()
            .all(|(i, c)| self.chars.get(self.pos + i) == Some(&c))
    }

    fn starts_with_ignore_case(&self, s: &str) -> bool {
        s.chars().enumerate().all(|(i, c)| {
            self.chars
                .get(self.pos + i)
                .is_some_and(|x| x.eq_ignore_ascii_case(&c))
        })
    }

    fn skip_whitespace(&mut self) {
        while !self.is_at_end() && self.peek().is_whitespace() {
            self.advance();
        }
    }

    fn peek(&self) -> char {
        self.peek_at(0)
    }

    fn peek_next(&self) -> char {
        self.peek_at(1)
    }

    fn peek_at(&self, offset: usize) -> char {
        self.chars.get(self.pos + offset).copied().unwrap_or('\0')
    }

    fn advance(&mut self) {
        if let Some(&c) = self.chars.get(self.pos) {
            self.pos += 1;
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }

    fn advance_n(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn error(&self, message: String) -> MarkupError {
        MarkupError {
            message,
            line: self.line,
            column: self.column,
        }
    }
}

impl Iterator for Scanner {
    type Item = Result<Token, MarkupError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_token() {
            Ok(token) => token.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Helper: tokenize and return token kinds (ignoring spans).
    fn kinds(source: &str) -> Vec<TokenKind> {
        Scanner::tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn start_tag(name: &str, attributes: &[(&str, &str)], self_closing: bool) -> TokenKind {
        TokenKind::StartTag {
            name: name.into(),
            attributes: attributes
                .iter()
                .map(|(n, v)| Attribute::new(*n, *v, Span::new(0, 0, 0, 0)))
                .collect(),
            self_closing,
        }
    }

    /// Helper: compare kinds with attribute spans zeroed out.
    fn without_spans(kinds: Vec<TokenKind>) -> Vec<TokenKind> {
        kinds
            .into_iter()
            .map(|kind| match kind {
                TokenKind::StartTag {
                    name,
                    attributes,
                    self_closing,
                } => TokenKind::StartTag {
                    name,
                    attributes: attributes
                        .into_iter()
                        .map(|a| Attribute::new(a.name, a.value, Span::new(0, 0, 0, 0)))
                        .collect(),
                    self_closing,
                },
                other => other,
            })
            .collect()
    }

    // =========================================================================
    // Structure
    // =========================================================================

    #[test]
    fn test_empty_source() {
        assert!(kinds("").is_empty());
    }

    #[test]
    fn test_text_only() {
        assert_eq!(kinds("hello"), vec![TokenKind::Text("hello".into())]);
    }

    #[test]
    fn test_element_with_text() {
        assert_eq!(
            without_spans(kinds("<p>hi</p>")),
            vec![
                start_tag("p", &[], false),
                TokenKind::Text("hi".into()),
                TokenKind::EndTag { name: "p".into() },
            ]
        );
    }

    #[test]
    fn test_self_closing() {
        assert_eq!(
            without_spans(kinds("<br/><img />")),
            vec![start_tag("br", &[], true), start_tag("img", &[], true)]
        );
    }

    #[test]
    fn test_comment() {
        assert_eq!(
            kinds("<!-- note -->"),
            vec![TokenKind::Comment(" note ".into())]
        );
    }

    #[test]
    fn test_doctype() {
        assert_eq!(
            kinds("<!DOCTYPE html>"),
            vec![TokenKind::Doctype("DOCTYPE html".into())]
        );
    }

    #[test]
    fn test_lone_angle_bracket_is_text() {
        assert_eq!(kinds("a < b"), vec![TokenKind::Text("a < b".into())]);
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    #[test]
    fn test_binding_attributes_keep_case_and_order() {
        let k = without_spans(kinds(
            r##"<input #r1 [(ngModel)]="model" (keyUp)="onKey($event)" disabled>"##,
        ));
        assert_eq!(
            k,
            vec![start_tag(
                "input",
                &[
                    ("#r1", ""),
                    ("[(ngModel)]", "model"),
                    ("(keyUp)", "onKey($event)"),
                    ("disabled", ""),
                ],
                false,
            )]
        );
    }

    #[test]
    fn test_single_quoted_and_unquoted_values() {
        let k = without_spans(kinds("<a href='/x' target=_blank>"));
        assert_eq!(
            k,
            vec![start_tag("a", &[("href", "/x"), ("target", "_blank")], false)]
        );
    }

    #[test]
    fn test_attribute_value_with_gt_and_entities() {
        let k = without_spans(kinds(r#"<i [x]="a &gt; b ? '>' : c">"#));
        assert_eq!(
            k,
            vec![start_tag("i", &[("[x]", "a > b ? '>' : c")], false)]
        );
    }

    #[test]
    fn test_text_entities_decoded() {
        assert_eq!(kinds("a &amp; b"), vec![TokenKind::Text("a & b".into())]);
    }

    // =========================================================================
    // Raw text
    // =========================================================================

    #[test]
    fn test_script_content_is_raw() {
        let k = without_spans(kinds("<script>if (a<b) {}</script>"));
        assert_eq!(
            k,
            vec![
                start_tag("script", &[], false),
                TokenKind::Text("if (a<b) {}".into()),
                TokenKind::EndTag {
                    name: "script".into()
                },
            ]
        );
    }

    #[test]
    fn test_empty_raw_text_element() {
        let k = without_spans(kinds("<style></style>"));
        assert_eq!(k.len(), 2);
    }

    // =========================================================================
    // Errors
    // =========================================================================

    #[test]
    fn test_unterminated_comment() {
        let err = Scanner::tokenize("<!-- oops").unwrap_err();
        assert!(err.message.contains("Unterminated comment"));
    }

    #[test]
    fn test_unterminated_start_tag() {
        let err = Scanner::tokenize("<div class=\"a\"").unwrap_err();
        assert!(err.message.contains("Unterminated start tag"));
    }

    #[test]
    fn test_unterminated_attribute_value() {
        let err = Scanner::tokenize("<div title=\"abc>").unwrap_err();
        assert!(err.message.contains("Unterminated attribute value"));
    }

    #[test]
    fn test_iterator_stops_after_error() {
        let mut scanner = Scanner::new("<p><!-- x");
        assert!(scanner.next().unwrap().is_ok());
        assert!(scanner.next().unwrap().is_err());
        assert!(scanner.next().is_none());
    }

    // =========================================================================
    // Spans
    // =========================================================================

    #[test]
    fn test_span_line_column() {
        let tokens = Scanner::tokenize("<p>\n  <b>x</b></p>").unwrap();
        let b = &tokens[2];
        assert!(matches!(b.kind, TokenKind::StartTag { ref name, .. } if name == "b"));
        assert_eq!(b.span.line, 2);
        assert_eq!(b.span.column, 3);
        assert_eq!(b.span.start, 6);
    }
}
