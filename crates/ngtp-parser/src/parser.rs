//! Template walker.
//!
//! Pulls markup tokens one at a time and assembles a [`Root`]. Attributes are
//! classified by their syntax and every binding gets a parsed expression:
//!
//! | syntax | canonical form | result |
//! |---|---|---|
//! | `#name`, `ref-name` | | [`Reference`] |
//! | `[prop]`, `bind-prop` | `[class.x]`, `[style.x.unit]`, `[attr.x]`, `[@x]` | [`BoundAttribute`] |
//! | `(event)`, `on-event` | `(target:event)`, `(@trigger.phase)` | [`BoundEvent`] |
//! | `[(model)]`, `bindon-model` | | [`BoundAttribute`] + `modelChange` [`BoundEvent`] |
//! | anything else | | [`TextAttribute`] |
//!
//! Nesting is tracked with an explicit stack of open elements, so deep
//! markup cannot exhaust the call stack. An end tag closes the nearest open
//! element with that name (and anything opened inside it); end tags with no
//! open counterpart are ignored.

use log::{debug, warn};
use ngtp_markup::{is_void_element, Attribute, MarkupError, Scanner, Token, TokenKind};

use crate::ast::{
    AstWithSource, BindingType, BoundAttribute, BoundEvent, BoundText, Comment, Element,
    EventType, ExprKind, Expression, Node, Reference, Root, Text, TextAttribute,
};
use crate::expr_lexer::is_identifier;
use crate::expr_parser::ExprParser;
use crate::interpolation;
use crate::{ErrorPolicy, ParseError, ParseOptions, TemplateError};

/// Binding label used in errors for text interpolations.
const TEXT_BINDING: &str = "#text";

/// Template walker over a stream of markup tokens.
pub struct TemplateParser<I> {
    tokens: I,
    options: ParseOptions,
    /// Open elements, outermost first.
    stack: Vec<Element>,
    nodes: Vec<Node>,
}

impl TemplateParser<Scanner> {
    /// Parse template source with default options.
    pub fn parse(source: &str) -> Result<Root, TemplateError> {
        Self::parse_with_options(source, ParseOptions::default())
    }

    pub fn parse_with_options(source: &str, options: ParseOptions) -> Result<Root, TemplateError> {
        TemplateParser::from_tokens(Scanner::new(source), options).parse_root()
    }
}

impl<I> TemplateParser<I>
where
    I: Iterator<Item = Result<Token, MarkupError>>,
{
    /// Walk an already tokenized template.
    pub fn from_tokens(tokens: I, options: ParseOptions) -> Self {
        Self {
            tokens,
            options,
            stack: Vec::new(),
            nodes: Vec::new(),
        }
    }

    /// Consume the token stream and build the tree.
    pub fn parse_root(mut self) -> Result<Root, TemplateError> {
        while let Some(token) = self.tokens.next() {
            match token?.kind {
                TokenKind::StartTag {
                    name,
                    attributes,
                    self_closing,
                } => {
                    let element = self.element(name, &attributes)?;
                    if self_closing || is_void_element(&element.name) {
                        self.append(Node::Element(element));
                    } else {
                        debug!("open <{}>", element.name);
                        self.stack.push(element);
                    }
                }
                TokenKind::EndTag { name } => self.close(&name),
                TokenKind::Text(value) => {
                    if let Some(node) = self.text(value)? {
                        self.append(node);
                    }
                }
                TokenKind::Comment(value) => self.append(Node::Comment(Comment { value })),
                TokenKind::Doctype(_) => {}
            }
        }

        while let Some(element) = self.stack.pop() {
            warn!("<{}> is not closed before end of input", element.name);
            self.append(Node::Element(element));
        }

        Ok(Root { nodes: self.nodes })
    }

    // =========================================================================
    // Tree assembly
    // =========================================================================

    fn append(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.nodes.push(node),
        }
    }

    fn close(&mut self, name: &str) {
        let Some(depth) = self
            .stack
            .iter()
            .rposition(|open| open.name.eq_ignore_ascii_case(name))
        else {
            warn!("Ignoring end tag </{name}> with no open element");
            return;
        };

        while self.stack.len() > depth {
            let Some(element) = self.stack.pop() else {
                break;
            };
            if self.stack.len() > depth {
                warn!("<{}> implicitly closed by </{name}>", element.name);
            } else {
                debug!("close <{}>", element.name);
            }
            self.append(Node::Element(element));
        }
    }

    fn text(&self, value: String) -> Result<Option<Node>, TemplateError> {
        if !self.in_script() && interpolation::has_interpolation(&value) {
            let bound = match interpolation::parse_interpolation(&value) {
                Ok(ast) => AstWithSource::new(ast, value),
                Err(error) => self.recover(TEXT_BINDING, &value, error)?,
            };
            return Ok(Some(Node::BoundText(BoundText { value: bound })));
        }

        if !self.options.preserve_whitespace && value.chars().all(|c| c.is_ascii_whitespace()) {
            return Ok(None);
        }
        Ok(Some(Node::Text(Text { value })))
    }

    /// Script and style bodies never contain bindings.
    fn in_script(&self) -> bool {
        self.stack.last().is_some_and(|open| {
            open.name.eq_ignore_ascii_case("script") || open.name.eq_ignore_ascii_case("style")
        })
    }

    // =========================================================================
    // Attribute classification
    // =========================================================================

    fn element(&self, name: String, attributes: &[Attribute]) -> Result<Element, TemplateError> {
        let mut element = Element::new(name);
        for attr in attributes {
            self.attribute(&mut element, attr)?;
        }
        Ok(element)
    }

    fn attribute(&self, element: &mut Element, attr: &Attribute) -> Result<(), TemplateError> {
        let name = attr.name.as_str();

        if let Some(model) = unwrap_name(name, "[(", ")]").or_else(|| prefixed(name, "bindon-")) {
            return self.two_way(element, attr, model);
        }
        if let Some(property) = unwrap_name(name, "[", "]").or_else(|| prefixed(name, "bind-")) {
            element.inputs.push(self.bound_attribute(attr, property)?);
            return Ok(());
        }
        if let Some(event) = unwrap_name(name, "(", ")").or_else(|| prefixed(name, "on-")) {
            element.outputs.push(self.bound_event(attr, event)?);
            return Ok(());
        }
        if let Some(reference) = prefixed(name, "#").or_else(|| prefixed(name, "ref-")) {
            if is_identifier(reference) {
                element.references.push(Reference {
                    name: reference.to_string(),
                    value: attr.value.clone(),
                });
                return Ok(());
            }
            self.reject(name, format!("Reference name [{reference}] is not an identifier"))?;
        }

        element.attributes.push(TextAttribute {
            name: attr.name.clone(),
            value: attr.value.clone(),
        });
        Ok(())
    }

    /// `[prop]`, `[class.x]`, `[style.x.unit]`, `[attr.x]`, `[@trigger]`
    fn bound_attribute(&self, attr: &Attribute, property: &str) -> Result<BoundAttribute, TemplateError> {
        let mut unit = None;
        let (binding_type, name) = if let Some(trigger) = property.strip_prefix('@') {
            (BindingType::Animation, trigger)
        } else if let Some(class) = property.strip_prefix("class.") {
            (BindingType::Class, class)
        } else if let Some(attribute) = property.strip_prefix("attr.") {
            (BindingType::Attribute, attribute)
        } else if let Some(style) = property.strip_prefix("style.") {
            match style.split_once('.') {
                Some((style, suffix)) => {
                    unit = Some(suffix.to_string());
                    (BindingType::Style, style)
                }
                None => (BindingType::Style, style),
            }
        } else {
            (BindingType::Property, property)
        };

        Ok(BoundAttribute {
            name: name.to_string(),
            binding_type,
            value: self.expression(&attr.name, &attr.value, ExprParser::parse)?,
            unit,
        })
    }

    /// `(event)`, `(target:event)`, `(@trigger.phase)`
    fn bound_event(&self, attr: &Attribute, event: &str) -> Result<BoundEvent, TemplateError> {
        let (target, event) = match event.split_once(':') {
            Some((target, event)) => (Some(target.to_string()), event),
            None => (None, event),
        };

        let (event_type, name, phase) = match event.strip_prefix('@') {
            Some(animation) => match animation.split_once('.') {
                Some((trigger, phase)) => (EventType::Animation, trigger, Some(phase.to_string())),
                None => (EventType::Animation, animation, None),
            },
            None => (EventType::Regular, event, None),
        };

        Ok(BoundEvent {
            name: name.to_string(),
            event_type,
            target,
            phase,
            handler: self.expression(&attr.name, &attr.value, ExprParser::parse_action)?,
        })
    }

    /// `[(model)]="path"` becomes a property binding of `model` plus a
    /// `modelChange` event whose handler writes `$event` back to `path`.
    fn two_way(&self, element: &mut Element, attr: &Attribute, model: &str) -> Result<(), TemplateError> {
        let value = self.expression(&attr.name, &attr.value, ExprParser::parse)?;

        let handler = match &value.ast.kind {
            ExprKind::PropertyRead { name } => {
                let source = format!("{name}=$event");
                self.expression(&attr.name, &source, ExprParser::parse_action)?
            }
            _ if value.is_unparsable() => value.clone(),
            _ => {
                let error = ParseError {
                    message: "Two-way bindings must target a property path".into(),
                    offset: 0,
                    input: attr.value.clone(),
                };
                self.recover(&attr.name, &attr.value, error)?
            }
        };

        element.inputs.push(BoundAttribute {
            name: model.to_string(),
            binding_type: BindingType::Property,
            value,
            unit: None,
        });
        element.outputs.push(BoundEvent {
            name: format!("{model}Change"),
            event_type: EventType::TwoWay,
            target: None,
            phase: None,
            handler,
        });
        Ok(())
    }

    // =========================================================================
    // Expressions and error policy
    // =========================================================================

    fn expression(
        &self,
        binding: &str,
        source: &str,
        parse: fn(&str) -> Result<Expression, ParseError>,
    ) -> Result<AstWithSource, TemplateError> {
        match parse(source) {
            Ok(ast) => {
                debug!("parsed {binding}=\"{source}\"");
                Ok(AstWithSource::new(ast, source))
            }
            Err(error) => self.recover(binding, source, error),
        }
    }

    fn recover(&self, binding: &str, source: &str, error: ParseError) -> Result<AstWithSource, TemplateError> {
        match self.options.error_policy {
            ErrorPolicy::FailFast => Err(TemplateError::Expression {
                attribute: binding.to_string(),
                error,
            }),
            ErrorPolicy::Placeholder => {
                warn!("Unparsable binding {binding}: {error}");
                Ok(AstWithSource::unparsable(source, error))
            }
        }
    }

    /// Report a malformed attribute that has no expression to placeholder.
    fn reject(&self, attribute: &str, message: String) -> Result<(), TemplateError> {
        let error = ParseError {
            message,
            offset: 0,
            input: attribute.to_string(),
        };
        match self.options.error_policy {
            ErrorPolicy::FailFast => Err(TemplateError::Expression {
                attribute: attribute.to_string(),
                error,
            }),
            ErrorPolicy::Placeholder => {
                warn!("Keeping {attribute} as a plain attribute: {error}");
                Ok(())
            }
        }
    }
}

/// `[name]` → `name`; `None` unless both delimiters are present around a
/// non-empty name.
fn unwrap_name<'a>(name: &'a str, open: &str, close: &str) -> Option<&'a str> {
    name.strip_prefix(open)
        .and_then(|rest| rest.strip_suffix(close))
        .filter(|inner| !inner.is_empty())
}

fn prefixed<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    name.strip_prefix(prefix).filter(|rest| !rest.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ExprSpan, LiteralValue};
    use ngtp_markup::Span;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Root {
        TemplateParser::parse(source).unwrap()
    }

    fn parse_strict(source: &str) -> Result<Root, TemplateError> {
        TemplateParser::parse_with_options(
            source,
            ParseOptions {
                error_policy: ErrorPolicy::FailFast,
                ..ParseOptions::default()
            },
        )
    }

    fn first_element(root: &Root) -> &Element {
        match &root.nodes[0] {
            Node::Element(el) => el,
            other => panic!("Expected Element, got {other:?}"),
        }
    }

    fn element_names(nodes: &[Node]) -> Vec<&str> {
        nodes
            .iter()
            .filter_map(|node| match node {
                Node::Element(el) => Some(el.name.as_str()),
                _ => None,
            })
            .collect()
    }

    fn read(name: &str) -> ExprKind {
        ExprKind::PropertyRead { name: name.into() }
    }

    // =========================================================================
    // Binding classification
    // =========================================================================

    #[test]
    fn test_classifies_all_binding_kinds() {
        let root = parse(
            r#"<div #r1 [class.active]="isOn" (click)="onClick($event)" [(val)]="model"></div>"#,
        );
        assert_eq!(root.nodes.len(), 1);
        let el = first_element(&root);
        assert_eq!(el.name, "div");

        assert_eq!(el.references.len(), 1);
        assert_eq!(el.references[0].name, "r1");

        assert_eq!(el.inputs.len(), 2);
        assert_eq!(el.inputs[0].binding_type, BindingType::Class);
        assert_eq!(el.inputs[0].name, "active");
        assert_eq!(el.inputs[0].value.ast.kind, read("isOn"));
        assert_eq!(el.inputs[1].binding_type, BindingType::Property);
        assert_eq!(el.inputs[1].name, "val");
        assert_eq!(el.inputs[1].value.ast.kind, read("model"));

        assert_eq!(el.outputs.len(), 2);
        assert_eq!(el.outputs[0].name, "click");
        assert_eq!(el.outputs[0].event_type, EventType::Regular);
        let ExprKind::MethodCall { name, args } = &el.outputs[0].handler.ast.kind else {
            panic!("expected method call");
        };
        assert_eq!(name, "onClick");
        assert_eq!(args.len(), 1);
        assert_eq!(args[0].kind, read("$event"));

        assert_eq!(el.outputs[1].name, "valChange");
        assert_eq!(el.outputs[1].event_type, EventType::TwoWay);
        assert_eq!(el.outputs[1].handler.source, "model=$event");
        let ExprKind::PropertyWrite { name, value } = &el.outputs[1].handler.ast.kind else {
            panic!("expected property write");
        };
        assert_eq!(name, "model");
        assert_eq!(value.kind, read("$event"));

        assert!(el.attributes.is_empty());
    }

    #[test]
    fn test_text_attribute_keeps_name_and_value() {
        let root = parse(r#"<a href="/home" disabled></a>"#);
        let el = first_element(&root);
        assert_eq!(
            el.attributes,
            vec![
                TextAttribute {
                    name: "href".into(),
                    value: "/home".into()
                },
                TextAttribute {
                    name: "disabled".into(),
                    value: String::new()
                },
            ]
        );
    }

    #[test]
    fn test_reference_value() {
        let root = parse(r#"<form #f="ngForm" ref-other></form>"#);
        let el = first_element(&root);
        assert_eq!(
            el.references,
            vec![
                Reference {
                    name: "f".into(),
                    value: "ngForm".into()
                },
                Reference {
                    name: "other".into(),
                    value: String::new()
                },
            ]
        );
    }

    #[test]
    fn test_invalid_reference_name() {
        let root = parse(r#"<div #1bad></div>"#);
        let el = first_element(&root);
        assert!(el.references.is_empty());
        assert_eq!(el.attributes[0].name, "#1bad");

        let err = parse_strict(r#"<div #1bad></div>"#).unwrap_err();
        assert!(matches!(err, TemplateError::Expression { ref attribute, .. } if attribute == "#1bad"));
    }

    #[test]
    fn test_property_binding_types() {
        let root = parse(
            r#"<p [title]="t" [attr.role]="r" [style.width.px]="w" [style.color]="c" [@fade]="state"></p>"#,
        );
        let el = first_element(&root);
        let summary: Vec<(BindingType, &str, Option<&str>)> = el
            .inputs
            .iter()
            .map(|i| (i.binding_type, i.name.as_str(), i.unit.as_deref()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (BindingType::Property, "title", None),
                (BindingType::Attribute, "role", None),
                (BindingType::Style, "width", Some("px")),
                (BindingType::Style, "color", None),
                (BindingType::Animation, "fade", None),
            ]
        );
    }

    #[test]
    fn test_property_value_is_grammar_parsed() {
        let root = parse(r#"<p [hidden]="count > 0 ? false : true"></p>"#);
        let el = first_element(&root);
        assert!(matches!(el.inputs[0].value.ast.kind, ExprKind::Conditional { .. }));
        assert_eq!(el.inputs[0].value.source, "count > 0 ? false : true");
    }

    #[test]
    fn test_canonical_prefixes() {
        let root = parse(r#"<input bind-value="v" on-change="save()" bindon-ngModel="user.name">"#);
        let el = first_element(&root);
        let inputs: Vec<&str> = el.inputs.iter().map(|i| i.name.as_str()).collect();
        let outputs: Vec<&str> = el.outputs.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(inputs, vec!["value", "ngModel"]);
        assert_eq!(outputs, vec!["change", "ngModelChange"]);
        assert_eq!(el.outputs[1].handler.source, "user.name=$event");
    }

    #[test]
    fn test_event_target_and_animation_phase() {
        let root = parse(r#"<div (window:resize)="onResize()" (@fade.done)="finished()" (keydown.enter)="go()"></div>"#);
        let el = first_element(&root);

        assert_eq!(el.outputs[0].name, "resize");
        assert_eq!(el.outputs[0].target.as_deref(), Some("window"));

        assert_eq!(el.outputs[1].name, "fade");
        assert_eq!(el.outputs[1].event_type, EventType::Animation);
        assert_eq!(el.outputs[1].phase.as_deref(), Some("done"));

        assert_eq!(el.outputs[2].name, "keydown.enter");
        assert_eq!(el.outputs[2].target, None);
    }

    #[test]
    fn test_event_handler_assignment() {
        let root = parse(r#"<button (click)="count = count + 1"></button>"#);
        let el = first_element(&root);
        let ExprKind::PropertyWrite { name, .. } = &el.outputs[0].handler.ast.kind else {
            panic!("expected property write");
        };
        assert_eq!(name, "count");
    }

    #[test]
    fn test_unbalanced_brackets_are_text_attributes() {
        let root = parse(r#"<div [open="x" (close="y" []="z"></div>"#);
        let el = first_element(&root);
        assert!(el.inputs.is_empty());
        assert!(el.outputs.is_empty());
        assert_eq!(el.attributes.len(), 3);
    }

    // =========================================================================
    // Text and interpolation
    // =========================================================================

    #[test]
    fn test_interpolation() {
        let root = parse("Hello {{name}}!");
        let Node::BoundText(text) = &root.nodes[0] else {
            panic!("expected bound text, got {:?}", root.nodes[0]);
        };
        assert_eq!(text.value.source, "Hello {{name}}!");
        let ExprKind::Interpolation {
            strings,
            expressions,
        } = &text.value.ast.kind
        else {
            panic!("expected interpolation");
        };
        assert_eq!(strings, &vec!["Hello ".to_string(), "!".to_string()]);
        assert_eq!(expressions.len(), 1);
        assert_eq!(expressions[0].kind, read("name"));
    }

    #[test]
    fn test_plain_text() {
        let root = parse("<p>just text</p>");
        let el = first_element(&root);
        assert_eq!(
            el.children,
            vec![Node::Text(Text {
                value: "just text".into()
            })]
        );
    }

    #[test]
    fn test_unterminated_interpolation_placeholder() {
        let root = parse("<p>{{</p>");
        let el = first_element(&root);
        let Node::BoundText(text) = &el.children[0] else {
            panic!("expected bound text");
        };
        assert!(text.value.is_unparsable());
        assert_eq!(text.value.ast.kind, ExprKind::Unparsable);
        assert_eq!(text.value.ast.span, ExprSpan::new(0, 2));
        assert_eq!(text.value.source, "{{");
        assert!(text.value.errors[0].message.starts_with("Unterminated interpolation"));
    }

    #[test]
    fn test_unterminated_interpolation_fail_fast() {
        let err = parse_strict("{{").unwrap_err();
        let TemplateError::Expression { attribute, error } = err else {
            panic!("expected expression error");
        };
        assert_eq!(attribute, "#text");
        assert_eq!(error.offset, 0);
    }

    #[test]
    fn test_script_body_is_not_interpolated() {
        let root = parse("<script>var a = '{{';</script>");
        let el = first_element(&root);
        assert!(matches!(el.children[0], Node::Text(_)));
    }

    #[test]
    fn test_whitespace_text_dropped_by_default() {
        let root = parse("<ul>\n  <li>a</li>\n</ul>");
        let el = first_element(&root);
        assert_eq!(element_names(&el.children), vec!["li"]);
        assert_eq!(el.children.len(), 1);
    }

    #[test]
    fn test_whitespace_text_preserved_on_request() {
        let root = TemplateParser::parse_with_options(
            "<ul>\n  <li>a</li>\n</ul>",
            ParseOptions {
                preserve_whitespace: true,
                ..ParseOptions::default()
            },
        )
        .unwrap();
        let el = first_element(&root);
        assert_eq!(el.children.len(), 3);
    }

    #[test]
    fn test_comments_and_doctype() {
        let root = parse("<!DOCTYPE html><!-- note --><p></p>");
        assert_eq!(root.nodes.len(), 2);
        assert_eq!(
            root.nodes[0],
            Node::Comment(Comment {
                value: " note ".into()
            })
        );
    }

    // =========================================================================
    // Nesting
    // =========================================================================

    #[test]
    fn test_nested_children() {
        let root = parse("<div><span>a</span><b>c</b></div><p></p>");
        assert_eq!(element_names(&root.nodes), vec!["div", "p"]);
        assert_eq!(element_names(&first_element(&root).children), vec!["span", "b"]);
    }

    #[test]
    fn test_void_elements_have_no_children() {
        let root = parse(r#"<div><input [value]="x"><span></span><br></div>"#);
        let el = first_element(&root);
        assert_eq!(element_names(&el.children), vec!["input", "span", "br"]);
        let Node::Element(input) = &el.children[0] else {
            panic!("expected input");
        };
        assert!(input.children.is_empty());
        assert_eq!(input.inputs.len(), 1);
    }

    #[test]
    fn test_self_closing() {
        let root = parse("<my-cmp /><p></p>");
        assert_eq!(element_names(&root.nodes), vec!["my-cmp", "p"]);
    }

    #[test]
    fn test_implicit_close() {
        let root = parse("<div><p>one</div><span></span>");
        assert_eq!(element_names(&root.nodes), vec!["div", "span"]);
        let div = first_element(&root);
        assert_eq!(element_names(&div.children), vec!["p"]);
    }

    #[test]
    fn test_stray_end_tag_ignored() {
        let root = parse("<div></span>text</div>");
        let div = first_element(&root);
        assert_eq!(
            div.children,
            vec![Node::Text(Text {
                value: "text".into()
            })]
        );
    }

    #[test]
    fn test_eof_closes_open_elements() {
        let root = parse("<div><p>unclosed");
        assert_eq!(root.nodes.len(), 1);
        let div = first_element(&root);
        let Node::Element(p) = &div.children[0] else {
            panic!("expected p");
        };
        assert_eq!(p.children.len(), 1);
    }

    #[test]
    fn test_deep_nesting() {
        let source = format!("{}{}", "<i>".repeat(500), "</i>".repeat(500));
        let root = parse(&source);
        assert_eq!(root.nodes.len(), 1);
    }

    // =========================================================================
    // Error policy
    // =========================================================================

    #[test]
    fn test_bad_expression_placeholder() {
        let root = parse(r#"<p [title]="a +" (click)="go("></p>"#);
        let el = first_element(&root);
        assert!(el.inputs[0].value.is_unparsable());
        assert_eq!(el.inputs[0].value.source, "a +");
        assert!(el.outputs[0].handler.is_unparsable());
    }

    #[test]
    fn test_bad_expression_fail_fast() {
        let err = parse_strict(r#"<p [title]="a +"></p>"#).unwrap_err();
        assert!(err.to_string().starts_with("Invalid binding `[title]`"));
        let TemplateError::Expression { attribute, error } = err else {
            panic!("expected expression error");
        };
        assert_eq!(attribute, "[title]");
        assert_eq!(error.input, "a +");
    }

    #[test]
    fn test_two_way_requires_path() {
        let root = parse(r#"<input [(value)]="a + b">"#);
        let el = first_element(&root);
        assert_eq!(el.inputs.len(), 1);
        assert_eq!(el.outputs.len(), 1);
        assert!(!el.inputs[0].value.is_unparsable());
        assert!(el.outputs[0].handler.is_unparsable());

        assert!(parse_strict(r#"<input [(value)]="a + b">"#).is_err());
    }

    #[test]
    fn test_two_way_unparsable_model() {
        let root = parse(r#"<input [(value)]="a +">"#);
        let el = first_element(&root);
        assert!(el.inputs[0].value.is_unparsable());
        assert!(el.outputs[0].handler.is_unparsable());
        assert_eq!(el.outputs[0].name, "valueChange");
    }

    #[test]
    fn test_markup_error_aborts() {
        let err = TemplateParser::parse("<div <").unwrap_err();
        assert!(matches!(err, TemplateError::Markup(_)));
    }

    // =========================================================================
    // Token sources
    // =========================================================================

    #[test]
    fn test_from_custom_token_stream() {
        let span = Span::new(0, 0, 1, 1);
        let tokens = vec![
            Ok(Token::new(
                TokenKind::StartTag {
                    name: "b".into(),
                    attributes: vec![Attribute::new("[title]", "'hi'", span)],
                    self_closing: false,
                },
                span,
            )),
            Ok(Token::new(TokenKind::Text("{{ 1 }}".into()), span)),
            Ok(Token::new(TokenKind::EndTag { name: "b".into() }, span)),
        ];

        let root = TemplateParser::from_tokens(tokens.into_iter(), ParseOptions::default())
            .parse_root()
            .unwrap();
        let el = first_element(&root);
        assert_eq!(
            el.inputs[0].value.ast.kind,
            ExprKind::LiteralPrimitive(LiteralValue::String("hi".into()))
        );
        assert!(matches!(el.children[0], Node::BoundText(_)));
    }
}
