//! Template printer.
//!
//! Walks a [`Root`] and emits markup. Bindings come out in their bracket
//! form (`bind-x` prints as `[x]`) with canonical expression source; a
//! binding that failed to parse keeps its original source. The printer adds
//! no whitespace of its own, so a template parsed with
//! `preserve_whitespace` prints back with its layout intact.

use ngtp_markup::{is_raw_text_element, is_void_element};
use ngtp_parser::ast::{
    AstWithSource, BindingType, BoundAttribute, BoundEvent, BoundText, Comment, Element,
    EventType, Root, Text,
};
use ngtp_parser::visitor::Visitor;

use crate::unparse;

/// Render a template tree back to markup.
pub fn print_template(root: &Root) -> String {
    let mut printer = TemplatePrinter::default();
    printer.visit_root(root);
    printer.out
}

#[derive(Default)]
struct TemplatePrinter {
    out: String,
    /// Inside `<script>`, `<style>` and friends text is written verbatim.
    raw_text: bool,
}

impl<'a> Visitor<'a> for TemplatePrinter {
    fn visit_element(&mut self, el: &'a Element) {
        self.out.push('<');
        self.out.push_str(&el.name);

        for attr in &el.attributes {
            self.attribute(&attr.name, &attr.value);
        }
        for reference in &el.references {
            self.attribute(&format!("#{}", reference.name), &reference.value);
        }
        for input in &el.inputs {
            let two_way = input.binding_type == BindingType::Property
                && el.outputs.iter().any(|output| {
                    output.event_type == EventType::TwoWay
                        && output.name.strip_suffix("Change") == Some(input.name.as_str())
                });
            let name = if two_way {
                format!("[({})]", input.name)
            } else {
                input_name(input)
            };
            self.binding(&name, &input.value);
        }
        for output in &el.outputs {
            if output.event_type != EventType::TwoWay {
                self.binding(&output_name(output), &output.handler);
            }
        }
        self.out.push('>');

        if is_void_element(&el.name) {
            return;
        }

        let outer = self.raw_text;
        self.raw_text = is_raw_text_element(&el.name);
        for child in &el.children {
            self.visit_node(child);
        }
        self.raw_text = outer;

        self.out.push_str("</");
        self.out.push_str(&el.name);
        self.out.push('>');
    }

    fn visit_text(&mut self, text: &'a Text) {
        if self.raw_text {
            self.out.push_str(&text.value);
        } else {
            self.out.push_str(&escape(&text.value, false));
        }
    }

    fn visit_comment(&mut self, comment: &'a Comment) {
        self.out.push_str("<!--");
        self.out.push_str(&comment.value);
        self.out.push_str("-->");
    }

    fn visit_bound_text(&mut self, text: &'a BoundText) {
        let source = expression_source(&text.value);
        self.out.push_str(&escape(&source, false));
    }
}

impl TemplatePrinter {
    fn attribute(&mut self, name: &str, value: &str) {
        self.out.push(' ');
        self.out.push_str(name);
        if !value.is_empty() {
            self.out.push_str("=\"");
            self.out.push_str(&escape(value, true));
            self.out.push('"');
        }
    }

    fn binding(&mut self, name: &str, value: &AstWithSource) {
        let source = expression_source(value);
        self.out.push(' ');
        self.out.push_str(name);
        self.out.push_str("=\"");
        self.out.push_str(&escape(&source, true));
        self.out.push('"');
    }
}

fn input_name(input: &BoundAttribute) -> String {
    let name = &input.name;
    match input.binding_type {
        BindingType::Property => format!("[{name}]"),
        BindingType::Attribute => format!("[attr.{name}]"),
        BindingType::Class => format!("[class.{name}]"),
        BindingType::Style => match &input.unit {
            Some(unit) => format!("[style.{name}.{unit}]"),
            None => format!("[style.{name}]"),
        },
        BindingType::Animation => format!("[@{name}]"),
    }
}

fn output_name(output: &BoundEvent) -> String {
    let mut event = match output.event_type {
        EventType::Animation => format!("@{}", output.name),
        _ => output.name.clone(),
    };
    if let Some(phase) = &output.phase {
        event = format!("{event}.{phase}");
    }
    match &output.target {
        Some(target) => format!("({target}:{event})"),
        None => format!("({event})"),
    }
}

fn expression_source(value: &AstWithSource) -> String {
    if value.is_unparsable() {
        value.source.clone()
    } else {
        unparse(&value.ast)
    }
}

/// Escape markup-significant characters. Text keeps `"` as is.
fn escape(s: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}
