//! Pre-order traversal over templates and expressions.
//!
//! Implement [`Visitor`] and override the `visit_*` methods for the nodes you
//! care about. Every default delegates to the matching `walk_*` function,
//! which visits the node's children; call it from an override to keep
//! descending.

use crate::ast::{
    AstWithSource, BoundAttribute, BoundEvent, BoundText, Comment, Element, ExprKind, Expression,
    Node, Root, Text,
};

pub trait Visitor<'a> {
    fn visit_root(&mut self, root: &'a Root) {
        walk_root(self, root);
    }

    fn visit_node(&mut self, node: &'a Node) {
        walk_node(self, node);
    }

    fn visit_element(&mut self, element: &'a Element) {
        walk_element(self, element);
    }

    fn visit_text(&mut self, _text: &'a Text) {}

    fn visit_comment(&mut self, _comment: &'a Comment) {}

    fn visit_bound_text(&mut self, text: &'a BoundText) {
        self.visit_binding(&text.value);
    }

    fn visit_bound_attribute(&mut self, input: &'a BoundAttribute) {
        self.visit_binding(&input.value);
    }

    fn visit_bound_event(&mut self, output: &'a BoundEvent) {
        self.visit_binding(&output.handler);
    }

    /// Every expression in a template is reached through here.
    fn visit_binding(&mut self, binding: &'a AstWithSource) {
        self.visit_expression(&binding.ast);
    }

    fn visit_expression(&mut self, expr: &'a Expression) {
        walk_expression(self, expr);
    }
}

pub fn walk_root<'a, V: Visitor<'a> + ?Sized>(visitor: &mut V, root: &'a Root) {
    for node in &root.nodes {
        visitor.visit_node(node);
    }
}

pub fn walk_node<'a, V: Visitor<'a> + ?Sized>(visitor: &mut V, node: &'a Node) {
    match node {
        Node::Element(element) => visitor.visit_element(element),
        Node::Text(text) => visitor.visit_text(text),
        Node::Comment(comment) => visitor.visit_comment(comment),
        Node::BoundText(text) => visitor.visit_bound_text(text),
    }
}

/// Inputs, then outputs, then children.
pub fn walk_element<'a, V: Visitor<'a> + ?Sized>(visitor: &mut V, element: &'a Element) {
    for input in &element.inputs {
        visitor.visit_bound_attribute(input);
    }
    for output in &element.outputs {
        visitor.visit_bound_event(output);
    }
    for child in &element.children {
        visitor.visit_node(child);
    }
}

pub fn walk_expression<'a, V: Visitor<'a> + ?Sized>(visitor: &mut V, expr: &'a Expression) {
    for child in expr.children() {
        visitor.visit_expression(child);
    }
}

/// Every property path read anywhere in the template, in visit order.
pub fn property_reads(root: &Root) -> Vec<&str> {
    struct Reads<'a>(Vec<&'a str>);

    impl<'a> Visitor<'a> for Reads<'a> {
        fn visit_expression(&mut self, expr: &'a Expression) {
            if let ExprKind::PropertyRead { name } = &expr.kind {
                self.0.push(name);
            }
            walk_expression(self, expr);
        }
    }

    let mut reads = Reads(Vec::new());
    reads.visit_root(root);
    reads.0
}

/// Bindings that were replaced by a placeholder.
pub fn unparsable_bindings(root: &Root) -> Vec<&AstWithSource> {
    struct Unparsable<'a>(Vec<&'a AstWithSource>);

    impl<'a> Visitor<'a> for Unparsable<'a> {
        fn visit_binding(&mut self, binding: &'a AstWithSource) {
            if binding.is_unparsable() {
                self.0.push(binding);
            }
        }
    }

    let mut found = Unparsable(Vec::new());
    found.visit_root(root);
    found.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TemplateParser;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Root {
        TemplateParser::parse(source).unwrap()
    }

    #[test]
    fn test_property_reads_in_order() {
        let root = parse(
            r#"<p [title]="user.name" (click)="select(item, $event)">{{ a + b[i] }}</p>"#,
        );
        assert_eq!(
            property_reads(&root),
            vec!["user.name", "item", "$event", "a", "b", "i"]
        );
    }

    #[test]
    fn test_property_reads_inside_pipes_and_maps() {
        let root = parse(r#"<x [v]="{k: (total | currency:code)}"></x>"#);
        assert_eq!(property_reads(&root), vec!["total", "code"]);
    }

    #[test]
    fn test_unparsable_bindings() {
        let root = parse(r#"<div [a]="ok"><span [b]="1 +">{{ ) }}</span></div>"#);
        let sources: Vec<&str> = unparsable_bindings(&root)
            .iter()
            .map(|b| b.source.as_str())
            .collect();
        assert_eq!(sources, vec!["1 +", "{{ ) }}"]);
    }

    #[test]
    fn test_override_stops_descent() {
        #[derive(Default)]
        struct Elements(Vec<String>);

        impl<'a> Visitor<'a> for Elements {
            fn visit_element(&mut self, element: &'a Element) {
                self.0.push(element.name.clone());
                if element.name != "skip" {
                    walk_element(self, element);
                }
            }
        }

        let root = parse("<a><skip><b></b></skip><c></c></a>");
        let mut visitor = Elements::default();
        visitor.visit_root(&root);
        assert_eq!(visitor.0, vec!["a", "skip", "c"]);
    }

    #[test]
    fn test_counts_text_and_comments() {
        #[derive(Default)]
        struct Count {
            text: usize,
            comments: usize,
        }

        impl<'a> Visitor<'a> for Count {
            fn visit_text(&mut self, _text: &'a Text) {
                self.text += 1;
            }

            fn visit_comment(&mut self, _comment: &'a Comment) {
                self.comments += 1;
            }
        }

        let root = parse("<p>one<!-- two --><b>three</b></p>");
        let mut count = Count::default();
        count.visit_root(&root);
        assert_eq!((count.text, count.comments), (2, 1));
    }
}
