//! Abstract Syntax Tree for templates.
//!
//! Contains both template-level nodes (elements, text, bindings) and
//! expression-level nodes (property reads, calls, binaries, literals).
//! Every binding owns its expression through an [`AstWithSource`], which
//! keeps the attribute or interpolation text it was parsed from.

use serde::Serialize;

use crate::ParseError;

// ---------------------------------------------------------------------------
// Template-level AST
// ---------------------------------------------------------------------------

/// A parsed template: the ordered list of top-level nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Root {
    pub nodes: Vec<Node>,
}

/// A node in the template tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Node {
    Element(Element),

    /// Literal text with no interpolation markers.
    Text(Text),

    /// `<!-- ... -->`
    Comment(Comment),

    /// Text containing `{{ expr }}` interpolations.
    BoundText(BoundText),
}

/// An element with its classified attributes and owned children.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<TextAttribute>,
    pub inputs: Vec<BoundAttribute>,
    pub outputs: Vec<BoundEvent>,
    pub references: Vec<Reference>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Text {
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundText {
    pub value: AstWithSource,
}

/// A plain `name="value"` attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextAttribute {
    pub name: String,
    pub value: String,
}

/// A template reference: `#name="value"` or `ref-name="value"`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reference {
    pub name: String,
    pub value: String,
}

/// What a property-family binding writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BindingType {
    /// `[prop]`
    Property,
    /// `[attr.name]`
    Attribute,
    /// `[class.name]`
    Class,
    /// `[style.name]`, `[style.name.unit]`
    Style,
    /// `[@trigger]`
    Animation,
}

/// An input binding: `[name]="expr"`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundAttribute {
    pub name: String,
    pub binding_type: BindingType,
    pub value: AstWithSource,
    /// Style unit from `[style.width.px]`.
    pub unit: Option<String>,
}

/// How an output binding was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventType {
    /// `(event)`
    Regular,
    /// `(@trigger.phase)`
    Animation,
    /// The change half of `[(name)]`
    TwoWay,
}

/// An output binding: `(name)="handler"`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundEvent {
    pub name: String,
    pub event_type: EventType,
    /// Global target from `(window:resize)`.
    pub target: Option<String>,
    /// Animation phase from `(@trigger.done)`.
    pub phase: Option<String>,
    pub handler: AstWithSource,
}

/// An expression paired with the source text it came from.
///
/// When an expression fails to parse under the placeholder policy, `ast`
/// is [`ExprKind::Unparsable`] and `errors` says why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AstWithSource {
    pub ast: Expression,
    pub source: String,
    pub errors: Vec<ParseError>,
}

impl AstWithSource {
    pub fn new(ast: Expression, source: impl Into<String>) -> Self {
        Self {
            ast,
            source: source.into(),
            errors: Vec::new(),
        }
    }

    /// A placeholder for an expression that could not be parsed.
    pub fn unparsable(source: impl Into<String>, error: ParseError) -> Self {
        let source = source.into();
        Self {
            ast: Expression::new(ExprKind::Unparsable, ExprSpan::new(0, source.len())),
            source,
            errors: vec![error],
        }
    }

    pub fn is_unparsable(&self) -> bool {
        !self.errors.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Expression-level AST
// ---------------------------------------------------------------------------

/// A position in expression text (byte offsets into the expression string,
/// not the template).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExprSpan {
    pub start: usize,
    pub end: usize,
}

impl ExprSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// A complete expression node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expression {
    pub kind: ExprKind,
    pub span: ExprSpan,
}

impl Expression {
    pub fn new(kind: ExprKind, span: ExprSpan) -> Self {
        Self { kind, span }
    }

    /// Direct sub-expressions in source order.
    pub fn children(&self) -> Vec<&Expression> {
        match &self.kind {
            ExprKind::LiteralPrimitive(_)
            | ExprKind::PropertyRead { .. }
            | ExprKind::Unparsable => Vec::new(),
            ExprKind::KeyedRead { receiver, key } => vec![&**receiver, &**key],
            ExprKind::PropertyWrite { value, .. } => vec![&**value],
            ExprKind::MethodCall { args, .. } => args.iter().collect(),
            ExprKind::Binary { left, right, .. } => vec![&**left, &**right],
            ExprKind::Conditional {
                condition,
                true_exp,
                false_exp,
            } => vec![&**condition, &**true_exp, &**false_exp],
            ExprKind::LiteralArray(items) => items.iter().collect(),
            ExprKind::LiteralMap { values, .. } => values.iter().collect(),
            ExprKind::Pipe { exp, args, .. } => std::iter::once(&**exp).chain(args).collect(),
            ExprKind::Interpolation { expressions, .. } => expressions.iter().collect(),
        }
    }

    pub fn children_mut(&mut self) -> Vec<&mut Expression> {
        match &mut self.kind {
            ExprKind::LiteralPrimitive(_)
            | ExprKind::PropertyRead { .. }
            | ExprKind::Unparsable => Vec::new(),
            ExprKind::KeyedRead { receiver, key } => vec![&mut **receiver, &mut **key],
            ExprKind::PropertyWrite { value, .. } => vec![&mut **value],
            ExprKind::MethodCall { args, .. } => args.iter_mut().collect(),
            ExprKind::Binary { left, right, .. } => vec![&mut **left, &mut **right],
            ExprKind::Conditional {
                condition,
                true_exp,
                false_exp,
            } => vec![&mut **condition, &mut **true_exp, &mut **false_exp],
            ExprKind::LiteralArray(items) => items.iter_mut().collect(),
            ExprKind::LiteralMap { values, .. } => values.iter_mut().collect(),
            ExprKind::Pipe { exp, args, .. } => std::iter::once(&mut **exp).chain(args).collect(),
            ExprKind::Interpolation { expressions, .. } => expressions.iter_mut().collect(),
        }
    }

    /// Move every span in this tree `delta` bytes to the right.
    pub fn shift(&mut self, delta: usize) {
        self.span.start += delta;
        self.span.end += delta;
        for child in self.children_mut() {
            child.shift(delta);
        }
    }
}

/// Expression variants.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum ExprKind {
    /// `42`, `'text'`, `true`, `null`, `undefined`
    LiteralPrimitive(LiteralValue),

    /// `user.name`. Dotted paths stay flat: `name` is the whole path.
    PropertyRead { name: String },

    /// `items[0]`, `map['key']`
    KeyedRead {
        receiver: Box<Expression>,
        key: Box<Expression>,
    },

    /// `user.name = $event`
    PropertyWrite {
        name: String,
        value: Box<Expression>,
    },

    /// `save()`, `user.rename(first, last)`
    MethodCall { name: String, args: Vec<Expression> },

    /// `a + b`, `count === 0`
    Binary {
        operation: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },

    /// `ok ? yes : no`
    Conditional {
        condition: Box<Expression>,
        true_exp: Box<Expression>,
        false_exp: Box<Expression>,
    },

    /// `[a, b]`
    LiteralArray(Vec<Expression>),

    /// `{'a': 1, b: 2}`
    LiteralMap {
        keys: Vec<String>,
        values: Vec<Expression>,
    },

    /// `value | name:arg1:arg2`
    Pipe {
        exp: Box<Expression>,
        name: String,
        args: Vec<Expression>,
    },

    /// `Hello {{name}}!`: `strings.len() == expressions.len() + 1`.
    Interpolation {
        strings: Vec<String>,
        expressions: Vec<Expression>,
    },

    /// Placeholder for source that failed to parse.
    Unparsable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value")]
pub enum LiteralValue {
    Null,
    Undefined,
    Boolean(bool),
    Number(f64),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
}

impl BinaryOp {
    pub fn from_symbol(op: &str) -> Option<Self> {
        Some(match op {
            "+" => Self::Add,
            "-" => Self::Sub,
            "*" => Self::Mul,
            "/" => Self::Div,
            "%" => Self::Mod,
            "==" => Self::Eq,
            "!=" => Self::NotEq,
            "===" => Self::StrictEq,
            "!==" => Self::StrictNotEq,
            "<" => Self::Lt,
            ">" => Self::Gt,
            "<=" => Self::LtEq,
            ">=" => Self::GtEq,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::StrictEq => "===",
            Self::StrictNotEq => "!==",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::LtEq => "<=",
            Self::GtEq => ">=",
        }
    }

    /// Binding strength; higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            Self::Mul | Self::Div | Self::Mod => 3,
            Self::Add | Self::Sub => 2,
            _ => 1,
        }
    }
}
