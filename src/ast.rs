//! # Syntax Tree
//!
//! Expressions, templates and configuration bodies as produced by the
//! [`crate::analyzer`]. Every node records the source range it was parsed
//! from so that evaluation diagnostics can point back at it.

use indexmap::IndexMap;
use strum::Display;

use crate::diagnostics::{Diagnostic, Diagnostics, SourceRange};
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub range: SourceRange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    Literal(Value),
    Variable(String),
    GetAttr {
        source: Box<Expression>,
        name: String,
        name_range: SourceRange,
    },
    Index {
        source: Box<Expression>,
        key: Box<Expression>,
    },
    Unary {
        op: UnaryOperator,
        operand: Box<Expression>,
    },
    Binary {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Conditional {
        condition: Box<Expression>,
        true_result: Box<Expression>,
        false_result: Box<Expression>,
    },
    FunctionCall {
        name: String,
        name_range: SourceRange,
        args: Vec<Expression>,
        expand_final: bool,
    },
    For(Box<ForExpression>),
    /// `source[*].each` or `source.*.each`; `each` is evaluated once per
    /// element with [`ExpressionKind::SplatItem`] bound to the element.
    Splat {
        source: Box<Expression>,
        each: Box<Expression>,
    },
    SplatItem,
    Template(Vec<TemplatePart>),
    Object(Vec<ObjectItem>),
    Tuple(Vec<Expression>),
    Parenthesized(Box<Expression>),
}

impl Expression {
    pub fn new(kind: ExpressionKind, range: SourceRange) -> Self {
        Self { kind, range }
    }

    /// A template consisting of nothing but one interpolation.
    pub fn unwrapped_template(&self) -> Option<&Expression> {
        match &self.kind {
            ExpressionKind::Template(parts) => match parts.as_slice() {
                [TemplatePart::Interpolation(inner)] => Some(inner),
                _ => None,
            },
            _ => None,
        }
    }

    /// The name of a bare identifier, as used for object keys and type
    /// keywords.
    pub fn as_keyword(&self) -> Option<&str> {
        match &self.kind {
            ExpressionKind::Variable(name) => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum UnaryOperator {
    #[strum(serialize = "!")]
    Not,
    #[strum(serialize = "-")]
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum BinaryOperator {
    #[strum(serialize = "||")]
    Or,
    #[strum(serialize = "&&")]
    And,
    #[strum(serialize = "==")]
    Equal,
    #[strum(serialize = "!=")]
    NotEqual,
    #[strum(serialize = "<")]
    Less,
    #[strum(serialize = "<=")]
    LessEqual,
    #[strum(serialize = ">")]
    Greater,
    #[strum(serialize = ">=")]
    GreaterEqual,
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Subtract,
    #[strum(serialize = "*")]
    Multiply,
    #[strum(serialize = "/")]
    Divide,
    #[strum(serialize = "%")]
    Modulo,
}

impl BinaryOperator {
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            Self::Add | Self::Subtract | Self::Multiply | Self::Divide | Self::Modulo
        )
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Less | Self::LessEqual | Self::Greater | Self::GreaterEqual
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, Self::And | Self::Or)
    }

    pub fn is_equality(self) -> bool {
        matches!(self, Self::Equal | Self::NotEqual)
    }
}

/// `[for k, v in coll : v if cond]` or `{for k, v in coll : k => v... if cond}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ForExpression {
    pub key_var: Option<String>,
    pub value_var: String,
    pub collection: Expression,
    /// Present for the object form.
    pub key_expr: Option<Expression>,
    pub value_expr: Expression,
    pub condition: Option<Expression>,
    /// `...` after the value: group values sharing a key.
    pub grouped: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectItem {
    pub key: Expression,
    pub value: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Literal {
        value: String,
        range: SourceRange,
    },
    Interpolation(Expression),
    If {
        condition: Expression,
        then_parts: Vec<TemplatePart>,
        else_parts: Vec<TemplatePart>,
        range: SourceRange,
    },
    For {
        key_var: Option<String>,
        value_var: String,
        collection: Expression,
        body: Vec<TemplatePart>,
        range: SourceRange,
    },
}

/// A configuration body: attributes and nested blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub attributes: IndexMap<String, Attribute>,
    pub blocks: Vec<Block>,
    pub range: SourceRange,
}

impl Body {
    /// Where to point diagnostics about something missing from this body.
    pub fn missing_item_range(&self) -> SourceRange {
        self.range.start_range()
    }

    pub fn blocks_of_type<'a>(&'a self, type_name: &'a str) -> impl Iterator<Item = &'a Block> + 'a {
        self.blocks.iter().filter(move |b| b.type_name == type_name)
    }

    /// The attributes of a body that may not contain blocks; each block
    /// present is reported.
    pub fn just_attributes(&self) -> (&IndexMap<String, Attribute>, Diagnostics) {
        let diagnostics = self
            .blocks
            .iter()
            .map(|block| {
                Diagnostic::error(
                    format!("Unexpected {:?} block", block.type_name),
                    "Blocks are not allowed here.",
                )
                .with_subject(block.type_range.clone())
            })
            .collect();
        (&self.attributes, diagnostics)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub expr: Expression,
    pub range: SourceRange,
    pub name_range: SourceRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub type_name: String,
    pub labels: Vec<String>,
    pub body: Body,
    pub type_range: SourceRange,
    pub label_ranges: Vec<SourceRange>,
    pub range: SourceRange,
}

impl Block {
    /// The header portion of the block, for diagnostics about the block as
    /// a whole.
    pub fn definition_range(&self) -> SourceRange {
        match self.label_ranges.last() {
            Some(last) => SourceRange::between(&self.type_range, last),
            None => self.type_range.clone(),
        }
    }
}
