use indexmap::IndexMap;

use crate::value::{Type, Value};

/// A decode schema: describes which attributes and blocks a body may
/// contain and how to assemble them into a single value.
#[derive(Debug, Clone, PartialEq)]
pub enum Spec {
    /// An object whose attributes are decoded from the child specs, in
    /// declaration order.
    Object(IndexMap<String, Spec>),
    Attr(AttrSpec),
    Block(BlockSpec),
    BlockList(BlockListSpec),
    BlockSet(BlockListSpec),
    BlockMap(BlockMapSpec),
    Literal(Value),
    /// The primary result, or the fallback when the primary is null.
    Default {
        primary: Box<Spec>,
        fallback: Box<Spec>,
    },
    /// Every attribute not claimed by another spec in the same body, as a
    /// map.
    Attrs { element_type: Type },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttrSpec {
    pub name: String,
    pub ty: Type,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockSpec {
    pub type_name: String,
    pub required: bool,
    pub nested: Box<Spec>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockListSpec {
    pub type_name: String,
    pub min_items: usize,
    /// Zero means unlimited.
    pub max_items: usize,
    pub nested: Box<Spec>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockMapSpec {
    pub type_name: String,
    /// One map level per label, outermost first.
    pub labels: Vec<String>,
    pub nested: Box<Spec>,
}

impl AttrSpec {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

impl Spec {
    pub fn object<I, K>(children: I) -> Self
    where
        I: IntoIterator<Item = (K, Spec)>,
        K: Into<String>,
    {
        Spec::Object(children.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// The type of every value this spec can produce.
    pub fn implied_type(&self) -> Type {
        match self {
            Spec::Object(children) => Type::Object(
                children
                    .iter()
                    .map(|(k, spec)| (k.clone(), spec.implied_type()))
                    .collect(),
            ),
            Spec::Attr(attr) => attr.ty.clone(),
            Spec::Block(block) => block.nested.implied_type(),
            Spec::BlockList(list) => Type::list(list.nested.implied_type()),
            Spec::BlockSet(set) => Type::set(set.nested.implied_type()),
            Spec::BlockMap(map) => map
                .labels
                .iter()
                .fold(map.nested.implied_type(), |inner, _| Type::map(inner)),
            Spec::Literal(value) => value.ty(),
            Spec::Default { primary, .. } => primary.implied_type(),
            Spec::Attrs { element_type } => Type::map(element_type.clone()),
        }
    }

    /// Names of the attributes this spec reads from the body it is applied
    /// to (nested blocks not included).
    pub fn attribute_names(&self) -> Vec<&str> {
        match self {
            Spec::Object(children) => children.values().flat_map(Spec::attribute_names).collect(),
            Spec::Attr(attr) => vec![attr.name.as_str()],
            Spec::Default { primary, fallback } => {
                let mut names = primary.attribute_names();
                names.extend(fallback.attribute_names());
                names
            }
            _ => Vec::new(),
        }
    }

    /// Types of the blocks this spec reads from the body it is applied to.
    pub fn block_types(&self) -> Vec<&str> {
        match self {
            Spec::Object(children) => children.values().flat_map(Spec::block_types).collect(),
            Spec::Block(block) => vec![block.type_name.as_str()],
            Spec::BlockList(list) | Spec::BlockSet(list) => vec![list.type_name.as_str()],
            Spec::BlockMap(map) => vec![map.type_name.as_str()],
            Spec::Default { primary, fallback } => {
                let mut types = primary.block_types();
                types.extend(fallback.block_types());
                types
            }
            _ => Vec::new(),
        }
    }

    /// Whether an `Attrs` spec claims the attributes no other spec reads.
    pub fn has_catch_all(&self) -> bool {
        match self {
            Spec::Attrs { .. } => true,
            Spec::Object(children) => children.values().any(Spec::has_catch_all),
            Spec::Default { primary, fallback } => {
                primary.has_catch_all() || fallback.has_catch_all()
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Spec {
        Spec::object([
            ("name", Spec::Attr(AttrSpec::new("name", Type::String))),
            (
                "rules",
                Spec::BlockMap(BlockMapSpec {
                    type_name: "rule".to_string(),
                    labels: vec!["kind".to_string()],
                    nested: Box::new(Spec::Attr(AttrSpec::new("port", Type::Number))),
                }),
            ),
            (
                "mode",
                Spec::Default {
                    primary: Box::new(Spec::Attr(AttrSpec::new("mode", Type::String))),
                    fallback: Box::new(Spec::Literal(Value::string("auto"))),
                },
            ),
        ])
    }

    #[test]
    fn test_implied_type() {
        assert_eq!(
            sample().implied_type(),
            Type::object([
                ("name", Type::String),
                ("rules", Type::map(Type::Number)),
                ("mode", Type::String),
            ])
        );
    }

    #[test]
    fn test_names_at_this_level() {
        let spec = sample();
        assert_eq!(spec.attribute_names(), vec!["name", "mode"]);
        assert_eq!(spec.block_types(), vec!["rule"]);
        assert!(!spec.has_catch_all());
    }
}
