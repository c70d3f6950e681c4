//! # Values
//!
//! The dynamic value model shared by the evaluator, the decoder and the
//! provider functions.
//!
//! ## Known, Null and Unknown
//!
//! Every value has a [`Type`]. Beyond ordinary known values there are two
//! special states:
//!
//! * **Null** (`Value::Null(ty)`): the absence of a value, still typed.
//! * **Unknown** (`Value::Unknown(ty, refinement)`): a placeholder for a
//!   value that will only be determined later. Unknowns propagate through
//!   evaluation and may carry a [`Refinement`] describing what is already
//!   known about them.
//!
//! A known collection may contain unknown elements; such a value is known
//! but not *wholly* known.
//!
//! ## Numbers
//!
//! Numbers are arbitrary-precision decimals ([`Number`]) so that literals
//! such as `0.1` or a 40-digit integer are represented exactly.

pub mod convert;
pub mod json;
pub mod number;
pub mod refinement;
pub mod types;
pub mod unify;

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;

pub use number::Number;
pub use refinement::{Refinement, RefinementBuilder};
pub use types::Type;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null(Type),
    Bool(bool),
    Number(Number),
    String(String),
    List(Type, Vec<Value>),
    Set(Type, Vec<Value>),
    Map(Type, BTreeMap<String, Value>),
    Tuple(Vec<Value>),
    Object(IndexMap<String, Value>),
    Unknown(Type, Refinement),
}

impl Value {
    pub fn null(ty: Type) -> Self {
        Value::Null(ty)
    }

    pub fn bool(b: bool) -> Self {
        Value::Bool(b)
    }

    pub fn number(n: impl Into<Number>) -> Self {
        Value::Number(n.into())
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn list(element_type: Type, items: Vec<Value>) -> Self {
        Value::List(element_type, items)
    }

    /// Builds a set, removing duplicates and putting elements in canonical
    /// order.
    pub fn set(element_type: Type, items: Vec<Value>) -> Self {
        let mut unique: Vec<Value> = Vec::with_capacity(items.len());
        for item in items {
            let duplicate = item.is_wholly_known()
                && unique
                    .iter()
                    .any(|existing| existing.raw_equal(&item) == Some(true));
            if !duplicate {
                unique.push(item);
            }
        }
        unique.sort_by(canonical_cmp);
        Value::Set(element_type, unique)
    }

    pub fn map<I, K>(element_type: Type, items: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Value::Map(
            element_type,
            items.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        )
    }

    pub fn tuple(items: Vec<Value>) -> Self {
        Value::Tuple(items)
    }

    pub fn object<I, K>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Value::Object(
            attributes
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        )
    }

    pub fn empty_object() -> Self {
        Value::Object(IndexMap::new())
    }

    pub fn unknown(ty: Type) -> Self {
        Value::Unknown(ty, Refinement::default())
    }

    /// An unknown value of unknown type.
    pub fn dynamic() -> Self {
        Value::unknown(Type::Dynamic)
    }

    pub fn ty(&self) -> Type {
        match self {
            Value::Null(ty) | Value::Unknown(ty, _) => ty.clone(),
            Value::Bool(_) => Type::Bool,
            Value::Number(_) => Type::Number,
            Value::String(_) => Type::String,
            Value::List(e, _) => Type::list(e.clone()),
            Value::Set(e, _) => Type::set(e.clone()),
            Value::Map(e, _) => Type::map(e.clone()),
            Value::Tuple(items) => Type::Tuple(items.iter().map(Value::ty).collect()),
            Value::Object(attrs) => {
                Type::Object(attrs.iter().map(|(k, v)| (k.clone(), v.ty())).collect())
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null(_))
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Value::Unknown(..))
    }

    /// Known, and every nested element known too.
    pub fn is_wholly_known(&self) -> bool {
        match self {
            Value::Unknown(..) => false,
            Value::List(_, items) | Value::Set(_, items) | Value::Tuple(items) => {
                items.iter().all(Value::is_wholly_known)
            }
            Value::Map(_, items) => items.values().all(Value::is_wholly_known),
            Value::Object(attrs) => attrs.values().all(Value::is_wholly_known),
            _ => true,
        }
    }

    /// Unknown and refined to exclude null.
    pub fn is_definitely_not_null(&self) -> bool {
        match self {
            Value::Null(_) => false,
            Value::Unknown(_, r) => r.not_null,
            _ => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<&Number> {
        match self {
            Value::Number(n) => Some(n),
            _ => None,
        }
    }

    /// Number of elements of a known collection, tuple or object.
    pub fn length(&self) -> Option<usize> {
        match self {
            Value::List(_, items) | Value::Set(_, items) | Value::Tuple(items) => Some(items.len()),
            Value::Map(_, items) => Some(items.len()),
            Value::Object(attrs) => Some(attrs.len()),
            _ => None,
        }
    }

    /// Key/value pairs of a known iterable value: list and tuple keys are
    /// indices, set keys are the elements themselves, map and object keys
    /// are strings.
    pub fn elements(&self) -> Option<Vec<(Value, Value)>> {
        match self {
            Value::List(_, items) | Value::Tuple(items) => Some(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (Value::number(i as u64), v.clone()))
                    .collect(),
            ),
            Value::Set(_, items) => Some(items.iter().map(|v| (v.clone(), v.clone())).collect()),
            Value::Map(_, items) => Some(
                items
                    .iter()
                    .map(|(k, v)| (Value::string(k.clone()), v.clone()))
                    .collect(),
            ),
            Value::Object(attrs) => Some(
                attrs
                    .iter()
                    .map(|(k, v)| (Value::string(k.clone()), v.clone()))
                    .collect(),
            ),
            _ => None,
        }
    }

    pub fn refine(self) -> RefinementBuilder {
        RefinementBuilder::new(self)
    }

    pub fn refine_not_null(self) -> Self {
        self.refine().not_null().new_value()
    }

    pub fn refinement(&self) -> Refinement {
        Refinement::of_value(self)
    }

    /// Equality as the `==` operator sees it: `Some(result)` when decidable,
    /// `None` when unknowns get in the way.
    pub fn raw_equal(&self, other: &Value) -> Option<bool> {
        match (self, other) {
            (Value::Unknown(..), _) | (_, Value::Unknown(..)) => None,
            (Value::Null(_), Value::Null(_)) => Some(true),
            (Value::Null(_), _) | (_, Value::Null(_)) => Some(false),
            (Value::Bool(a), Value::Bool(b)) => Some(a == b),
            (Value::Number(a), Value::Number(b)) => Some(a == b),
            (Value::String(a), Value::String(b)) => Some(a == b),
            (Value::List(_, a), Value::List(_, b))
            | (Value::Set(_, a), Value::Set(_, b))
            | (Value::Tuple(a), Value::Tuple(b)) => {
                if a.len() != b.len() {
                    return Some(false);
                }
                all_equal(a.iter().zip(b.iter()))
            }
            (Value::Map(_, a), Value::Map(_, b)) => {
                if a.len() != b.len() || a.keys().any(|k| !b.contains_key(k)) {
                    return Some(false);
                }
                all_equal(a.iter().filter_map(|(k, v)| b.get(k).map(|w| (v, w))))
            }
            (Value::Object(a), Value::Object(b)) => {
                if a.len() != b.len() || a.keys().any(|k| !b.contains_key(k)) {
                    return Some(false);
                }
                all_equal(a.iter().filter_map(|(k, v)| b.get(k).map(|w| (v, w))))
            }
            _ => Some(false),
        }
    }

    /// `==` as a value.
    pub fn equals(&self, other: &Value) -> Value {
        match self.raw_equal(other) {
            Some(b) => Value::Bool(b),
            None => Value::unknown(Type::Bool).refine_not_null(),
        }
    }
}

fn all_equal<'a>(pairs: impl Iterator<Item = (&'a Value, &'a Value)>) -> Option<bool> {
    let mut decided = true;
    for (a, b) in pairs {
        match a.raw_equal(b) {
            Some(false) => return Some(false),
            Some(true) => {}
            None => decided = false,
        }
    }
    decided.then_some(true)
}

fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Bool(_) => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Null(_) => 4,
        Value::Unknown(..) => 5,
        _ => 3,
    }
}

/// Ordering used for set elements.
pub fn canonical_cmp(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => x.cmp(y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => kind_rank(a)
            .cmp(&kind_rank(b))
            .then_with(|| a.to_string().cmp(&b.to_string())),
    }
}

/// Renders a number without trailing zeros.
pub fn format_number(n: &Number) -> String {
    n.to_string()
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null(_) => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", format_number(n)),
            Value::String(s) => write!(f, "{:?}", s),
            Value::List(_, items) | Value::Set(_, items) | Value::Tuple(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(_, items) => {
                write!(f, "{{")?;
                for (i, (k, v)) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?} = {}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Object(attrs) => {
                write!(f, "{{")?;
                for (i, (k, v)) in attrs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} = {}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Unknown(ty, _) => write!(f, "(unknown {})", ty),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_types() {
        let v = Value::object([
            ("a", Value::number(1)),
            ("b", Value::tuple(vec![Value::bool(true)])),
        ]);
        assert_eq!(
            v.ty(),
            Type::object([("a", Type::Number), ("b", Type::Tuple(vec![Type::Bool]))])
        );
    }

    #[test]
    fn test_typed_nulls_differ() {
        assert_ne!(Value::null(Type::String), Value::null(Type::Dynamic));
        assert_eq!(Value::null(Type::String).raw_equal(&Value::null(Type::Number)), Some(true));
    }

    #[test]
    fn test_numbers_compare_by_value() {
        let a = Value::Number(Number::new(10, 1));
        assert_eq!(a, Value::number(1));
        assert_eq!(format_number(&Number::new(150, 2)), "1.5");
    }

    #[test]
    fn test_set_deduplicates_and_orders() {
        let s = Value::set(
            Type::String,
            vec![Value::string("b"), Value::string("a"), Value::string("b")],
        );
        assert_eq!(
            s,
            Value::Set(Type::String, vec![Value::string("a"), Value::string("b")])
        );
    }

    #[test]
    fn test_wholly_known() {
        let v = Value::tuple(vec![Value::number(1), Value::unknown(Type::String)]);
        assert!(v.is_known());
        assert!(!v.is_wholly_known());
    }

    #[test]
    fn test_equality_with_unknowns() {
        let known = Value::tuple(vec![Value::number(1), Value::number(2)]);
        let partly = Value::tuple(vec![Value::number(1), Value::unknown(Type::Number)]);
        let different = Value::tuple(vec![Value::number(3), Value::unknown(Type::Number)]);
        assert_eq!(known.raw_equal(&partly), None);
        assert_eq!(known.raw_equal(&different), Some(false));
        assert_eq!(Value::string("1").raw_equal(&Value::number(1)), Some(false));
    }

    #[test]
    fn test_display() {
        let v = Value::object([("a", Value::tuple(vec![Value::number(1), Value::string("x")]))]);
        assert_eq!(v.to_string(), r#"{a = [1, "x"]}"#);
    }
}
