//! Type conversion.
//!
//! [`convert`] turns a value into the requested type or explains why it
//! cannot. Primitive types convert to and from strings; collections convert
//! element-wise; `Dynamic` accepts anything unchanged. Nulls and unknowns
//! convert to a null or unknown of the target type, and unknowns keep the
//! parts of their refinement that still make sense for the new type.

use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use thiserror::Error;

use super::unify::unify;
use super::{format_number, Number, Type, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    Index(usize),
    Key(String),
    Attribute(String),
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStep::Index(i) => write!(f, "element {}", i),
            PathStep::Key(k) => write!(f, "element {:?}", k),
            PathStep::Attribute(a) => write!(f, "attribute {:?}", a),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct ConvertError {
    pub path: Vec<PathStep>,
    pub message: String,
}

impl ConvertError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            path: Vec::new(),
            message: message.into(),
        }
    }

    fn required(target: &Type) -> Self {
        Self::new(format!("{} required", target.friendly_name()))
    }

    fn at(mut self, step: PathStep) -> Self {
        self.path.insert(0, step);
        self
    }
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.path {
            write!(f, "{}: ", step)?;
        }
        write!(f, "{}", self.message)
    }
}

pub type ConvertResult<T> = Result<T, ConvertError>;

/// Converts `value` to `target`.
pub fn convert(value: &Value, target: &Type) -> ConvertResult<Value> {
    if target.is_dynamic() {
        return Ok(value.clone());
    }
    match value {
        Value::Unknown(ty, refinement) => {
            check_conversion(ty, target)?;
            Ok(Value::Unknown(
                target.clone(),
                refinement.through_conversion(ty, target),
            ))
        }
        Value::Null(ty) => {
            check_conversion(ty, target)?;
            Ok(Value::Null(target.clone()))
        }
        known => convert_known(known, target),
    }
}

/// Type-level check used for nulls and unknowns, which have no content to
/// inspect.
fn check_conversion(from: &Type, to: &Type) -> ConvertResult<()> {
    match (from, to) {
        (Type::Dynamic, _) | (_, Type::Dynamic) => Ok(()),
        (a, b) if a == b => Ok(()),
        (Type::Bool | Type::Number | Type::String, Type::String) => Ok(()),
        (Type::String, Type::Number | Type::Bool) => Ok(()),
        (Type::List(e) | Type::Set(e), Type::List(t) | Type::Set(t)) => check_conversion(e, t),
        (Type::Tuple(elems), Type::List(t) | Type::Set(t)) => {
            elems.iter().try_for_each(|e| check_conversion(e, t))
        }
        (Type::Map(e), Type::Map(t)) => check_conversion(e, t),
        (Type::Object(attrs), Type::Map(t)) => {
            attrs.values().try_for_each(|a| check_conversion(a, t))
        }
        (Type::Tuple(elems), Type::Tuple(targets)) if elems.len() == targets.len() => elems
            .iter()
            .zip(targets)
            .enumerate()
            .try_for_each(|(i, (e, t))| check_conversion(e, t).map_err(|err| err.at(PathStep::Index(i)))),
        (Type::List(_), Type::Tuple(_)) => Ok(()),
        (Type::Map(e), Type::Object(targets)) => targets
            .iter()
            .try_for_each(|(k, t)| check_conversion(e, t).map_err(|err| err.at(PathStep::Attribute(k.clone())))),
        (Type::Object(attrs), Type::Object(targets)) => {
            for (k, t) in targets {
                match attrs.get(k) {
                    Some(a) => check_conversion(a, t)
                        .map_err(|err| err.at(PathStep::Attribute(k.clone())))?,
                    None => return Err(ConvertError::new(format!("attribute {:?} is required", k))),
                }
            }
            Ok(())
        }
        _ => Err(ConvertError::required(to)),
    }
}

fn convert_known(value: &Value, target: &Type) -> ConvertResult<Value> {
    match target {
        Type::Dynamic => Ok(value.clone()),
        Type::String => match value {
            Value::String(_) => Ok(value.clone()),
            Value::Number(n) => Ok(Value::String(format_number(n))),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            _ => Err(ConvertError::required(target)),
        },
        Type::Number => match value {
            Value::Number(_) => Ok(value.clone()),
            Value::String(s) => parse_number(s)
                .map(Value::Number)
                .ok_or_else(|| ConvertError::new("a number is required")),
            _ => Err(ConvertError::required(target)),
        },
        Type::Bool => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(s) if s == "true" => Ok(Value::Bool(true)),
            Value::String(s) if s == "false" => Ok(Value::Bool(false)),
            Value::String(_) => Err(ConvertError::new("a bool is required")),
            _ => Err(ConvertError::required(target)),
        },
        Type::List(element) | Type::Set(element) => {
            let items = match value {
                Value::List(_, items) | Value::Set(_, items) | Value::Tuple(items) => items,
                _ => return Err(ConvertError::required(target)),
            };
            let (element, items) = convert_sequence(items, element)?;
            Ok(match target {
                Type::Set(_) => Value::set(element, items),
                _ => Value::list(element, items),
            })
        }
        Type::Map(element) => {
            let entries: Vec<(&String, &Value)> = match value {
                Value::Map(_, items) => items.iter().collect(),
                Value::Object(attrs) => attrs.iter().collect(),
                _ => return Err(ConvertError::required(target)),
            };
            let element = match element.as_ref() {
                Type::Dynamic => {
                    let types: Vec<Type> = entries.iter().map(|(_, v)| v.ty()).collect();
                    unify(&types).ok_or_else(|| {
                        ConvertError::new("all map elements must have the same type")
                    })?
                }
                other => other.clone(),
            };
            let mut converted = BTreeMap::new();
            for (k, v) in entries {
                let item = convert(v, &element).map_err(|e| e.at(PathStep::Key(k.clone())))?;
                converted.insert(k.clone(), item);
            }
            Ok(Value::Map(element, converted))
        }
        Type::Tuple(targets) => {
            let items = match value {
                Value::Tuple(items) | Value::List(_, items) => items,
                _ => return Err(ConvertError::required(target)),
            };
            if items.len() != targets.len() {
                return Err(ConvertError::new(format!(
                    "tuple with {} elements required",
                    targets.len()
                )));
            }
            items
                .iter()
                .zip(targets)
                .enumerate()
                .map(|(i, (v, t))| convert(v, t).map_err(|e| e.at(PathStep::Index(i))))
                .collect::<ConvertResult<Vec<_>>>()
                .map(Value::Tuple)
        }
        Type::Object(targets) => {
            let lookup = |k: &str| -> Option<&Value> {
                match value {
                    Value::Object(attrs) => attrs.get(k),
                    Value::Map(_, items) => items.get(k),
                    _ => None,
                }
            };
            if !matches!(value, Value::Object(_) | Value::Map(..)) {
                return Err(ConvertError::required(target));
            }
            let mut converted = IndexMap::new();
            for (k, t) in targets {
                let v = lookup(k)
                    .ok_or_else(|| ConvertError::new(format!("attribute {:?} is required", k)))?;
                let item = convert(v, t).map_err(|e| e.at(PathStep::Attribute(k.clone())))?;
                converted.insert(k.clone(), item);
            }
            if let Value::Object(attrs) = value {
                if let Some(extra) = attrs.keys().find(|k| !targets.contains_key(*k)) {
                    return Err(ConvertError::new(format!("unsupported attribute {:?}", extra)));
                }
            }
            Ok(Value::Object(converted))
        }
    }
}

/// Converts sequence items to a common element type, inferring it when the
/// requested element type is `Dynamic`.
fn convert_sequence(items: &[Value], element: &Type) -> ConvertResult<(Type, Vec<Value>)> {
    let element = match element {
        Type::Dynamic => {
            let types: Vec<Type> = items.iter().map(Value::ty).collect();
            unify(&types)
                .ok_or_else(|| ConvertError::new("all list elements must have the same type"))?
        }
        other => other.clone(),
    };
    let converted = items
        .iter()
        .enumerate()
        .map(|(i, v)| convert(v, &element).map_err(|e| e.at(PathStep::Index(i))))
        .collect::<ConvertResult<Vec<_>>>()?;
    Ok((element, converted))
}

/// A list of the unified element type, or a tuple when the items have no
/// type in common.
pub fn list_or_tuple(items: Vec<Value>) -> Value {
    let types: Vec<Type> = items.iter().map(Value::ty).collect();
    let Some(element) = unify(&types) else {
        return Value::Tuple(items);
    };
    let converted: Option<Vec<Value>> = items.iter().map(|v| convert(v, &element).ok()).collect();
    match converted {
        Some(converted) => Value::list(element, converted),
        None => Value::Tuple(items),
    }
}

/// Parses a decimal or scientific-notation number.
pub fn parse_number(s: &str) -> Option<Number> {
    if s.is_empty() || s != s.trim() {
        return None;
    }
    Number::parse(s)
}
