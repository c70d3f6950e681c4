//! Bridge between [`Value`] and `serde_json::Value`, used for JSON-encoded
//! variables, the JSON functions and the command line tool.

use indexmap::IndexMap;
use super::convert::parse_number;
use super::{format_number, Number, Type, Value};
use crate::{Error, InternalResult};

/// JSON arrays become tuples and JSON objects become objects.
pub fn from_json(json: &serde_json::Value) -> InternalResult<Value> {
    Ok(match json {
        serde_json::Value::Null => Value::Null(Type::Dynamic),
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            let text = n.to_string();
            let number = parse_number(&text)
                .ok_or_else(|| Error::Internal(format!("number {} is out of range", text)))?;
            Value::Number(number)
        }
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => Value::Tuple(
            items
                .iter()
                .map(from_json)
                .collect::<InternalResult<Vec<_>>>()?,
        ),
        serde_json::Value::Object(entries) => {
            let mut attrs = IndexMap::new();
            for (k, v) in entries {
                attrs.insert(k.clone(), from_json(v)?);
            }
            Value::Object(attrs)
        }
    })
}

/// Fails if the value is not wholly known.
pub fn to_json(value: &Value) -> InternalResult<serde_json::Value> {
    Ok(match value {
        Value::Unknown(ty, _) => {
            return Err(Error::UnknownValue(format!(
                "cannot serialize unknown {} value",
                ty
            )))
        }
        Value::Null(_) => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => number_to_json(n),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::List(_, items) | Value::Set(_, items) | Value::Tuple(items) => serde_json::Value::Array(
            items.iter().map(to_json).collect::<InternalResult<Vec<_>>>()?,
        ),
        Value::Map(_, items) => {
            let mut map = serde_json::Map::new();
            for (k, v) in items {
                map.insert(k.clone(), to_json(v)?);
            }
            serde_json::Value::Object(map)
        }
        Value::Object(attrs) => {
            let mut map = serde_json::Map::new();
            for (k, v) in attrs {
                map.insert(k.clone(), to_json(v)?);
            }
            serde_json::Value::Object(map)
        }
    })
}

fn number_to_json(n: &Number) -> serde_json::Value {
    if let Some(i) = n.to_i64() {
        return serde_json::Value::from(i);
    }
    match n.to_f64().and_then(serde_json::Number::from_f64) {
        Some(f) => serde_json::Value::Number(f),
        None => serde_json::Value::String(format_number(n)),
    }
}
