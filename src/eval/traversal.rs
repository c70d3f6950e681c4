use crate::ast::Expression;
use crate::diagnostics::{Diagnostics, SourceRange};
use crate::suggest::did_you_mean;
use crate::value::convert::{convert, list_or_tuple};
use crate::value::{Type, Value};

use super::Evaluator;

const NO_SUCH_ELEMENT: &str = "The given key does not identify an element in this collection value.";

impl Evaluator {
    pub(super) fn eval_get_attr(
        &mut self,
        source: &Expression,
        name: &str,
        name_range: &SourceRange,
        diags: &mut Diagnostics,
    ) -> Value {
        let value = self.eval(source, diags);
        self.get_attr(value, name, name_range, diags)
    }

    fn get_attr(
        &self,
        value: Value,
        name: &str,
        range: &SourceRange,
        diags: &mut Diagnostics,
    ) -> Value {
        match value {
            Value::Null(_) => self.error(
                diags,
                "Attempt to get attribute from null value",
                "This value is null, so it does not have any attributes.",
                range,
            ),
            Value::Object(mut attrs) => match attrs.swap_remove(name) {
                Some(attr) => attr,
                None => self.unsupported_attribute(name, attrs.keys().map(String::as_str), range, diags),
            },
            Value::Map(_, mut items) => match items.remove(name) {
                Some(item) => item,
                None => self.error(
                    diags,
                    "Missing map element",
                    format!("This map does not have an element with the key {:?}.", name),
                    range,
                ),
            },
            Value::Unknown(ty, _) => match ty {
                Type::Dynamic => Value::dynamic(),
                Type::Map(element) => Value::unknown(*element),
                Type::Object(attrs) => match attrs.get(name) {
                    Some(attr) => Value::unknown(attr.clone()),
                    None => self.unsupported_attribute(name, attrs.keys().map(String::as_str), range, diags),
                },
                other => self.attribute_on_non_object(&other, range, diags),
            },
            other => self.attribute_on_non_object(&other.ty(), range, diags),
        }
    }

    fn unsupported_attribute<'a>(
        &self,
        name: &str,
        candidates: impl IntoIterator<Item = &'a str>,
        range: &SourceRange,
        diags: &mut Diagnostics,
    ) -> Value {
        let suggestion = did_you_mean(name, candidates);
        self.error(
            diags,
            "Unsupported attribute",
            format!("This object does not have an attribute named {:?}.{}", name, suggestion),
            range,
        )
    }

    fn attribute_on_non_object(&self, ty: &Type, range: &SourceRange, diags: &mut Diagnostics) -> Value {
        let detail = if ty.is_primitive() {
            format!("Can't access attributes on a primitive-typed value ({}).", ty)
        } else {
            format!(
                "Can't access attributes on a {}. Did you mean to access an attribute for each element, or only for a specific element?",
                ty
            )
        };
        self.error(diags, "Unsupported attribute", detail, range)
    }

    pub(super) fn eval_index(
        &mut self,
        source: &Expression,
        key: &Expression,
        diags: &mut Diagnostics,
    ) -> Value {
        let collection = self.eval(source, diags);
        let key_value = self.eval(key, diags);
        self.index(collection, key_value, &key.range, diags)
    }

    fn index(&self, collection: Value, key: Value, range: &SourceRange, diags: &mut Diagnostics) -> Value {
        if collection.is_null() {
            return self.error(
                diags,
                "Attempt to index null value",
                "This value is null, so it does not have any indices.",
                range,
            );
        }
        if key.is_null() {
            return self.error(
                diags,
                "Invalid index",
                "Can't use a null value as an indexing key.",
                range,
            );
        }

        match collection {
            Value::Set(..) | Value::Unknown(Type::Set(_), _) => self.error(
                diags,
                "Invalid index",
                "Elements of a set are identified only by their value and don't have any separate index or key to select with, so it's only possible to perform operations across all elements of the set.",
                range,
            ),
            Value::Unknown(ty, _) => self.index_unknown(&ty, &key, range, diags),
            Value::List(_, items) | Value::Tuple(items) => {
                let Some(position) = self.position_key(&key, range, diags) else {
                    return Value::dynamic();
                };
                match position {
                    Position::Unknown => Value::dynamic(),
                    Position::At(i) => match items.into_iter().nth(i) {
                        Some(item) => item,
                        None => self.error(diags, "Invalid index", NO_SUCH_ELEMENT, range),
                    },
                }
            }
            Value::Map(element, mut items) => match self.string_key(&key, range, diags) {
                Some(Some(k)) => match items.remove(&k) {
                    Some(item) => item,
                    None => self.error(diags, "Invalid index", NO_SUCH_ELEMENT, range),
                },
                Some(None) => Value::unknown(element),
                None => Value::dynamic(),
            },
            Value::Object(mut attrs) => match self.string_key(&key, range, diags) {
                Some(Some(k)) => match attrs.swap_remove(&k) {
                    Some(attr) => attr,
                    None => self.error(diags, "Invalid index", NO_SUCH_ELEMENT, range),
                },
                _ => Value::dynamic(),
            },
            _ => self.error(
                diags,
                "Invalid index",
                "This value does not have any indices.",
                range,
            ),
        }
    }

    /// Indexing into a value that is not yet known: only the result type
    /// can be worked out.
    fn index_unknown(&self, ty: &Type, key: &Value, range: &SourceRange, diags: &mut Diagnostics) -> Value {
        match ty {
            Type::List(element) => match self.position_key(key, range, diags) {
                Some(_) => Value::unknown(element.as_ref().clone()),
                None => Value::dynamic(),
            },
            Type::Map(element) => match self.string_key(key, range, diags) {
                Some(_) => Value::unknown(element.as_ref().clone()),
                None => Value::dynamic(),
            },
            Type::Tuple(elements) => match self.position_key(key, range, diags) {
                Some(Position::At(i)) => match elements.get(i) {
                    Some(t) => Value::unknown(t.clone()),
                    None => self.error(diags, "Invalid index", NO_SUCH_ELEMENT, range),
                },
                _ => Value::dynamic(),
            },
            Type::Object(attrs) => match self.string_key(key, range, diags) {
                Some(Some(k)) => match attrs.get(&k) {
                    Some(t) => Value::unknown(t.clone()),
                    None => self.error(diags, "Invalid index", NO_SUCH_ELEMENT, range),
                },
                _ => Value::dynamic(),
            },
            Type::Dynamic => Value::dynamic(),
            _ => self.error(
                diags,
                "Invalid index",
                "This value does not have any indices.",
                range,
            ),
        }
    }

    /// A sequence index. `None` means an error was reported.
    fn position_key(&self, key: &Value, range: &SourceRange, diags: &mut Diagnostics) -> Option<Position> {
        match convert(key, &Type::Number) {
            Ok(Value::Number(n)) => {
                match n.to_usize() {
                    Some(i) => Some(Position::At(i)),
                    None => {
                        self.error(diags, "Invalid index", NO_SUCH_ELEMENT, range);
                        None
                    }
                }
            }
            Ok(_) => Some(Position::Unknown),
            Err(err) => {
                self.error(
                    diags,
                    "Invalid index",
                    format!("The given key does not identify an element in this collection value: {}.", err),
                    range,
                );
                None
            }
        }
    }

    /// A map key. `Some(None)` for an unknown key, `None` when an error was
    /// reported.
    fn string_key(&self, key: &Value, range: &SourceRange, diags: &mut Diagnostics) -> Option<Option<String>> {
        match convert(key, &Type::String) {
            Ok(Value::String(s)) => Some(Some(s)),
            Ok(_) => Some(None),
            Err(err) => {
                self.error(
                    diags,
                    "Invalid index",
                    format!("The given key does not identify an element in this collection value: {}.", err),
                    range,
                );
                None
            }
        }
    }

    pub(super) fn eval_splat(
        &mut self,
        source: &Expression,
        each: &Expression,
        diags: &mut Diagnostics,
    ) -> Value {
        let value = self.eval(source, diags);
        match value {
            Value::Null(_) => Value::Tuple(Vec::new()),
            Value::Unknown(Type::Dynamic, _) => Value::dynamic(),
            Value::Unknown(Type::List(_) | Type::Set(_) | Type::Tuple(_), refinement) => {
                let mut builder = Value::unknown(Type::list(Type::Dynamic)).refine().not_null();
                if let Some(n) = refinement.length_lower {
                    builder = builder.collection_length_lower_bound(n);
                }
                if let Some(n) = refinement.length_upper {
                    builder = builder.collection_length_upper_bound(n);
                }
                builder.new_value()
            }
            Value::Tuple(items) => {
                if !self.within_iteration_limit(items.len(), &source.range, diags) {
                    return Value::dynamic();
                }
                Value::Tuple(self.splat_each(items, each, diags))
            }
            Value::List(_, items) | Value::Set(_, items) => {
                if !self.within_iteration_limit(items.len(), &source.range, diags) {
                    return Value::dynamic();
                }
                let results = self.splat_each(items, each, diags);
                list_or_tuple(results)
            }
            single => Value::Tuple(self.splat_each(vec![single], each, diags)),
        }
    }

    fn splat_each(&mut self, items: Vec<Value>, each: &Expression, diags: &mut Diagnostics) -> Vec<Value> {
        items
            .into_iter()
            .map(|item| {
                self.splat_items.push(item);
                let result = self.eval(each, diags);
                self.splat_items.pop();
                result
            })
            .collect()
    }

    pub(super) fn eval_splat_item(&self, range: &SourceRange, diags: &mut Diagnostics) -> Value {
        match self.splat_items.last() {
            Some(item) => item.clone(),
            None => self.error(
                diags,
                "Invalid splat expression",
                "A splat item can only appear inside a splat expression.",
                range,
            ),
        }
    }
}

enum Position {
    At(usize),
    Unknown,
}
