use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::ast::ForExpression;
use crate::diagnostics::{Diagnostics, SourceRange};
use crate::value::{convert::convert, Type, Value};

use super::Evaluator;

/// What one iteration of a `for` expression contributed.
enum Outcome {
    Skipped,
    /// The filter or the key depends on an unknown value.
    Unknown,
    Failed,
    Item { key: Option<String>, value: Value },
}

impl Evaluator {
    pub(super) fn eval_for(
        &mut self,
        for_expr: &ForExpression,
        range: &SourceRange,
        diags: &mut Diagnostics,
    ) -> Value {
        let collection = self.eval(&for_expr.collection, diags);
        let collection_range = &for_expr.collection.range;
        if collection.is_null() {
            return self.error(
                diags,
                "Iteration over null value",
                "A null value cannot be used as the collection in a 'for' expression.",
                collection_range,
            );
        }
        if !collection.is_known() {
            return Value::dynamic();
        }
        let Some(elements) = collection.elements() else {
            return self.error(
                diags,
                "Iteration over non-iterable value",
                format!(
                    "A value of type {} cannot be used as the collection in a 'for' expression.",
                    collection.ty()
                ),
                collection_range,
            );
        };
        if !self.within_iteration_limit(elements.len(), collection_range, diags) {
            return Value::dynamic();
        }

        let object_form = for_expr.key_expr.is_some();
        let mut items = Vec::new();
        let mut attrs: IndexMap<String, Value> = IndexMap::new();
        let mut groups: IndexMap<String, Vec<Value>> = IndexMap::new();
        let mut unknown = false;
        let mut failed = false;

        for (key, value) in elements {
            let mut scope = BTreeMap::new();
            if let Some(key_var) = &for_expr.key_var {
                scope.insert(key_var.clone(), key);
            }
            scope.insert(for_expr.value_var.clone(), value);

            match self.with_scope(scope, |this| this.for_iteration(for_expr, diags)) {
                Outcome::Skipped => {}
                Outcome::Unknown => unknown = true,
                Outcome::Failed => failed = true,
                Outcome::Item { key: None, value } => items.push(value),
                Outcome::Item {
                    key: Some(key),
                    value,
                } => {
                    if for_expr.grouped {
                        groups.entry(key).or_default().push(value);
                    } else if attrs.contains_key(&key) {
                        let subject = for_expr
                            .key_expr
                            .as_ref()
                            .map_or(range, |expr| &expr.range);
                        self.error(
                            diags,
                            "Duplicate object key",
                            format!(
                                "Two different items produced the key {:?} in this 'for' expression. If duplicates are expected, use the ellipsis (...) after the value expression to enable grouping by key.",
                                key
                            ),
                            subject,
                        );
                        failed = true;
                    } else {
                        attrs.insert(key, value);
                    }
                }
            }
        }

        if failed || unknown {
            return Value::dynamic();
        }
        if !object_form {
            return Value::Tuple(items);
        }
        if for_expr.grouped {
            return Value::Object(
                groups
                    .into_iter()
                    .map(|(k, values)| (k, Value::Tuple(values)))
                    .collect(),
            );
        }
        Value::Object(attrs)
    }

    fn for_iteration(&mut self, for_expr: &ForExpression, diags: &mut Diagnostics) -> Outcome {
        if let Some(condition) = &for_expr.condition {
            let raw = self.eval(condition, diags);
            match convert(&raw, &Type::Bool) {
                Ok(Value::Bool(true)) => {}
                Ok(Value::Bool(false)) => return Outcome::Skipped,
                Ok(Value::Null(_)) => {
                    self.error(
                        diags,
                        "Condition is null",
                        "The value of the 'if' clause must not be null.",
                        &condition.range,
                    );
                    return Outcome::Failed;
                }
                Ok(_) => return Outcome::Unknown,
                Err(err) => {
                    self.error(
                        diags,
                        "Invalid 'for' condition",
                        format!("The 'if' clause value is invalid: {}.", err),
                        &condition.range,
                    );
                    return Outcome::Failed;
                }
            }
        }

        let key = match &for_expr.key_expr {
            None => None,
            Some(key_expr) => {
                let raw = self.eval(key_expr, diags);
                match convert(&raw, &Type::String) {
                    Ok(Value::String(key)) => Some(key),
                    Ok(Value::Null(_)) => {
                        self.error(
                            diags,
                            "Invalid object key",
                            "Key expression in 'for' expression must not produce a null value.",
                            &key_expr.range,
                        );
                        return Outcome::Failed;
                    }
                    Ok(_) => return Outcome::Unknown,
                    Err(err) => {
                        self.error(
                            diags,
                            "Invalid object key",
                            format!("The key expression produced an invalid result: {}.", err),
                            &key_expr.range,
                        );
                        return Outcome::Failed;
                    }
                }
            }
        };

        let value = self.eval(&for_expr.value_expr, diags);
        Outcome::Item { key, value }
    }
}
