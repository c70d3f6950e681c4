//! # Decoder
//!
//! Applies a [`Spec`] to a parsed configuration [`Body`], evaluating
//! attribute expressions along the way, and assembles the result into a
//! single value whose type is the spec's [implied type](Spec::implied_type).
//!
//! Decoding checks the whole body before giving up: every unexpected
//! attribute or block, every missing required item and every bad value is
//! reported. A result is only meaningful when no errors were reported.

mod blocks;
pub mod spec;

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::ast::Body;
use crate::diagnostics::{Diagnostic, Diagnostics, SourceRange};
use crate::eval::{EvalContext, Evaluator, Limits};
use crate::suggest::did_you_mean;
use crate::value::{convert::convert, Type, Value};

pub use spec::{AttrSpec, BlockListSpec, BlockMapSpec, BlockSpec, Spec};

pub struct Decoder {
    ctx: Arc<EvalContext>,
    limits: Limits,
}

impl Decoder {
    pub fn new(ctx: Arc<EvalContext>) -> Self {
        Self {
            ctx,
            limits: Limits::default(),
        }
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    #[tracing::instrument(level = "debug", skip_all)]
    pub fn decode(&self, body: &Body, spec: &Spec) -> (Value, Diagnostics) {
        let mut diags = Diagnostics::new();
        let value = self.decode_body(body, spec, &mut diags);
        if diags.has_errors() {
            tracing::debug!(errors = diags.error_count(), "decode reported errors");
        }
        (value, diags)
    }

    /// Decodes `spec` against one body, after checking the body contains
    /// nothing the spec does not expect.
    fn decode_body(&self, body: &Body, spec: &Spec, diags: &mut Diagnostics) -> Value {
        let claimed: HashSet<&str> = spec.attribute_names().into_iter().collect();
        self.check_unexpected(body, spec, &claimed, diags);
        self.decode_spec(body, spec, &claimed, diags)
    }

    fn check_unexpected(
        &self,
        body: &Body,
        spec: &Spec,
        claimed: &HashSet<&str>,
        diags: &mut Diagnostics,
    ) {
        if !spec.has_catch_all() {
            for attr in body.attributes.values() {
                if claimed.contains(attr.name.as_str()) {
                    continue;
                }
                let suggestion = did_you_mean(&attr.name, claimed.iter().copied());
                diags.push(
                    Diagnostic::error(
                        "Unsupported argument",
                        format!(
                            "An argument named {:?} is not expected here.{}",
                            attr.name, suggestion
                        ),
                    )
                    .with_subject(attr.name_range.clone()),
                );
            }
        }

        let block_types = spec.block_types();
        for block in &body.blocks {
            if block_types.contains(&block.type_name.as_str()) {
                continue;
            }
            let suggestion = did_you_mean(&block.type_name, block_types.iter().copied());
            diags.push(
                Diagnostic::error(
                    "Unsupported block type",
                    format!(
                        "Blocks of type {:?} are not expected here.{}",
                        block.type_name, suggestion
                    ),
                )
                .with_subject(block.type_range.clone()),
            );
        }
    }

    fn decode_spec(
        &self,
        body: &Body,
        spec: &Spec,
        claimed: &HashSet<&str>,
        diags: &mut Diagnostics,
    ) -> Value {
        match spec {
            Spec::Object(children) => Value::Object(
                children
                    .iter()
                    .map(|(name, child)| (name.clone(), self.decode_spec(body, child, claimed, diags)))
                    .collect(),
            ),
            Spec::Attr(attr) => self.decode_attr(body, attr, diags),
            Spec::Block(block) => self.decode_block(body, block, diags),
            Spec::BlockList(list) => self.decode_block_list(body, list, diags),
            Spec::BlockSet(set) => match self.decode_block_list(body, set, diags) {
                Value::List(element, items) => Value::set(element, items),
                Value::Tuple(items) => Value::set(Type::Dynamic, items),
                other => other,
            },
            Spec::BlockMap(map) => self.decode_block_map(body, map, diags),
            Spec::Literal(value) => value.clone(),
            Spec::Default { primary, fallback } => {
                let value = self.decode_spec(body, primary, claimed, diags);
                if value.is_null() {
                    self.decode_spec(body, fallback, claimed, diags)
                } else {
                    value
                }
            }
            Spec::Attrs { element_type } => {
                let mut items = BTreeMap::new();
                for attr in body.attributes.values() {
                    if claimed.contains(attr.name.as_str()) {
                        continue;
                    }
                    let value = self.evaluate_attr(&attr.name, &attr.expr, element_type, diags);
                    items.insert(attr.name.clone(), value);
                }
                Value::Map(element_type.clone(), items)
            }
        }
    }

    fn decode_attr(&self, body: &Body, spec: &AttrSpec, diags: &mut Diagnostics) -> Value {
        match body.attributes.get(&spec.name) {
            Some(attr) => self.evaluate_attr(&spec.name, &attr.expr, &spec.ty, diags),
            None => {
                if spec.required {
                    diags.push(
                        Diagnostic::error(
                            "Missing required argument",
                            format!(
                                "The argument {:?} is required, but no definition was found.",
                                spec.name
                            ),
                        )
                        .with_subject(body.missing_item_range()),
                    );
                }
                Value::null(spec.ty.clone())
            }
        }
    }

    /// Evaluates an attribute expression and converts the result to `ty`.
    fn evaluate_attr(
        &self,
        name: &str,
        expr: &crate::ast::Expression,
        ty: &Type,
        diags: &mut Diagnostics,
    ) -> Value {
        let (value, eval_diags) = Evaluator::new(self.ctx.clone())
            .with_limits(self.limits)
            .evaluate(expr);
        let failed = eval_diags.has_errors();
        diags.extend(eval_diags);
        if failed {
            return Value::unknown(ty.clone());
        }
        match convert(&value, ty) {
            Ok(value) => value,
            Err(err) => {
                diags.push(incorrect_value(name, &err.to_string(), &expr.range));
                Value::unknown(ty.clone())
            }
        }
    }
}

fn incorrect_value(name: &str, message: &str, range: &SourceRange) -> Diagnostic {
    Diagnostic::error(
        "Incorrect attribute value type",
        format!("Inappropriate value for attribute {:?}: {}.", name, message),
    )
    .with_subject(range.clone())
}

/// Decodes `body` with `spec` in `ctx` using default limits.
pub fn decode(body: &Body, spec: &Spec, ctx: Arc<EvalContext>) -> (Value, Diagnostics) {
    Decoder::new(ctx).decode(body, spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::parse_config;
    use pretty_assertions::assert_eq;

    fn name_spec() -> Spec {
        Spec::object([("name", Spec::Attr(AttrSpec::new("name", Type::String)))])
    }

    fn decode_src(src: &str, spec: &Spec) -> (Value, Diagnostics) {
        let (body, parse_diags) = parse_config(src, "<src>");
        assert!(parse_diags.is_empty(), "{}", parse_diags);
        decode(&body, spec, Arc::new(EvalContext::new()))
    }

    #[test]
    fn test_optional_attribute() {
        let (value, diags) = decode_src("", &name_spec());
        assert!(diags.is_empty());
        assert_eq!(value, Value::object([("name", Value::null(Type::String))]));

        let (value, _) = decode_src("name = \"Jackson\"", &name_spec());
        assert_eq!(value, Value::object([("name", Value::string("Jackson"))]));
    }

    #[test]
    fn test_unsupported_argument_suggests() {
        let (_, diags) = decode_src("nome = \"Foo\"", &name_spec());
        assert_eq!(
            diags.to_string(),
            "<src>:1,1-5: Unsupported argument; An argument named \"nome\" is not expected here. Did you mean \"name\"?"
        );
    }

    #[test]
    fn test_missing_required_argument() {
        let spec = Spec::object([(
            "name",
            Spec::Attr(AttrSpec::new("name", Type::String).required()),
        )]);
        let (_, diags) = decode_src("", &spec);
        assert_eq!(
            diags.to_string(),
            "<src>:1,1-1: Missing required argument; The argument \"name\" is required, but no definition was found."
        );
    }

    #[test]
    fn test_incorrect_value_type() {
        let spec = Spec::object([("n", Spec::Attr(AttrSpec::new("n", Type::Number)))]);
        let (_, diags) = decode_src("n = [1]", &spec);
        assert_eq!(
            diags.to_string(),
            "<src>:1,5-8: Incorrect attribute value type; Inappropriate value for attribute \"n\": number required."
        );
    }

    #[test]
    fn test_default_and_literal() {
        let spec = Spec::object([(
            "mode",
            Spec::Default {
                primary: Box::new(Spec::Attr(AttrSpec::new("mode", Type::String))),
                fallback: Box::new(Spec::Literal(Value::string("auto"))),
            },
        )]);
        let (value, _) = decode_src("", &spec);
        assert_eq!(value, Value::object([("mode", Value::string("auto"))]));
        let (value, _) = decode_src("mode = \"manual\"", &spec);
        assert_eq!(value, Value::object([("mode", Value::string("manual"))]));
    }

    #[test]
    fn test_catch_all_attributes() {
        let spec = Spec::object([
            ("name", Spec::Attr(AttrSpec::new("name", Type::String))),
            (
                "extra",
                Spec::Attrs {
                    element_type: Type::Number,
                },
            ),
        ]);
        let (value, diags) = decode_src("name = \"x\"\nb = 2\na = \"1\"\n", &spec);
        assert!(diags.is_empty(), "{}", diags);
        assert_eq!(
            value,
            Value::object([
                ("name", Value::string("x")),
                (
                    "extra",
                    Value::map(Type::Number, [("a", Value::number(1)), ("b", Value::number(2))])
                ),
            ])
        );
    }

    #[test]
    fn test_all_problems_reported() {
        let spec = Spec::object([
            ("a", Spec::Attr(AttrSpec::new("a", Type::Number).required())),
            ("b", Spec::Attr(AttrSpec::new("b", Type::Number))),
        ]);
        let (_, diags) = decode_src("b = \"x\"\nzzz = 1\n", &spec);
        assert_eq!(diags.error_count(), 3);
    }
}
