//! Turns spec blocks into [`Spec`] trees.

use std::sync::Arc;

use crate::ast::{Block, Body, Expression};
use crate::decoder::{AttrSpec, BlockListSpec, BlockMapSpec, BlockSpec, Spec};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::eval::{EvalContext, Evaluator};
use crate::value::{convert::convert, Type, Value};

use super::types::type_from_expression;

/// Block types that describe a spec.
pub(super) const SPEC_BLOCK_TYPES: &[&str] = &[
    "object",
    "attr",
    "block",
    "block_list",
    "block_set",
    "block_map",
    "literal",
    "default",
    "attrs",
];

pub(super) fn is_spec_block(block: &Block) -> bool {
    SPEC_BLOCK_TYPES.contains(&block.type_name.as_str())
}

/// Reads spec blocks, collecting every problem found along the way.
pub(super) struct SpecLoader<'a> {
    ctx: Arc<EvalContext>,
    diags: &'a mut Diagnostics,
}

impl<'a> SpecLoader<'a> {
    pub(super) fn new(ctx: Arc<EvalContext>, diags: &'a mut Diagnostics) -> Self {
        Self { ctx, diags }
    }

    /// Decodes one spec block. `None` when the block is too broken to
    /// produce a spec at all.
    pub(super) fn load(&mut self, block: &Block) -> Option<Spec> {
        let label = block.labels.first().map(String::as_str);
        if block.labels.len() > 1 {
            self.diags.push(
                Diagnostic::error(
                    "Invalid spec block",
                    format!("A {} spec block may have at most one label.", block.type_name),
                )
                .with_subject(
                    block
                        .label_ranges
                        .get(1)
                        .cloned()
                        .unwrap_or_else(|| block.definition_range()),
                ),
            );
        }

        match block.type_name.as_str() {
            "object" => self.load_object(block),
            "attr" => self.load_attr(block, label),
            "block" => self.load_block(block, label),
            "block_list" => self
                .load_block_list(block, label)
                .map(Spec::BlockList),
            "block_set" => self.load_block_list(block, label).map(Spec::BlockSet),
            "block_map" => self.load_block_map(block, label),
            "literal" => self.load_literal(block),
            "default" => self.load_default(block),
            "attrs" => self.load_attrs(block),
            other => {
                self.diags.push(
                    Diagnostic::error(
                        "Invalid spec block",
                        format!(
                            "Blocks of type {:?} are not expected here. Expected one of: {}.",
                            other,
                            SPEC_BLOCK_TYPES.join(", ")
                        ),
                    )
                    .with_subject(block.type_range.clone()),
                );
                None
            }
        }
    }

    fn load_object(&mut self, block: &Block) -> Option<Spec> {
        BodyReader::new(&block.body, &[]).finish(self.diags);

        let mut children = indexmap::IndexMap::new();
        for child in &block.body.blocks {
            let Some(key) = child.labels.first().cloned() else {
                self.diags.push(
                    Diagnostic::error(
                        "Missing spec label",
                        "Spec blocks nested inside an object block must have a label, which is the name of the resulting attribute.",
                    )
                    .with_subject(child.definition_range()),
                );
                continue;
            };
            if let Some(spec) = self.load(child) {
                children.insert(key, spec);
            }
        }
        Some(Spec::Object(children))
    }

    fn load_attr(&mut self, block: &Block, label: Option<&str>) -> Option<Spec> {
        let reader = BodyReader::new(&block.body, &["name", "type", "required"]);
        let name = self
            .string(reader.take("name"))
            .or_else(|| label.map(str::to_string));
        let ty = match reader.take("type") {
            Some(expr) => self.type_expr(expr),
            None => {
                self.missing_argument(block, "type");
                None
            }
        };
        let required = self.bool(reader.take("required")).unwrap_or(false);
        reader.finish(self.diags);
        self.no_nested_blocks(block);

        let Some(name) = name else {
            self.missing_argument(block, "name");
            return None;
        };
        let mut spec = AttrSpec::new(name, ty?);
        spec.required = required;
        Some(Spec::Attr(spec))
    }

    fn load_block(&mut self, block: &Block, label: Option<&str>) -> Option<Spec> {
        let reader = BodyReader::new(&block.body, &["block_type", "required"]);
        let type_name = self.block_type(&reader, block, label);
        let required = self.bool(reader.take("required")).unwrap_or(false);
        reader.finish(self.diags);
        let nested = self.single_nested(block)?;
        Some(Spec::Block(BlockSpec {
            type_name: type_name?,
            required,
            nested: Box::new(nested),
        }))
    }

    fn load_block_list(&mut self, block: &Block, label: Option<&str>) -> Option<BlockListSpec> {
        let reader =
            BodyReader::new(&block.body, &["block_type", "min_items", "max_items"]);
        let type_name = self.block_type(&reader, block, label);
        let min_items = self.count(reader.take("min_items")).unwrap_or(0);
        let max_items = self.count(reader.take("max_items")).unwrap_or(0);
        reader.finish(self.diags);
        let nested = self.single_nested(block)?;

        if max_items > 0 && min_items > max_items {
            self.diags.push(
                Diagnostic::error(
                    "Invalid spec block",
                    "The min_items argument must not be greater than max_items.",
                )
                .with_subject(block.definition_range()),
            );
            return None;
        }
        Some(BlockListSpec {
            type_name: type_name?,
            min_items,
            max_items,
            nested: Box::new(nested),
        })
    }

    fn load_block_map(&mut self, block: &Block, label: Option<&str>) -> Option<Spec> {
        let reader = BodyReader::new(&block.body, &["block_type", "labels"]);
        let type_name = self.block_type(&reader, block, label);
        let labels = match reader.take("labels") {
            Some(expr) => self.string_list(expr),
            None => {
                self.missing_argument(block, "labels");
                None
            }
        };
        reader.finish(self.diags);
        let nested = self.single_nested(block)?;

        let labels = labels?;
        if labels.is_empty() {
            self.diags.push(
                Diagnostic::error(
                    "Invalid spec block",
                    "A block_map spec must declare at least one label.",
                )
                .with_subject(block.definition_range()),
            );
            return None;
        }
        Some(Spec::BlockMap(BlockMapSpec {
            type_name: type_name?,
            labels,
            nested: Box::new(nested),
        }))
    }

    fn load_literal(&mut self, block: &Block) -> Option<Spec> {
        let reader = BodyReader::new(&block.body, &["value"]);
        let value = reader.take("value");
        reader.finish(self.diags);
        self.no_nested_blocks(block);
        match value {
            Some(expr) => self.evaluate(expr).map(Spec::Literal),
            None => {
                self.missing_argument(block, "value");
                None
            }
        }
    }

    fn load_default(&mut self, block: &Block) -> Option<Spec> {
        BodyReader::new(&block.body, &[]).finish(self.diags);
        if block.body.blocks.len() < 2 {
            self.diags.push(
                Diagnostic::error(
                    "Missing spec block",
                    "A default block must have at least two nested spec blocks.",
                )
                .with_subject(block.definition_range()),
            );
            return None;
        }
        let specs: Vec<Spec> = block
            .body
            .blocks
            .iter()
            .filter_map(|child| self.load(child))
            .collect();
        specs.into_iter().rev().reduce(|fallback, primary| Spec::Default {
            primary: Box::new(primary),
            fallback: Box::new(fallback),
        })
    }

    fn load_attrs(&mut self, block: &Block) -> Option<Spec> {
        let reader = BodyReader::new(&block.body, &["element_type"]);
        let element_type = match reader.take("element_type") {
            Some(expr) => self.type_expr(expr),
            None => {
                self.missing_argument(block, "element_type");
                None
            }
        };
        reader.finish(self.diags);
        self.no_nested_blocks(block);
        Some(Spec::Attrs {
            element_type: element_type?,
        })
    }

    fn block_type(
        &mut self,
        reader: &BodyReader<'_>,
        block: &Block,
        label: Option<&str>,
    ) -> Option<String> {
        let name = self
            .string(reader.take("block_type"))
            .or_else(|| label.map(str::to_string));
        if name.is_none() {
            self.missing_argument(block, "block_type");
        }
        name
    }

    /// The one spec block nested inside a block-decoding spec.
    fn single_nested(&mut self, block: &Block) -> Option<Spec> {
        let detail = format!(
            "A {} spec block must have exactly one child spec specifying how to decode block contents.",
            block.type_name
        );
        match block.body.blocks.as_slice() {
            [] => {
                self.diags.push(
                    Diagnostic::error("Missing spec block", detail)
                        .with_subject(block.definition_range()),
                );
                None
            }
            [child] => self.load(child),
            [_, extra, ..] => {
                self.diags.push(
                    Diagnostic::error("Extraneous spec block", detail)
                        .with_subject(extra.definition_range()),
                );
                None
            }
        }
    }

    fn no_nested_blocks(&mut self, block: &Block) {
        for child in &block.body.blocks {
            self.diags.push(
                Diagnostic::error(
                    "Extraneous spec block",
                    format!("A {} spec block may not contain nested blocks.", block.type_name),
                )
                .with_subject(child.type_range.clone()),
            );
        }
    }

    fn missing_argument(&mut self, block: &Block, name: &str) {
        self.diags.push(
            Diagnostic::error(
                "Missing required argument",
                format!("The argument {:?} is required, but no definition was found.", name),
            )
            .with_subject(block.definition_range()),
        );
    }

    fn type_expr(&mut self, expr: &Expression) -> Option<Type> {
        match type_from_expression(expr) {
            Ok(ty) => Some(ty),
            Err(diag) => {
                self.diags.push(diag);
                None
            }
        }
    }

    pub(super) fn evaluate(&mut self, expr: &Expression) -> Option<Value> {
        let (value, diags) = Evaluator::new(self.ctx.clone()).evaluate(expr);
        let failed = diags.has_errors();
        self.diags.extend(diags);
        if failed {
            return None;
        }
        if !value.is_wholly_known() {
            self.diags.push(
                Diagnostic::error(
                    "Invalid spec block",
                    "Values in a spec file must be known when the file is loaded.",
                )
                .with_subject(expr.range.clone()),
            );
            return None;
        }
        Some(value)
    }

    fn typed(&mut self, expr: Option<&Expression>, ty: &Type) -> Option<Value> {
        let expr = expr?;
        let value = self.evaluate(expr)?;
        match convert(&value, ty) {
            Ok(value) if !value.is_null() => Some(value),
            Ok(_) => None,
            Err(err) => {
                self.diags.push(
                    Diagnostic::error(
                        "Invalid spec block",
                        format!("Unsuitable value: {}.", err),
                    )
                    .with_subject(expr.range.clone()),
                );
                None
            }
        }
    }

    fn string(&mut self, expr: Option<&Expression>) -> Option<String> {
        match self.typed(expr, &Type::String)? {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    fn bool(&mut self, expr: Option<&Expression>) -> Option<bool> {
        self.typed(expr, &Type::Bool)?.as_bool()
    }

    fn count(&mut self, expr: Option<&Expression>) -> Option<usize> {
        let range = expr.map(|e| e.range.clone());
        let value = self.typed(expr, &Type::Number)?;
        match value.as_number()?.to_usize() {
            Some(count) => Some(count),
            None => {
                let mut diag = Diagnostic::error(
                    "Invalid spec block",
                    "A block count must be a non-negative whole number.",
                );
                if let Some(range) = range {
                    diag = diag.with_subject(range);
                }
                self.diags.push(diag);
                None
            }
        }
    }

    fn string_list(&mut self, expr: &Expression) -> Option<Vec<String>> {
        match self.typed(Some(expr), &Type::list(Type::String))? {
            Value::List(_, items) => Some(
                items
                    .into_iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect(),
            ),
            _ => None,
        }
    }
}

/// Hands out a body's attributes by name, then reports the ones nobody
/// asked for.
pub(super) struct BodyReader<'b> {
    body: &'b Body,
    allowed: &'b [&'b str],
}

impl<'b> BodyReader<'b> {
    pub(super) fn new(body: &'b Body, allowed: &'b [&'b str]) -> Self {
        Self { body, allowed }
    }

    pub(super) fn take(&self, name: &str) -> Option<&'b Expression> {
        self.body.attributes.get(name).map(|attr| &attr.expr)
    }

    pub(super) fn finish(self, diags: &mut Diagnostics) {
        for attr in self.body.attributes.values() {
            if self.allowed.contains(&attr.name.as_str()) {
                continue;
            }
            let suggestion = crate::suggest::did_you_mean(&attr.name, self.allowed.iter().copied());
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
}

