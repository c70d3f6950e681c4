use std::collections::{BTreeMap, HashMap};

use crate::ast::{Block, Body};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::value::convert::{convert, list_or_tuple};
use crate::value::unify::unify;
use crate::value::{Type, Value};

use super::spec::{BlockListSpec, BlockMapSpec, BlockSpec};
use super::Decoder;

impl Decoder {
    pub(super) fn decode_block(&self, body: &Body, spec: &BlockSpec, diags: &mut Diagnostics) -> Value {
        let mut blocks = body.blocks_of_type(&spec.type_name);
        let Some(first) = blocks.next() else {
            if spec.required {
                diags.push(
                    Diagnostic::error(
                        format!("Missing {} block", spec.type_name),
                        format!("A block of type {:?} is required here.", spec.type_name),
                    )
                    .with_subject(body.missing_item_range()),
                );
            }
            return Value::null(spec.nested.implied_type());
        };
        for duplicate in blocks {
            diags.push(
                Diagnostic::error(
                    format!("Duplicate {} block", spec.type_name),
                    format!(
                        "Only one block of type {:?} is allowed. Previous definition was at {}.",
                        spec.type_name,
                        first.definition_range()
                    ),
                )
                .with_subject(duplicate.type_range.clone()),
            );
        }
        self.decode_unlabeled(first, &spec.nested, diags)
    }

    pub(super) fn decode_block_list(
        &self,
        body: &Body,
        spec: &BlockListSpec,
        diags: &mut Diagnostics,
    ) -> Value {
        let blocks: Vec<&Block> = body.blocks_of_type(&spec.type_name).collect();

        if blocks.len() < spec.min_items {
            diags.push(
                Diagnostic::error(
                    format!("Insufficient {} blocks", spec.type_name),
                    format!(
                        "At least {} {:?} blocks are required.",
                        spec.min_items, spec.type_name
                    ),
                )
                .with_subject(body.missing_item_range()),
            );
        }
        if spec.max_items > 0 {
            if let Some(extra) = blocks.get(spec.max_items) {
                diags.push(
                    Diagnostic::error(
                        format!("Too many {} blocks", spec.type_name),
                        format!(
                            "No more than {} {:?} blocks are allowed.",
                            spec.max_items, spec.type_name
                        ),
                    )
                    .with_subject(extra.definition_range()),
                );
            }
        }

        if blocks.is_empty() {
            return Value::list(spec.nested.implied_type(), Vec::new());
        }
        let items = blocks
            .into_iter()
            .map(|block| self.decode_unlabeled(block, &spec.nested, diags))
            .collect();
        list_or_tuple(items)
    }

    pub(super) fn decode_block_map(
        &self,
        body: &Body,
        spec: &BlockMapSpec,
        diags: &mut Diagnostics,
    ) -> Value {
        if spec.labels.is_empty() {
            return Value::Map(spec.nested.implied_type(), BTreeMap::new());
        }
        let mut seen: HashMap<&[String], &Block> = HashMap::new();
        let mut entries: Vec<(&[String], Value)> = Vec::new();

        for block in body.blocks_of_type(&spec.type_name) {
            if !self.check_labels(block, &spec.type_name, &spec.labels, diags) {
                continue;
            }
            if let Some(previous) = seen.get(block.labels.as_slice()) {
                diags.push(
                    Diagnostic::error(
                        format!("Duplicate {} block", spec.type_name),
                        format!(
                            "A block for {} was already defined at {}. The {} labels must be unique.",
                            quoted_labels(&block.labels),
                            previous.definition_range(),
                            spec.type_name
                        ),
                    )
                    .with_subject(block.definition_range()),
                );
                continue;
            }
            seen.insert(block.labels.as_slice(), block);
            let value = self.decode_body(&block.body, &spec.nested, diags);
            entries.push((block.labels.as_slice(), value));
        }

        nest(entries, 0, spec)
    }

    fn decode_unlabeled(&self, block: &Block, nested: &super::Spec, diags: &mut Diagnostics) -> Value {
        self.check_labels(block, &block.type_name, &[], diags);
        self.decode_body(&block.body, nested, diags)
    }

    /// Reports a block whose label count does not match `expected`.
    fn check_labels(
        &self,
        block: &Block,
        type_name: &str,
        expected: &[String],
        diags: &mut Diagnostics,
    ) -> bool {
        if block.labels.len() > expected.len() {
            let detail = if expected.is_empty() {
                format!("No labels are expected for {} blocks.", type_name)
            } else {
                format!("Only {} labels ({}) are expected for {} blocks.", expected.len(), expected.join(", "), type_name)
            };
            let subject = block
                .label_ranges
                .get(expected.len())
                .cloned()
                .unwrap_or_else(|| block.definition_range());
            diags.push(
                Diagnostic::error(format!("Extraneous label for {}", type_name), detail)
                    .with_subject(subject),
            );
            return false;
        }
        if block.labels.len() < expected.len() {
            let missing = &expected[block.labels.len()];
            diags.push(
                Diagnostic::error(
                    format!("Missing {} for {}", missing, type_name),
                    format!(
                        "All {} blocks must have {} labels ({}).",
                        type_name,
                        expected.len(),
                        expected.join(", ")
                    ),
                )
                .with_subject(block.definition_range()),
            );
            return false;
        }
        true
    }
}

/// Builds one map level per label from `(labels, value)` entries.
fn nest(entries: Vec<(&[String], Value)>, depth: usize, spec: &BlockMapSpec) -> Value {
    let remaining = spec.labels.len() - depth - 1;
    let element_type = (0..remaining).fold(spec.nested.implied_type(), |inner, _| Type::map(inner));

    let mut groups: BTreeMap<String, Vec<(&[String], Value)>> = BTreeMap::new();
    for (labels, value) in entries {
        groups.entry(labels[depth].clone()).or_default().push((labels, value));
    }

    let items: BTreeMap<String, Value> = groups
        .into_iter()
        .filter_map(|(key, group)| {
            let value = if remaining == 0 {
                group.into_iter().next().map(|(_, value)| value)?
            } else {
                nest(group, depth + 1, spec)
            };
            Some((key, value))
        })
        .collect();

    if items.is_empty() {
        return Value::Map(element_type, items);
    }
    as_map(items)
}

/// A map when the elements share a type, an object otherwise.
fn as_map(items: BTreeMap<String, Value>) -> Value {
    let types: Vec<Type> = items.values().map(Value::ty).collect();
    if let Some(element) = unify(&types) {
        let converted: Option<BTreeMap<String, Value>> = items
            .iter()
            .map(|(k, v)| convert(v, &element).ok().map(|v| (k.clone(), v)))
            .collect();
        if let Some(converted) = converted {
            return Value::Map(element, converted);
        }
    }
    Value::Object(items.into_iter().collect())
}

fn quoted_labels(labels: &[String]) -> String {
    labels
        .iter()
        .map(|l| format!("{:?}", l))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::super::{decode, AttrSpec, Spec};
    use super::*;
    use crate::analyzer::parse_config;
    use crate::eval::EvalContext;
    use pretty_assertions::assert_eq;

    fn decode_src(src: &str, spec: &Spec) -> (Value, Diagnostics) {
        let (body, parse_diags) = parse_config(src, "<src>");
        assert!(parse_diags.is_empty(), "{}", parse_diags);
        decode(&body, spec, Arc::new(EvalContext::new()))
    }

    fn port() -> Box<Spec> {
        Box::new(Spec::object([(
            "port",
            Spec::Attr(AttrSpec::new("port", Type::Number)),
        )]))
    }

    #[test]
    fn test_single_block() {
        let spec = Spec::object([(
            "server",
            Spec::Block(BlockSpec {
                type_name: "server".to_string(),
                required: true,
                nested: port(),
            }),
        )]);

        let (value, diags) = decode_src("server {\n  port = 80\n}\n", &spec);
        assert!(diags.is_empty(), "{}", diags);
        assert_eq!(
            value,
            Value::object([("server", Value::object([("port", Value::number(80))]))])
        );

        let (_, diags) = decode_src("", &spec);
        assert_eq!(diags.first().map(|d| d.summary.as_str()), Some("Missing server block"));

        let (_, diags) = decode_src("server {}\nserver {}\n", &spec);
        assert_eq!(diags.first().map(|d| d.summary.as_str()), Some("Duplicate server block"));

        let (_, diags) = decode_src("server \"a\" {}\n", &spec);
        assert_eq!(
            diags.to_string(),
            "<src>:1,8-11: Extraneous label for server; No labels are expected for server blocks."
        );
    }

    #[test]
    fn test_nested_body_checked() {
        let spec = Spec::object([(
            "server",
            Spec::Block(BlockSpec {
                type_name: "server".to_string(),
                required: false,
                nested: port(),
            }),
        )]);
        let (_, diags) = decode_src("server {\n  prot = 80\n}\n", &spec);
        assert_eq!(
            diags.to_string(),
            "<src>:2,3-7: Unsupported argument; An argument named \"prot\" is not expected here. Did you mean \"port\"?"
        );
    }

    #[test]
    fn test_block_list_bounds() {
        let spec = Spec::object([(
            "servers",
            Spec::BlockList(BlockListSpec {
                type_name: "server".to_string(),
                min_items: 1,
                max_items: 2,
                nested: port(),
            }),
        )]);

        let (value, diags) = decode_src("server {\n  port = 1\n}\nserver {\n  port = 2\n}\n", &spec);
        assert!(diags.is_empty(), "{}", diags);
        let element = Type::object([("port", Type::Number)]);
        assert_eq!(
            value,
            Value::object([(
                "servers",
                Value::list(
                    element.clone(),
                    vec![
                        Value::object([("port", Value::number(1))]),
                        Value::object([("port", Value::number(2))]),
                    ]
                )
            )])
        );

        let (value, diags) = decode_src("", &spec);
        assert_eq!(
            diags.first().map(|d| d.summary.as_str()),
            Some("Insufficient server blocks")
        );
        assert_eq!(value, Value::object([("servers", Value::list(element, vec![]))]));

        let (_, diags) = decode_src("server {}\nserver {}\nserver {}\n", &spec);
        assert_eq!(diags.first().map(|d| d.summary.as_str()), Some("Too many server blocks"));
    }

    #[test]
    fn test_block_set_removes_duplicates() {
        let spec = Spec::object([(
            "ports",
            Spec::BlockSet(BlockListSpec {
                type_name: "listen".to_string(),
                min_items: 0,
                max_items: 0,
                nested: Box::new(Spec::Attr(AttrSpec::new("port", Type::Number))),
            }),
        )]);
        let (value, diags) = decode_src(
            "listen {\n  port = 2\n}\nlisten {\n  port = 1\n}\nlisten {\n  port = 2\n}\n",
            &spec,
        );
        assert!(diags.is_empty(), "{}", diags);
        assert_eq!(
            value,
            Value::object([(
                "ports",
                Value::set(Type::Number, vec![Value::number(1), Value::number(2)])
            )])
        );
    }

    #[test]
    fn test_block_map_two_labels() {
        let spec = Spec::object([(
            "rules",
            Spec::BlockMap(BlockMapSpec {
                type_name: "rule".to_string(),
                labels: vec!["kind".to_string(), "name".to_string()],
                nested: Box::new(Spec::Attr(AttrSpec::new("port", Type::Number))),
            }),
        )]);
        let src = "rule \"in\" \"web\" {\n  port = 80\n}\nrule \"in\" \"ssh\" {\n  port = 22\n}\nrule \"out\" \"all\" {\n  port = 0\n}\n";
        let (value, diags) = decode_src(src, &spec);
        assert!(diags.is_empty(), "{}", diags);
        assert_eq!(
            value,
            Value::object([(
                "rules",
                Value::map(
                    Type::map(Type::Number),
                    [
                        (
                            "in",
                            Value::map(
                                Type::Number,
                                [("ssh", Value::number(22)), ("web", Value::number(80))]
                            )
                        ),
                        ("out", Value::map(Type::Number, [("all", Value::number(0))])),
                    ]
                )
            )])
        );

        let (_, diags) = decode_src("rule \"in\" {}\n", &spec);
        assert_eq!(
            diags.first().map(|d| d.summary.as_str()),
            Some("Missing name for rule")
        );

        let (_, diags) = decode_src("rule \"a\" \"b\" {}\nrule \"a\" \"b\" {}\n", &spec);
        assert_eq!(diags.first().map(|d| d.summary.as_str()), Some("Duplicate rule block"));
    }
}
