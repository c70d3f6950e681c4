//! # Spec Language
//!
//! Loads decode specs written in the configuration syntax itself:
//!
//! ```text
//! variables {
//!   default_port = 8080
//! }
//!
//! function "greet" {
//!   params = [name]
//!   result = "hello, ${name}"
//! }
//!
//! object {
//!   attr "name" {
//!     type     = string
//!     required = true
//!   }
//!   block_list "listener" {
//!     object {
//!       attr "port" {
//!         type = number
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! A file holds exactly one root spec block plus any number of `variables`
//! and `function` blocks. The variables and functions form the scope that
//! decoded configuration is evaluated in.

mod loader;
mod types;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::ast::{Block, Body, Expression};
use crate::decoder::Spec;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::eval::function::{Function, FunctionError, FunctionSpec, FunctionTable, Parameter};
use crate::eval::{EvalContext, Evaluator};
use crate::functions::standard_library;
use crate::value::{Type, Value};

use loader::{is_spec_block, BodyReader, SpecLoader};

pub use types::type_from_expression;

const ROOT_DETAIL: &str =
    "A spec file must have exactly one root block specifying how to map to a JSON value.";

/// A loaded spec file: the root spec and the scope it defines.
#[derive(Debug, Clone)]
pub struct SpecFile {
    pub root: Spec,
    pub variables: BTreeMap<String, Value>,
    pub functions: FunctionTable,
}

/// Reads and loads the spec file at `path`. Diagnostics name the file by
/// the path as given.
#[tracing::instrument(level = "debug", skip_all, fields(path = %path.as_ref().display()))]
pub fn load_spec_file(path: impl AsRef<Path>) -> (Option<SpecFile>, Diagnostics) {
    let path = path.as_ref();
    match std::fs::read_to_string(path) {
        Ok(src) => load_spec(&src, &path.display().to_string()),
        Err(err) => {
            tracing::debug!(error = %err, "spec file not readable");
            let diag = Diagnostic::error(
                "Failed to read spec file",
                format!("The spec file {} could not be read: {}.", path.display(), err),
            );
            (None, Diagnostics::from_iter([diag]))
        }
    }
}

/// Loads a spec from source text. The result is `None` whenever the
/// diagnostics contain errors.
pub fn load_spec(src: &str, filename: &str) -> (Option<SpecFile>, Diagnostics) {
    let (body, mut diags) = crate::analyzer::parse_config(src, filename);
    if diags.has_errors() {
        return (None, diags);
    }
    let file = load_body(&body, &mut diags);
    if diags.has_errors() {
        return (None, diags);
    }
    (file, diags)
}

fn load_body(body: &Body, diags: &mut Diagnostics) -> Option<SpecFile> {
    let stdlib = Arc::new(standard_library());
    let literal_ctx = Arc::new(EvalContext::new().with_functions(stdlib.clone()));

    BodyReader::new(body, &[]).finish(diags);

    let mut variables = BTreeMap::new();
    for block in body.blocks_of_type("variables") {
        load_variables(block, &literal_ctx, &mut variables, diags);
    }

    let scope = Arc::new(
        EvalContext::new()
            .with_variables(variables.clone())
            .with_functions(stdlib),
    );
    let mut functions = FunctionTable::new();
    for block in body.blocks_of_type("function") {
        if let Some((name, function)) = load_function(block, &scope, diags) {
            if functions.insert(name.clone(), function).is_some() {
                diags.push(
                    Diagnostic::error(
                        "Duplicate function",
                        format!("A function named {:?} was already defined.", name),
                    )
                    .with_subject(block.definition_range()),
                );
            }
        }
    }

    let mut roots = Vec::new();
    for block in &body.blocks {
        match block.type_name.as_str() {
            "variables" | "function" => {}
            _ if is_spec_block(block) => roots.push(block),
            other => diags.push(
                Diagnostic::error(
                    "Invalid spec block",
                    format!("Blocks of type {:?} are not expected here.", other),
                )
                .with_subject(block.type_range.clone()),
            ),
        }
    }

    let root = match roots.as_slice() {
        [] => {
            diags.push(
                Diagnostic::error("Missing spec block", ROOT_DETAIL)
                    .with_subject(body.missing_item_range()),
            );
            return None;
        }
        [root] => SpecLoader::new(literal_ctx, diags).load(root)?,
        [_, extra, ..] => {
            diags.push(
                Diagnostic::error("Extraneous spec block", ROOT_DETAIL)
                    .with_subject(extra.definition_range()),
            );
            return None;
        }
    };

    Some(SpecFile {
        root,
        variables,
        functions,
    })
}

fn load_variables(
    block: &Block,
    ctx: &Arc<EvalContext>,
    variables: &mut BTreeMap<String, Value>,
    diags: &mut Diagnostics,
) {
    if !block.body.blocks.is_empty() || !block.labels.is_empty() {
        diags.push(
            Diagnostic::error(
                "Invalid spec block",
                "A variables block takes no labels and contains only attributes.",
            )
            .with_subject(block.definition_range()),
        );
    }
    for attr in block.body.attributes.values() {
        if variables.contains_key(&attr.name) {
            diags.push(
                Diagnostic::error(
                    "Duplicate variable",
                    format!("A variable named {:?} was already defined.", attr.name),
                )
                .with_subject(attr.name_range.clone()),
            );
            continue;
        }
        let mut loader_diags = Diagnostics::new();
        let value = SpecLoader::new(ctx.clone(), &mut loader_diags).evaluate(&attr.expr);
        diags.extend(loader_diags);
        if let Some(value) = value {
            variables.insert(attr.name.clone(), value);
        }
    }
}

/// Builds a function whose result expression is evaluated with the
/// parameters bound as variables on top of the spec file's own scope.
fn load_function(
    block: &Block,
    scope: &Arc<EvalContext>,
    diags: &mut Diagnostics,
) -> Option<(String, Function)> {
    let Some(name) = block.labels.first().cloned() else {
        diags.push(
            Diagnostic::error(
                "Missing spec label",
                "A function block must have a label giving the function name.",
            )
            .with_subject(block.definition_range()),
        );
        return None;
    };

    let reader = BodyReader::new(&block.body, &["params", "variadic_param", "result"]);
    let params = match reader.take("params") {
        Some(expr) => parameter_names(expr, diags)?,
        None => Vec::new(),
    };
    let variadic = match reader.take("variadic_param") {
        Some(expr) => Some(parameter_name(expr, diags)?),
        None => None,
    };
    let result = reader.take("result").cloned();
    reader.finish(diags);

    let Some(result) = result else {
        diags.push(
            Diagnostic::error(
                "Missing required argument",
                "The argument \"result\" is required, but no definition was found.",
            )
            .with_subject(block.definition_range()),
        );
        return None;
    };

    let scope = scope.clone();
    let bound_params = params.clone();
    let bound_variadic = variadic.clone();
    let mut spec = FunctionSpec::new(
        format!("User-defined function {:?}.", name),
        Type::Dynamic,
        move |args| {
            let mut locals: BTreeMap<String, Value> = bound_params
                .iter()
                .cloned()
                .zip(args.iter().cloned())
                .collect();
            if let Some(rest) = &bound_variadic {
                let extra = args.get(bound_params.len()..).unwrap_or_default().to_vec();
                locals.insert(rest.clone(), Value::tuple(extra));
            }
            let ctx = Arc::new(EvalContext::child(scope.clone(), locals));
            let (value, diags) = Evaluator::new(ctx).evaluate(&result);
            if diags.has_errors() {
                return Err(FunctionError::call(diags.to_string()));
            }
            Ok(value)
        },
    );
    for param in params {
        spec = spec.param(Parameter::new(param, Type::Dynamic).allow_null());
    }
    if let Some(rest) = variadic {
        spec = spec.variadic(Parameter::new(rest, Type::Dynamic).allow_null());
    }
    Some((name, Function::new(spec)))
}

fn parameter_names(expr: &Expression, diags: &mut Diagnostics) -> Option<Vec<String>> {
    match &expr.kind {
        crate::ast::ExpressionKind::Tuple(items) => items
            .iter()
            .map(|item| parameter_name(item, diags))
            .collect(),
        _ => {
            diags.push(
                Diagnostic::error(
                    "Invalid parameter list",
                    "The params argument must be a list of parameter names.",
                )
                .with_subject(expr.range.clone()),
            );
            None
        }
    }
}

fn parameter_name(expr: &Expression, diags: &mut Diagnostics) -> Option<String> {
    match expr.as_keyword() {
        Some(name) => Some(name.to_string()),
        None => {
            diags.push(
                Diagnostic::error(
                    "Invalid parameter name",
                    "Parameter names must be given as bare identifiers.",
                )
                .with_subject(expr.range.clone()),
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{AttrSpec, BlockListSpec};
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn load_ok(src: &str) -> SpecFile {
        let (file, diags) = load_spec(src, "test.hcldec");
        assert!(!diags.has_errors(), "{}", diags);
        file.unwrap()
    }

    fn load_err(src: &str) -> String {
        let (file, diags) = load_spec(src, "test.hcldec");
        assert!(file.is_none());
        diags.to_string()
    }

    #[test]
    fn test_simple_object() {
        let file = load_ok("object {\n  attr \"name\" {\n    type = string\n  }\n}\n");
        assert_eq!(
            file.root,
            Spec::object([("name", Spec::Attr(AttrSpec::new("name", Type::String)))])
        );
        assert!(file.variables.is_empty());
        assert!(file.functions.is_empty());
    }

    #[test]
    fn test_attr_name_and_required() {
        let file = load_ok(
            "object {\n  attr \"id\" {\n    name     = \"identifier\"\n    type     = number\n    required = true\n  }\n}\n",
        );
        assert_eq!(
            file.root,
            Spec::object([(
                "id",
                Spec::Attr(AttrSpec::new("identifier", Type::Number).required())
            )])
        );
    }

    #[test]
    fn test_block_list() {
        let file = load_ok(
            "block_list \"listener\" {\n  min_items = 1\n  attr {\n    name = \"port\"\n    type = number\n  }\n}\n",
        );
        assert_eq!(
            file.root,
            Spec::BlockList(BlockListSpec {
                type_name: "listener".to_string(),
                min_items: 1,
                max_items: 0,
                nested: Box::new(Spec::Attr(AttrSpec::new("port", Type::Number))),
            })
        );
    }

    #[test]
    fn test_default_folds_right() {
        let file = load_ok(
            "default {\n  attr {\n    name = \"a\"\n    type = string\n  }\n  attr {\n    name = \"b\"\n    type = string\n  }\n  literal {\n    value = \"c\"\n  }\n}\n",
        );
        let Spec::Default { primary, fallback } = file.root else {
            panic!("expected a default spec");
        };
        assert_eq!(*primary, Spec::Attr(AttrSpec::new("a", Type::String)));
        assert!(matches!(*fallback, Spec::Default { .. }));
    }

    #[test]
    fn test_variables_and_functions() {
        let file = load_ok(
            "variables {\n  greeting = \"hello\"\n}\nfunction \"greet\" {\n  params = [name]\n  result = \"${greeting}, ${upper(name)}\"\n}\nliteral {\n  value = 1\n}\n",
        );
        assert_eq!(file.variables.get("greeting"), Some(&Value::string("hello")));
        let greet = file.functions.get("greet").unwrap();
        assert_eq!(
            greet.call(&[Value::string("bob")]).unwrap(),
            Value::string("hello, BOB")
        );
    }

    #[test]
    fn test_variadic_function() {
        let file = load_ok(
            "function \"count\" {\n  params = [first]\n  variadic_param = rest\n  result = 1 + length(rest)\n}\nliteral {\n  value = null\n}\n",
        );
        let count = file.functions.get("count").unwrap();
        assert_eq!(
            count
                .call(&[Value::number(1), Value::number(2), Value::number(3)])
                .unwrap(),
            Value::number(3)
        );
    }

    #[test]
    fn test_root_block_count() {
        assert_eq!(
            load_err("variables {\n  a = 1\n}\n"),
            "test.hcldec:1,1-1: Missing spec block; A spec file must have exactly one root block specifying how to map to a JSON value."
        );
        assert!(load_err("object {}\nobject {}\n").starts_with("test.hcldec:2,1-7: Extraneous spec block"));
    }

    #[test]
    fn test_nested_spec_needs_label() {
        assert!(load_err("object {\n  attr {\n    type = string\n  }\n}\n")
            .contains("Missing spec label"));
    }

    #[test]
    fn test_invalid_type_reported() {
        assert_eq!(
            load_err("attr \"x\" {\n  type = strin\n}\n"),
            "test.hcldec:2,10-15: Invalid type specification; The keyword \"strin\" is not a valid type specification."
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "attr \"name\" {{\n  type = string\n}}").unwrap();
        let (spec, diags) = load_spec_file(file.path());
        assert!(diags.is_empty(), "{}", diags);
        assert_eq!(
            spec.unwrap().root,
            Spec::Attr(AttrSpec::new("name", Type::String))
        );
    }

    #[test]
    fn test_missing_file() {
        let (spec, diags) = load_spec_file("does/not/exist.hcldec");
        assert!(spec.is_none());
        assert!(diags
            .to_string()
            .starts_with("Failed to read spec file; The spec file does/not/exist.hcldec could not be read"));
    }
}
