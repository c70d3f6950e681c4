use std::sync::Arc;

use crate::analyzer::parse_config_limited;
use crate::decoder::Decoder;
use crate::eval::function::{FunctionError, FunctionResult, FunctionSpec, FunctionTable, Parameter};
use crate::eval::EvalContext;
use crate::speclang::load_spec_file;
use crate::value::{Type, Value};

use super::{src_arg, src_param, variables, vars_param, Engine};

pub(super) fn evalconfig(engine: Arc<Engine>) -> FunctionSpec {
    FunctionSpec::new(
        "Evaluates HCL configuration source code in \"Just Attributes\" mode, returning an object representing the attributes.",
        Type::Dynamic,
        move |args| run(&engine, args),
    )
    .param(src_param(
        "The source code of the HCL native syntax configuration to parse and evaluate.",
    ))
    .param(
        Parameter::new("specfile", Type::String).describe(
            "Path to the file containing the hcldec specification describing how to interpret the configuration.",
        ),
    )
    .param(vars_param(
        "An object describing any additional variables to include in the evaluation scope.",
    ))
}

#[tracing::instrument(level = "debug", skip_all)]
fn run(engine: &Engine, args: &[Value]) -> FunctionResult {
    let Some(vars) = variables(args.get(2).unwrap_or(&Value::dynamic()), 2)? else {
        return Ok(Value::dynamic());
    };
    let src = src_arg(args);
    let spec_path = args.get(1).and_then(Value::as_str).unwrap_or_default();
    tracing::debug!(spec = spec_path, src_len = src.len(), vars = vars.len(), "decoding");

    let (spec_file, diags) = load_spec_file(spec_path);
    let Some(spec_file) = spec_file.filter(|_| !diags.has_errors()) else {
        tracing::warn!(first = ?diags.first(), "spec file rejected");
        return Err(FunctionError::argument(1, format!("invalid spec file: {}", diags)));
    };

    let (body, diags) = parse_config_limited(src, &engine.config.source_name, engine.limits.max_depth);
    if diags.has_errors() {
        tracing::warn!(first = ?diags.first(), "syntax errors");
        return Err(FunctionError::argument(0, format!("invalid syntax: {}", diags)));
    }

    // spec file functions shadow built-ins of the same name
    let mut functions: FunctionTable = (*engine.stdlib).clone();
    functions.extend(spec_file.functions);

    let base = Arc::new(
        EvalContext::new()
            .with_variables(spec_file.variables)
            .with_functions(Arc::new(functions)),
    );
    let ctx = if vars.is_empty() {
        base
    } else {
        Arc::new(EvalContext::child(base, vars))
    };

    let (result, diags) = Decoder::new(ctx)
        .with_limits(engine.limits)
        .decode(&body, &spec_file.root);
    if diags.has_errors() {
        tracing::warn!(first = ?diags.first(), "decode errors");
        return Err(FunctionError::argument(
            0,
            format!("evaluation failed: {}", diags),
        ));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use crate::provider::Provider;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    const SPEC: &str = r#"
variables {
  suffix = "!"
}

function "shout" {
  params = [s]
  result = "${upper(s)}${suffix}"
}

object {
  attr "greeting" {
    type = string
  }
}
"#;

    fn spec_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SPEC.as_bytes()).unwrap();
        file
    }

    fn evalconfig(src: &str, spec: &str, vars: Value) -> Result<Value, String> {
        Provider::default()
            .call("evalconfig", &[Value::string(src), Value::string(spec), vars])
            .map_err(|e| e.to_string())
    }

    #[test]
    fn test_spec_scope_available() {
        let file = spec_file();
        let path = file.path().display().to_string();
        assert_eq!(
            evalconfig("greeting = shout(\"hi\")", &path, Value::empty_object()),
            Ok(Value::object([("greeting", Value::string("HI!"))]))
        );
    }

    #[test]
    fn test_extra_vars_shadow_spec_vars() {
        let file = spec_file();
        let path = file.path().display().to_string();
        let vars = Value::object([("suffix", Value::string("?"))]);
        assert_eq!(
            evalconfig("greeting = suffix", &path, vars),
            Ok(Value::object([("greeting", Value::string("?"))]))
        );
    }

    #[test]
    fn test_missing_spec_file() {
        let err = evalconfig("", "no/such/spec.hcldec", Value::empty_object()).unwrap_err();
        assert!(err.starts_with("invalid spec file: Failed to read spec file"));
    }

    #[test]
    fn test_vars_checked_first() {
        assert_eq!(
            evalconfig("", "no/such/spec.hcldec", Value::string("x")),
            Err("must be an object whose attributes represent the variables to include in the HCL evaluation scope".to_string())
        );
    }
}
