mod common;

use common::{call, vars};
use hcleval::{Type, Value};
use pretty_assertions::assert_eq;

fn evaltemplate(src: &str, vars: Value) -> Result<Value, String> {
    call("evaltemplate", &[Value::string(src), vars])
}

#[test]
fn test_interpolations_convert_to_string() {
    assert_eq!(evaltemplate("${1}", Value::empty_object()), Ok(Value::string("1")));
    assert_eq!(
        evaltemplate("${\"hello\"}", Value::empty_object()),
        Ok(Value::string("hello"))
    );
    assert_eq!(
        evaltemplate("${upper(\"hello\")}", Value::empty_object()),
        Ok(Value::string("HELLO"))
    );
    assert_eq!(
        evaltemplate("${foo}", vars([("foo", Value::string("hello"))])),
        Ok(Value::string("hello"))
    );
}

#[test]
fn test_unknown_interpolation() {
    assert_eq!(
        evaltemplate("${unk + 2}", vars([("unk", Value::unknown(Type::String))])),
        Ok(Value::unknown(Type::String).refine_not_null())
    );
}

#[test]
fn test_known_prefix_kept() {
    assert_eq!(
        evaltemplate("foo-${unk}", vars([("unk", Value::unknown(Type::String))])),
        Ok(Value::unknown(Type::String)
            .refine()
            .not_null()
            .string_prefix_full("foo-")
            .new_value())
    );
}

#[test]
fn test_extra_characters_in_interpolation() {
    assert_eq!(
        evaltemplate("${invalid syntax}", Value::empty_object()),
        Err("invalid syntax: <src>:1,11-17: Extra characters after interpolation expression; Expected a closing brace to end the interpolation expression, but found extra characters.\n\nThis can happen when you include interpolation syntax for another language, such as shell scripting, but forget to escape the interpolation start token. If this is an embedded sequence for another language, escape it by starting with \"$${\" instead of just \"${\".".to_string())
    );
}

#[test]
fn test_invalid_operand_in_interpolation() {
    assert_eq!(
        evaltemplate("${[] + 1}", Value::empty_object()),
        Err("evaluation failed: <src>:1,3-5: Invalid operand; Unsuitable value for left operand: number required.".to_string())
    );
}

#[test]
fn test_result_must_be_string() {
    assert_eq!(
        evaltemplate("${[]}", Value::empty_object()),
        Err("invalid result type: string required".to_string())
    );
}

#[test]
fn test_escapes_and_literal_text() {
    assert_eq!(
        evaltemplate("cost: $${price}", Value::empty_object()),
        Ok(Value::string("cost: ${price}"))
    );
}

#[test]
fn test_directives() {
    let scope = vars([
        ("items", Value::tuple(vec![Value::string("a"), Value::string("b")])),
        ("loud", Value::Bool(true)),
    ]);
    assert_eq!(
        evaltemplate(
            "%{ for x in items }[${x}]%{ endfor }%{ if loud }!%{ else }.%{ endif }",
            scope
        ),
        Ok(Value::string("[a][b]!"))
    );
}

#[test]
fn test_null_interpolation_rejected() {
    let err = evaltemplate("a${x}", vars([("x", Value::null(Type::String))])).unwrap_err();
    assert!(
        err.starts_with("evaluation failed: <src>:1,4-5: Invalid template interpolation value"),
        "{}",
        err
    );
}

#[test]
fn test_non_ascii_text_around_interpolation() {
    assert_eq!(
        evaltemplate("é-${x}!", vars([("x", Value::string("a"))])),
        Ok(Value::string("é-a!"))
    );
    assert_eq!(
        evaltemplate("日本 ${x} 語", vars([("x", Value::string("の"))])),
        Ok(Value::string("日本 の 語"))
    );
}
