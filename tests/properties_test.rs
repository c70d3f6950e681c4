mod common;

use common::{call, vars};
use hcleval::value::Number;
use hcleval::Value;
use proptest::prelude::*;

proptest! {
    #[test]
    fn number_literals_evaluate_to_themselves(
        whole in "0|[1-9][0-9]{0,50}",
        fraction in "[0-9]{0,40}",
    ) {
        let src = if fraction.is_empty() {
            whole.clone()
        } else {
            format!("{}.{}", whole, fraction)
        };
        let expected = Number::parse(&src).unwrap();
        let result = call("evalexpr", &[Value::string(src.clone()), Value::empty_object()]);
        prop_assert_eq!(result, Ok(Value::Number(expected)), "literal {}", src);
    }

    #[test]
    fn long_literals_render_every_digit(
        whole in "[1-9][0-9]{28,50}",
        fraction in "[0-9]{0,39}[1-9]",
    ) {
        let src = format!("{}.{}", whole, fraction);
        let template = Value::string(format!("${{{}}}", src));
        let result = call("evaltemplate", &[template, Value::empty_object()]);
        prop_assert_eq!(result, Ok(Value::string(src)));
    }

    #[test]
    fn evaluation_is_repeatable(a in -1000i64..1000, b in 1i64..1000) {
        let scope = vars([("a", Value::number(a)), ("b", Value::number(b))]);
        let src = Value::string("\"${a} / ${b} = ${a / b}\"");
        let first = call("evalexpr", &[src.clone(), scope.clone()]);
        let second = call("evalexpr", &[src, scope]);
        prop_assert!(first.is_ok());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn plain_text_templates_are_unchanged(text in "[a-zA-Z0-9 ,.!?-]{0,40}") {
        let result = call("evaltemplate", &[Value::string(text.clone()), Value::empty_object()]);
        prop_assert_eq!(result, Ok(Value::string(text)));
    }
}
