use crate::runtime::value::Value;
use crate::script::{eval, run, Script};
use std::collections::HashMap;

fn no_vars() -> HashMap<String, Value> {
    HashMap::new()
}

fn vars(entries: Vec<(&str, Value)>) -> HashMap<String, Value> {
    entries
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

#[test]
fn let_yields_the_bound_value() {
    let result = run("let x = 42", no_vars());
    assert!(result.is_ok(), "{:?}", result.errors);
    assert!(matches!(result.value, Value::Number(n) if n == 42.0));
    assert!(result.output.is_empty());
}

#[test]
fn string_concatenation_across_statements() {
    let source = "let name = \"Rill\"\nlet greeting = \"Hello \" + name\ngreeting";
    let result = run(source, no_vars());
    assert!(result.is_ok(), "{:?}", result.errors);
    assert_eq!(result.value.render(), "Hello Rill");
}

#[test]
fn elvis_supplies_default_for_null() {
    let source = "let x = null\nlet y = x ?: \"default\"\ny";
    let result = run(source, no_vars());
    assert!(result.is_ok(), "{:?}", result.errors);
    assert_eq!(result.value.render(), "default");
}

#[test]
fn safe_access_on_null_host_variable() {
    let source = "let status = user?.name ?: \"unknown\"\nstatus";
    let result = run(source, vars(vec![("user", Value::Null)]));
    assert!(result.is_ok(), "{:?}", result.errors);
    assert_eq!(result.value.render(), "unknown");
}

#[test]
fn recursive_factorial() {
    let source = "let factorial = fn(n) { if (n <= 1) { return 1 } return n * factorial(n - 1) }\nfactorial(10)";
    let result = run(source, no_vars());
    assert!(result.is_ok(), "{:?}", result.errors);
    assert!(matches!(result.value, Value::Number(n) if n == 3_628_800.0));
}

#[test]
fn print_lines_are_captured_in_order() {
    let result = run("print(\"Hello\")\nprint(\"World\")", no_vars());
    assert!(result.is_ok(), "{:?}", result.errors);
    assert!(result.value.is_null());
    assert_eq!(result.output, vec!["Hello", "World"]);
}

#[test]
fn operation_limit_aborts_injected_loop() {
    let arr = Value::array((1..=10).map(|n| Value::Number(n as f64)).collect());
    let result = Script::new("let sum = 0\nfor (i in arr) { sum = sum + i }\nsum")
        .with_variables(vars(vec![("arr", arr)]))
        .with_max_operations(5)
        .silent_print(true)
        .execute();
    assert_eq!(result.errors, vec!["operation limit exceeded"]);
}

#[test]
fn value_is_the_last_statement() {
    let result = run("let a = 1\nlet b = 2\na + b", no_vars());
    assert_eq!(result.value.render(), "3");

    // An if whose branch is not taken leaves null behind.
    let result = run("if (false) { 1 }", no_vars());
    assert!(result.value.is_null());
}

#[test]
fn top_level_return_stops_execution() {
    let result = run("return 7\nprint(\"unreachable\")", no_vars());
    assert!(result.is_ok(), "{:?}", result.errors);
    assert_eq!(result.value.render(), "7");
    assert!(result.output.is_empty());
}

#[test]
fn parse_errors_skip_evaluation() {
    let result = run("let = 1", no_vars());
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].starts_with("line 1, col 1:"), "{}", result.errors[0]);
    assert!(result.value.is_null());
}

#[test]
fn runtime_error_is_a_single_message() {
    let result = run("let x = 1\nx.y", no_vars());
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("cannot access property"), "{}", result.errors[0]);
}

#[test]
fn eval_returns_value_or_first_error() {
    assert_eq!(eval("2 + 3").unwrap().render(), "5");
    let err = eval("missing").unwrap_err();
    assert_eq!(err.to_string(), "undefined variable: missing");
}

#[test]
fn execution_is_deterministic() {
    let source = "let xs = [3, 1, 2]\nlet sorted = sort(xs)\nprint(join(sorted, \"-\"))\nfirst(sorted)";
    let first = run(source, no_vars());
    let second = run(source, no_vars());
    assert!(first.is_ok(), "{:?}", first.errors);
    assert_eq!(first.value.render(), second.value.render());
    assert_eq!(first.output, second.output);
}

#[test]
fn cached_and_uncached_parses_agree() {
    let source = "let x = 11\nx * 2";
    let cached_once = Script::new(source).silent_print(true).execute();
    let cached_twice = Script::new(source).silent_print(true).execute();
    let uncached = Script::new(source)
        .with_cache(false)
        .silent_print(true)
        .execute();
    assert_eq!(cached_once.value.render(), "22");
    assert_eq!(cached_twice.value.render(), "22");
    assert_eq!(uncached.value.render(), "22");
}

#[test]
fn template_end_to_end() {
    let source = "let user = {name: \"Ada\", score: 9.5}\n\"${user.name}: ${user.score * 2} points\"";
    let result = run(source, no_vars());
    assert!(result.is_ok(), "{:?}", result.errors);
    assert_eq!(result.value.render(), "Ada: 19 points");
}

#[test]
fn injected_containers_are_scriptable() {
    let order = Value::object(
        [
            ("id".to_string(), Value::Str("A-1".into())),
            ("total".to_string(), Value::Number(40.0)),
        ]
        .into_iter()
        .collect(),
    );
    let source = "if (order.total > 20) { order.id + \": big\" } else { order.id + \": small\" }";
    let result = run(source, vars(vec![("order", order)]));
    assert!(result.is_ok(), "{:?}", result.errors);
    assert_eq!(result.value.render(), "A-1: big");
}
