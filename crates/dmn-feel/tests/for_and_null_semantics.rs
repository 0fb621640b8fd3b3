//! `for` iteration and the three-valued comparison semantics that drive
//! decision-table matching.

use dmn_feel::value::Value;
use dmn_feel::{evaluate_expression, evaluate_unary_test, Environment};

#[test]
fn for_over_a_list_returns_the_same_elements_in_order() {
    let mut env = Environment::new();
    let v = evaluate_expression("for x in [1, 2, 3] return x", &mut env).unwrap();
    assert_eq!(
        v,
        Value::List(vec![
            Value::Number(1.into()),
            Value::Number(2.into()),
            Value::Number(3.into()),
        ])
    );
}

#[test]
fn for_result_compares_equal_to_the_source_list_built_directly() {
    let mut env = Environment::new();
    let roundtripped = evaluate_expression("for x in [1, 2, 3] return x", &mut env).unwrap();
    let direct = evaluate_expression("[1, 2, 3]", &mut env).unwrap();
    assert_eq!(roundtripped, direct);
}

#[test]
fn equality_against_null_is_false_inequality_is_true() {
    let mut env = Environment::new();
    assert_eq!(
        evaluate_expression("3 = null", &mut env).unwrap(),
        Value::Boolean(false)
    );
    assert_eq!(
        evaluate_expression("3 != null", &mut env).unwrap(),
        Value::Boolean(true)
    );
}

#[test]
fn ordering_comparisons_against_null_are_null() {
    let mut env = Environment::new();
    for op in ["<", ">", "<=", ">="] {
        let src = format!("3 {op} null");
        assert_eq!(
            evaluate_expression(&src, &mut env).unwrap(),
            Value::Null,
            "3 {op} null should be Null"
        );
    }
}

#[test]
fn unary_test_wildcard_matches_every_input_including_null() {
    let mut env = Environment::new();
    for input in [
        Value::Number(42.into()),
        Value::String("anything".into()),
        Value::Boolean(false),
        Value::Null,
    ] {
        let result = evaluate_unary_test("-", &input, &mut env).unwrap();
        assert_eq!(result, Value::Boolean(true), "- should match {input:?}");
    }
}
