//! FEEL (Friendly Enough Expression Language) lexer, parser, value system, and
//! evaluator.

pub mod ast;
pub mod builtins;
pub mod env;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod temporal;
pub mod token;
pub mod value;

pub use ast::{Expr, UnaryTest};
pub use env::Environment;
pub use error::{Error, Result};
pub use eval::{eval, eval_lenient, eval_unary_test};
pub use parser::{parse_expression, parse_unary_test};
pub use value::{Type, Value};

/// Parses and evaluates a FEEL expression string against an environment in one
/// step (the common case for decision-table input expressions and literal
/// expression decisions).
pub fn evaluate_expression(src: &str, env: &mut Environment) -> Result<Value> {
    let expr = parse_expression(src)?;
    eval(&expr, env)
}

/// Parses a `simple_unary_tests` string and evaluates it against an already-computed
/// input value.
pub fn evaluate_unary_test(src: &str, input: &Value, env: &mut Environment) -> Result<Value> {
    let test = parse_unary_test(src)?;
    eval_unary_test(&test, input, env)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluates_arithmetic() {
        let mut env = Environment::new();
        let v = evaluate_expression("1 + 2 * 3", &mut env).unwrap();
        assert_eq!(v, Value::Number(rust_decimal::Decimal::from(7)));
    }

    #[test]
    fn resolves_multi_word_name() {
        let mut env = Environment::new();
        env.bind("Loan Amount", Value::Number(rust_decimal::Decimal::from(1000)));
        let v = evaluate_expression("Loan Amount", &mut env).unwrap();
        assert_eq!(v, Value::Number(rust_decimal::Decimal::from(1000)));
    }

    #[test]
    fn unknown_name_errors_in_strict_expression_context() {
        let mut env = Environment::new();
        let err = evaluate_expression("Unknown Var", &mut env).unwrap_err();
        assert!(matches!(err, Error::UnknownName(_)));
    }

    #[test]
    fn unresolved_name_is_null_in_unary_test_context() {
        let mut env = Environment::new();
        let v = evaluate_unary_test("Unknown Var", &Value::Number(rust_decimal::Decimal::from(1)), &mut env).unwrap();
        assert_eq!(v, Value::Boolean(false));
    }

    #[test]
    fn three_valued_and_with_null() {
        let mut env = Environment::new();
        let v = evaluate_expression("true and null", &mut env).unwrap();
        assert_eq!(v, Value::Null);
        let v = evaluate_expression("false and null", &mut env).unwrap();
        assert_eq!(v, Value::Boolean(false));
    }

    #[test]
    fn range_unary_test() {
        let mut env = Environment::new();
        let v = evaluate_unary_test("[1..10]", &Value::Number(rust_decimal::Decimal::from(5)), &mut env).unwrap();
        assert_eq!(v, Value::Boolean(true));
    }

    #[test]
    fn for_expression_with_partial() {
        let mut env = Environment::new();
        let v = evaluate_expression("for x in [1,2,3] return x + count(partial)", &mut env).unwrap();
        assert_eq!(
            v,
            Value::List(vec![
                Value::Number(rust_decimal::Decimal::from(1)),
                Value::Number(rust_decimal::Decimal::from(3)),
                Value::Number(rust_decimal::Decimal::from(5)),
            ])
        );
    }
}
