//! Arithmetic is associative under FEEL's Decimal semantics, regardless of how
//! the three operands group.

use quickcheck_macros::quickcheck;
use rust_decimal::Decimal;

use dmn_feel::value::Value;
use dmn_feel::{evaluate_expression, Environment};

fn eval_sum(src: &str) -> Decimal {
    let mut env = Environment::new();
    match evaluate_expression(src, &mut env).unwrap() {
        Value::Number(n) => n,
        other => panic!("expected a Number, got {other:?}"),
    }
}

#[quickcheck]
fn addition_of_three_numbers_is_associative(a: i32, b: i32, c: i32) -> bool {
    let (a, b, c) = (a as i64, b as i64, c as i64);
    let left = eval_sum(&format!("({a} + {b}) + {c}"));
    let right = eval_sum(&format!("{a} + ({b} + {c})"));
    left == right
}

#[quickcheck]
fn addition_of_three_numbers_is_commutative(a: i32, b: i32, c: i32) -> bool {
    let (a, b, c) = (a as i64, b as i64, c as i64);
    let one = eval_sum(&format!("{a} + {b} + {c}"));
    let shuffled = eval_sum(&format!("{c} + {a} + {b}"));
    one == shuffled
}
