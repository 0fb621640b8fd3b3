//! Parsing the same source twice must yield the same AST, across a representative
//! corpus of FEEL expressions. `dmn_feel::ast::Expr` has no unparser (nothing in
//! this engine needs to re-render an AST back to source), so "round-trip" here
//! means parser determinism rather than parse-then-print-then-reparse.

use dmn_feel::parse_expression;

const CORPUS: &[&str] = &[
    "1 + 2",
    "1 + 2 * 3",
    "(1 + 2) * 3",
    "-5",
    "true and false",
    "true or false",
    "not(true)",
    "3 = 3",
    "3 != 4",
    "3 < 4",
    "3 <= 4",
    "\"abc\" + \"def\"",
    "[1, 2, 3]",
    "[1, 2, 3][1]",
    "{ a: 1, b: 2 }",
    "{ a: 1 }.a",
    "if true then 1 else 2",
    "for x in [1, 2, 3] return x * 2",
    "some x in [1, 2, 3] satisfies x > 1",
    "every x in [1, 2, 3] satisfies x > 0",
    "Age + 10",
    "Loan Amount * 2",
    "date(\"2024-01-01\")",
];

#[test]
fn reparsing_the_same_source_yields_an_identical_ast() {
    for src in CORPUS {
        let first = parse_expression(src).unwrap_or_else(|e| panic!("parse '{src}' failed: {e}"));
        let second = parse_expression(src).unwrap_or_else(|e| panic!("reparse '{src}' failed: {e}"));
        assert_eq!(first, second, "parsing '{src}' was not deterministic");
    }
}
