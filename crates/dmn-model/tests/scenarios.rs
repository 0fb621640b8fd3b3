//! End-to-end scenarios from spec.md §8, built directly against
//! `DefinitionBuilder` rather than DMN XML (that's `dmn-xml`'s concern).

use dmn_feel::value::Value;
use dmn_model::{
    Aggregator, DefinitionBuilder, HitPolicyKind, RawInputClause, RawOutputClause, RawRule,
};

fn input(expr: &str) -> RawInputClause {
    RawInputClause {
        expression: expr.to_string(),
        type_ref: None,
        allowed_values: None,
    }
}

fn output(name: &str, default: Option<&str>) -> RawOutputClause {
    RawOutputClause {
        name: name.to_string(),
        type_ref: None,
        allowed_values: None,
        default: default.map(str::to_string),
    }
}

fn rule(id: &str, inputs: &[&str], outputs: &[&str]) -> RawRule {
    RawRule {
        id: id.to_string(),
        inputs: inputs.iter().map(|s| s.to_string()).collect(),
        outputs: outputs.iter().map(|s| s.to_string()).collect(),
    }
}

/// `age10 = Age+10`, `Age2 = age10*2`, then a `First` table `MainDT` over
/// `[Age2, Pocet, Greeting]` producing `[Category, Eligible]` (spec.md §8's
/// end-to-end scenario).
fn build_main_dt() -> dmn_model::Definition {
    let mut builder = DefinitionBuilder::new();
    builder.add_input("Age", "number").unwrap();
    builder.add_input("Pocet", "number").unwrap();
    builder.add_input("Greeting", "string").unwrap();
    builder
        .add_expression_decision("age10", "age10", Some("number"), "Age+10", vec!["Age".into()])
        .unwrap();
    builder
        .add_expression_decision("Age2", "Age2", Some("number"), "age10*2", vec!["age10".into()])
        .unwrap();
    builder
        .add_table_decision(
            "MainDT",
            "Category",
            HitPolicyKind::First,
            None,
            vec![input("Age2"), input("Pocet"), input("Greeting")],
            vec![
                output("Category", Some("\"none\"")),
                output("Eligible", Some("false")),
            ],
            vec![
                rule(
                    "r1",
                    &["-", ">3", "\"sss\", \"www\""],
                    &["\"special\"", "true"],
                ),
                rule("r2", &["<50", "-", "-"], &["\"a\"", "false"]),
                rule("r3", &[">=50", "-", "\"po\""], &["\"c\"", "true"]),
            ],
            vec!["Age2".into(), "Pocet".into(), "Greeting".into()],
        )
        .unwrap();
    builder.build().unwrap()
}

/// `MainDT` has two output clauses, so its binding is a `Context`; pull a field out
/// of it the way a caller reading `result.outputs["Category"]` would.
fn field<'a>(result: &'a dmn_model::EvaluationResult, key: &str) -> &'a Value {
    match result.outputs.get("Category").expect("Category binding") {
        Value::Context(entries) => entries.get(key).expect("field present"),
        other => panic!("expected a Context binding, got {other:?}"),
    }
}

fn run_main_dt(age: Value, pocet: Value, greeting: Value) -> dmn_model::EvaluationResult {
    let def = build_main_dt();
    dmn_model::evaluate(
        &def,
        "MainDT",
        vec![
            ("Age".into(), age),
            ("Pocet".into(), pocet),
            ("Greeting".into(), greeting),
        ],
    )
    .unwrap()
}

#[test]
fn scenario_1_matches_the_age_bracket_by_greeting() {
    let result = run_main_dt(
        Value::Number(33.into()),
        Value::Number(1.into()),
        Value::String("po".into()),
    );
    assert_eq!(result.outputs.get("age10"), Some(&Value::Number(43.into())));
    assert_eq!(result.outputs.get("Age2"), Some(&Value::Number(86.into())));
    assert_eq!(field(&result, "Category"), &Value::String("c".into()));
    assert_eq!(field(&result, "Eligible"), &Value::Boolean(true));
}

#[test]
fn scenario_2_matches_the_lower_age_bracket() {
    let result = run_main_dt(
        Value::Number(5.into()),
        Value::Number(1.into()),
        Value::String("po".into()),
    );
    assert_eq!(result.outputs.get("age10"), Some(&Value::Number(15.into())));
    assert_eq!(result.outputs.get("Age2"), Some(&Value::Number(30.into())));
    assert_eq!(field(&result, "Category"), &Value::String("a".into()));
    assert_eq!(field(&result, "Eligible"), &Value::Boolean(false));
}

#[test]
fn scenario_3_first_returns_the_earliest_rule_even_when_a_later_rule_also_matches() {
    let result = run_main_dt(
        Value::Number(33.into()),
        Value::Number(10.into()),
        Value::String("sss".into()),
    );
    // Age2 = 86 would also satisfy r3 (`>=50`), but r1 (`Pocet>3 and Greeting in
    // ("sss","www")`) is declared first and First stops at the first match.
    assert_eq!(field(&result, "Category"), &Value::String("special".into()));
    assert_eq!(field(&result, "Eligible"), &Value::Boolean(true));
}

#[test]
fn scenario_4_null_propagation_falls_through_to_default_outputs() {
    let result = run_main_dt(Value::Null, Value::Number(1.into()), Value::String("xx".into()));
    assert_eq!(result.outputs.get("age10"), Some(&Value::Null));
    assert_eq!(result.outputs.get("Age2"), Some(&Value::Null));
    assert_eq!(field(&result, "Category"), &Value::String("none".into()));
    assert_eq!(field(&result, "Eligible"), &Value::Boolean(false));
}

#[test]
fn collect_sum_totals_amount_across_matching_region_rules() {
    let mut builder = DefinitionBuilder::new();
    builder.add_input("Region", "string").unwrap();
    builder
        .add_table_decision(
            "TotalAmount",
            "Amount",
            HitPolicyKind::Collect,
            Some(Aggregator::Sum),
            vec![input("Region")],
            vec![output("Amount", None)],
            vec![
                rule("r1", &["\"EU\""], &["10"]),
                rule("r2", &["\"EU\""], &["5"]),
                rule("r3", &["\"US\""], &["7"]),
            ],
            vec!["Region".into()],
        )
        .unwrap();
    let def = builder.build().unwrap();

    let result = dmn_model::evaluate(
        &def,
        "TotalAmount",
        vec![("Region".into(), Value::String("EU".into()))],
    )
    .unwrap();
    assert_eq!(result.outputs.get("Amount"), Some(&Value::Number(15.into())));
}

#[test]
fn collect_count_counts_non_numeric_matches_and_ignores_null() {
    let mut builder = DefinitionBuilder::new();
    builder.add_input("Region", "string").unwrap();
    builder
        .add_table_decision(
            "MatchedLabels",
            "Label",
            HitPolicyKind::Collect,
            Some(Aggregator::Count),
            vec![input("Region")],
            vec![output("Label", None)],
            vec![
                rule("r1", &["\"EU\""], &["\"a\""]),
                rule("r2", &["\"EU\""], &["\"b\""]),
                rule("r3", &["\"EU\""], &["null"]),
                rule("r4", &["\"US\""], &["\"c\""]),
            ],
            vec!["Region".into()],
        )
        .unwrap();
    let def = builder.build().unwrap();

    let result = dmn_model::evaluate(
        &def,
        "MatchedLabels",
        vec![("Region".into(), Value::String("EU".into()))],
    )
    .unwrap();
    // Three rules match ("r1", "r2", "r3"), but "r3"'s output is Null and must not be
    // counted — Count ignores Null but otherwise counts non-numeric matches too.
    assert_eq!(result.outputs.get("Label"), Some(&Value::Number(2.into())));
}

#[test]
fn priority_ranks_gold_ahead_of_bronze() {
    let mut builder = DefinitionBuilder::new();
    builder.add_input("Tier", "string").unwrap();
    builder
        .add_table_decision(
            "Medal",
            "Medal",
            HitPolicyKind::Priority,
            None,
            vec![input("Tier")],
            vec![RawOutputClause {
                name: "Medal".to_string(),
                type_ref: None,
                allowed_values: Some(vec!["gold".into(), "silver".into(), "bronze".into()]),
                default: None,
            }],
            vec![
                rule("r1", &["\"x\", \"y\""], &["\"bronze\""]),
                rule("r2", &["\"x\""], &["\"gold\""]),
            ],
            vec!["Tier".into()],
        )
        .unwrap();
    let def = builder.build().unwrap();

    let result = dmn_model::evaluate(&def, "Medal", vec![("Tier".into(), Value::String("x".into()))]).unwrap();
    assert_eq!(result.outputs.get("Medal"), Some(&Value::String("gold".into())));
}

#[test]
fn a_cyclic_requirement_graph_is_rejected_at_build_time() {
    let mut builder = DefinitionBuilder::new();
    builder
        .add_expression_decision("a", "a", None, "b+1", vec!["b".into()])
        .unwrap();
    builder
        .add_expression_decision("b", "b", None, "a+1", vec!["a".into()])
        .unwrap();
    let err = builder.build().unwrap_err();
    assert!(matches!(err, dmn_model::Error::ParseError(_)));
}

#[test]
fn every_trace_step_is_in_the_transitive_closure_and_appears_once() {
    let def = build_main_dt();
    let result = dmn_model::evaluate(
        &def,
        "MainDT",
        vec![
            ("Age".into(), Value::Number(33.into())),
            ("Pocet".into(), Value::Number(1.into())),
            ("Greeting".into(), Value::String("po".into())),
        ],
    )
    .unwrap();

    let names: Vec<&str> = result
        .trace
        .steps()
        .iter()
        .map(|s| s.decision_name.as_str())
        .collect();
    assert_eq!(names, vec!["age10", "Age2", "MainDT"]);

    let mut seen = std::collections::HashSet::new();
    for name in &names {
        assert!(seen.insert(*name), "decision '{name}' appeared more than once in the trace");
    }
}
