//! Dependency resolution and evaluation-pass orchestration (spec.md §4.7).

use std::collections::HashSet;

use indexmap::IndexMap;

use dmn_feel::eval;
use dmn_feel::value::Value;

use crate::context::ExecutionContext;
use crate::error::{Error, Result};
use crate::model::{Decision, DecisionKind, Definition, OutputClause};
use crate::table::{self, OutputRow, TableOutcome};
use crate::trace::{Step, StepKind, StepOutcome, Trace};

pub struct EvaluationResult {
    pub outputs: IndexMap<String, Value>,
    pub trace: Trace,
}

/// Evaluates a single target decision and its transitive required decisions.
pub fn evaluate(
    definition: &Definition,
    target: &str,
    inputs: Vec<(String, Value)>,
) -> Result<EvaluationResult> {
    evaluate_many(definition, &[target], inputs)
}

/// Evaluates every root decision (one not required by any other decision), unioning
/// their transitive requirements into a single pass.
pub fn evaluate_all_roots(
    definition: &Definition,
    inputs: Vec<(String, Value)>,
) -> Result<EvaluationResult> {
    let roots: Vec<&str> = definition.roots.iter().map(|s| s.as_str()).collect();
    evaluate_many(definition, &roots, inputs)
}

fn evaluate_many(
    definition: &Definition,
    targets: &[&str],
    inputs: Vec<(String, Value)>,
) -> Result<EvaluationResult> {
    let mut ctx = ExecutionContext::new();
    for warning in &definition.warnings {
        ctx.warn(warning.clone());
    }
    for (name, value) in inputs {
        ctx.set_input(name, value);
    }

    let mut seen = HashSet::new();
    let mut order: Vec<&Decision> = Vec::new();
    for target in targets {
        let decision = definition
            .decision(target)
            .ok_or_else(|| Error::ParseError(format!("unknown decision '{target}'")))?;
        collect_order(definition, decision, &mut seen, &mut order)?;
    }

    let mut outputs = IndexMap::new();
    for decision in order {
        if ctx.is_bound(&decision.output_variable) {
            continue;
        }
        let value = evaluate_decision(decision, &mut ctx)?;
        outputs.insert(decision.output_variable.clone(), value);
    }

    Ok(EvaluationResult {
        outputs,
        trace: ctx.into_trace(),
    })
}

/// Post-order DFS over the required-decisions graph: a decision is appended only after
/// every decision it requires, giving a valid topological order. Siblings are visited
/// in their declared order, matching spec.md's "stable, declaration order" requirement.
/// Cycles cannot occur here — `DefinitionBuilder::build` rejects them at load time.
fn collect_order<'a>(
    definition: &'a Definition,
    decision: &'a Decision,
    seen: &mut HashSet<&'a str>,
    order: &mut Vec<&'a Decision>,
) -> Result<()> {
    if seen.contains(decision.name.as_str()) {
        return Ok(());
    }
    seen.insert(&decision.name);
    for req in &decision.required_decisions {
        let required = definition.decision(req).ok_or_else(|| {
            Error::ParseError(format!(
                "decision '{}' requires unknown decision '{req}'",
                decision.name
            ))
        })?;
        collect_order(definition, required, seen, order)?;
    }
    order.push(decision);
    Ok(())
}

fn evaluate_decision(decision: &Decision, ctx: &mut ExecutionContext) -> Result<Value> {
    match &decision.kind {
        DecisionKind::Expression(expr) => match eval(expr, ctx.environment()) {
            Ok(value) => {
                ctx.set_output(&decision.output_variable, value.clone());
                ctx.record(Step {
                    decision_name: decision.name.clone(),
                    kind: StepKind::Expression,
                    outcome: StepOutcome::Expression(value.clone()),
                });
                Ok(value)
            }
            Err(e) => {
                let err = Error::from_feel(&decision.name, e);
                ctx.record(Step {
                    decision_name: decision.name.clone(),
                    kind: StepKind::Expression,
                    outcome: StepOutcome::Error(err.to_string()),
                });
                Err(err)
            }
        },
        DecisionKind::Table(dt) => match table::evaluate_table(&decision.name, dt, ctx) {
            Ok(evaluation) => {
                let single_output = dt.outputs.len() == 1;
                let (value, trace_outputs) = match evaluation.outcome {
                    TableOutcome::Single(row) => {
                        let trace_outputs = row.clone();
                        (row_to_value(row, single_output), trace_outputs)
                    }
                    TableOutcome::Multiple(rows) => {
                        let trace_outputs = multiple_outputs_trace(&rows, &dt.outputs);
                        let value = Value::List(
                            rows.into_iter()
                                .map(|r| row_to_value(r, single_output))
                                .collect(),
                        );
                        (value, trace_outputs)
                    }
                };
                ctx.set_output(&decision.output_variable, value.clone());
                ctx.record(Step {
                    decision_name: decision.name.clone(),
                    kind: StepKind::Table,
                    outcome: StepOutcome::Table {
                        matched_rule_ids: evaluation.matched_rule_ids,
                        outputs: trace_outputs,
                    },
                });
                Ok(value)
            }
            Err(e) => {
                ctx.record(Step {
                    decision_name: decision.name.clone(),
                    kind: StepKind::Table,
                    outcome: StepOutcome::Error(e.to_string()),
                });
                Err(e)
            }
        },
    }
}

fn row_to_value(row: OutputRow, single_output: bool) -> Value {
    if single_output {
        row.into_values().next().unwrap_or(Value::Null)
    } else {
        Value::Context(row)
    }
}

fn multiple_outputs_trace(rows: &[OutputRow], outputs: &[OutputClause]) -> IndexMap<String, Value> {
    let mut result = IndexMap::new();
    for clause in outputs {
        let values: Vec<Value> = rows
            .iter()
            .filter_map(|row| row.get(&clause.name).cloned())
            .collect();
        result.insert(clause.name.clone(), Value::List(values));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{DefinitionBuilder, HitPolicyKind, RawInputClause, RawOutputClause, RawRule};

    #[test]
    fn chains_expression_decisions_through_a_table() {
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
                vec![
                    RawInputClause {
                        expression: "Age2".into(),
                        type_ref: None,
                        allowed_values: None,
                    },
                    RawInputClause {
                        expression: "Pocet".into(),
                        type_ref: None,
                        allowed_values: None,
                    },
                    RawInputClause {
                        expression: "Greeting".into(),
                        type_ref: None,
                        allowed_values: None,
                    },
                ],
                vec![RawOutputClause {
                    name: "Category".into(),
                    type_ref: None,
                    allowed_values: None,
                    default: Some("\"none\"".into()),
                }],
                vec![
                    RawRule {
                        id: "1".into(),
                        inputs: vec![">=20".into(), "-".into(), "-".into()],
                        outputs: vec!["\"big\"".into()],
                    },
                    RawRule {
                        id: "2".into(),
                        inputs: vec!["-".into(), "-".into(), "-".into()],
                        outputs: vec!["\"small\"".into()],
                    },
                ],
                vec!["Age2".into(), "Pocet".into(), "Greeting".into()],
            )
            .unwrap();
        let def = builder.build().unwrap();

        let result = evaluate(
            &def,
            "MainDT",
            vec![
                ("Age".into(), Value::Number(5.into())),
                ("Pocet".into(), Value::Number(1.into())),
                ("Greeting".into(), Value::String("hi".into())),
            ],
        )
        .unwrap();

        assert_eq!(result.outputs.get("Category"), Some(&Value::String("big".into())));
        assert_eq!(result.trace.steps().len(), 3);
    }

    #[test]
    fn a_decision_is_evaluated_at_most_once_per_pass() {
        let mut builder = DefinitionBuilder::new();
        builder.add_input("x", "number").unwrap();
        builder
            .add_expression_decision("shared", "shared", Some("number"), "x+1", vec!["x".into()])
            .unwrap();
        builder
            .add_expression_decision("a", "a", None, "shared*2", vec!["shared".into()])
            .unwrap();
        builder
            .add_expression_decision("b", "b", None, "shared*3", vec!["shared".into()])
            .unwrap();
        let def = builder.build().unwrap();

        let result = evaluate_all_roots(&def, vec![("x".into(), Value::Number(1.into()))]).unwrap();
        let shared_steps = result
            .trace
            .steps()
            .iter()
            .filter(|s| s.decision_name == "shared")
            .count();
        assert_eq!(shared_steps, 1);
    }
}
