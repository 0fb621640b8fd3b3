//! Decision-table evaluation: rule matching, hit policies, aggregation
//! (spec.md §4.6).

use indexmap::IndexMap;
use rust_decimal::Decimal;

use dmn_feel::value::Value;
use dmn_feel::{eval, eval_unary_test};

use crate::context::ExecutionContext;
use crate::error::{Error, Result};
use crate::model::{Aggregator, DecisionTable, HitPolicy, OutputClause};

pub type OutputRow = IndexMap<String, Value>;

/// A table's result before it is bound to the decision's output variable. Single-output
/// hit policies (Unique/Any/First/Priority/Collect+aggregator) collapse to one row;
/// Rule-order and bare Collect keep every matched rule's row (spec.md §4.6).
pub enum TableOutcome {
    Single(OutputRow),
    Multiple(Vec<OutputRow>),
}

pub struct TableEvaluation {
    pub matched_rule_ids: Vec<String>,
    pub outcome: TableOutcome,
}

pub fn evaluate_table(
    decision_name: &str,
    table: &DecisionTable,
    ctx: &mut ExecutionContext,
) -> Result<TableEvaluation> {
    let mut inputs = Vec::with_capacity(table.inputs.len());
    for clause in &table.inputs {
        let v =
            eval(&clause.expr, ctx.environment()).map_err(|e| Error::from_feel(decision_name, e))?;
        inputs.push(v);
    }

    let mut matches: Vec<(usize, OutputRow)> = Vec::new();
    'rule: for (idx, rule) in table.rules.iter().enumerate() {
        for (test, input) in rule.inputs.iter().zip(&inputs) {
            match eval_unary_test(test, input, ctx.environment()) {
                Ok(Value::Boolean(true)) => continue,
                // A sub-test that errors or yields false/Null demotes the whole rule to
                // non-match rather than aborting the table (spec.md §7).
                _ => continue 'rule,
            }
        }
        let mut row = IndexMap::new();
        for (clause, expr) in table.outputs.iter().zip(&rule.outputs) {
            let v =
                eval(expr, ctx.environment()).map_err(|e| Error::from_feel(decision_name, e))?;
            row.insert(clause.name.clone(), v);
        }
        matches.push((idx, row));
    }

    let matched_rule_ids: Vec<String> = matches
        .iter()
        .map(|(idx, _)| table.rules[*idx].id.clone())
        .collect();

    let outcome = match table.hit_policy {
        HitPolicy::Unique => {
            if matches.len() > 1 {
                return Err(Error::HitPolicyViolation {
                    decision: decision_name.to_string(),
                    message: format!(
                        "UNIQUE hit policy matched {} rules: [{}]",
                        matches.len(),
                        matched_rule_ids.join(", ")
                    ),
                });
            }
            let rows: Vec<OutputRow> = matches.into_iter().map(|(_, row)| row).collect();
            TableOutcome::Single(single_or_default(rows, table, decision_name, ctx)?)
        }
        HitPolicy::Any => {
            if let Some((_, first)) = matches.first() {
                for (_, row) in &matches[1..] {
                    if !rows_agree(first, row) {
                        return Err(Error::HitPolicyViolation {
                            decision: decision_name.to_string(),
                            message: format!(
                                "ANY hit policy matched rules with differing outputs: [{}]",
                                matched_rule_ids.join(", ")
                            ),
                        });
                    }
                }
            }
            let rows: Vec<OutputRow> = matches.into_iter().map(|(_, row)| row).collect();
            TableOutcome::Single(single_or_default(rows, table, decision_name, ctx)?)
        }
        HitPolicy::First => {
            let rows: Vec<OutputRow> = matches.into_iter().map(|(_, row)| row).collect();
            TableOutcome::Single(single_or_default(rows, table, decision_name, ctx)?)
        }
        HitPolicy::Priority => {
            let winner = priority_best(matches, &table.outputs);
            let rows: Vec<OutputRow> = winner.into_iter().collect();
            TableOutcome::Single(single_or_default(rows, table, decision_name, ctx)?)
        }
        HitPolicy::RuleOrder | HitPolicy::Collect => {
            TableOutcome::Multiple(matches.into_iter().map(|(_, row)| row).collect())
        }
        HitPolicy::CollectAgg(agg) => {
            let rows: Vec<OutputRow> = matches.into_iter().map(|(_, row)| row).collect();
            if rows.is_empty() {
                TableOutcome::Single(default_row(decision_name, &table.outputs, ctx)?)
            } else {
                TableOutcome::Single(aggregate_rows(&rows, &table.outputs, agg))
            }
        }
    };

    Ok(TableEvaluation {
        matched_rule_ids,
        outcome,
    })
}

fn single_or_default(
    mut rows: Vec<OutputRow>,
    table: &DecisionTable,
    decision_name: &str,
    ctx: &mut ExecutionContext,
) -> Result<OutputRow> {
    if rows.is_empty() {
        default_row(decision_name, &table.outputs, ctx)
    } else {
        Ok(rows.remove(0))
    }
}

fn default_row(
    decision_name: &str,
    outputs: &[OutputClause],
    ctx: &mut ExecutionContext,
) -> Result<OutputRow> {
    let mut row = IndexMap::new();
    for clause in outputs {
        let v = match &clause.default {
            Some(expr) => {
                eval(expr, ctx.environment()).map_err(|e| Error::from_feel(decision_name, e))?
            }
            None => Value::Null,
        };
        row.insert(clause.name.clone(), v);
    }
    Ok(row)
}

fn rows_agree(a: &OutputRow, b: &OutputRow) -> bool {
    a.len() == b.len() && a.iter().all(|(k, v)| b.get(k).is_some_and(|bv| v.feel_eq(bv)))
}

/// An unlisted or `Null` output value ranks after every declared allowed value
/// (spec.md's resolved open question on Priority ranking).
fn priority_rank(row: &OutputRow, outputs: &[OutputClause]) -> Vec<usize> {
    outputs
        .iter()
        .map(|clause| match &clause.allowed_values {
            Some(values) => {
                let rendered = row.get(&clause.name).map(|v| v.to_string());
                match rendered {
                    Some(s) => values.iter().position(|v| *v == s).unwrap_or(values.len()),
                    None => values.len(),
                }
            }
            None => 0,
        })
        .collect()
}

/// Picks the matched row with the best (lowest) rank, comparing multi-output ranks
/// lexicographically across output-clause declaration order; ties keep the
/// earliest-matched rule.
fn priority_best(matches: Vec<(usize, OutputRow)>, outputs: &[OutputClause]) -> Option<OutputRow> {
    let mut best: Option<(Vec<usize>, OutputRow)> = None;
    for (_, row) in matches {
        let rank = priority_rank(&row, outputs);
        match &best {
            Some((best_rank, _)) if rank >= *best_rank => {}
            _ => best = Some((rank, row)),
        }
    }
    best.map(|(_, row)| row)
}

fn aggregate_rows(rows: &[OutputRow], outputs: &[OutputClause], agg: Aggregator) -> OutputRow {
    let mut result = IndexMap::new();
    for clause in outputs {
        // Count ignores Null but counts non-numeric matches too (spec.md's "Count
        // ignores Null"), so it's computed before the Sum/Min/Max numeric filter.
        if agg == Aggregator::Count {
            let count = rows
                .iter()
                .filter_map(|row| row.get(&clause.name))
                .filter(|v| !matches!(v, Value::Null))
                .count();
            result.insert(clause.name.clone(), Value::Number(Decimal::from(count as u64)));
            continue;
        }

        let values: Vec<Decimal> = rows
            .iter()
            .filter_map(|row| row.get(&clause.name))
            .filter_map(|v| match v {
                Value::Number(d) => Some(*d),
                _ => None,
            })
            .collect();
        let aggregated = match agg {
            Aggregator::Count => unreachable!("handled above"),
            Aggregator::Sum => Value::Number(values.iter().sum()),
            Aggregator::Min => values
                .iter()
                .min()
                .copied()
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Aggregator::Max => values
                .iter()
                .max()
                .copied()
                .map(Value::Number)
                .unwrap_or(Value::Null),
        };
        result.insert(clause.name.clone(), aggregated);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{DefinitionBuilder, HitPolicyKind, RawInputClause, RawOutputClause, RawRule};

    fn input_clause(expr: &str) -> RawInputClause {
        RawInputClause {
            expression: expr.to_string(),
            type_ref: None,
            allowed_values: None,
        }
    }

    fn output_clause(name: &str) -> RawOutputClause {
        RawOutputClause {
            name: name.to_string(),
            type_ref: None,
            allowed_values: None,
            default: None,
        }
    }

    fn rule(id: &str, inputs: &[&str], outputs: &[&str]) -> RawRule {
        RawRule {
            id: id.to_string(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn unique_selects_the_single_matching_rule() {
        let mut builder = DefinitionBuilder::new();
        builder.add_input("age", "number").unwrap();
        builder
            .add_table_decision(
                "Bucket",
                "bucket",
                HitPolicyKind::Unique,
                None,
                vec![input_clause("age")],
                vec![output_clause("bucket")],
                vec![
                    rule("1", &["<18"], &["\"minor\""]),
                    rule("2", &[">=18"], &["\"adult\""]),
                ],
                vec!["age".to_string()],
            )
            .unwrap();
        let def = builder.build().unwrap();
        let table = match &def.decision("Bucket").unwrap().kind {
            crate::model::DecisionKind::Table(t) => t,
            _ => unreachable!(),
        };
        let mut ctx = ExecutionContext::new();
        ctx.set_input("age", Value::Number(20.into()));
        let result = evaluate_table("Bucket", table, &mut ctx).unwrap();
        assert_eq!(result.matched_rule_ids, vec!["2"]);
        match result.outcome {
            TableOutcome::Single(row) => {
                assert_eq!(row.get("bucket"), Some(&Value::String("adult".into())));
            }
            _ => panic!("expected single outcome"),
        }
    }

    #[test]
    fn collect_sum_aggregates_matching_rows() {
        let mut builder = DefinitionBuilder::new();
        builder.add_input("region", "string").unwrap();
        builder
            .add_table_decision(
                "Total",
                "total",
                HitPolicyKind::Collect,
                Some(Aggregator::Sum),
                vec![input_clause("region")],
                vec![output_clause("total")],
                vec![
                    rule("1", &["\"EU\", \"US\""], &["10"]),
                    rule("2", &["\"EU\""], &["5"]),
                    rule("3", &["\"APAC\""], &["100"]),
                ],
                vec!["region".to_string()],
            )
            .unwrap();
        let def = builder.build().unwrap();
        let table = match &def.decision("Total").unwrap().kind {
            crate::model::DecisionKind::Table(t) => t,
            _ => unreachable!(),
        };
        let mut ctx = ExecutionContext::new();
        ctx.set_input("region", Value::String("EU".into()));
        let result = evaluate_table("Total", table, &mut ctx).unwrap();
        assert_eq!(result.matched_rule_ids, vec!["1", "2"]);
        match result.outcome {
            TableOutcome::Single(row) => {
                assert_eq!(row.get("total"), Some(&Value::Number(15.into())));
            }
            _ => panic!("expected single outcome"),
        }
    }
}
