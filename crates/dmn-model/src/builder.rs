//! Definition builder: the model-ingest interface an external XML (or other) reader
//! drives to construct a validated `Definition` (spec.md §6.2).

use std::collections::{HashMap, HashSet};

use dmn_feel::value::Type;
use dmn_feel::{parse_expression, parse_unary_test};

use crate::error::{Error, Result};
use crate::model::{
    normalize, Aggregator, Decision, DecisionKind, DecisionTable, Definition, HitPolicy,
    InputClause, OutputClause, Rule, Variable,
};

/// Hit policy without an aggregator attached; `DefinitionBuilder::add_table_decision`
/// pairs it with an optional `Aggregator` and validates the combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitPolicyKind {
    Unique,
    First,
    Priority,
    Any,
    RuleOrder,
    Collect,
}

pub struct RawInputClause {
    pub expression: String,
    pub type_ref: Option<String>,
    pub allowed_values: Option<Vec<String>>,
}

pub struct RawOutputClause {
    pub name: String,
    pub type_ref: Option<String>,
    pub allowed_values: Option<Vec<String>>,
    pub default: Option<String>,
}

pub struct RawRule {
    pub id: String,
    /// One `simple_unary_tests` source string per input clause; `"-"` for wildcard.
    pub inputs: Vec<String>,
    /// One `expression` source string per output clause.
    pub outputs: Vec<String>,
}

#[derive(Default)]
pub struct DefinitionBuilder {
    inputs: Vec<Variable>,
    decisions: Vec<Decision>,
    /// One `required` list per decision, keyed by its index in `decisions`. Kept
    /// separate from `Decision::required_decisions`/`required_inputs` until `build()`,
    /// since a decision's requirements may name a decision added later.
    raw_required: Vec<Vec<String>>,
    input_names: HashSet<String>,
    decision_names: HashSet<String>,
    warnings: Vec<String>,
}

impl DefinitionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a model-level warning to surface once per evaluation pass, via the
    /// trace, rather than failing the build outright.
    pub fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn add_input(&mut self, name: impl Into<String>, type_ref: &str) -> Result<()> {
        let name = name.into();
        if !self.input_names.insert(name.clone()) {
            return Err(Error::ParseError(format!("duplicate input name '{name}'")));
        }
        self.inputs
            .push(Variable::new(name, Type::from_type_ref(type_ref), true));
        Ok(())
    }

    pub fn add_expression_decision(
        &mut self,
        name: impl Into<String>,
        output_var: impl Into<String>,
        output_type: Option<&str>,
        expression_text: &str,
        required: Vec<String>,
    ) -> Result<()> {
        let name = name.into();
        self.reserve_decision_name(&name)?;
        let expr = parse_expression(expression_text).map_err(|e| {
            Error::ParseError(format!("decision '{name}': {e}"))
        })?;
        self.decisions.push(Decision {
            normalized_name: normalize(&name),
            output_variable: output_var.into(),
            output_type: output_type.map(Type::from_type_ref).unwrap_or(Type::Any),
            kind: DecisionKind::Expression(expr),
            required_decisions: Vec::new(),
            required_inputs: Vec::new(),
            name,
        });
        self.raw_required.push(required);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_table_decision(
        &mut self,
        name: impl Into<String>,
        output_var: impl Into<String>,
        hit_policy: HitPolicyKind,
        aggregator: Option<Aggregator>,
        inputs: Vec<RawInputClause>,
        outputs: Vec<RawOutputClause>,
        rules: Vec<RawRule>,
        required: Vec<String>,
    ) -> Result<()> {
        let name = name.into();
        self.reserve_decision_name(&name)?;

        let hit_policy = resolve_hit_policy(hit_policy, aggregator)
            .map_err(|message| Error::ParseError(format!("decision '{name}': {message}")))?;

        let input_clauses: Vec<InputClause> = inputs
            .into_iter()
            .map(|raw| -> Result<InputClause> {
                Ok(InputClause {
                    expr: parse_expression(&raw.expression)
                        .map_err(|e| Error::ParseError(format!("decision '{name}': {e}")))?,
                    type_ref: raw.type_ref.as_deref().map(Type::from_type_ref),
                    allowed_values: raw.allowed_values,
                })
            })
            .collect::<Result<_>>()?;

        let output_clauses: Vec<OutputClause> = outputs
            .into_iter()
            .map(|raw| -> Result<OutputClause> {
                if hit_policy == HitPolicy::Priority
                    && raw.allowed_values.as_ref().is_none_or(|v| v.is_empty())
                {
                    return Err(Error::ParseError(format!(
                        "decision '{name}': Priority hit policy requires a non-empty allowed-value list on output '{}'",
                        raw.name
                    )));
                }
                Ok(OutputClause {
                    default: raw
                        .default
                        .as_deref()
                        .map(parse_expression)
                        .transpose()
                        .map_err(|e| Error::ParseError(format!("decision '{name}': {e}")))?,
                    type_ref: raw.type_ref.as_deref().map(Type::from_type_ref),
                    allowed_values: raw.allowed_values,
                    name: raw.name,
                })
            })
            .collect::<Result<_>>()?;

        let rule_count_inputs = input_clauses.len();
        let rule_count_outputs = output_clauses.len();
        let parsed_rules: Vec<Rule> = rules
            .into_iter()
            .map(|raw| -> Result<Rule> {
                if raw.inputs.len() != rule_count_inputs || raw.outputs.len() != rule_count_outputs {
                    return Err(Error::TableSchemaError {
                        decision: name.clone(),
                        message: format!(
                            "rule '{}' has {} input(s)/{} output(s), table declares {}/{}",
                            raw.id,
                            raw.inputs.len(),
                            raw.outputs.len(),
                            rule_count_inputs,
                            rule_count_outputs
                        ),
                    });
                }
                Ok(Rule {
                    inputs: raw
                        .inputs
                        .iter()
                        .map(|s| parse_unary_test(s))
                        .collect::<dmn_feel::Result<_>>()
                        .map_err(|e| Error::ParseError(format!("decision '{name}', rule '{}': {e}", raw.id)))?,
                    outputs: raw
                        .outputs
                        .iter()
                        .map(|s| parse_expression(s))
                        .collect::<dmn_feel::Result<_>>()
                        .map_err(|e| Error::ParseError(format!("decision '{name}', rule '{}': {e}", raw.id)))?,
                    id: raw.id,
                })
            })
            .collect::<Result<_>>()?;

        let output_type = match output_clauses.as_slice() {
            [single] => single.type_ref.clone().unwrap_or(Type::Any),
            _ => Type::Any,
        };

        self.decisions.push(Decision {
            normalized_name: normalize(&name),
            output_variable: output_var.into(),
            output_type,
            kind: DecisionKind::Table(DecisionTable {
                hit_policy,
                inputs: input_clauses,
                outputs: output_clauses,
                rules: parsed_rules,
            }),
            required_decisions: Vec::new(),
            required_inputs: Vec::new(),
            name,
        });
        self.raw_required.push(required);
        Ok(())
    }

    fn reserve_decision_name(&mut self, name: &str) -> Result<()> {
        if !self.decision_names.insert(name.to_string()) {
            return Err(Error::ParseError(format!("duplicate decision name '{name}'")));
        }
        Ok(())
    }

    pub fn build(mut self) -> Result<Definition> {
        let decision_index: HashMap<String, usize> = self
            .decisions
            .iter()
            .enumerate()
            .map(|(i, d)| (d.name.clone(), i))
            .collect();
        let input_index: HashMap<String, usize> = self
            .inputs
            .iter()
            .enumerate()
            .map(|(i, v)| (v.name.clone(), i))
            .collect();

        // Decision-vs-input partitioning happens here rather than at each `add_*` call
        // so that a decision may declare a requirement on a decision added later.
        for (idx, required) in self.raw_required.iter().enumerate() {
            let (decisions, inputs): (Vec<String>, Vec<String>) = required
                .iter()
                .cloned()
                .partition(|r| decision_index.contains_key(r));
            self.decisions[idx].required_decisions = decisions;
            self.decisions[idx].required_inputs = inputs;
        }

        for decision in &self.decisions {
            for req in decision
                .required_decisions
                .iter()
                .chain(decision.required_inputs.iter())
            {
                if !decision_index.contains_key(req) && !input_index.contains_key(req) {
                    return Err(Error::ParseError(format!(
                        "decision '{}' requires unknown name '{req}'",
                        decision.name
                    )));
                }
            }
        }

        detect_cycles(&self.decisions, &decision_index)?;

        let required_by_someone: HashSet<&str> = self
            .decisions
            .iter()
            .flat_map(|d| d.required_decisions.iter().map(|s| s.as_str()))
            .collect();
        let roots: Vec<String> = self
            .decisions
            .iter()
            .map(|d| d.name.clone())
            .filter(|n| !required_by_someone.contains(n.as_str()))
            .collect();

        if !self.decisions.is_empty() && roots.is_empty() {
            return Err(Error::ParseError(
                "definition has decisions but no root (every decision is required by another)".into(),
            ));
        }

        Ok(Definition {
            inputs: self.inputs,
            decisions: self.decisions,
            roots,
            warnings: self.warnings,
            decision_index,
            input_index,
        })
    }
}

fn resolve_hit_policy(kind: HitPolicyKind, aggregator: Option<Aggregator>) -> std::result::Result<HitPolicy, String> {
    match (kind, aggregator) {
        (HitPolicyKind::Collect, Some(agg)) => Ok(HitPolicy::CollectAgg(agg)),
        (HitPolicyKind::Collect, None) => Ok(HitPolicy::Collect),
        (_, Some(_)) => Err("an aggregator is only valid with the Collect hit policy".into()),
        (HitPolicyKind::Unique, None) => Ok(HitPolicy::Unique),
        (HitPolicyKind::First, None) => Ok(HitPolicy::First),
        (HitPolicyKind::Priority, None) => Ok(HitPolicy::Priority),
        (HitPolicyKind::Any, None) => Ok(HitPolicy::Any),
        (HitPolicyKind::RuleOrder, None) => Ok(HitPolicy::RuleOrder),
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

fn detect_cycles(decisions: &[Decision], index: &HashMap<String, usize>) -> Result<()> {
    let mut marks: HashMap<&str, Mark> = HashMap::new();
    for decision in decisions {
        visit(decision, decisions, index, &mut marks)?;
    }
    Ok(())
}

fn visit<'a>(
    decision: &'a Decision,
    decisions: &'a [Decision],
    index: &HashMap<String, usize>,
    marks: &mut HashMap<&'a str, Mark>,
) -> Result<()> {
    match marks.get(decision.name.as_str()) {
        Some(Mark::Done) => return Ok(()),
        Some(Mark::Visiting) => {
            return Err(Error::ParseError(format!(
                "information-requirement cycle detected at decision '{}'",
                decision.name
            )))
        }
        None => {}
    }
    marks.insert(&decision.name, Mark::Visiting);
    for req in &decision.required_decisions {
        if let Some(&idx) = index.get(req) {
            visit(&decisions[idx], decisions, index, marks)?;
        }
    }
    marks.insert(&decision.name, Mark::Done);
    Ok(())
}
