//! DMN 1.x XML reader: fills a `dmn_model::DefinitionBuilder` from `<definitions>`
//! markup. Schema-agnostic in the same sense as the teacher's FHIR format helpers —
//! it reads the handful of elements this engine cares about and ignores the rest
//! (diagram interchange, documentation, extension elements).

use std::collections::HashMap;

use roxmltree::{Document, Node};
use thiserror::Error;

use dmn_model::{
    Aggregator, DefinitionBuilder, HitPolicyKind, RawInputClause, RawOutputClause, RawRule,
};

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("missing required attribute '{attribute}' on <{element}>")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },
    #[error("decision '{0}' has neither a literalExpression nor a decisionTable")]
    MissingDecisionLogic(String),
    #[error("unrecognized hitPolicy '{0}'")]
    UnknownHitPolicy(String),
    #[error("unrecognized aggregation '{0}'")]
    UnknownAggregation(String),
    #[error("dangling reference '{0}' in an informationRequirement")]
    DanglingReference(String),
    #[error(transparent)]
    Model(#[from] dmn_model::Error),
}

/// The DMN model-spec versions whose namespace this reader recognizes, oldest first.
/// `@"…"` temporal literals are only documented from 1.4 onward; earlier namespaces
/// still get them evaluated (this engine has one FEEL grammar), but the definition
/// carries a `VersionMismatch` warning surfaced once per evaluation pass.
const NAMESPACES_BEFORE_TEMPORAL_LITERALS: &[&str] = &[
    "https://www.omg.org/spec/DMN/20151101/dmn.xsd",
    "https://www.omg.org/spec/DMN/20180521/MODEL/",
    "https://www.omg.org/spec/DMN/20191111/MODEL/",
];

/// Parses a `<definitions>` document and builds a validated `Definition`.
pub fn read_definitions(xml: &str) -> Result<dmn_model::Definition, XmlError> {
    let doc = Document::parse(xml)?;
    let root = doc.root_element();
    let pre_1_4 = root
        .tag_name()
        .namespace()
        .is_some_and(|ns| NAMESPACES_BEFORE_TEMPORAL_LITERALS.contains(&ns));

    // id -> name, so <informationRequirement><requiredInput href="#i1"/> can resolve
    // to the name the builder's `required` lists expect.
    let mut names_by_id: HashMap<String, String> = HashMap::new();
    for node in dmn_elements(&root, "inputData") {
        if let (Some(id), Some(name)) = (node.attribute("id"), node.attribute("name")) {
            names_by_id.insert(id.to_string(), name.to_string());
        }
    }
    for node in dmn_elements(&root, "decision") {
        if let (Some(id), Some(name)) = (node.attribute("id"), node.attribute("name")) {
            names_by_id.insert(id.to_string(), name.to_string());
        }
    }

    let mut builder = DefinitionBuilder::new();

    for node in dmn_elements(&root, "inputData") {
        let name = required_attr(&node, "inputData", "name")?;
        let type_ref = variable_type_ref(&node).unwrap_or("any");
        builder.add_input(name, type_ref)?;
    }

    for node in dmn_elements(&root, "decision") {
        let name = required_attr(&node, "decision", "name").map(str::to_string)?;
        let output_var = variable_name(&node).unwrap_or(&name).to_string();
        let output_type = variable_type_ref(&node);
        let required = required_names(&node, &names_by_id)?;

        if let Some(literal) = dmn_child(&node, "literalExpression") {
            let text = child_text(&literal, "text").unwrap_or_default();
            if pre_1_4 && has_temporal_literal(&text) {
                warn_version_mismatch(&mut builder, &name);
            }
            builder.add_expression_decision(name, output_var, output_type, &text, required)?;
            continue;
        }

        if let Some(table) = dmn_child(&node, "decisionTable") {
            read_table_decision(&mut builder, &name, &output_var, &table, required, pre_1_4)?;
            continue;
        }

        return Err(XmlError::MissingDecisionLogic(name));
    }

    Ok(builder.build()?)
}

fn read_table_decision(
    builder: &mut DefinitionBuilder,
    name: &str,
    output_var: &str,
    table: &Node,
    required: Vec<String>,
    pre_1_4: bool,
) -> Result<(), XmlError> {
    let hit_policy_str = table.attribute("hitPolicy").unwrap_or("UNIQUE");
    let (hit_policy, aggregator) =
        parse_hit_policy(hit_policy_str, table.attribute("aggregation"))?;

    let inputs: Vec<RawInputClause> = dmn_elements(table, "input")
        .map(|input| {
            let expr = dmn_child(&input, "inputExpression")
                .and_then(|e| child_text(&e, "text"))
                .unwrap_or_default();
            let type_ref = dmn_child(&input, "inputExpression")
                .and_then(|e| e.attribute("typeRef"))
                .map(str::to_string);
            let allowed_values = dmn_child(&input, "inputValues")
                .and_then(|v| child_text(&v, "text"))
                .map(|t| split_enumeration(&t));
            RawInputClause {
                expression: expr,
                type_ref,
                allowed_values,
            }
        })
        .collect();

    let outputs: Vec<RawOutputClause> = dmn_elements(table, "output")
        .map(|output| RawOutputClause {
            name: output.attribute("name").unwrap_or(output_var).to_string(),
            type_ref: output.attribute("typeRef").map(str::to_string),
            allowed_values: dmn_child(&output, "outputValues")
                .and_then(|v| child_text(&v, "text"))
                .map(|t| split_enumeration(&t)),
            default: dmn_child(&output, "defaultOutputEntry").and_then(|e| child_text(&e, "text")),
        })
        .collect();

    let rules: Vec<RawRule> = dmn_elements(table, "rule")
        .map(|rule| RawRule {
            id: rule.attribute("id").unwrap_or_default().to_string(),
            inputs: dmn_elements(&rule, "inputEntry")
                .map(|e| child_text(&e, "text").unwrap_or_else(|| "-".to_string()))
                .collect(),
            outputs: dmn_elements(&rule, "outputEntry")
                .map(|e| child_text(&e, "text").unwrap_or_default())
                .collect(),
        })
        .collect();

    if pre_1_4 {
        let any_temporal = inputs.iter().any(|c| has_temporal_literal(&c.expression))
            || outputs
                .iter()
                .any(|c| c.default.as_deref().is_some_and(has_temporal_literal))
            || rules.iter().any(|r| {
                r.inputs.iter().any(|s| has_temporal_literal(s))
                    || r.outputs.iter().any(|s| has_temporal_literal(s))
            });
        if any_temporal {
            warn_version_mismatch(builder, name);
        }
    }

    builder.add_table_decision(
        name,
        output_var,
        hit_policy,
        aggregator,
        inputs,
        outputs,
        rules,
        required,
    )?;
    Ok(())
}

/// Lexical check for a FEEL temporal literal (`@"2024-01-15"`), not a full parse —
/// the reader only needs to know whether the warning applies.
fn has_temporal_literal(text: &str) -> bool {
    text.contains("@\"")
}

fn warn_version_mismatch(builder: &mut DefinitionBuilder, decision: &str) {
    builder.warn(format!(
        "VersionMismatch: decision '{decision}' uses an @\"...\" temporal literal, \
         which the declared DMN namespace predates (documented from DMN 1.4); \
         accepting it lexically"
    ));
}

fn parse_hit_policy(
    hit_policy: &str,
    aggregation: Option<&str>,
) -> Result<(HitPolicyKind, Option<Aggregator>), XmlError> {
    let kind = match hit_policy {
        "UNIQUE" => HitPolicyKind::Unique,
        "FIRST" => HitPolicyKind::First,
        "PRIORITY" => HitPolicyKind::Priority,
        "ANY" => HitPolicyKind::Any,
        "RULE ORDER" | "RULE_ORDER" => HitPolicyKind::RuleOrder,
        "COLLECT" => HitPolicyKind::Collect,
        other => return Err(XmlError::UnknownHitPolicy(other.to_string())),
    };
    let aggregator = match aggregation {
        None | Some("") => None,
        Some("SUM") => Some(Aggregator::Sum),
        Some("MIN") => Some(Aggregator::Min),
        Some("MAX") => Some(Aggregator::Max),
        Some("COUNT") => Some(Aggregator::Count),
        Some(other) => return Err(XmlError::UnknownAggregation(other.to_string())),
    };
    Ok((kind, aggregator))
}

/// Splits a FEEL enumeration literal (`"gold","silver","bronze"`) into its bare
/// string values, respecting quoted commas.
fn split_enumeration(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for ch in text.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                parts.push(current.trim().trim_matches('"').to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        if ch != '"' || in_quotes {
            current.push(ch);
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().trim_matches('"').to_string());
    }
    parts
}

fn required_names(
    decision: &Node,
    names_by_id: &HashMap<String, String>,
) -> Result<Vec<String>, XmlError> {
    let mut required = Vec::new();
    for req in dmn_elements(decision, "informationRequirement") {
        for child_name in ["requiredInput", "requiredDecision"] {
            if let Some(child) = dmn_child(&req, child_name) {
                let href = child.attribute("href").unwrap_or_default();
                let id = href.trim_start_matches('#');
                let name = names_by_id
                    .get(id)
                    .ok_or_else(|| XmlError::DanglingReference(href.to_string()))?;
                required.push(name.clone());
            }
        }
    }
    Ok(required)
}

fn variable_name<'a>(decision: &Node<'a, 'a>) -> Option<&'a str> {
    dmn_child(decision, "variable").and_then(|v| v.attribute("name"))
}

fn variable_type_ref<'a>(node: &Node<'a, 'a>) -> Option<&'a str> {
    dmn_child(node, "variable").and_then(|v| v.attribute("typeRef"))
}

fn required_attr<'a>(
    node: &Node<'a, 'a>,
    element: &'static str,
    attribute: &'static str,
) -> Result<&'a str, XmlError> {
    node.attribute(attribute)
        .ok_or(XmlError::MissingAttribute { element, attribute })
}

fn child_text(node: &Node, name: &str) -> Option<String> {
    dmn_child(node, name).map(|n| n.text().unwrap_or_default().to_string())
}

fn dmn_child<'a, 'i>(node: &Node<'a, 'i>, local_name: &str) -> Option<Node<'a, 'i>> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == local_name)
}

fn dmn_elements<'a, 'i>(
    node: &Node<'a, 'i>,
    local_name: &'i str,
) -> impl Iterator<Item = Node<'a, 'i>> {
    node.children()
        .filter(move |c| c.is_element() && c.tag_name().name() == local_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &str = r##"
    <definitions xmlns="https://www.omg.org/spec/DMN/20191111/MODEL/">
      <inputData id="i1" name="Age">
        <variable name="Age" typeRef="number"/>
      </inputData>
      <decision id="d1" name="Bucket">
        <variable name="bucket" typeRef="string"/>
        <informationRequirement>
          <requiredInput href="#i1"/>
        </informationRequirement>
        <decisionTable hitPolicy="UNIQUE">
          <input id="in1">
            <inputExpression typeRef="number"><text>Age</text></inputExpression>
          </input>
          <output id="out1" name="bucket" typeRef="string"/>
          <rule id="r1">
            <inputEntry><text>&lt;18</text></inputEntry>
            <outputEntry><text>"minor"</text></outputEntry>
          </rule>
          <rule id="r2">
            <inputEntry><text>&gt;=18</text></inputEntry>
            <outputEntry><text>"adult"</text></outputEntry>
          </rule>
        </decisionTable>
      </decision>
    </definitions>
    "##;

    #[test]
    fn reads_a_single_table_decision() {
        let def = read_definitions(SIMPLE).unwrap();
        assert!(def.input("Age").is_some());
        let decision = def.decision("Bucket").unwrap();
        assert_eq!(decision.required_inputs, vec!["Age".to_string()]);
        match &decision.kind {
            dmn_model::DecisionKind::Table(t) => assert_eq!(t.rules.len(), 2),
            _ => panic!("expected a table decision"),
        }
    }

    #[test]
    fn reads_a_literal_expression_decision_chained_to_a_table() {
        let xml = r##"
        <definitions xmlns="https://www.omg.org/spec/DMN/20191111/MODEL/">
          <inputData id="i1" name="Age"><variable name="Age" typeRef="number"/></inputData>
          <decision id="d1" name="age10">
            <variable name="age10" typeRef="number"/>
            <informationRequirement><requiredInput href="#i1"/></informationRequirement>
            <literalExpression><text>Age+10</text></literalExpression>
          </decision>
        </definitions>
        "##;
        let def = read_definitions(xml).unwrap();
        let decision = def.decision("age10").unwrap();
        assert_eq!(decision.required_inputs, vec!["Age".to_string()]);
        assert!(matches!(decision.kind, dmn_model::DecisionKind::Expression(_)));
    }

    #[test]
    fn a_temporal_literal_under_a_pre_1_4_namespace_is_accepted_with_a_warning() {
        let xml = r##"
        <definitions xmlns="https://www.omg.org/spec/DMN/20191111/MODEL/">
          <decision id="d1" name="anniversary">
            <variable name="anniversary" typeRef="date"/>
            <literalExpression><text>@"2024-01-15"</text></literalExpression>
          </decision>
        </definitions>
        "##;
        let def = read_definitions(xml).unwrap();
        assert_eq!(def.warnings.len(), 1);
        assert!(def.warnings[0].contains("VersionMismatch"));
        assert!(def.warnings[0].contains("anniversary"));
    }

    #[test]
    fn a_temporal_literal_under_a_recent_namespace_raises_no_warning() {
        let xml = r##"
        <definitions xmlns="https://www.omg.org/spec/DMN/20211108/MODEL/">
          <decision id="d1" name="anniversary">
            <variable name="anniversary" typeRef="date"/>
            <literalExpression><text>@"2024-01-15"</text></literalExpression>
          </decision>
        </definitions>
        "##;
        let def = read_definitions(xml).unwrap();
        assert!(def.warnings.is_empty());
    }
}
