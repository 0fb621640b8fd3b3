//! Execution trace: an append-only record of each decision evaluated during a pass
//! (spec.md §3, §4.8).

use indexmap::IndexMap;

use dmn_feel::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Expression,
    Table,
}

#[derive(Debug, Clone)]
pub enum StepOutcome {
    Expression(Value),
    Table {
        matched_rule_ids: Vec<String>,
        outputs: IndexMap<String, Value>,
    },
    Error(String),
}

#[derive(Debug, Clone)]
pub struct Step {
    pub decision_name: String,
    pub kind: StepKind,
    pub outcome: StepOutcome,
}

/// Ordered, append-only log of decision evaluations for a single pass.
#[derive(Debug, Clone, Default)]
pub struct Trace {
    steps: Vec<Step>,
    warnings: Vec<String>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Records a model-level warning (e.g. a `VersionMismatch`) that isn't tied to a
    /// single decision's evaluation.
    pub fn push_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

/// Renders a trace as a flat, indented step list for CLI output — scoped down from
/// the teacher's full pipeline visualizer (`visualize.rs`) since DMN tracing has no
/// compilation stages to render.
pub fn render(trace: &Trace) -> String {
    let mut out = String::new();
    for warning in trace.warnings() {
        out.push_str(&format!("warning: {warning}\n"));
    }
    for (i, step) in trace.steps().iter().enumerate() {
        out.push_str(&format!("{}. {} ({:?})\n", i + 1, step.decision_name, step.kind));
        match &step.outcome {
            StepOutcome::Expression(v) => {
                out.push_str(&format!("   -> {v}\n"));
            }
            StepOutcome::Table { matched_rule_ids, outputs } => {
                out.push_str(&format!("   matched rules: [{}]\n", matched_rule_ids.join(", ")));
                for (k, v) in outputs {
                    out.push_str(&format!("   {k} = {v}\n"));
                }
            }
            StepOutcome::Error(message) => {
                out.push_str(&format!("   ERROR: {message}\n"));
            }
        }
    }
    out
}
