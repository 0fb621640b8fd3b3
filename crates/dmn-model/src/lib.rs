//! The decision model: parsing-independent representation of a DMN definition, plus
//! the evaluator that walks its information-requirement graph (spec.md §3-§5).

pub mod builder;
pub mod context;
pub mod error;
pub mod model;
pub mod scheduler;
pub mod table;
pub mod trace;

pub use builder::{
    DefinitionBuilder, HitPolicyKind, RawInputClause, RawOutputClause, RawRule,
};
pub use context::ExecutionContext;
pub use error::{Error, Result};
pub use model::{
    normalize, Aggregator, Decision, DecisionKind, DecisionTable, Definition, HitPolicy,
    InputClause, OutputClause, Rule, Variable,
};
pub use scheduler::{evaluate, evaluate_all_roots, EvaluationResult};
pub use table::{OutputRow, TableEvaluation, TableOutcome};
pub use trace::{render, Step, StepKind, StepOutcome, Trace};
