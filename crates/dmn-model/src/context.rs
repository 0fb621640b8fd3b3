//! Execution context: variable scopes plus trace recording for one evaluation pass
//! (spec.md §3, §4.8).

use std::collections::HashSet;

use dmn_feel::value::Value;
use dmn_feel::Environment;

use crate::trace::{Step, Trace};

/// A single evaluation pass's state: the shared binding scope decisions read from and
/// write to, plus the append-only trace. Not `Clone` — a fresh `ExecutionContext` is
/// created per `evaluate`/`evaluate_all_roots` call (spec.md §5: "each evaluation owns
/// its own Context and Trace").
pub struct ExecutionContext {
    env: Environment,
    bound_outputs: HashSet<String>,
    trace: Trace,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self {
            env: Environment::new(),
            bound_outputs: HashSet::new(),
            trace: Trace::new(),
        }
    }

    /// Binds a declared input's value. Inputs may be (re-)bound freely before
    /// evaluation starts; only decision outputs are one-shot.
    pub fn set_input(&mut self, name: impl Into<String>, value: Value) {
        self.env.bind(name, value);
    }

    /// Binds a decision's output variable. Panics if the same output has already been
    /// bound this pass — a scheduler bug, not a representable runtime error (spec.md
    /// §9: "double-write is a programmer error, not runtime data").
    pub fn set_output(&mut self, output_variable: &str, value: Value) {
        if !self.bound_outputs.insert(output_variable.to_string()) {
            panic!("decision output '{output_variable}' was bound more than once in this pass");
        }
        self.env.bind(output_variable, value);
    }

    pub fn is_bound(&self, output_variable: &str) -> bool {
        self.bound_outputs.contains(output_variable)
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.env.get(name).cloned()
    }

    pub fn environment(&mut self) -> &mut Environment {
        &mut self.env
    }

    pub fn push_scope(&mut self) {
        self.env.push_scope();
    }

    pub fn pop_scope(&mut self) {
        self.env.pop_scope();
    }

    pub fn record(&mut self, step: Step) {
        self.trace.push(step);
    }

    pub fn warn(&mut self, warning: impl Into<String>) {
        self.trace.push_warning(warning);
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    pub fn into_trace(self) -> Trace {
        self.trace
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}
