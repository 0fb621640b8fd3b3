//! Evaluation environment: a stack of lexical frames plus greedy longest-match
//! resolution of multi-word FEEL names (spec.md §4.2, §9).

use std::collections::HashMap;
use std::sync::Arc;

use crate::value::Value;

#[derive(Debug, Default, Clone)]
struct Frame {
    vars: HashMap<String, Value>,
}

/// A stack of lexical scopes: bottom-most holds the decision's input/decision
/// variables, each `push`ed frame shadows without mutating its parent (`for`,
/// quantified expressions, and function calls each push one).
#[derive(Clone)]
pub struct Environment {
    frames: Vec<Frame>,
}

impl Environment {
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::default()],
        }
    }

    pub fn push_scope(&mut self) {
        self.frames.push(Frame::default());
    }

    pub fn pop_scope(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.frames
            .last_mut()
            .expect("environment always has a frame")
            .vars
            .insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        for frame in self.frames.iter().rev() {
            if let Some(v) = frame.vars.get(name) {
                return Some(v);
            }
        }
        None
    }

    /// Resolves a raw run of name words against currently-bound variable names,
    /// longest match first. Ties (two bound names of equal matched length) resolve
    /// in the order scopes were declared: innermost scope wins, matching normal
    /// lexical shadowing.
    pub fn resolve(&self, words: &[String]) -> Option<(String, Value)> {
        for len in (1..=words.len()).rev() {
            let candidate = words[..len].join(" ");
            if let Some(v) = self.get(&candidate) {
                return Some((candidate, v.clone()));
            }
        }
        None
    }

    pub fn known_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for frame in &self.frames {
            for k in frame.vars.keys() {
                if !names.contains(k) {
                    names.push(k.clone());
                }
            }
        }
        names
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

/// A user-defined FEEL function closure captured at declaration time.
pub type SharedEnv = Arc<Environment>;
