//! Abstract syntax tree for FEEL expressions and unary tests.
//!
//! Mirrors the grammar fragment in spec.md §6.1: one enum variant per grammar
//! alternative, tagged unions rather than a class hierarchy (see DESIGN.md).

use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

/// A raw, not-yet-resolved FEEL name: the run of adjacent `Name`/`Number` words the
/// parser collected. Resolution against known variable names happens in the
/// evaluator (`crate::env`).
pub type RawName = Vec<String>;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    NullLiteral,
    BooleanLiteral(bool),
    NumberLiteral(Decimal),
    StringLiteral(String),
    DateLiteral(NaiveDate),
    TimeLiteral(NaiveTime, Option<FixedOffset>),
    DateTimeLiteral(NaiveDateTime, Option<FixedOffset>),
    DayTimeDurationLiteral(i64),
    YearMonthDurationLiteral(i64),

    /// An unresolved name reference; resolved at evaluation time.
    Name(RawName),

    List(Vec<Expr>),
    Context(Vec<(String, Expr)>),
    /// `[a..b]` (or `(a..b]`, `]a..b[`, ...) used as a value expression (range-vs-range
    /// intersection tests and range membership both start from this node).
    RangeLiteral {
        low: Box<Expr>,
        low_closed: bool,
        high: Box<Expr>,
        high_closed: bool,
    },

    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Between {
        value: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
    },
    /// `x in (tests)` / `x in test`: membership against a unary-test list.
    In {
        value: Box<Expr>,
        tests: Vec<UnaryTest>,
    },
    InstanceOf {
        value: Box<Expr>,
        type_name: String,
    },

    If {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    For {
        iterators: Vec<Iterator_>,
        body: Box<Expr>,
    },
    Quantified {
        kind: QuantifiedKind,
        iterators: Vec<Iterator_>,
        body: Box<Expr>,
    },

    /// Member access: `v.k` on a context, or a temporal component accessor.
    Path {
        target: Box<Expr>,
        name: String,
    },
    /// `L[e]`: numeric index or boolean filter predicate (`item` bound to element).
    Filter {
        target: Box<Expr>,
        predicate: Box<Expr>,
    },
    FunctionCall {
        name: String,
        args: Args,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Args {
    Positional(Vec<Expr>),
    Named(Vec<(String, Expr)>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Iterator_ {
    pub name: String,
    pub source: IterSource,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IterSource {
    List(Expr),
    Range(Expr, Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantifiedKind {
    Some,
    Every,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Ternary, // not used directly; ternary lowers to If
}

/// Unary-test AST (spec.md §4.5/§6.1): a disjoint grammar from `Expr` since unary
/// tests have an implicit left-hand side (the test input).
#[derive(Debug, Clone, PartialEq)]
pub enum UnaryTest {
    Any,
    IsNull,
    Not(Vec<UnaryTest>),
    Compare(CompareOp, Expr),
    Range {
        low: Expr,
        low_closed: bool,
        high: Expr,
        high_closed: bool,
    },
    Disjunction(Vec<UnaryTest>),
    /// Plain expression: match iff input `= x`. If both the input and the
    /// evaluated expression are `Range`s, this is a range-intersection test instead
    /// of equality (spec.md §4.5).
    Expr(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Ne,
}

pub type ExprRef = Arc<Expr>;
