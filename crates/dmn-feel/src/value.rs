//! The FEEL value and type system.
//!
//! `Value` is a tagged union exactly matching the cases a FEEL-like expression
//! language needs; `Type` is the small lattice DMN type refs map onto.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use indexmap::IndexMap;
use rust_decimal::Decimal;

use crate::ast::Expr;

/// A FEEL temporal/day-time duration, stored as whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DayTimeDuration {
    pub seconds: i64,
}

/// A FEEL year-month duration, stored as whole months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct YearMonthDuration {
    pub months: i64,
}

/// One endpoint of a `Range`. `None` denotes an unbounded side.
pub type RangeEndpoint = Option<Box<Value>>;

#[derive(Debug, Clone, PartialEq)]
pub struct Range {
    pub low: RangeEndpoint,
    pub low_closed: bool,
    pub high: RangeEndpoint,
    pub high_closed: bool,
}

/// A closure: formal parameter names plus either an interpreted `body` AST or the
/// name of a built-in.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub params: Vec<String>,
    pub body: FunctionBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionBody {
    Expr(Arc<Expr>),
    Builtin(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Number(Decimal),
    String(String),
    Date(NaiveDate),
    Time(NaiveTime, Option<FixedOffset>),
    DateTime(NaiveDateTime, Option<FixedOffset>),
    DayTimeDuration(DayTimeDuration),
    YearMonthDuration(YearMonthDuration),
    List(Vec<Value>),
    Context(IndexMap<String, Value>),
    Range(Box<Range>),
    Function(Arc<Function>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// FEEL truthiness for `if`/`and`/`or` conditions: only `true` is truthy,
    /// `false` and `Null` are both falsy but distinct for three-valued logic.
    pub fn is_true(&self) -> bool {
        matches!(self, Value::Boolean(true))
    }

    pub fn type_of(&self) -> Type {
        match self {
            Value::Null => Type::Null,
            Value::Boolean(_) => Type::Boolean,
            Value::Number(_) => Type::Number,
            Value::String(_) => Type::String,
            Value::Date(_) => Type::Date,
            Value::Time(_, _) => Type::Time,
            Value::DateTime(_, _) => Type::DateTime,
            Value::DayTimeDuration(_) => Type::DayTimeDuration,
            Value::YearMonthDuration(_) => Type::YearMonthDuration,
            Value::List(items) => {
                let elem = items.first().map(|v| v.type_of()).unwrap_or(Type::Any);
                Type::List(Box::new(elem))
            }
            Value::Context(entries) => Type::Context(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.type_of()))
                    .collect(),
            ),
            Value::Range(_) => Type::Any,
            Value::Function(_) => Type::Function,
        }
    }

    /// FEEL equality: `Null = Null` only for identical nulls, numbers by value,
    /// strings code-point-wise, lists/contexts structurally. Comparing mismatched
    /// variants yields `false` (not `Null`) for `=`/`!=`; the three-valued `Null`
    /// result is reserved for ordering comparisons (`feel_cmp`).
    pub fn feel_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Time(a, oa), Value::Time(b, ob)) => a == b && oa == ob,
            (Value::DateTime(a, oa), Value::DateTime(b, ob)) => a == b && oa == ob,
            (Value::DayTimeDuration(a), Value::DayTimeDuration(b)) => a == b,
            (Value::YearMonthDuration(a), Value::YearMonthDuration(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.feel_eq(y))
            }
            (Value::Context(a), Value::Context(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).is_some_and(|bv| v.feel_eq(bv)))
            }
            (Value::Range(a), Value::Range(b)) => a == b,
            _ => false,
        }
    }

    /// Three-valued ordering: `None` ("incomparable") maps to a `Null` result at
    /// the call site. Defined only for numbers, strings, and temporal values.
    pub fn feel_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::Time(a, _), Value::Time(b, _)) => Some(a.cmp(b)),
            (Value::DateTime(a, _), Value::DateTime(b, _)) => Some(a.cmp(b)),
            (Value::DayTimeDuration(a), Value::DayTimeDuration(b)) => Some(a.cmp(b)),
            (Value::YearMonthDuration(a), Value::YearMonthDuration(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Number(d) => write!(f, "{d}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Date(d) => write!(f, "{d}"),
            Value::Time(t, _) => write!(f, "{t}"),
            Value::DateTime(dt, _) => write!(f, "{dt}"),
            Value::DayTimeDuration(d) => write!(f, "{}", crate::temporal::format_day_time_duration(*d)),
            Value::YearMonthDuration(d) => write!(f, "{}", crate::temporal::format_year_month_duration(*d)),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Context(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Value::Range(r) => {
                write!(f, "{}", if r.low_closed { "[" } else { "(" })?;
                match &r.low {
                    Some(v) => write!(f, "{v}")?,
                    None => write!(f, "null")?,
                }
                write!(f, "..")?;
                match &r.high {
                    Some(v) => write!(f, "{v}")?,
                    None => write!(f, "null")?,
                }
                write!(f, "{}", if r.high_closed { "]" } else { ")" })
            }
            Value::Function(_) => write!(f, "<function>"),
        }
    }
}

/// The FEEL/DMN type lattice (spec §3). `integer`/`long`/`double`/`float`/`decimal`
/// DMN type refs all collapse to `Number`.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Any,
    Null,
    Boolean,
    Number,
    String,
    Date,
    Time,
    DateTime,
    DayTimeDuration,
    YearMonthDuration,
    List(Box<Type>),
    Context(Vec<(String, Type)>),
    Function,
}

impl Type {
    /// Parse a DMN `typeRef` string into the lattice.
    pub fn from_type_ref(name: &str) -> Type {
        match name {
            "string" => Type::String,
            "boolean" => Type::Boolean,
            "number" | "integer" | "long" | "double" | "float" | "decimal" => Type::Number,
            "date" => Type::Date,
            "time" => Type::Time,
            "dateTime" => Type::DateTime,
            "dayTimeDuration" => Type::DayTimeDuration,
            "yearMonthDuration" => Type::YearMonthDuration,
            _ => Type::Any,
        }
    }
}
