//! Expression and unary-test evaluation (spec.md §4.4, §4.5).
//!
//! A recursive function from `(AST, Environment) -> Value`, matching the teacher's
//! tree-walking style rather than a bytecode VM — see DESIGN.md for why the HIR/VM
//! pipeline in `ferrum-fhirpath` was not carried over.

use std::cmp::Ordering;

use chrono::Datelike;
use chrono::Timelike;
use indexmap::IndexMap;
use rust_decimal::Decimal;

use crate::ast::*;
use crate::builtins;
use crate::env::Environment;
use crate::error::{Error, Result};
use crate::value::{DayTimeDuration, Range, Value, YearMonthDuration};

/// Evaluates an expression in an expression-decision context: unresolved names
/// raise `Error::UnknownName` (spec.md §4.4).
pub fn eval(expr: &Expr, env: &mut Environment) -> Result<Value> {
    eval_in(expr, env, true)
}

/// Evaluates an expression the way a unary-test sub-expression is evaluated:
/// unresolved names yield `Null` instead of erroring (spec.md §4.5).
pub fn eval_lenient(expr: &Expr, env: &mut Environment) -> Result<Value> {
    eval_in(expr, env, false)
}

fn eval_in(expr: &Expr, env: &mut Environment, strict: bool) -> Result<Value> {
    match expr {
        Expr::NullLiteral => Ok(Value::Null),
        Expr::BooleanLiteral(b) => Ok(Value::Boolean(*b)),
        Expr::NumberLiteral(d) => Ok(Value::Number(*d)),
        Expr::StringLiteral(s) => Ok(Value::String(s.clone())),
        Expr::DateLiteral(d) => Ok(Value::Date(*d)),
        Expr::TimeLiteral(t, off) => Ok(Value::Time(*t, *off)),
        Expr::DateTimeLiteral(dt, off) => Ok(Value::DateTime(*dt, *off)),
        Expr::DayTimeDurationLiteral(s) => Ok(Value::DayTimeDuration(DayTimeDuration { seconds: *s })),
        Expr::YearMonthDurationLiteral(m) => {
            Ok(Value::YearMonthDuration(YearMonthDuration { months: *m }))
        }

        Expr::Name(words) => match env.resolve(words) {
            Some((_, v)) => Ok(v),
            None if strict => Err(Error::UnknownName(words.join(" "))),
            None => Ok(Value::Null),
        },

        Expr::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(eval_in(item, env, strict)?);
            }
            Ok(Value::List(out))
        }
        Expr::Context(entries) => {
            let mut out = IndexMap::new();
            for (k, v) in entries {
                out.insert(k.clone(), eval_in(v, env, strict)?);
            }
            Ok(Value::Context(out))
        }
        Expr::RangeLiteral {
            low,
            low_closed,
            high,
            high_closed,
        } => {
            let low_v = eval_in(low, env, strict)?;
            let high_v = eval_in(high, env, strict)?;
            Ok(Value::Range(Box::new(Range {
                low: if low_v.is_null() { None } else { Some(Box::new(low_v)) },
                low_closed: *low_closed,
                high: if high_v.is_null() { None } else { Some(Box::new(high_v)) },
                high_closed: *high_closed,
            })))
        }

        Expr::Unary { op, expr } => {
            let v = eval_in(expr, env, strict)?;
            match (op, &v) {
                (UnaryOp::Neg, Value::Number(d)) => Ok(Value::Number(-d)),
                (UnaryOp::Neg, Value::Null) => Ok(Value::Null),
                (UnaryOp::Neg, _) => Err(Error::TypeError("unary '-' requires a number".into())),
                (UnaryOp::Not, Value::Boolean(b)) => Ok(Value::Boolean(!b)),
                (UnaryOp::Not, Value::Null) => Ok(Value::Null),
                (UnaryOp::Not, _) => Err(Error::TypeError("'not' requires a boolean".into())),
            }
        }

        Expr::Binary { op, left, right } => eval_binary(*op, left, right, env, strict),

        Expr::Between { value, low, high } => {
            let v = eval_in(value, env, strict)?;
            let low = eval_in(low, env, strict)?;
            let high = eval_in(high, env, strict)?;
            three_valued_and(cmp_bool(&low, &v, false), cmp_bool(&v, &high, false))
        }

        Expr::In { value, tests } => {
            let v = eval_in(value, env, strict)?;
            let mut any_null = false;
            for test in tests {
                match eval_unary_test(test, &v, env)? {
                    Value::Boolean(true) => return Ok(Value::Boolean(true)),
                    Value::Null => any_null = true,
                    _ => {}
                }
            }
            Ok(if any_null { Value::Null } else { Value::Boolean(false) })
        }

        Expr::InstanceOf { value, type_name } => {
            let v = eval_in(value, env, strict)?;
            Ok(Value::Boolean(matches_type_name(&v, type_name)))
        }

        Expr::If {
            cond,
            then_branch,
            else_branch,
        } => {
            let c = eval_in(cond, env, strict)?;
            if c.is_true() {
                eval_in(then_branch, env, strict)
            } else {
                eval_in(else_branch, env, strict)
            }
        }

        Expr::For { iterators, body } => eval_for(iterators, body, env, strict),

        Expr::Quantified {
            kind,
            iterators,
            body,
        } => eval_quantified(*kind, iterators, body, env, strict),

        Expr::Path { target, name } => {
            let v = eval_in(target, env, strict)?;
            Ok(path_access(&v, name))
        }

        Expr::Filter { target, predicate } => eval_filter(target, predicate, env, strict),

        Expr::FunctionCall { name, args } => eval_call(name, args, env, strict),
    }
}

fn eval_binary(op: BinaryOp, left: &Expr, right: &Expr, env: &mut Environment, strict: bool) -> Result<Value> {
    match op {
        BinaryOp::And => {
            let l = eval_in(left, env, strict)?;
            if matches!(l, Value::Boolean(false)) {
                return Ok(Value::Boolean(false));
            }
            let r = eval_in(right, env, strict)?;
            three_valued_and_bool(&l, &r)
        }
        BinaryOp::Or => {
            let l = eval_in(left, env, strict)?;
            if matches!(l, Value::Boolean(true)) {
                return Ok(Value::Boolean(true));
            }
            let r = eval_in(right, env, strict)?;
            three_valued_or_bool(&l, &r)
        }
        _ => {
            let l = eval_in(left, env, strict)?;
            let r = eval_in(right, env, strict)?;
            eval_binary_values(op, l, r)
        }
    }
}

fn three_valued_and_bool(l: &Value, r: &Value) -> Result<Value> {
    match (l, r) {
        (Value::Boolean(a), Value::Boolean(b)) => Ok(Value::Boolean(*a && *b)),
        (Value::Boolean(false), _) | (_, Value::Boolean(false)) => Ok(Value::Boolean(false)),
        _ => Ok(Value::Null),
    }
}

fn three_valued_or_bool(l: &Value, r: &Value) -> Result<Value> {
    match (l, r) {
        (Value::Boolean(a), Value::Boolean(b)) => Ok(Value::Boolean(*a || *b)),
        (Value::Boolean(true), _) | (_, Value::Boolean(true)) => Ok(Value::Boolean(true)),
        _ => Ok(Value::Null),
    }
}

fn three_valued_and(a: Option<bool>, b: Option<bool>) -> Result<Value> {
    match (a, b) {
        (Some(false), _) | (_, Some(false)) => Ok(Value::Boolean(false)),
        (Some(true), Some(true)) => Ok(Value::Boolean(true)),
        _ => Ok(Value::Null),
    }
}

fn cmp_bool(a: &Value, b: &Value, strict_less: bool) -> Option<bool> {
    let _ = strict_less;
    a.feel_cmp(b).map(|ord| ord != Ordering::Greater)
}

pub fn eval_binary_values(op: BinaryOp, l: Value, r: Value) -> Result<Value> {
    use BinaryOp::*;
    match op {
        Eq => Ok(Value::Boolean(l.feel_eq(&r))),
        Ne => Ok(Value::Boolean(!l.feel_eq(&r))),
        Lt | Le | Gt | Ge => {
            if l.is_null() || r.is_null() {
                return Ok(Value::Null);
            }
            match l.feel_cmp(&r) {
                None => Ok(Value::Null),
                Some(ord) => Ok(Value::Boolean(match op {
                    Lt => ord == Ordering::Less,
                    Le => ord != Ordering::Greater,
                    Gt => ord == Ordering::Greater,
                    Ge => ord != Ordering::Less,
                    _ => unreachable!(),
                })),
            }
        }
        Add => arithmetic_add(l, r),
        Sub => arithmetic_sub(l, r),
        Mul => match (l, r) {
            (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),
            _ => Err(Error::TypeError("'*' requires two numbers".into())),
        },
        Div => match (l, r) {
            (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
            (Value::Number(_), Value::Number(b)) if b.is_zero() => Ok(Value::Null),
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),
            _ => Err(Error::TypeError("'/' requires two numbers".into())),
        },
        Mod => match (l, r) {
            (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
            (Value::Number(_), Value::Number(b)) if b.is_zero() => Err(Error::DivisionByZero),
            (Value::Number(a), Value::Number(b)) => {
                let r = a % b;
                let r = if !r.is_zero() && (r.is_sign_negative() != b.is_sign_negative()) {
                    r + b
                } else {
                    r
                };
                Ok(Value::Number(r))
            }
            _ => Err(Error::TypeError("'%' requires two numbers".into())),
        },
        Pow => match (l, r) {
            (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
            (Value::Number(a), Value::Number(b)) => {
                let exp = b.to_string().parse::<f64>().unwrap_or(0.0);
                let base = a.to_string().parse::<f64>().unwrap_or(0.0);
                let result = base.powf(exp);
                Decimal::try_from(result)
                    .map(Value::Number)
                    .map_err(|e| Error::TypeError(format!("'**' result not representable: {e}")))
            }
            _ => Err(Error::TypeError("'**' requires two numbers".into())),
        },
        And | Or | Ternary => unreachable!("handled by eval_binary"),
    }
}

fn arithmetic_add(l: Value, r: Value) -> Result<Value> {
    match (l, r) {
        (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
        (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
        (Value::Date(d), Value::DayTimeDuration(dur)) => {
            Ok(Value::Date(d + chrono::Duration::seconds(dur.seconds)))
        }
        (Value::DateTime(dt, off), Value::DayTimeDuration(dur)) => {
            Ok(Value::DateTime(dt + chrono::Duration::seconds(dur.seconds), off))
        }
        (Value::Date(d), Value::YearMonthDuration(dur)) => Ok(Value::Date(add_months(d, dur.months))),
        (Value::DayTimeDuration(a), Value::DayTimeDuration(b)) => {
            Ok(Value::DayTimeDuration(DayTimeDuration { seconds: a.seconds + b.seconds }))
        }
        (Value::YearMonthDuration(a), Value::YearMonthDuration(b)) => {
            Ok(Value::YearMonthDuration(YearMonthDuration { months: a.months + b.months }))
        }
        (Value::List(mut a), Value::List(b)) => {
            a.extend(b);
            Ok(Value::List(a))
        }
        _ => Err(Error::TypeError("'+' operands are not compatible".into())),
    }
}

fn arithmetic_sub(l: Value, r: Value) -> Result<Value> {
    match (l, r) {
        (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),
        (Value::Date(a), Value::Date(b)) => Ok(Value::DayTimeDuration(DayTimeDuration {
            seconds: (a - b).num_seconds(),
        })),
        (Value::DateTime(a, _), Value::DateTime(b, _)) => Ok(Value::DayTimeDuration(DayTimeDuration {
            seconds: (a - b).num_seconds(),
        })),
        (Value::Date(d), Value::DayTimeDuration(dur)) => {
            Ok(Value::Date(d - chrono::Duration::seconds(dur.seconds)))
        }
        (Value::DateTime(dt, off), Value::DayTimeDuration(dur)) => {
            Ok(Value::DateTime(dt - chrono::Duration::seconds(dur.seconds), off))
        }
        (Value::Date(d), Value::YearMonthDuration(dur)) => Ok(Value::Date(add_months(d, -dur.months))),
        (Value::DayTimeDuration(a), Value::DayTimeDuration(b)) => {
            Ok(Value::DayTimeDuration(DayTimeDuration { seconds: a.seconds - b.seconds }))
        }
        (Value::YearMonthDuration(a), Value::YearMonthDuration(b)) => {
            Ok(Value::YearMonthDuration(YearMonthDuration { months: a.months - b.months }))
        }
        _ => Err(Error::TypeError("'-' operands are not compatible".into())),
    }
}

fn add_months(d: chrono::NaiveDate, months: i64) -> chrono::NaiveDate {
    let total = d.year() as i64 * 12 + (d.month() as i64 - 1) + months;
    let year = total.div_euclid(12) as i32;
    let month = total.rem_euclid(12) as u32 + 1;
    let day = d.day();
    chrono::NaiveDate::from_ymd_opt(year, month, day)
        .unwrap_or_else(|| last_day_of_month(year, month))
}

fn last_day_of_month(year: i32, month: u32) -> chrono::NaiveDate {
    let (ny, nm) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    chrono::NaiveDate::from_ymd_opt(ny, nm, 1)
        .unwrap()
        .pred_opt()
        .unwrap()
}

fn path_access(v: &Value, name: &str) -> Value {
    match v {
        Value::Context(entries) => entries.get(name).cloned().unwrap_or(Value::Null),
        Value::Date(d) => temporal_component(*d, None, name),
        Value::Time(t, off) => time_component(*t, *off, name),
        Value::DateTime(dt, off) => {
            let mut v = temporal_component(dt.date(), *off, name);
            if matches!(v, Value::Null) {
                v = time_component(dt.time(), *off, name);
            }
            v
        }
        _ => Value::Null,
    }
}

fn temporal_component(d: chrono::NaiveDate, off: Option<chrono::FixedOffset>, name: &str) -> Value {
    match name {
        "year" => Value::Number(Decimal::from(d.year())),
        "month" => Value::Number(Decimal::from(d.month())),
        "day" => Value::Number(Decimal::from(d.day())),
        "weekday" => Value::Number(Decimal::from(d.weekday().number_from_monday())),
        "offset" => offset_value(off),
        _ => Value::Null,
    }
}

fn time_component(t: chrono::NaiveTime, off: Option<chrono::FixedOffset>, name: &str) -> Value {
    match name {
        "hour" => Value::Number(Decimal::from(t.hour())),
        "minute" => Value::Number(Decimal::from(t.minute())),
        "second" => Value::Number(Decimal::from(t.second())),
        "offset" => offset_value(off),
        _ => Value::Null,
    }
}

fn offset_value(off: Option<chrono::FixedOffset>) -> Value {
    match off {
        Some(o) => Value::DayTimeDuration(DayTimeDuration { seconds: o.local_minus_utc() as i64 }),
        None => Value::Null,
    }
}

fn eval_filter(target: &Expr, predicate: &Expr, env: &mut Environment, strict: bool) -> Result<Value> {
    let v = eval_in(target, env, strict)?;
    let items = match v {
        Value::List(items) => items,
        Value::Null => return Ok(Value::Null),
        other => vec![other],
    };

    // Numeric index: 1-based, negative indexes from the end.
    let idx_probe = eval_in(predicate, env, strict);
    if let Ok(Value::Number(n)) = &idx_probe {
        let len = items.len() as i64;
        let idx = n.to_string().parse::<i64>().unwrap_or(0);
        let idx = if idx < 0 { len + idx } else { idx - 1 };
        if idx < 0 || idx >= len {
            return Ok(Value::Null);
        }
        return Ok(items[idx as usize].clone());
    }

    let mut out = Vec::new();
    for item in items {
        env.push_scope();
        env.bind("item", item.clone());
        let keep = eval_in(predicate, env, strict);
        env.pop_scope();
        if keep?.is_true() {
            out.push(item);
        }
    }
    Ok(Value::List(out))
}

fn eval_for(iterators: &[Iterator_], body: &Expr, env: &mut Environment, strict: bool) -> Result<Value> {
    let mut sources = Vec::with_capacity(iterators.len());
    for it in iterators {
        sources.push((it.name.clone(), materialize_source(&it.source, env, strict)?));
    }
    let mut results = Vec::new();
    for_cartesian(&sources, 0, env, &mut Vec::new(), &mut |env, bindings| {
        for (name, value) in bindings {
            env.bind(name.clone(), value.clone());
        }
        env.bind("partial", Value::List(results.clone()));
        let v = eval_in(body, env, strict)?;
        results.push(v);
        Ok(())
    })?;
    Ok(Value::List(results))
}

fn materialize_source(source: &IterSource, env: &mut Environment, strict: bool) -> Result<Vec<Value>> {
    match source {
        IterSource::List(expr) => match eval_in(expr, env, strict)? {
            Value::List(items) => Ok(items),
            Value::Null => Ok(Vec::new()),
            other => Ok(vec![other]),
        },
        IterSource::Range(lo, hi) => {
            let lo = eval_in(lo, env, strict)?;
            let hi = eval_in(hi, env, strict)?;
            match (lo, hi) {
                (Value::Number(a), Value::Number(b)) => {
                    let a = a.to_string().parse::<i64>().unwrap_or(0);
                    let b = b.to_string().parse::<i64>().unwrap_or(0);
                    let range: Vec<Value> = if a <= b {
                        (a..=b).map(|n| Value::Number(Decimal::from(n))).collect()
                    } else {
                        (b..=a).rev().map(|n| Value::Number(Decimal::from(n))).collect()
                    };
                    Ok(range)
                }
                _ => Err(Error::TypeError("for range bounds must be numbers".into())),
            }
        }
    }
}

type CartesianLeaf<'a> = dyn FnMut(&mut Environment, &[(String, Value)]) -> Result<()> + 'a;

fn for_cartesian(
    sources: &[(String, Vec<Value>)],
    idx: usize,
    env: &mut Environment,
    bindings: &mut Vec<(String, Value)>,
    leaf: &mut CartesianLeaf,
) -> Result<()> {
    if idx == sources.len() {
        env.push_scope();
        let r = leaf(env, bindings);
        env.pop_scope();
        return r;
    }
    let (name, values) = &sources[idx];
    for v in values {
        bindings.push((name.clone(), v.clone()));
        for_cartesian(sources, idx + 1, env, bindings, leaf)?;
        bindings.pop();
    }
    Ok(())
}

fn eval_quantified(
    kind: QuantifiedKind,
    iterators: &[Iterator_],
    body: &Expr,
    env: &mut Environment,
    strict: bool,
) -> Result<Value> {
    let mut sources = Vec::with_capacity(iterators.len());
    for it in iterators {
        sources.push((it.name.clone(), materialize_source(&it.source, env, strict)?));
    }
    let mut saw_true = false;
    let mut saw_false = false;
    let mut saw_other = false;
    for_cartesian(&sources, 0, env, &mut Vec::new(), &mut |env, bindings| {
        for (name, value) in bindings {
            env.bind(name.clone(), value.clone());
        }
        match eval_in(body, env, strict)? {
            Value::Boolean(true) => saw_true = true,
            Value::Boolean(false) => saw_false = true,
            _ => saw_other = true,
        }
        Ok(())
    })?;
    Ok(match kind {
        QuantifiedKind::Some => {
            if saw_true {
                Value::Boolean(true)
            } else if !saw_other {
                Value::Boolean(false)
            } else {
                Value::Null
            }
        }
        QuantifiedKind::Every => {
            if saw_false {
                Value::Boolean(false)
            } else if !saw_other {
                Value::Boolean(true)
            } else {
                Value::Null
            }
        }
    })
}

fn eval_call(name: &str, args: &Args, env: &mut Environment, strict: bool) -> Result<Value> {
    match args {
        Args::Positional(exprs) => {
            let mut values = Vec::with_capacity(exprs.len());
            for e in exprs {
                values.push(eval_in(e, env, strict)?);
            }
            dispatch_call(name, values, env, strict)
        }
        Args::Named(named) => {
            let mut values = Vec::with_capacity(named.len());
            let mut names = Vec::with_capacity(named.len());
            for (n, e) in named {
                names.push(n.clone());
                values.push(eval_in(e, env, strict)?);
            }
            dispatch_named_call(name, names, values, env, strict)
        }
    }
}

/// Functions whose argument is itself an expression evaluated per-element (`item`
/// bound), rather than a pre-evaluated value — these are handled before the
/// general positional-argument path.
fn dispatch_call(name: &str, args: Vec<Value>, _env: &mut Environment, _strict: bool) -> Result<Value> {
    builtins::call(name, args)
}

fn dispatch_named_call(
    name: &str,
    names: Vec<String>,
    values: Vec<Value>,
    _env: &mut Environment,
    _strict: bool,
) -> Result<Value> {
    // Named args are matched positionally against the built-in's canonical parameter
    // order; unsupplied trailing params bind to Null (spec.md §4.4).
    let ordered = canonical_param_order(name);
    let mut positional = vec![Value::Null; ordered.len().max(names.len())];
    for (n, v) in names.into_iter().zip(values) {
        if let Some(pos) = ordered.iter().position(|p| *p == n) {
            positional[pos] = v;
        }
    }
    builtins::call(name, positional)
}

fn canonical_param_order(name: &str) -> Vec<&'static str> {
    match name {
        "substring" => vec!["string", "start position", "length"],
        "contains" => vec!["string", "match"],
        "starts with" => vec!["string", "match"],
        "ends with" => vec!["string", "match"],
        "matches" => vec!["input", "pattern"],
        "replace" => vec!["input", "pattern", "replacement"],
        "split" => vec!["string", "delimiter"],
        _ => vec![],
    }
}

fn matches_type_name(v: &Value, type_name: &str) -> bool {
    match type_name {
        "number" | "integer" | "long" | "double" | "float" | "decimal" => matches!(v, Value::Number(_)),
        "string" => matches!(v, Value::String(_)),
        "boolean" => matches!(v, Value::Boolean(_)),
        "date" => matches!(v, Value::Date(_)),
        "time" => matches!(v, Value::Time(_, _)),
        "dateTime" => matches!(v, Value::DateTime(_, _)),
        "dayTimeDuration" => matches!(v, Value::DayTimeDuration(_)),
        "yearMonthDuration" => matches!(v, Value::YearMonthDuration(_)),
        "list" => matches!(v, Value::List(_)),
        "context" => matches!(v, Value::Context(_)),
        _ => false,
    }
}

/// Evaluates a unary test against an input value (spec.md §4.5). Returns
/// `Value::Boolean` for a match/non-match or `Value::Null` for a non-match caused by
/// a `Null` sub-evaluation; real errors propagate so the caller can demote the rule.
pub fn eval_unary_test(test: &UnaryTest, input: &Value, env: &mut Environment) -> Result<Value> {
    match test {
        UnaryTest::Any => Ok(Value::Boolean(true)),
        UnaryTest::IsNull => Ok(Value::Boolean(input.is_null())),
        UnaryTest::Not(tests) => {
            let mut any_null = false;
            for t in tests {
                match eval_unary_test(t, input, env)? {
                    Value::Boolean(true) => return Ok(Value::Boolean(false)),
                    Value::Null => any_null = true,
                    _ => {}
                }
            }
            Ok(if any_null { Value::Null } else { Value::Boolean(true) })
        }
        UnaryTest::Disjunction(tests) => {
            let mut any_null = false;
            for t in tests {
                match eval_unary_test(t, input, env)? {
                    Value::Boolean(true) => return Ok(Value::Boolean(true)),
                    Value::Null => any_null = true,
                    _ => {}
                }
            }
            Ok(if any_null { Value::Null } else { Value::Boolean(false) })
        }
        UnaryTest::Compare(op, expr) => {
            let x = eval_lenient(expr, env)?;
            if input.is_null() || x.is_null() {
                return Ok(Value::Null);
            }
            match input.feel_cmp(&x) {
                None => Ok(Value::Null),
                Some(ord) => Ok(Value::Boolean(match op {
                    CompareOp::Lt => ord == Ordering::Less,
                    CompareOp::Le => ord != Ordering::Greater,
                    CompareOp::Gt => ord == Ordering::Greater,
                    CompareOp::Ge => ord != Ordering::Less,
                    CompareOp::Ne => !input.feel_eq(&x),
                })),
            }
        }
        UnaryTest::Range {
            low,
            low_closed,
            high,
            high_closed,
        } => {
            let low_v = eval_lenient(low, env)?;
            let high_v = eval_lenient(high, env)?;
            if input.is_null() {
                return Ok(Value::Null);
            }
            let lower_ok = if low_v.is_null() {
                true
            } else {
                match input.feel_cmp(&low_v) {
                    None => return Ok(Value::Null),
                    Some(ord) => ord == Ordering::Greater || (*low_closed && ord == Ordering::Equal),
                }
            };
            let upper_ok = if high_v.is_null() {
                true
            } else {
                match input.feel_cmp(&high_v) {
                    None => return Ok(Value::Null),
                    Some(ord) => ord == Ordering::Less || (*high_closed && ord == Ordering::Equal),
                }
            };
            Ok(Value::Boolean(lower_ok && upper_ok))
        }
        UnaryTest::Expr(expr) => {
            let x = eval_lenient(expr, env)?;
            match (input, &x) {
                (Value::Range(a), Value::Range(b)) => Ok(Value::Boolean(ranges_intersect(a, b))),
                _ => {
                    if x.is_null() {
                        return Ok(Value::Boolean(input.is_null()));
                    }
                    Ok(Value::Boolean(input.feel_eq(&x)))
                }
            }
        }
    }
}

fn ranges_intersect(a: &Range, b: &Range) -> bool {
    let lower_ok = match (&a.low, &b.high) {
        (None, _) | (_, None) => true,
        (Some(al), Some(bh)) => match al.feel_cmp(bh) {
            Some(Ordering::Less) => true,
            Some(Ordering::Equal) => a.low_closed && b.high_closed,
            _ => false,
        },
    };
    let upper_ok = match (&a.high, &b.low) {
        (None, _) | (_, None) => true,
        (Some(ah), Some(bl)) => match ah.feel_cmp(bl) {
            Some(Ordering::Greater) => true,
            Some(Ordering::Equal) => a.high_closed && b.low_closed,
            _ => false,
        },
    };
    lower_ok && upper_ok
}
