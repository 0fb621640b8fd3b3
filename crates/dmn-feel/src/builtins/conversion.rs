//! Conversion built-ins (spec.md §4.4).

use std::str::FromStr;

use chrono::Datelike;
use rust_decimal::Decimal;

use crate::error::{Error, Result};
use crate::temporal;
use crate::value::{Value, YearMonthDuration};

pub fn number(args: Vec<Value>) -> Result<Value> {
    match args.first() {
        Some(Value::Number(d)) => Ok(Value::Number(*d)),
        Some(Value::String(s)) => match Decimal::from_str(s.trim()) {
            Ok(d) => Ok(Value::Number(d)),
            Err(_) => Ok(Value::Null),
        },
        Some(Value::Null) | None => Ok(Value::Null),
        _ => Err(Error::TypeError("number() requires a string or number".into())),
    }
}

pub fn string(args: Vec<Value>) -> Result<Value> {
    match args.first() {
        Some(Value::Null) | None => Ok(Value::Null),
        Some(v) => Ok(Value::String(v.to_string())),
    }
}

pub fn boolean(args: Vec<Value>) -> Result<Value> {
    match args.first() {
        Some(Value::Boolean(b)) => Ok(Value::Boolean(*b)),
        Some(Value::String(s)) => match s.as_str() {
            "true" => Ok(Value::Boolean(true)),
            "false" => Ok(Value::Boolean(false)),
            _ => Ok(Value::Null),
        },
        _ => Ok(Value::Null),
    }
}

pub fn date(args: Vec<Value>) -> Result<Value> {
    match args.first() {
        Some(Value::String(s)) => temporal::parse_date(s),
        Some(v @ Value::Date(_)) => Ok(v.clone()),
        Some(Value::DateTime(dt, _)) => Ok(Value::Date(dt.date())),
        _ => Err(Error::TypeError("date() requires a string or date-time".into())),
    }
}

pub fn time(args: Vec<Value>) -> Result<Value> {
    match args.first() {
        Some(Value::String(s)) => temporal::parse_time(s),
        Some(v @ Value::Time(_, _)) => Ok(v.clone()),
        Some(Value::DateTime(dt, off)) => Ok(Value::Time(dt.time(), *off)),
        _ => Err(Error::TypeError("time() requires a string or date-time".into())),
    }
}

pub fn date_and_time(args: Vec<Value>) -> Result<Value> {
    match (args.first(), args.get(1)) {
        (Some(Value::String(s)), None) => temporal::parse_date_time(s),
        (Some(Value::Date(d)), Some(Value::Time(t, off))) => {
            Ok(Value::DateTime(d.and_time(*t), *off))
        }
        _ => Err(Error::TypeError(
            "date and time() requires a string, or a date and a time".into(),
        )),
    }
}

pub fn duration(args: Vec<Value>) -> Result<Value> {
    match args.first() {
        Some(Value::String(s)) => temporal::try_parse_duration(s)
            .ok_or_else(|| Error::BuiltinError(format!("invalid duration '{s}'"))),
        _ => Err(Error::TypeError("duration() requires a string".into())),
    }
}

pub fn years_and_months_duration(args: Vec<Value>) -> Result<Value> {
    match (args.first(), args.get(1)) {
        (Some(Value::Date(from)), Some(Value::Date(to))) => {
            let months = month_span(from.year(), from.month(), to.year(), to.month());
            Ok(Value::YearMonthDuration(YearMonthDuration { months }))
        }
        _ => Err(Error::TypeError(
            "years and months duration() requires two dates".into(),
        )),
    }
}

fn month_span(y1: i32, m1: u32, y2: i32, m2: u32) -> i64 {
    (y2 as i64 - y1 as i64) * 12 + (m2 as i64 - m1 as i64)
}
