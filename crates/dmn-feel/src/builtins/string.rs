//! String built-ins (spec.md §4.4).

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::{Error, Result};
use crate::value::Value;

fn expect_string(v: &Value) -> Result<String> {
    match v {
        Value::String(s) => Ok(s.clone()),
        _ => Err(Error::TypeError("expected a string argument".into())),
    }
}

fn arg<'a>(args: &'a [Value], index: usize, fn_name: &str) -> Result<&'a Value> {
    args.get(index)
        .ok_or_else(|| Error::InvalidArgument(format!("{fn_name}() requires at least {} argument(s)", index + 1)))
}

pub fn substring(args: Vec<Value>) -> Result<Value> {
    if args.len() < 2 {
        return Err(Error::InvalidArgument("substring() requires at least 2 arguments".into()));
    }
    let s = expect_string(arg(&args, 0, "substring")?)?;
    let chars: Vec<char> = s.chars().collect();
    let start = match arg(&args, 1, "substring")? {
        Value::Number(n) => n.to_i64().ok_or_else(|| Error::TypeError("substring start out of range".into()))?,
        _ => return Err(Error::TypeError("substring start must be a number".into())),
    };
    let start_idx = if start > 0 { (start - 1) as usize } else { 0 };
    let start_idx = start_idx.min(chars.len());
    let end_idx = if let Some(Value::Number(len)) = args.get(2) {
        let len = len.to_i64().unwrap_or(0).max(0) as usize;
        (start_idx + len).min(chars.len())
    } else {
        chars.len()
    };
    Ok(Value::String(chars[start_idx..end_idx].iter().collect()))
}

pub fn string_length(args: Vec<Value>) -> Result<Value> {
    let s = expect_string(args.first().ok_or_else(|| Error::InvalidArgument("string length() requires 1 argument".into()))?)?;
    Ok(Value::Number(Decimal::from(s.chars().count())))
}

pub fn upper_case(args: Vec<Value>) -> Result<Value> {
    Ok(Value::String(expect_string(arg(&args, 0, "upper case")?)?.to_uppercase()))
}

pub fn lower_case(args: Vec<Value>) -> Result<Value> {
    Ok(Value::String(expect_string(arg(&args, 0, "lower case")?)?.to_lowercase()))
}

pub fn contains(args: Vec<Value>) -> Result<Value> {
    let haystack = expect_string(arg(&args, 0, "contains")?)?;
    let needle = expect_string(arg(&args, 1, "contains")?)?;
    Ok(Value::Boolean(haystack.contains(&needle)))
}

pub fn starts_with(args: Vec<Value>) -> Result<Value> {
    let s = expect_string(arg(&args, 0, "starts with")?)?;
    let prefix = expect_string(arg(&args, 1, "starts with")?)?;
    Ok(Value::Boolean(s.starts_with(&prefix)))
}

pub fn ends_with(args: Vec<Value>) -> Result<Value> {
    let s = expect_string(arg(&args, 0, "ends with")?)?;
    let suffix = expect_string(arg(&args, 1, "ends with")?)?;
    Ok(Value::Boolean(s.ends_with(&suffix)))
}

pub fn matches(args: Vec<Value>) -> Result<Value> {
    let s = expect_string(arg(&args, 0, "matches")?)?;
    let pattern = expect_string(arg(&args, 1, "matches")?)?;
    let re = regex::Regex::new(&pattern).map_err(|e| Error::BuiltinError(format!("bad regex: {e}")))?;
    Ok(Value::Boolean(re.is_match(&s)))
}

pub fn replace(args: Vec<Value>) -> Result<Value> {
    let s = expect_string(arg(&args, 0, "replace")?)?;
    let pattern = expect_string(arg(&args, 1, "replace")?)?;
    let with = expect_string(args.get(2).unwrap_or(&Value::String(String::new())))?;
    let re = regex::Regex::new(&pattern).map_err(|e| Error::BuiltinError(format!("bad regex: {e}")))?;
    Ok(Value::String(re.replace_all(&s, with.as_str()).into_owned()))
}

pub fn split(args: Vec<Value>) -> Result<Value> {
    let s = expect_string(arg(&args, 0, "split")?)?;
    let delimiter = expect_string(arg(&args, 1, "split")?)?;
    let re = regex::Regex::new(&delimiter).map_err(|e| Error::BuiltinError(format!("bad regex: {e}")))?;
    Ok(Value::List(
        re.split(&s).map(|p| Value::String(p.to_string())).collect(),
    ))
}
