//! List built-ins (spec.md §4.4).

use rust_decimal::Decimal;

use crate::error::{Error, Result};
use crate::value::Value;

fn expect_list(v: &Value) -> Result<Vec<Value>> {
    match v {
        Value::List(items) => Ok(items.clone()),
        _ => Err(Error::TypeError("expected a list argument".into())),
    }
}

fn arg<'a>(args: &'a [Value], index: usize, fn_name: &str) -> Result<&'a Value> {
    args.get(index)
        .ok_or_else(|| Error::InvalidArgument(format!("{fn_name}() requires at least {} argument(s)", index + 1)))
}

pub fn list_contains(args: Vec<Value>) -> Result<Value> {
    let list = expect_list(arg(&args, 0, "list contains")?)?;
    let target = arg(&args, 1, "list contains")?;
    Ok(Value::Boolean(list.iter().any(|v| v.feel_eq(target))))
}

pub fn append(args: Vec<Value>) -> Result<Value> {
    let mut list = expect_list(arg(&args, 0, "append")?)?;
    list.extend(args.into_iter().skip(1));
    Ok(Value::List(list))
}

pub fn concatenate(args: Vec<Value>) -> Result<Value> {
    let mut out = Vec::new();
    for a in args {
        out.extend(expect_list(&a)?);
    }
    Ok(Value::List(out))
}

pub fn insert_before(args: Vec<Value>) -> Result<Value> {
    let mut list = expect_list(arg(&args, 0, "insert before")?)?;
    let pos = match arg(&args, 1, "insert before")? {
        Value::Number(n) => n.to_string().parse::<i64>().unwrap_or(1),
        _ => return Err(Error::TypeError("insert before() position must be a number".into())),
    };
    let idx = ((pos - 1).max(0) as usize).min(list.len());
    let newitem = arg(&args, 2, "insert before")?.clone();
    list.insert(idx, newitem);
    Ok(Value::List(list))
}

pub fn remove(args: Vec<Value>) -> Result<Value> {
    let mut list = expect_list(arg(&args, 0, "remove")?)?;
    let pos = match arg(&args, 1, "remove")? {
        Value::Number(n) => n.to_string().parse::<i64>().unwrap_or(1),
        _ => return Err(Error::TypeError("remove() position must be a number".into())),
    };
    let idx = (pos - 1).max(0) as usize;
    if idx < list.len() {
        list.remove(idx);
    }
    Ok(Value::List(list))
}

pub fn reverse(args: Vec<Value>) -> Result<Value> {
    let mut list = expect_list(arg(&args, 0, "reverse")?)?;
    list.reverse();
    Ok(Value::List(list))
}

pub fn index_of(args: Vec<Value>) -> Result<Value> {
    let list = expect_list(arg(&args, 0, "index of")?)?;
    let target = arg(&args, 1, "index of")?;
    let indices: Vec<Value> = list
        .iter()
        .enumerate()
        .filter(|(_, v)| v.feel_eq(target))
        .map(|(i, _)| Value::Number(Decimal::from(i + 1)))
        .collect();
    Ok(Value::List(indices))
}

pub fn distinct_values(args: Vec<Value>) -> Result<Value> {
    let list = expect_list(arg(&args, 0, "distinct values")?)?;
    let mut out: Vec<Value> = Vec::new();
    for v in list {
        if !out.iter().any(|o| o.feel_eq(&v)) {
            out.push(v);
        }
    }
    Ok(Value::List(out))
}

pub fn flatten(args: Vec<Value>) -> Result<Value> {
    fn go(v: &Value, out: &mut Vec<Value>) {
        match v {
            Value::List(items) => {
                for item in items {
                    go(item, out);
                }
            }
            other => out.push(other.clone()),
        }
    }
    let mut out = Vec::new();
    go(arg(&args, 0, "flatten")?, &mut out);
    Ok(Value::List(out))
}

pub fn sort(args: Vec<Value>) -> Result<Value> {
    let mut list = expect_list(arg(&args, 0, "sort")?)?;
    list.sort_by(|a, b| a.feel_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    Ok(Value::List(list))
}
