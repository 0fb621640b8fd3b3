//! Context built-ins (spec.md §4.4).

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::value::Value;

fn expect_context(v: &Value) -> Result<IndexMap<String, Value>> {
    match v {
        Value::Context(entries) => Ok(entries.clone()),
        _ => Err(Error::TypeError("expected a context argument".into())),
    }
}

fn arg<'a>(args: &'a [Value], index: usize, fn_name: &str) -> Result<&'a Value> {
    args.get(index)
        .ok_or_else(|| Error::InvalidArgument(format!("{fn_name}() requires at least {} argument(s)", index + 1)))
}

pub fn get_value(args: Vec<Value>) -> Result<Value> {
    let ctx = expect_context(arg(&args, 0, "get value")?)?;
    let key = match arg(&args, 1, "get value")? {
        Value::String(s) => s.clone(),
        _ => return Err(Error::TypeError("get value() key must be a string".into())),
    };
    Ok(ctx.get(&key).cloned().unwrap_or(Value::Null))
}

pub fn get_entries(args: Vec<Value>) -> Result<Value> {
    let ctx = expect_context(arg(&args, 0, "get entries")?)?;
    Ok(Value::List(
        ctx.into_iter()
            .map(|(k, v)| {
                let mut entry = IndexMap::new();
                entry.insert("key".to_string(), Value::String(k));
                entry.insert("value".to_string(), v);
                Value::Context(entry)
            })
            .collect(),
    ))
}
