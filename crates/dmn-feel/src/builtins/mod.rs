//! Built-in FEEL function dispatch (spec.md §4.4).
//!
//! Grouped the way `ferrum-fhirpath`'s `vm/functions/*.rs` splits its built-ins by
//! category (math, string, list/filtering, conversion) rather than one flat match.

mod context;
mod conversion;
mod list;
mod string;

use phf::phf_map;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::error::{Error, Result};
use crate::value::Value;

/// Minimum required argument count per built-in, the way `ferrum-fhirpath`'s
/// `FUNCTIONS_BY_NAME` registry carries `min_args`/`max_args` metadata alongside
/// its name lookup (only the floor is tracked here; most DMN built-ins are
/// variadic or have no useful upper bound).
static MIN_ARGS: phf::Map<&'static str, usize> = phf_map! {
    "substring" => 2,
    "string length" => 1,
    "upper case" => 1,
    "lower case" => 1,
    "contains" => 2,
    "starts with" => 2,
    "ends with" => 2,
    "matches" => 2,
    "replace" => 2,
    "split" => 2,
    "list contains" => 2,
    "append" => 1,
    "insert before" => 3,
    "remove" => 2,
    "reverse" => 1,
    "index of" => 2,
    "distinct values" => 1,
    "flatten" => 1,
    "sort" => 1,
    "get value" => 2,
    "get entries" => 1,
};

/// Dispatches a resolved built-in function name to its implementation.
///
/// `name` has already been joined from the parser's raw word run (so multi-word
/// built-ins like `string length` arrive as a single string). Arity is checked
/// against `MIN_ARGS` up front so a too-short call is rejected uniformly, before
/// any individual built-in's own argument handling runs.
pub fn call(name: &str, args: Vec<Value>) -> Result<Value> {
    if let Some(&min) = MIN_ARGS.get(name) {
        if args.len() < min {
            return Err(Error::InvalidArgument(format!(
                "{name}() requires at least {min} argument(s), got {}",
                args.len()
            )));
        }
    }
    match name {
        "not" => unary_bool(args, |b| !b),
        "sum" => aggregate(args, Decimal::ZERO, |acc, n| acc + n),
        "count" => Ok(Value::Number(Decimal::from(flatten_numeric_source(args)?.len()))),
        "min" => extremum(args, true),
        "max" => extremum(args, false),
        "mean" => mean(args),
        "median" => median(args),
        "mode" => mode(args),
        "stddev" => stddev(args),

        "substring" => string::substring(args),
        "string length" => string::string_length(args),
        "upper case" => string::upper_case(args),
        "lower case" => string::lower_case(args),
        "contains" => string::contains(args),
        "starts with" => string::starts_with(args),
        "ends with" => string::ends_with(args),
        "matches" => string::matches(args),
        "replace" => string::replace(args),
        "split" => string::split(args),

        "list contains" => list::list_contains(args),
        "append" => list::append(args),
        "concatenate" => list::concatenate(args),
        "insert before" => list::insert_before(args),
        "remove" => list::remove(args),
        "reverse" => list::reverse(args),
        "index of" => list::index_of(args),
        "distinct values" => list::distinct_values(args),
        "flatten" => list::flatten(args),
        "sort" => list::sort(args),

        "get value" => context::get_value(args),
        "get entries" => context::get_entries(args),

        "number" => conversion::number(args),
        "string" => conversion::string(args),
        "boolean" => conversion::boolean(args),
        "date" => conversion::date(args),
        "time" => conversion::time(args),
        "date and time" => conversion::date_and_time(args),
        "duration" => conversion::duration(args),
        "years and months duration" => conversion::years_and_months_duration(args),
        "is defined" => Ok(Value::Boolean(!matches!(args.first(), None | Some(Value::Null)))),

        other => Err(Error::UnknownFunction(other.to_string())),
    }
}

fn unary_bool(args: Vec<Value>, f: impl Fn(bool) -> bool) -> Result<Value> {
    match args.first() {
        Some(Value::Boolean(b)) => Ok(Value::Boolean(f(*b))),
        Some(Value::Null) | None => Ok(Value::Null),
        _ => Err(Error::TypeError("expected boolean argument".into())),
    }
}

/// Built-ins that take either a single list argument or a variadic list of numbers
/// (DMN's convention for `sum(1,2,3)` vs `sum([1,2,3])`).
fn flatten_numeric_source(args: Vec<Value>) -> Result<Vec<Decimal>> {
    let items: Vec<Value> = if args.len() == 1 {
        match &args[0] {
            Value::List(items) => items.clone(),
            other => vec![other.clone()],
        }
    } else {
        args
    };
    items
        .into_iter()
        .map(|v| match v {
            Value::Number(d) => Ok(d),
            _ => Err(Error::TypeError("expected a numeric list".into())),
        })
        .collect()
}

fn aggregate(args: Vec<Value>, init: Decimal, f: impl Fn(Decimal, Decimal) -> Decimal) -> Result<Value> {
    let nums = flatten_numeric_source(args)?;
    Ok(Value::Number(nums.into_iter().fold(init, f)))
}

fn extremum(args: Vec<Value>, min: bool) -> Result<Value> {
    let nums = flatten_numeric_source(args)?;
    if nums.is_empty() {
        return Ok(Value::Null);
    }
    let best = nums
        .into_iter()
        .reduce(|a, b| if (min && b < a) || (!min && b > a) { b } else { a })
        .unwrap();
    Ok(Value::Number(best))
}

fn mean(args: Vec<Value>) -> Result<Value> {
    let nums = flatten_numeric_source(args)?;
    if nums.is_empty() {
        return Ok(Value::Null);
    }
    let sum: Decimal = nums.iter().sum();
    Ok(Value::Number(sum / Decimal::from(nums.len())))
}

fn median(args: Vec<Value>) -> Result<Value> {
    let mut nums = flatten_numeric_source(args)?;
    if nums.is_empty() {
        return Ok(Value::Null);
    }
    nums.sort();
    let mid = nums.len() / 2;
    let value = if nums.len() % 2 == 0 {
        (nums[mid - 1] + nums[mid]) / Decimal::from(2)
    } else {
        nums[mid]
    };
    Ok(Value::Number(value))
}

fn mode(args: Vec<Value>) -> Result<Value> {
    let mut nums = flatten_numeric_source(args)?;
    if nums.is_empty() {
        return Ok(Value::List(Vec::new()));
    }
    nums.sort();
    let mut best: Vec<Decimal> = Vec::new();
    let mut best_count = 0usize;
    let mut i = 0;
    while i < nums.len() {
        let mut j = i;
        while j < nums.len() && nums[j] == nums[i] {
            j += 1;
        }
        let count = j - i;
        match count.cmp(&best_count) {
            std::cmp::Ordering::Greater => {
                best_count = count;
                best = vec![nums[i]];
            }
            std::cmp::Ordering::Equal => best.push(nums[i]),
            std::cmp::Ordering::Less => {}
        }
        i = j;
    }
    Ok(Value::List(best.into_iter().map(Value::Number).collect()))
}

fn stddev(args: Vec<Value>) -> Result<Value> {
    let nums = flatten_numeric_source(args)?;
    if nums.len() < 2 {
        return Ok(Value::Null);
    }
    let n = nums.len() as f64;
    let mean: f64 = nums
        .iter()
        .map(|d| d.to_f64().unwrap_or(0.0))
        .sum::<f64>()
        / n;
    let variance = nums
        .iter()
        .map(|d| {
            let v = d.to_f64().unwrap_or(0.0) - mean;
            v * v
        })
        .sum::<f64>()
        / (n - 1.0);
    let sd = variance.sqrt();
    Decimal::try_from(sd)
        .map(Value::Number)
        .map_err(|e| Error::BuiltinError(format!("stddev result not representable: {e}")))
}
