//! Parsing of FEEL temporal literal text, shared by `@"..."` literals and the
//! `date`/`time`/`date and time`/`duration` conversion built-ins.

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{Error, Result};
use crate::value::{DayTimeDuration, Value, YearMonthDuration};

/// Parses the text between the quotes of an `@"..."` literal, selecting
/// Date/Time/DateTime/Duration by lexical form (spec.md §4.4).
pub fn parse_temporal_literal(text: &str) -> Result<Value> {
    if let Some(v) = try_parse_duration(text) {
        return Ok(v);
    }
    if text.contains('T') {
        return parse_date_time(text);
    }
    if text.contains(':') {
        return parse_time(text);
    }
    parse_date(text)
}

pub fn parse_date(text: &str) -> Result<Value> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map(Value::Date)
        .map_err(|e| Error::BuiltinError(format!("invalid date '{text}': {e}")))
}

pub fn parse_time(text: &str) -> Result<Value> {
    let (naive_part, offset) = split_offset(text);
    let time = NaiveTime::parse_from_str(naive_part, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(naive_part, "%H:%M:%S%.f"))
        .map_err(|e| Error::BuiltinError(format!("invalid time '{text}': {e}")))?;
    Ok(Value::Time(time, offset))
}

pub fn parse_date_time(text: &str) -> Result<Value> {
    let (naive_part, offset) = split_offset(text);
    let dt = NaiveDateTime::parse_from_str(naive_part, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(naive_part, "%Y-%m-%dT%H:%M:%S%.f"))
        .map_err(|e| Error::BuiltinError(format!("invalid date-time '{text}': {e}")))?;
    Ok(Value::DateTime(dt, offset))
}

fn split_offset(text: &str) -> (&str, Option<FixedOffset>) {
    if let Some(stripped) = text.strip_suffix('Z') {
        return (stripped, Some(FixedOffset::east_opt(0).unwrap()));
    }
    // Look for a +HH:MM / -HH:MM suffix after any time component.
    if text.len() > 6 {
        let tail = &text[text.len() - 6..];
        let mut chars = tail.chars();
        let sign = chars.next();
        if matches!(sign, Some('+') | Some('-')) && tail.as_bytes()[3] == b':' {
            if let Ok(offset) = parse_offset(tail) {
                return (&text[..text.len() - 6], Some(offset));
            }
        }
    }
    (text, None)
}

fn parse_offset(tail: &str) -> Result<FixedOffset> {
    let sign = if tail.starts_with('-') { -1 } else { 1 };
    let hh: i32 = tail[1..3]
        .parse()
        .map_err(|_| Error::BuiltinError(format!("invalid offset '{tail}'")))?;
    let mm: i32 = tail[4..6]
        .parse()
        .map_err(|_| Error::BuiltinError(format!("invalid offset '{tail}'")))?;
    let seconds = sign * (hh * 3600 + mm * 60);
    FixedOffset::east_opt(seconds).ok_or_else(|| Error::BuiltinError(format!("invalid offset '{tail}'")))
}

/// Parses an ISO-8601 duration (`P1D`, `P3DT4H`, `P1Y2M`, ...) into either a
/// day-time or year-month duration, per which designators are present.
pub fn try_parse_duration(text: &str) -> Option<Value> {
    if !text.starts_with('P') {
        return None;
    }
    let neg = false;
    let rest = &text[1..];
    let (date_part, time_part) = match rest.split_once('T') {
        Some((d, t)) => (d, Some(t)),
        None => (rest, None),
    };

    let mut years = 0i64;
    let mut months = 0i64;
    let mut days = 0i64;
    let mut hours = 0i64;
    let mut minutes = 0i64;
    let mut seconds = 0i64;
    let mut has_year_month = false;
    let mut has_day_time = time_part.is_some();

    let mut num = String::new();
    for c in date_part.chars() {
        if c.is_ascii_digit() {
            num.push(c);
            continue;
        }
        let n: i64 = num.parse().ok()?;
        num.clear();
        match c {
            'Y' => {
                years = n;
                has_year_month = true;
            }
            'M' => {
                months = n;
                has_year_month = true;
            }
            'D' => {
                days = n;
                has_day_time = true;
            }
            // No explicit `T` designator present but a time-only designator shows
            // up anyway (e.g. "P90000S"); accept it as day-time rather than
            // rejecting a value that `format_day_time_duration` itself produces.
            'H' => {
                hours = n;
                has_day_time = true;
            }
            'S' => {
                seconds = n;
                has_day_time = true;
            }
            _ => return None,
        }
    }

    if let Some(time_part) = time_part {
        let mut num = String::new();
        for c in time_part.chars() {
            if c.is_ascii_digit() {
                num.push(c);
                continue;
            }
            let n: i64 = num.parse().ok()?;
            num.clear();
            match c {
                'H' => hours = n,
                'M' => minutes = n,
                'S' => seconds = n,
                _ => return None,
            }
        }
    }

    if has_year_month && has_day_time {
        // DMN keeps these disjoint; prefer day-time when both designators appear
        // (matches how "P1DT1H" style values are commonly authored).
        has_year_month = false;
    }

    if has_year_month {
        let total_months = years * 12 + months;
        Some(Value::YearMonthDuration(YearMonthDuration {
            months: if neg { -total_months } else { total_months },
        }))
    } else {
        let total_seconds = days * 86_400 + hours * 3600 + minutes * 60 + seconds;
        Some(Value::DayTimeDuration(DayTimeDuration {
            seconds: if neg { -total_seconds } else { total_seconds },
        }))
    }
}

pub fn format_day_time_duration(d: DayTimeDuration) -> String {
    let mut s = d.seconds;
    let neg = s < 0;
    if neg {
        s = -s;
    }
    let days = s / 86_400;
    let rem = s % 86_400;
    let hours = rem / 3600;
    let rem = rem % 3600;
    let minutes = rem / 60;
    let seconds = rem % 60;
    format!(
        "{}P{}DT{}H{}M{}S",
        if neg { "-" } else { "" },
        days,
        hours,
        minutes,
        seconds
    )
}

pub fn format_year_month_duration(d: YearMonthDuration) -> String {
    let mut m = d.months;
    let neg = m < 0;
    if neg {
        m = -m;
    }
    format!("{}P{}Y{}M", if neg { "-" } else { "" }, m / 12, m % 12)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn day_time_duration_formats_with_the_mandatory_t_designator() {
        let d = DayTimeDuration { seconds: 90_000 };
        assert_eq!(format_day_time_duration(d), "P1DT1H0M0S");
    }

    #[test]
    fn day_time_duration_round_trips_through_duration_and_display() {
        for text in ["P1DT1H", "P90000S", "PT3600S"] {
            let parsed = try_parse_duration(text).unwrap();
            let rendered = parsed.to_string();
            let reparsed = try_parse_duration(&rendered)
                .unwrap_or_else(|| panic!("'{rendered}' (from '{text}') did not reparse"));
            assert_eq!(parsed, reparsed);
        }
    }

    #[test]
    fn year_month_duration_round_trips() {
        let parsed = Value::YearMonthDuration(YearMonthDuration { months: 14 });
        let rendered = parsed.to_string();
        assert_eq!(rendered, "P1Y2M");
    }
}
