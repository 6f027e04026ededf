//! Dashboard macro expansion for query text.
//!
//! Expansion is a pure string rewrite done before a query is sent. Supported
//! macros:
//!
//! - `$__timeFilter(field)` becomes `field >= <from> AND field <= <to>`
//! - `$__timeFrom` / `$__timeFrom()` and `$__timeTo` / `$__timeTo()`
//! - `$__interval` (as a SurrealQL duration) and `$__interval_ms`
//! - `$__maxDataPoints`

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// Time range selected by the caller, as RFC 3339 timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: String,
    pub to: String,
}

impl TimeRange {
    /// Creates a time range.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Values available to macros.
#[derive(Debug, Clone, Default)]
pub struct MacroContext {
    pub time_range: Option<TimeRange>,
    pub interval_ms: Option<u64>,
    pub max_data_points: Option<u64>,
}

fn macro_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$__(\w+)").expect("macro pattern is a valid regex")
    })
}

/// Expands every macro in `text`.
///
/// An argument list may itself contain parentheses, e.g.
/// `$__timeFilter(time::floor(at, 1h))`. Unknown macros, unbalanced
/// argument lists and macros whose inputs are missing are caller errors.
pub fn expand_macros(text: &str, ctx: &MacroContext) -> Result<String> {
    let mut expanded = String::with_capacity(text.len());
    let mut last = 0;

    while let Some(caps) = macro_pattern().captures_at(text, last) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            break;
        };
        expanded.push_str(&text[last..whole.start()]);

        let (args, end) = if text[whole.end()..].starts_with('(') {
            let (args, end) = argument_list(text, whole.end()).ok_or_else(|| {
                BridgeError::bad_request(format!("unbalanced parentheses in $__{}", name.as_str()))
            })?;
            (Some(args.trim()), end)
        } else {
            (None, whole.end())
        };

        expanded.push_str(&expand_one(name.as_str(), args, ctx)?);
        last = end;
    }

    expanded.push_str(&text[last..]);
    Ok(expanded)
}

/// Finds the argument list opening at `open`. Returns the text between the
/// outer parentheses and the index just past the closing one.
fn argument_list(text: &str, open: usize) -> Option<(&str, usize)> {
    let mut depth = 0usize;
    for (offset, c) in text[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    let close = open + offset;
                    return Some((&text[open + 1..close], close + 1));
                }
            }
            _ => {}
        }
    }
    None
}

fn expand_one(name: &str, args: Option<&str>, ctx: &MacroContext) -> Result<String> {

    match name {
        "timeFilter" => {
            let field = args
                .filter(|a| !a.is_empty())
                .ok_or_else(|| BridgeError::bad_request("$__timeFilter requires a field name"))?;
            let range = time_range(name, ctx)?;
            Ok(format!(
                "{field} >= {} AND {field} <= {}",
                datetime_literal(&range.from)?,
                datetime_literal(&range.to)?
            ))
        }
        "timeFrom" | "timeTo" => {
            no_args(name, args)?;
            let range = time_range(name, ctx)?;
            let bound = if name == "timeFrom" {
                &range.from
            } else {
                &range.to
            };
            datetime_literal(bound)
        }
        "interval_ms" => {
            no_args(name, args)?;
            Ok(interval_ms(name, ctx)?.to_string())
        }
        "interval" => {
            no_args(name, args)?;
            Ok(format_duration(interval_ms(name, ctx)?))
        }
        "maxDataPoints" => {
            no_args(name, args)?;
            ctx.max_data_points
                .map(|n| n.to_string())
                .ok_or_else(|| missing(name, "max data points"))
        }
        other => Err(BridgeError::bad_request(format!(
            "unknown macro $__{other}"
        ))),
    }
}

fn no_args(name: &str, args: Option<&str>) -> Result<()> {
    match args {
        None | Some("") => Ok(()),
        Some(_) => Err(BridgeError::bad_request(format!(
            "$__{name} does not take arguments"
        ))),
    }
}

fn missing(name: &str, what: &str) -> BridgeError {
    BridgeError::bad_request(format!("$__{name} requires a {what} in the request"))
}

fn time_range<'a>(name: &str, ctx: &'a MacroContext) -> Result<&'a TimeRange> {
    ctx.time_range.as_ref().ok_or_else(|| missing(name, "time range"))
}

fn interval_ms(name: &str, ctx: &MacroContext) -> Result<u64> {
    ctx.interval_ms.ok_or_else(|| missing(name, "interval"))
}

/// Renders a timestamp as a SurrealQL datetime cast.
fn datetime_literal(timestamp: &str) -> Result<String> {
    if timestamp.is_empty() || timestamp.contains(['\'', '\\']) {
        return Err(BridgeError::bad_request(format!(
            "invalid timestamp in time range: {timestamp:?}"
        )));
    }
    Ok(format!("<datetime>'{timestamp}'"))
}

/// Formats milliseconds as the largest whole SurrealQL duration unit.
fn format_duration(ms: u64) -> String {
    const UNITS: [(u64, &str); 4] = [
        (86_400_000, "d"),
        (3_600_000, "h"),
        (60_000, "m"),
        (1_000, "s"),
    ];

    if ms == 0 {
        return "0ms".to_string();
    }
    UNITS
        .iter()
        .find(|(size, _)| ms % size == 0)
        .map(|(size, unit)| format!("{}{}", ms / size, unit))
        .unwrap_or_else(|| format!("{ms}ms"))
}
