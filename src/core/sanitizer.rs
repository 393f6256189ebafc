//! Repair and decode near-JSON text returned by a language model.
//!
//! Models asked for JSON often answer with Python-style single quotes,
//! unquoted episode codes, trailing commas, code fences or prose around
//! the payload. [`sanitize_llm_output`] walks the text once with a small
//! state machine tracking bracket depth and quote state, so apostrophes and
//! colons inside real titles survive the repairs.

use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

static EPISODE_CODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^S\d{1,3}E\d{1,4}(?:-?E\d{1,4})*$").expect("valid episode code regex")
});

/// One segment proposed by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmSegment {
    /// Proposed episode title.
    pub title: String,
    /// Episode code or number, as the model wrote it.
    pub episode: Option<String>,
}

/// Repair model output into text that has a good chance of being JSON.
///
/// Repairs, in one pass:
/// 1. Single-quoted strings opening at a key/value boundary become
///    double-quoted; an inner `'` only closes the string when followed by a
///    delimiter, so `'Pup's Day'` keeps its apostrophe.
/// 2. Bare episode codes (`S01E01`, `S01E01-E02`) are quoted, as are bare
///    object keys and Python `True`/`False`/`None` are mapped to JSON.
/// 3. Commas directly before `]` or `}` are dropped.
///
/// Text before the first bracket and after the outermost container closes
/// is discarded, and containers left open at the end are closed.
pub fn sanitize_llm_output(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    let start = chars.iter().position(|c| *c == '[' || *c == '{');
    let mut i = start.unwrap_or(0);
    let mut out = String::with_capacity(raw.len() + 16);
    let mut stack: Vec<char> = Vec::new();

    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' => {
                i = copy_double_quoted(&chars, i, &mut out);
                continue;
            }
            '\'' if at_boundary(&out) => {
                i = convert_single_quoted(&chars, i, &mut out);
                continue;
            }
            '[' => {
                stack.push(']');
                out.push(c);
            }
            '{' => {
                stack.push('}');
                out.push(c);
            }
            ']' | '}' => {
                if stack.contains(&c) {
                    // Close anything the model forgot before this closer.
                    while let Some(closer) = stack.pop() {
                        trim_trailing_comma(&mut out);
                        out.push(closer);
                        if closer == c {
                            break;
                        }
                    }
                    if stack.is_empty() && start.is_some() {
                        return out;
                    }
                }
            }
            ',' => {
                if !next_is_closer(&chars, i + 1) {
                    out.push(c);
                }
            }
            c if is_token_char(c) => {
                let in_object = stack.last() == Some(&'}');
                i = copy_bare_token(&chars, i, in_object, &mut out);
                continue;
            }
            '\n' | '\r' | '\t' | ' ' => out.push(c),
            _ => out.push(c),
        }
        i += 1;
    }

    while let Some(closer) = stack.pop() {
        trim_trailing_comma(&mut out);
        out.push(closer);
    }
    out
}

fn is_token_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '+' | '.')
}

fn last_significant(out: &str) -> Option<char> {
    out.chars().rev().find(|c| !c.is_whitespace())
}

/// Whether a string may start here: at the start or after `[ { , :`.
fn at_boundary(out: &str) -> bool {
    matches!(last_significant(out), None | Some('[' | '{' | ',' | ':'))
}

fn next_significant(chars: &[char], from: usize) -> Option<char> {
    chars[from.min(chars.len())..]
        .iter()
        .copied()
        .find(|c| !c.is_whitespace())
}

fn next_is_closer(chars: &[char], from: usize) -> bool {
    matches!(next_significant(chars, from), None | Some(']' | '}'))
}

fn trim_trailing_comma(out: &mut String) {
    let trimmed_len = out.trim_end().len();
    if out[..trimmed_len].ends_with(',') {
        out.truncate(trimmed_len - 1);
    }
}

fn push_string_char(out: &mut String, c: char) {
    match c {
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        _ => out.push(c),
    }
}

/// Copy a double-quoted string verbatim, closing it if the input ends.
fn copy_double_quoted(chars: &[char], start: usize, out: &mut String) -> usize {
    out.push('"');
    let mut j = start + 1;
    while j < chars.len() {
        match chars[j] {
            '\\' if j + 1 < chars.len() => {
                out.push('\\');
                out.push(chars[j + 1]);
                j += 2;
            }
            '"' => {
                out.push('"');
                return j + 1;
            }
            c => {
                push_string_char(out, c);
                j += 1;
            }
        }
    }
    out.push('"');
    j
}

/// Rewrite a single-quoted string as a double-quoted one.
fn convert_single_quoted(chars: &[char], start: usize, out: &mut String) -> usize {
    out.push('"');
    let mut j = start + 1;
    while j < chars.len() {
        match chars[j] {
            '\\' if j + 1 < chars.len() => {
                if chars[j + 1] == '\'' {
                    out.push('\'');
                } else {
                    out.push('\\');
                    out.push(chars[j + 1]);
                }
                j += 2;
            }
            '\'' => {
                if matches!(next_significant(chars, j + 1), None | Some(',' | ':' | ']' | '}')) {
                    out.push('"');
                    return j + 1;
                }
                out.push('\'');
                j += 1;
            }
            '"' => {
                out.push_str("\\\"");
                j += 1;
            }
            c => {
                push_string_char(out, c);
                j += 1;
            }
        }
    }
    out.push('"');
    j
}

/// Copy an unquoted scalar, quoting it when it is an episode code or an
/// object key.
fn copy_bare_token(chars: &[char], start: usize, in_object: bool, out: &mut String) -> usize {
    let mut j = start;
    while j < chars.len() && is_token_char(chars[j]) {
        j += 1;
    }
    let token: String = chars[start..j].iter().collect();

    let is_key = in_object
        && matches!(last_significant(out), Some('{' | ','))
        && next_significant(chars, j) == Some(':');

    if is_key || EPISODE_CODE_RE.is_match(&token) {
        out.push('"');
        out.push_str(&token);
        out.push('"');
    } else {
        match token.as_str() {
            "True" => out.push_str("true"),
            "False" => out.push_str("false"),
            "None" => out.push_str("null"),
            _ => out.push_str(&token),
        }
    }
    j
}

/// Decode model output as a list of key-value mappings.
///
/// Fails with [`Error::SanitizationDecode`] when the repaired text is not
/// JSON or not a list of objects; callers fall back to deterministic
/// matching.
pub fn parse_llm_segments(raw: &str) -> Result<Vec<Map<String, Value>>> {
    let cleaned = sanitize_llm_output(raw);
    let value: Value = serde_json::from_str(&cleaned)
        .map_err(|e| Error::SanitizationDecode(format!("{}: {}", e, cleaned)))?;

    let Value::Array(items) = value else {
        return Err(Error::SanitizationDecode(format!(
            "expected a list, got {}",
            kind(&value)
        )));
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => Ok(map),
            other => Err(Error::SanitizationDecode(format!(
                "expected a mapping, got {}",
                kind(&other)
            ))),
        })
        .collect()
}

/// Typed view over decoded segments. Records without a string title are
/// dropped.
pub fn segments_from_records(records: &[Map<String, Value>]) -> Vec<LlmSegment> {
    records
        .iter()
        .filter_map(|record| {
            let title = record.get("title")?.as_str()?.trim();
            if title.is_empty() {
                return None;
            }
            let episode = record.get("episode").and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            });
            Some(LlmSegment {
                title: title.to_string(),
                episode,
            })
        })
        .collect()
}

/// Decode a disambiguation answer into the candidates the model picked, in
/// the model's order.
///
/// Accepts a list of strings, a list of `{"title": ..}` objects, a single
/// string, or an object with a `selected` list. Anything not present
/// verbatim in `candidates` is discarded; undecodable output selects
/// nothing.
pub fn parse_disambiguation(raw: &str, candidates: &[String]) -> Vec<String> {
    let cleaned = sanitize_llm_output(raw);
    let value: Value = match serde_json::from_str(&cleaned) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Ignoring undecodable disambiguation response: {}", e);
            return Vec::new();
        }
    };

    let picks: Vec<&Value> = match &value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => match map.get("selected") {
            Some(Value::Array(items)) => items.iter().collect(),
            _ => vec![&value],
        },
        other => vec![other],
    };

    let mut selected: Vec<String> = Vec::new();
    for pick in picks {
        let text = match pick {
            Value::String(s) => Some(s.as_str()),
            Value::Object(map) => map.get("title").and_then(Value::as_str),
            _ => None,
        };
        if let Some(text) = text {
            if candidates.iter().any(|c| c == text) && !selected.iter().any(|s| s == text) {
                selected.push(text.to_string());
            }
        }
    }
    selected
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}
