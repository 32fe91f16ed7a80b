//! The ordered strategy chain used by [`crate::parse`].
//!
//! Each strategy is a plain function returning `Some(record)` on success. The chain is tried
//! front to back and the first hit wins.

use crate::Record;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Which strategy produced a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParseStrategy {
    Direct,
    FencedBlock,
    BalancedBraces,
    Normalised,
    KeyValue,
}

impl std::fmt::Display for ParseStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Direct => "direct",
            Self::FencedBlock => "fenced_block",
            Self::BalancedBraces => "balanced_braces",
            Self::Normalised => "normalised",
            Self::KeyValue => "key_value",
        };
        f.write_str(name)
    }
}

type StrategyFn = fn(&str) -> Option<Record>;

pub(crate) const CHAIN: [(ParseStrategy, StrategyFn); 5] = [
    (ParseStrategy::Direct, direct),
    (ParseStrategy::FencedBlock, fenced_block),
    (ParseStrategy::BalancedBraces, balanced_braces),
    (ParseStrategy::Normalised, normalised),
    (ParseStrategy::KeyValue, key_value),
];

static FENCED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)```(?:json)?\s*(\{.*?\})\s*```").expect("valid regex"));

static BALANCED_OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[^{}]*(?:\{[^{}]*\}[^{}]*)*\}").expect("valid regex"));

static KEY_PATIENT_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)"?patient_id"?\s*:\s*"?([^",\s}]+)"?"#).expect("valid regex")
});

static KEY_ANALYSIS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)"?analysis"?\s*:\s*\[(.*?)\]"#).expect("valid regex"));

static KEY_SCORES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)"?coding_accuracy_score"?\s*:\s*\{(.*?)\}"#).expect("valid regex")
});

static KEY_MATCH_POTENTIAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)"?match_potential"?\s*:\s*\{(.*?)\}"#).expect("valid regex")
});

static BARE_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([{,]\s*)([A-Za-z_][A-Za-z0-9_]*)\s*:").expect("valid regex"));

static KEY_ASSESSMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)"?overall_assessment"?\s*:\s*"([^"]+)""#).expect("valid regex")
});

/// Parse `text` strictly, accepting only JSON objects.
pub(crate) fn strict_object(text: &str) -> Option<Record> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn direct(text: &str) -> Option<Record> {
    strict_object(text.trim())
}

fn fenced_block(text: &str) -> Option<Record> {
    FENCED_BLOCK
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .find_map(|m| strict_object(m.as_str().trim()))
}

fn balanced_braces(text: &str) -> Option<Record> {
    let mut candidates: Vec<&str> = BALANCED_OBJECT.find_iter(text).map(|m| m.as_str()).collect();
    // Longest first: a complete outer object beats any fragment inside it.
    candidates.sort_by_key(|c| std::cmp::Reverse(c.len()));
    candidates.into_iter().find_map(|c| strict_object(c.trim()))
}

fn normalised(text: &str) -> Option<Record> {
    normalise_json_text(text).and_then(|cleaned| strict_object(&cleaned))
}

/// Rewrite near-JSON into something a strict parser may accept.
///
/// - drops everything before the first `{` and after the last `}`
/// - collapses runs of whitespace (including newlines inside strings) to one space
/// - rewrites `True`/`False`/`None`/`NULL` outside strings to JSON literals
/// - escapes quotes inside string values that are not followed by a structural character
/// - drops trailing commas before `}` or `]`
pub(crate) fn normalise_json_text(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }

    let collapsed = text[start..=end].split_whitespace().collect::<Vec<_>>().join(" ");
    let chars: Vec<char> = collapsed.chars().collect();
    let mut out = String::with_capacity(collapsed.len() + 16);
    let mut in_string = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if in_string {
            match c {
                '\\' => {
                    out.push(c);
                    if let Some(&next) = chars.get(i + 1) {
                        out.push(next);
                        i += 1;
                    }
                }
                '"' if closes_string(&chars[i + 1..]) => {
                    in_string = false;
                    out.push(c);
                }
                '"' => out.push_str("\\\""),
                _ => out.push(c),
            }
        } else if c == '"' {
            in_string = true;
            out.push(c);
        } else if c.is_ascii_alphabetic() {
            let word_end = chars[i..]
                .iter()
                .position(|ch| !(ch.is_ascii_alphanumeric() || *ch == '_'))
                .map_or(chars.len(), |p| i + p);
            let word: String = chars[i..word_end].iter().collect();
            out.push_str(match word.as_str() {
                "True" | "TRUE" => "true",
                "False" | "FALSE" => "false",
                "None" | "NULL" | "Null" => "null",
                other => other,
            });
            i = word_end;
            continue;
        } else if c == ','
            && next_significant(&chars[i + 1..]).is_some_and(|n| n == '}' || n == ']')
        {
            // trailing comma
        } else {
            out.push(c);
        }
        i += 1;
    }

    Some(out)
}

fn next_significant(rest: &[char]) -> Option<char> {
    rest.iter().copied().find(|c| !c.is_whitespace())
}

fn closes_string(rest: &[char]) -> bool {
    matches!(
        next_significant(rest),
        None | Some(',') | Some('}') | Some(']') | Some(':')
    )
}

fn key_value(text: &str) -> Option<Record> {
    let mut extracted = Record::new();

    if let Some(caps) = KEY_PATIENT_ID.captures(text) {
        extracted.insert("patient_id".into(), Value::String(caps[1].to_owned()));
    }

    if let Some(caps) = KEY_ANALYSIS.captures(text) {
        extracted.insert("analysis".into(), Value::Array(analysis_entries(&caps[1])));
    }

    for (key, pattern) in [
        ("coding_accuracy_score", &*KEY_SCORES),
        ("match_potential", &*KEY_MATCH_POTENTIAL),
    ] {
        if let Some(caps) = pattern.captures(text) {
            extracted.insert(key.into(), Value::Object(loose_object(&caps[1])));
        }
    }

    if let Some(caps) = KEY_ASSESSMENT.captures(text) {
        extracted.insert(
            "overall_assessment".into(),
            Value::String(caps[1].to_owned()),
        );
    }

    (!extracted.is_empty()).then_some(extracted)
}

/// Parse the body of a small flat object, tolerating unquoted keys and Python literals.
/// Anything still unparseable is an empty object.
fn loose_object(body: &str) -> Record {
    let wrapped = format!("{{{body}}}");
    strict_object(&wrapped)
        .or_else(|| {
            let normalised = normalise_json_text(&wrapped)?;
            strict_object(&BARE_KEY.replace_all(&normalised, "$1\"$2\":"))
        })
        .unwrap_or_default()
}

/// Best-effort recovery of analysis entries from the body of a (possibly truncated) array.
fn analysis_entries(body: &str) -> Vec<Value> {
    if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(&format!("[{body}]")) {
        return items;
    }
    BALANCED_OBJECT
        .find_iter(body)
        .filter_map(|m| strict_object(m.as_str()))
        .map(Value::Object)
        .collect()
}
