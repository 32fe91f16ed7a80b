//! LLM response boundary support.
//!
//! LLM backends are asked for JSON but routinely wrap it in markdown fences, surround it with
//! prose, leave stray quotes inside string values, or truncate the object altogether. This crate
//! turns such text into a JSON object (a [`Record`]) using an ordered chain of strategies:
//!
//! 1. direct strict parse of the trimmed text
//! 2. fenced code blocks (```` ```json ```` or unlabelled)
//! 3. balanced-brace substrings (one level of nesting), longest first
//! 4. normalisation (trim to the outer braces, collapse whitespace, fix literal spelling,
//!    escape stray quotes) followed by a strict parse
//! 5. key/value extraction for the known top-level review keys
//!
//! Parsing is pure: no I/O, no logging. When every strategy fails the caller receives a
//! [`ParseFailure`] that carries the raw text verbatim, since it is the only audit trail for
//! the response.

mod recovery;
mod strategies;

pub use recovery::{recover_control_stripped, strip_control_characters};
pub use strategies::ParseStrategy;

/// A structured record extracted from a response: always a JSON object.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Every strategy failed to reduce the response to a record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to parse structured record from response ({attempts} strategies tried)")]
pub struct ParseFailure {
    /// The response text exactly as received.
    pub raw_text: String,
    /// Number of strategies attempted before giving up.
    pub attempts: usize,
}

/// A successfully parsed record together with the strategy that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecord {
    pub record: Record,
    pub strategy: ParseStrategy,
}

/// Parse an LLM response into a [`Record`], trying each strategy in order.
///
/// # Errors
///
/// Returns a [`ParseFailure`] carrying the original text if the response is empty or no
/// strategy yields a JSON object.
pub fn parse(text: &str) -> Result<ParsedRecord, ParseFailure> {
    if text.trim().is_empty() {
        return Err(ParseFailure {
            raw_text: text.to_owned(),
            attempts: 0,
        });
    }

    for (strategy, attempt) in strategies::CHAIN {
        if let Some(record) = attempt(text) {
            return Ok(ParsedRecord { record, strategy });
        }
    }

    Err(ParseFailure {
        raw_text: text.to_owned(),
        attempts: strategies::CHAIN.len(),
    })
}
