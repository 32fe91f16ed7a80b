//! Typed adjudication requests and responses.
//!
//! LLM replies arrive as loosely-shaped JSON records. They are converted here, once, into typed
//! values; every default (neutral scores, false flags, absent codes) is applied at this boundary
//! so the reconciliation arithmetic never sees a missing field. Replies that cannot be reduced to
//! a record become [`AdjudicationResult::Failed`] carrying the raw text.
//!
//! Field names on output use the baseline/AI vocabulary. Input also accepts the older
//! `sutherland_*` spellings.

use crate::constants::NEUTRAL_SCORE;
use crate::dataset::PatientRow;
use crate::{ReviewError, ReviewResult};
use llm_parse::Record;
use review_types::{CodeSet, PatientId};
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The three kinds of review the orchestrator dispatches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseKind {
    Classification,
    PartialReview,
    NoMatchReview,
}

impl std::fmt::Display for CaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Classification => "classification",
            Self::PartialReview => "partial_review",
            Self::NoMatchReview => "no_match_review",
        })
    }
}

/// Per-patient context sent with partial and no-match reviews.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaseContext {
    pub patient_id: PatientId,
    pub baseline_codes: CodeSet,
    pub ai_codes: CodeSet,
    pub missed: CodeSet,
    pub extra: CodeSet,
    pub narrative_text: String,
}

impl CaseContext {
    pub fn from_row(row: &PatientRow) -> Self {
        Self {
            patient_id: row.patient_id.clone(),
            missed: row.baseline_codes.difference(&row.ai_codes),
            extra: row.ai_codes.difference(&row.baseline_codes),
            baseline_codes: row.baseline_codes.clone(),
            ai_codes: row.ai_codes.clone(),
            narrative_text: row.clinical_text.clone(),
        }
    }
}

/// One unit of work for the LLM. Classification carries a single code and no patient context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AdjudicationRequest {
    Classification { code: String },
    PartialReview(CaseContext),
    NoMatchReview(CaseContext),
}

impl AdjudicationRequest {
    pub fn case_kind(&self) -> CaseKind {
        match self {
            Self::Classification { .. } => CaseKind::Classification,
            Self::PartialReview(_) => CaseKind::PartialReview,
            Self::NoMatchReview(_) => CaseKind::NoMatchReview,
        }
    }

    /// The code (classification) or patient id (reviews) this request is about.
    pub fn subject(&self) -> &str {
        match self {
            Self::Classification { code } => code,
            Self::PartialReview(case) | Self::NoMatchReview(case) => case.patient_id.as_str(),
        }
    }

    pub fn patient_id(&self) -> Option<&PatientId> {
        match self {
            Self::Classification { .. } => None,
            Self::PartialReview(case) | Self::NoMatchReview(case) => Some(&case.patient_id),
        }
    }
}

// ---------------------------------------------------------------------------------------------
// Lenient field deserialisers
// ---------------------------------------------------------------------------------------------

/// Empty strings and the literal text "null"/"none" mean "no code".
fn lenient_code<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty()
                || trimmed.eq_ignore_ascii_case("null")
                || trimmed.eq_ignore_ascii_case("none")
            {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_bool<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Bool(b) => b,
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes"),
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        _ => false,
    })
}

/// Numbers or numeric strings, clamped to `[0, 1]`. Anything else is the neutral score.
fn lenient_score<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    let value = match Value::deserialize(d)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(value
        .filter(|v| v.is_finite())
        .map_or(NEUTRAL_SCORE, |v| v.clamp(0.0, 1.0)))
}

fn lenient_text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn lenient_optional_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_patient_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<PatientId>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => PatientId::new(s).ok(),
        Value::Number(n) => PatientId::new(n.to_string()).ok(),
        _ => None,
    })
}

const CODE_ADJUDICATION_ALIASES: &[&[&str]] = &[
    &["baseline_code", "sutherland_code"],
    &["baseline_is_correct", "is_baseline_correct", "is_sutherland_correct"],
    &["ai_is_correct", "is_ai_correct"],
    &["reasoning", "clinical_justification"],
];

const ACCURACY_SCORE_ALIASES: &[&[&str]] = &[&["baseline_score", "sutherland_score"]];

/// Keep only the highest-precedence spelling of each aliased field, so a reply using two
/// spellings of one field still deserialises.
fn drop_shadowed_aliases(value: &mut Value, groups: &[&[&str]]) {
    let Value::Object(map) = value else {
        return;
    };
    for group in groups {
        let present: Vec<&str> = group
            .iter()
            .copied()
            .filter(|name| map.contains_key(*name))
            .collect();
        for shadowed in present.iter().skip(1) {
            map.remove(*shadowed);
        }
    }
}

/// Non-object entries are dropped; a non-array value is an empty analysis.
fn lenient_analysis<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<CodeAdjudication>, D::Error> {
    let Value::Array(items) = Value::deserialize(d)? else {
        return Ok(Vec::new());
    };
    items
        .into_iter()
        .filter(Value::is_object)
        .map(|mut item| {
            drop_shadowed_aliases(&mut item, CODE_ADJUDICATION_ALIASES);
            CodeAdjudication::deserialize(item).map_err(serde::de::Error::custom)
        })
        .collect()
}

fn lenient_scores<'de, D: Deserializer<'de>>(d: D) -> Result<AccuracyScores, D::Error> {
    match Value::deserialize(d)? {
        mut item @ Value::Object(_) => {
            drop_shadowed_aliases(&mut item, ACCURACY_SCORE_ALIASES);
            AccuracyScores::deserialize(item).map_err(serde::de::Error::custom)
        }
        _ => Ok(AccuracyScores::default()),
    }
}

fn lenient_match_potential<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Option<MatchPotential>, D::Error> {
    match Value::deserialize(d)? {
        item @ Value::Object(_) => MatchPotential::deserialize(item)
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

fn neutral_score() -> f64 {
    NEUTRAL_SCORE
}

// ---------------------------------------------------------------------------------------------
// Review responses
// ---------------------------------------------------------------------------------------------

/// One code-level judgment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CodeAdjudication {
    #[serde(default, alias = "sutherland_code", deserialize_with = "lenient_code")]
    pub baseline_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_code")]
    pub ai_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub status: String,
    #[serde(
        default,
        alias = "is_sutherland_correct",
        alias = "is_baseline_correct",
        deserialize_with = "lenient_bool"
    )]
    pub baseline_is_correct: bool,
    #[serde(default, alias = "is_ai_correct", deserialize_with = "lenient_bool")]
    pub ai_is_correct: bool,
    #[serde(default, alias = "clinical_justification", deserialize_with = "lenient_text")]
    pub reasoning: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_optional_text"
    )]
    pub recommended_action: Option<String>,
}

/// How a single adjudicated discrepancy counts towards reconciliation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodeOutcome {
    /// Baseline coded something the AI omitted, and the baseline was wrong.
    BaselineError,
    /// AI coded something the baseline omitted, and the AI was right.
    AcceptedAiCorrection,
    /// Different codes for the same finding; baseline wrong and AI right. Counts as both.
    Substitution,
    NoChange,
}

impl CodeAdjudication {
    pub fn outcome(&self) -> CodeOutcome {
        match (self.baseline_code.as_deref(), self.ai_code.as_deref()) {
            (Some(_), None) if !self.baseline_is_correct => CodeOutcome::BaselineError,
            (None, Some(_)) if self.ai_is_correct => CodeOutcome::AcceptedAiCorrection,
            (Some(b), Some(a)) if b != a && !self.baseline_is_correct && self.ai_is_correct => {
                CodeOutcome::Substitution
            }
            _ => CodeOutcome::NoChange,
        }
    }

    /// AI coded something the baseline did not code at all.
    pub fn is_ai_only(&self) -> bool {
        self.baseline_code.is_none() && self.ai_code.is_some()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccuracyScores {
    #[serde(
        default = "neutral_score",
        alias = "sutherland_score",
        deserialize_with = "lenient_score"
    )]
    pub baseline_score: f64,
    #[serde(default = "neutral_score", deserialize_with = "lenient_score")]
    pub ai_score: f64,
}

impl Default for AccuracyScores {
    fn default() -> Self {
        Self {
            baseline_score: NEUTRAL_SCORE,
            ai_score: NEUTRAL_SCORE,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPotential {
    #[serde(default, deserialize_with = "lenient_bool")]
    pub could_be_partial_match: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub could_be_complete_match: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_optional_text"
    )]
    pub reasoning: Option<String>,
}

/// A successfully structured partial or no-match review.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CaseReview {
    #[serde(default, deserialize_with = "lenient_patient_id")]
    pub patient_id: Option<PatientId>,
    #[serde(default, deserialize_with = "lenient_analysis")]
    pub analysis: Vec<CodeAdjudication>,
    #[serde(default, deserialize_with = "lenient_scores")]
    pub coding_accuracy_score: AccuracyScores,
    #[serde(default, deserialize_with = "lenient_text")]
    pub overall_assessment: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_match_potential"
    )]
    pub match_potential: Option<MatchPotential>,
}

fn from_record<T: DeserializeOwned>(record: Record) -> ReviewResult<T> {
    serde_path_to_error::deserialize(Value::Object(record)).map_err(ReviewError::from_path_error)
}

impl CaseReview {
    /// # Errors
    ///
    /// Returns `InvalidResponse` naming the field path when the record cannot be typed.
    pub fn from_record(record: Record) -> ReviewResult<Self> {
        from_record(record)
    }

    pub fn scores(&self) -> AccuracyScores {
        self.coding_accuracy_score
    }

    pub fn match_potential(&self) -> MatchPotential {
        self.match_potential.clone().unwrap_or_default()
    }
}

/// A review that produced no usable structure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedReview {
    #[serde(default, deserialize_with = "lenient_patient_id")]
    pub patient_id: Option<PatientId>,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

/// The outcome of one partial or no-match review.
///
/// Serialised with an `outcome` tag. Deserialisation also accepts untagged documents, treating
/// anything with an `error` key as a failure.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AdjudicationResult {
    Reviewed(CaseReview),
    Failed(FailedReview),
}

impl AdjudicationResult {
    pub fn patient_id(&self) -> Option<&PatientId> {
        match self {
            Self::Reviewed(review) => review.patient_id.as_ref(),
            Self::Failed(failed) => failed.patient_id.as_ref(),
        }
    }

    pub fn is_reviewed(&self) -> bool {
        matches!(self, Self::Reviewed(_))
    }
}

impl<'de> Deserialize<'de> for AdjudicationResult {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(d)?;
        let failed = match value.get("outcome").and_then(Value::as_str) {
            Some("failed") => true,
            Some("reviewed") => false,
            _ => value.get("error").is_some(),
        };
        if failed {
            FailedReview::deserialize(value)
                .map(Self::Failed)
                .map_err(serde::de::Error::custom)
        } else {
            CaseReview::deserialize(value)
                .map(Self::Reviewed)
                .map_err(serde::de::Error::custom)
        }
    }
}

// ---------------------------------------------------------------------------------------------
// Classification responses
// ---------------------------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Important,
    Unimportant,
    /// The request failed at the transport level.
    Error,
    #[serde(other)]
    Unknown,
}

fn lenient_classification<'de, D: Deserializer<'de>>(d: D) -> Result<Classification, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "important" => Classification::Important,
            "unimportant" => Classification::Unimportant,
            "error" => Classification::Error,
            _ => Classification::Unknown,
        },
        _ => Classification::Unknown,
    })
}

fn unknown_text() -> String {
    "unknown".to_string()
}

fn unknown_classification() -> Classification {
    Classification::Unknown
}

/// Importance classification of one missed code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeClassification {
    #[serde(default, deserialize_with = "lenient_text")]
    pub code: String,
    #[serde(default = "unknown_classification", deserialize_with = "lenient_classification")]
    pub classification: Classification,
    #[serde(default = "unknown_text", deserialize_with = "lenient_text")]
    pub category: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub reasoning: String,
    #[serde(default = "unknown_text", deserialize_with = "lenient_text")]
    pub clinical_impact: String,
    #[serde(default = "unknown_text", deserialize_with = "lenient_text")]
    pub radiology_relevance: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub original_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

impl CodeClassification {
    /// Type a parsed reply for `code`. The requested code is recorded as `original_code`, and
    /// fills `code` when the reply omits it.
    pub fn from_record(record: Record, code: &str) -> ReviewResult<Self> {
        let mut classification: Self = from_record(record)?;
        if classification.code.trim().is_empty() {
            classification.code = code.to_string();
        }
        classification.original_code = code.to_string();
        Ok(classification)
    }

    /// Fallback when the reply could not be structured. Counted as unimportant.
    pub fn parsing_error(code: &str, raw_response: String) -> Self {
        Self {
            code: code.to_string(),
            classification: Classification::Unimportant,
            category: "parsing_error".into(),
            reasoning: "Failed to parse AI response".into(),
            clinical_impact: unknown_text(),
            radiology_relevance: unknown_text(),
            original_code: code.to_string(),
            raw_response: Some(raw_response),
        }
    }

    /// Fallback when the request itself failed.
    pub fn api_error(code: &str, error: &str) -> Self {
        Self {
            code: code.to_string(),
            classification: Classification::Error,
            category: "api_error".into(),
            reasoning: format!("API error: {error}"),
            clinical_impact: unknown_text(),
            radiology_relevance: unknown_text(),
            original_code: code.to_string(),
            raw_response: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn legacy_field_names_are_accepted() {
        let review = CaseReview::from_record(record(json!({
            "patient_id": 67890,
            "analysis": [{
                "sutherland_code": "R91.8",
                "ai_code": "J44.1",
                "status": "substituted",
                "is_sutherland_correct": false,
                "is_ai_correct": true,
                "reasoning": "COPD exacerbation is definitive",
                "recommended_action": "keep_ai"
            }],
            "overall_assessment": "AI more accurate",
            "coding_accuracy_score": {"sutherland_score": 0.3, "ai_score": 1.0}
        })))
        .unwrap();

        assert_eq!(review.patient_id.as_ref().map(PatientId::as_str), Some("67890"));
        let entry = &review.analysis[0];
        assert_eq!(entry.baseline_code.as_deref(), Some("R91.8"));
        assert!(!entry.baseline_is_correct);
        assert!(entry.ai_is_correct);
        assert_eq!(entry.outcome(), CodeOutcome::Substitution);
        assert_eq!(review.scores().baseline_score, 0.3);
    }

    #[test]
    fn two_spellings_of_one_field_keep_the_current_name() {
        let review = CaseReview::from_record(record(json!({
            "analysis": [{
                "sutherland_code": "R91.8",
                "baseline_code": "R91.1",
                "is_sutherland_correct": true,
                "is_baseline_correct": false,
                "is_ai_correct": true
            }],
            "coding_accuracy_score": {"sutherland_score": 0.9, "baseline_score": 0.2, "ai_score": 0.8}
        })))
        .unwrap();

        let entry = &review.analysis[0];
        assert_eq!(entry.baseline_code.as_deref(), Some("R91.1"));
        assert!(!entry.baseline_is_correct);
        assert!(entry.ai_is_correct);
        assert_eq!(review.scores().baseline_score, 0.2);
    }

    #[test]
    fn missing_fields_get_boundary_defaults() {
        let review =
            CaseReview::from_record(record(json!({"analysis": [{"ai_code": "Z04.3"}]}))).unwrap();
        assert_eq!(review.patient_id, None);
        assert_eq!(review.scores(), AccuracyScores::default());
        assert!(!review.analysis[0].ai_is_correct);
        assert_eq!(review.analysis[0].outcome(), CodeOutcome::NoChange);
        assert!(review.analysis[0].is_ai_only());
        assert_eq!(review.match_potential(), MatchPotential::default());
    }

    #[test]
    fn loose_values_are_coerced() {
        let review = CaseReview::from_record(record(json!({
            "patient_id": "  ",
            "analysis": [
                {"sutherland_code": "", "ai_code": "null", "is_ai_correct": "true"},
                "not an entry"
            ],
            "coding_accuracy_score": {"sutherland_score": "0.9", "ai_score": 7},
            "match_potential": {"could_be_partial_match": "yes"}
        })))
        .unwrap();

        assert_eq!(review.patient_id, None);
        assert_eq!(review.analysis.len(), 1);
        assert_eq!(review.analysis[0].baseline_code, None);
        assert_eq!(review.analysis[0].ai_code, None);
        assert!(review.analysis[0].ai_is_correct);
        assert_eq!(review.scores().baseline_score, 0.9);
        assert_eq!(review.scores().ai_score, 1.0);
        assert!(review.match_potential().could_be_partial_match);
    }

    #[test]
    fn outcome_classification_covers_each_discrepancy_shape() {
        let entry = |b: Option<&str>, a: Option<&str>, b_ok: bool, a_ok: bool| CodeAdjudication {
            baseline_code: b.map(str::to_string),
            ai_code: a.map(str::to_string),
            status: String::new(),
            baseline_is_correct: b_ok,
            ai_is_correct: a_ok,
            reasoning: String::new(),
            recommended_action: None,
        };

        assert_eq!(entry(Some("A"), None, false, false).outcome(), CodeOutcome::BaselineError);
        assert_eq!(entry(Some("A"), None, true, false).outcome(), CodeOutcome::NoChange);
        assert_eq!(
            entry(None, Some("B"), false, true).outcome(),
            CodeOutcome::AcceptedAiCorrection
        );
        assert_eq!(entry(Some("A"), Some("B"), false, true).outcome(), CodeOutcome::Substitution);
        assert_eq!(entry(Some("A"), Some("B"), true, true).outcome(), CodeOutcome::NoChange);
        assert_eq!(entry(Some("A"), Some("A"), false, true).outcome(), CodeOutcome::NoChange);
    }

    #[test]
    fn results_round_trip_through_tagged_json() {
        let failed = AdjudicationResult::Failed(FailedReview {
            patient_id: Some(PatientId::new("9").unwrap()),
            error: "Failed to parse AI response".into(),
            raw_response: Some("garbage".into()),
        });
        let text = serde_json::to_string(&failed).unwrap();
        assert!(text.contains("\"outcome\":\"failed\""));
        let back: AdjudicationResult = serde_json::from_str(&text).unwrap();
        assert_eq!(back, failed);
    }

    #[test]
    fn untagged_documents_are_classified_by_error_key() {
        let failed: AdjudicationResult = serde_json::from_value(
            json!({"patient_id": "3", "error": "API error: timeout"}),
        )
        .unwrap();
        assert!(!failed.is_reviewed());
        assert_eq!(failed.patient_id().map(PatientId::as_str), Some("3"));

        let reviewed: AdjudicationResult =
            serde_json::from_value(json!({"patient_id": "4", "analysis": []})).unwrap();
        assert!(reviewed.is_reviewed());
    }

    #[test]
    fn classification_reply_is_typed_and_tagged_with_requested_code() {
        let typed = CodeClassification::from_record(
            record(json!({"classification": "Important", "category": "Cancer Codes"})),
            "C78.7",
        )
        .unwrap();
        assert_eq!(typed.code, "C78.7");
        assert_eq!(typed.original_code, "C78.7");
        assert_eq!(typed.classification, Classification::Important);
        assert_eq!(typed.clinical_impact, "unknown");

        let odd =
            CodeClassification::from_record(record(json!({"classification": "maybe"})), "R91.8")
                .unwrap();
        assert_eq!(odd.classification, Classification::Unknown);
    }

    #[test]
    fn classification_fallbacks() {
        let parse = CodeClassification::parsing_error("Z87.891", "oops".into());
        assert_eq!(parse.classification, Classification::Unimportant);
        assert_eq!(parse.category, "parsing_error");
        assert_eq!(parse.raw_response.as_deref(), Some("oops"));

        let api = CodeClassification::api_error("Z87.891", "exhausted");
        assert_eq!(api.classification, Classification::Error);
        assert_eq!(api.category, "api_error");
    }

    #[test]
    fn request_subject_and_kind() {
        let request = AdjudicationRequest::Classification { code: "C78.7".into() };
        assert_eq!(request.subject(), "C78.7");
        assert_eq!(request.case_kind(), CaseKind::Classification);
        assert!(request.patient_id().is_none());
    }
}
