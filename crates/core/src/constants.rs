//! Constants used throughout the coding review core crate.
//!
//! Export file names, default dataset column names, and the thresholds used by reconciliation.

/// Discrepancy analysis export.
pub const ANALYSIS_RESULTS_FILENAME: &str = "analysis_results.json";

/// Missed-code classification export.
pub const CODE_CLASSIFICATIONS_FILENAME: &str = "code_classifications.json";

/// Partial match review export.
pub const PARTIAL_MATCH_REVIEWS_FILENAME: &str = "partial_match_reviews.json";

/// No match review export.
pub const NO_MATCH_REVIEWS_FILENAME: &str = "no_match_reviews.json";

/// Comprehensive metrics export.
pub const COMPREHENSIVE_METRICS_FILENAME: &str = "comprehensive_metrics.json";

/// Pipeline run summary export.
pub const PIPELINE_SUMMARY_FILENAME: &str = "pipeline_summary.json";

/// Default output directory when none is configured.
pub const DEFAULT_OUTPUT_DIR: &str = "review_output";

pub const DEFAULT_PATIENT_ID_COLUMN: &str = "Patient ID";
pub const DEFAULT_BASELINE_CODES_COLUMN: &str = "SMC Coded";
pub const DEFAULT_AI_CODES_COLUMN: &str = "Rapidclaims Codes";
pub const DEFAULT_MATCH_RESULT_COLUMN: &str = "Match Result";
pub const DEFAULT_CLINICAL_TEXT_COLUMN: &str = "clinical text";

/// Default number of concurrent review requests.
pub const DEFAULT_MAX_WORKERS: usize = 3;

/// Default number of extra requests made when a reply cannot be parsed.
pub const DEFAULT_MAX_JSON_RETRIES: usize = 2;

/// Score assumed when a review omits `coding_accuracy_score`.
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Promotion rule (i): the AI score must exceed this (and the baseline score).
pub const AI_SCORE_PROMOTION_THRESHOLD: f64 = 0.8;

/// Promotion rule (iii): baseline error rate over reviewed codes must be below this.
pub const LOW_BASELINE_ERROR_RATE: f64 = 0.2;

/// Manual coding accuracy below this is flagged in the text report.
pub const MANUAL_ACCURACY_WARNING_THRESHOLD: f64 = 0.9;

/// Recorded in `corrected_codes` for a baseline code that should not have been coded.
pub const SHOULD_NOT_CODE: &str = "should_not_code";

/// Recorded in `corrected_codes` for an AI-only code that should have been coded.
pub const SHOULD_CODE: &str = "should_code";
