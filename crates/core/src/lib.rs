//! # Coding Review Core
//!
//! Comparison of baseline (human) billing codes against AI-suggested codes, LLM adjudication of
//! the discrepancies, and reconciliation of the adjudications into accuracy metrics.
//!
//! - [`dataset`] and [`comparison`]: load the patient CSV and derive per-patient set differences
//! - [`discrepancy`]: missed-code statistics and case selection
//! - [`orchestrator`]: bounded-concurrency LLM review of codes and cases
//! - [`reconciliation`]: comprehensive before/after metrics
//! - [`pipeline`]: the end-to-end run with JSON exports
//! - [`report`]: plain-text rendering of the metrics
//!
//! **No transport concerns**: endpoint rotation, backoff and response parsing live in
//! `llm-client` and `llm-parse`.

pub mod adjudication;
pub mod comparison;
pub mod config;
pub mod constants;
pub mod dataset;
pub mod discrepancy;
pub mod error;
pub mod orchestrator;
pub mod pipeline;
pub mod prompts;
pub mod reconciliation;
pub mod report;

pub use config::CoreConfig;
pub use error::{ReviewError, ReviewResult};
pub use orchestrator::CaseReviewer;
pub use pipeline::{PipelineOptions, PipelineOutcome, ReviewPipeline};
pub use reconciliation::{compute_comprehensive_metrics, ComprehensiveMetrics, ReconciliationInput};
