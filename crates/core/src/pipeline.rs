//! End-to-end review pipeline and JSON exports.
//!
//! Steps, in order: discrepancy analysis, missed-code classification, partial match review,
//! no match review, comprehensive metrics, run summary. Each LLM step can be skipped, in which
//! case the results exported by an earlier run are loaded from the output directory instead.

use crate::adjudication::{AdjudicationResult, CodeClassification};
use crate::config::CoreConfig;
use crate::constants::{
    ANALYSIS_RESULTS_FILENAME, CODE_CLASSIFICATIONS_FILENAME, COMPREHENSIVE_METRICS_FILENAME,
    NO_MATCH_REVIEWS_FILENAME, PARTIAL_MATCH_REVIEWS_FILENAME, PIPELINE_SUMMARY_FILENAME,
};
use crate::dataset::load_dataset;
use crate::discrepancy::{analyse_discrepancies, no_match_cases, partial_match_cases};
use crate::orchestrator::CaseReviewer;
use crate::reconciliation::{
    compute_comprehensive_metrics, ComprehensiveMetrics, ReconciliationInput,
};
use crate::{ReviewError, ReviewResult};
use chrono::{DateTime, Utc};
use llm_client::InvocationStats;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Write `value` to `path` as pretty-printed JSON.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> ReviewResult<()> {
    let text = serde_json::to_string_pretty(value).map_err(ReviewError::Serialization)?;
    fs::write(path, text).map_err(ReviewError::FileWrite)?;
    tracing::debug!(path = %path.display(), "wrote export");
    Ok(())
}

/// Load a JSON list written by an earlier run. An absent file is an empty list.
pub fn load_results<T: DeserializeOwned>(path: &Path) -> ReviewResult<Vec<T>> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "no previous results found, using an empty list");
        return Ok(Vec::new());
    }
    let text = fs::read_to_string(path).map_err(ReviewError::FileRead)?;
    let results: Vec<T> = serde_json::from_str(&text).map_err(ReviewError::Deserialization)?;
    tracing::info!(path = %path.display(), results = results.len(), "loaded previous results");
    Ok(results)
}

/// Steps to skip. A skipped step reuses the previous export.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    pub skip_classification: bool,
    pub skip_partial_review: bool,
    pub skip_no_match_review: bool,
}

impl PipelineOptions {
    fn needs_reviewer(&self) -> bool {
        !(self.skip_classification && self.skip_partial_review && self.skip_no_match_review)
    }
}

/// `pipeline_summary.json`
#[derive(Clone, Debug, Serialize)]
pub struct PipelineSummary {
    pub run_id: Uuid,
    pub dataset: PathBuf,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_runtime_minutes: f64,
    /// Export name to file name.
    pub file_exports: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invocation_stats: Option<InvocationStats>,
}

#[derive(Clone, Debug)]
pub struct PipelineOutcome {
    pub metrics: ComprehensiveMetrics,
    pub summary: PipelineSummary,
}

pub struct ReviewPipeline {
    config: Arc<CoreConfig>,
    reviewer: Option<CaseReviewer>,
}

impl ReviewPipeline {
    /// `reviewer` may be `None` only when every LLM step is skipped.
    pub fn new(config: Arc<CoreConfig>, reviewer: Option<CaseReviewer>) -> Self {
        Self { config, reviewer }
    }

    fn export<T: Serialize + ?Sized>(
        &self,
        exports: &mut BTreeMap<String, String>,
        name: &str,
        filename: &str,
        value: &T,
    ) -> ReviewResult<()> {
        write_json(&self.config.output_file(filename), value)?;
        exports.insert(name.to_string(), filename.to_string());
        Ok(())
    }

    /// Run every step and write the exports.
    ///
    /// # Errors
    ///
    /// Fails on dataset or filesystem errors, or when an LLM step is requested without a
    /// reviewer. Individual review failures are recorded in the results, not returned.
    pub async fn run(&self, options: PipelineOptions) -> ReviewResult<PipelineOutcome> {
        let reviewer = match (&self.reviewer, options.needs_reviewer()) {
            (Some(reviewer), _) => Some(reviewer),
            (None, false) => None,
            (None, true) => {
                return Err(ReviewError::InvalidInput(
                    "an LLM reviewer is required unless every review step is skipped".into(),
                ));
            }
        };

        let run_id = Uuid::new_v4();
        let start_time = Utc::now();
        tracing::info!(
            %run_id,
            dataset = %self.config.dataset_path().display(),
            max_workers = self.config.max_workers(),
            "starting review pipeline"
        );

        fs::create_dir_all(self.config.output_dir()).map_err(ReviewError::OutputDirCreation)?;
        let mut exports = BTreeMap::new();

        let rows = load_dataset(self.config.dataset_path(), self.config.columns())?;
        let analysis = analyse_discrepancies(&rows);
        tracing::info!(
            patients = analysis.summary_stats.total_patients,
            missed_codes = analysis.summary_stats.total_missed_codes,
            unique_missed_codes = analysis.summary_stats.unique_missed_codes,
            "discrepancy analysis complete"
        );
        self.export(&mut exports, "analysis_results", ANALYSIS_RESULTS_FILENAME, &analysis)?;

        let classifications: Vec<CodeClassification> = match reviewer {
            Some(reviewer) if !options.skip_classification => {
                let results = reviewer.classify_codes(analysis.unique_missed_codes()).await;
                self.export(
                    &mut exports,
                    "code_classifications",
                    CODE_CLASSIFICATIONS_FILENAME,
                    &results,
                )?;
                results
            }
            _ => load_results(&self.config.output_file(CODE_CLASSIFICATIONS_FILENAME))?,
        };

        let partial_reviews: Vec<AdjudicationResult> = match reviewer {
            Some(reviewer) if !options.skip_partial_review => {
                let results = reviewer.review_partial_matches(&partial_match_cases(&rows)).await;
                self.export(
                    &mut exports,
                    "partial_match_reviews",
                    PARTIAL_MATCH_REVIEWS_FILENAME,
                    &results,
                )?;
                results
            }
            _ => load_results(&self.config.output_file(PARTIAL_MATCH_REVIEWS_FILENAME))?,
        };

        let no_match_reviews: Vec<AdjudicationResult> = match reviewer {
            Some(reviewer) if !options.skip_no_match_review => {
                let results = reviewer.review_no_matches(&no_match_cases(&rows)).await;
                self.export(&mut exports, "no_match_reviews", NO_MATCH_REVIEWS_FILENAME, &results)?;
                results
            }
            _ => load_results(&self.config.output_file(NO_MATCH_REVIEWS_FILENAME))?,
        };

        let metrics = compute_comprehensive_metrics(&ReconciliationInput {
            rows: &rows,
            classifications: &classifications,
            partial_reviews: &partial_reviews,
            no_match_reviews: &no_match_reviews,
        });
        self.export(
            &mut exports,
            "comprehensive_metrics",
            COMPREHENSIVE_METRICS_FILENAME,
            &metrics,
        )?;

        let end_time = Utc::now();
        exports.insert("pipeline_summary".into(), PIPELINE_SUMMARY_FILENAME.into());
        let summary = PipelineSummary {
            run_id,
            dataset: self.config.dataset_path().to_path_buf(),
            start_time,
            end_time,
            total_runtime_minutes: (end_time - start_time).num_milliseconds() as f64 / 60_000.0,
            file_exports: exports,
            invocation_stats: reviewer.map(CaseReviewer::stats),
        };
        write_json(&self.config.output_file(PIPELINE_SUMMARY_FILENAME), &summary)?;

        tracing::info!(
            %run_id,
            original_complete_rate = metrics.original_accuracy.chart_level.complete_match_rate,
            post_review_complete_rate = metrics.post_ai_review.complete_match_rate,
            "review pipeline finished"
        );

        Ok(PipelineOutcome { metrics, summary })
    }
}
