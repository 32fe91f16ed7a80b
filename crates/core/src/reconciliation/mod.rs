//! Accuracy reconciliation.
//!
//! Folds the original code comparisons together with the collected adjudication results into
//! layered accuracy metrics:
//!
//! - original chart-level and code-level accuracy
//! - code importance, from the missed-code classifications
//! - partial match reconciliation: per-code outcomes, chart promotion, manual coding accuracy
//! - pre-review, post-review and corrected code-level accuracy
//! - no match analysis and the unified post-review projection
//!
//! [`compute_comprehensive_metrics`] is a pure function. Promotions are applied to a private
//! copy of the comparisons built for each call, so two calls with the same input return equal
//! documents.
//!
//! Results that cannot be used are never an error here. Each is counted in
//! [`ReconciliationExclusions`] and logged.

mod chart;
mod codes;
mod no_match;

pub use chart::{
    ChartImprovements, ChartLevelAccuracy, CodeLevelAccuracy, ManualCodingAnalysis,
    OriginalAccuracy, PromotionRecord, PromotionRule,
};
pub use codes::{
    CodeImportanceAnalysis, ComparisonMetrics, CorrectedCodeAccuracy, ImportantCodes,
    PatientCodeAccuracy, PatientCorrection, PostReviewCodeAccuracy, PostReviewMetrics,
    PreReviewCodeAccuracy, PreReviewMetrics, UnimportantCodes,
};
pub use no_match::{
    ImprovementBreakdown, NoMatchAnalysis, NoMatchConversions, PartialMatchImprovements,
    ProjectionCheck, RateSnapshot, TotalImprovements, UnifiedPostReviewAccuracy,
    UpgradePotential,
};

use crate::adjudication::{AdjudicationResult, CaseReview, CodeClassification};
use crate::comparison::{build_comparisons, PatientCodeComparison};
use crate::dataset::PatientRow;
use review_types::{MatchCategory, PatientId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Everything reconciliation reads. Nothing here is modified.
#[derive(Clone, Copy, Debug)]
pub struct ReconciliationInput<'a> {
    pub rows: &'a [PatientRow],
    pub classifications: &'a [CodeClassification],
    pub partial_reviews: &'a [AdjudicationResult],
    pub no_match_reviews: &'a [AdjudicationResult],
}

/// Counts of review results left out of reconciliation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationExclusions {
    /// Failed results with no raw text, or raw text that could not be recovered.
    pub unusable_results: usize,
    /// Results with no patient id, or one not present in the dataset.
    pub unknown_patients: usize,
    /// Results for a patient whose original category is not the one under review.
    pub outside_review_category: usize,
    /// Failed partial reviews whose raw text was recovered and used. Not an exclusion; counted
    /// here so the recovery is visible.
    pub recovered_from_raw_text: usize,
}

/// The full metrics document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComprehensiveMetrics {
    pub original_accuracy: OriginalAccuracy,
    pub code_importance_analysis: CodeImportanceAnalysis,
    pub post_ai_review: ChartLevelAccuracy,
    pub improvements: ChartImprovements,
    pub manual_coding_analysis: ManualCodingAnalysis,
    pub corrected_code_accuracy: CorrectedCodeAccuracy,
    pub detailed_changes: Vec<PromotionRecord>,
    pub pre_review_code_accuracy: PreReviewCodeAccuracy,
    pub post_review_code_accuracy: PostReviewCodeAccuracy,
    pub unified_post_review_accuracy: UnifiedPostReviewAccuracy,
    pub no_match_analysis: NoMatchAnalysis,
    pub reconciliation_exclusions: ReconciliationExclusions,
}

/// A review that passed every eligibility check.
#[derive(Clone, Debug)]
pub(crate) struct EligibleReview {
    pub patient_id: PatientId,
    pub review: CaseReview,
    /// Built from a failed result's raw text rather than a successful reply.
    pub recovered: bool,
}

/// Patient id to position in the comparison list. The first row wins for duplicated ids.
pub(crate) struct PatientIndex<'a> {
    positions: HashMap<&'a str, usize>,
    comparisons: &'a [PatientCodeComparison],
}

impl<'a> PatientIndex<'a> {
    pub(crate) fn new(comparisons: &'a [PatientCodeComparison]) -> Self {
        let mut positions = HashMap::with_capacity(comparisons.len());
        for (position, comparison) in comparisons.iter().enumerate() {
            positions
                .entry(comparison.patient_id.as_str())
                .or_insert(position);
        }
        Self {
            positions,
            comparisons,
        }
    }

    pub(crate) fn position(&self, patient_id: &PatientId) -> Option<usize> {
        self.positions.get(patient_id.as_str()).copied()
    }

    fn category(&self, patient_id: &PatientId) -> Option<MatchCategory> {
        self.position(patient_id)
            .map(|p| self.comparisons[p].match_category)
    }
}

/// Reduce a failed result's raw text to a review, if it holds one with an `analysis` field.
fn recover_review(raw: &str) -> Option<CaseReview> {
    let record = llm_parse::recover_control_stripped(raw)?;
    if !record.contains_key("analysis") {
        return None;
    }
    CaseReview::from_record(record).ok()
}

/// Select the results that reconciliation may use for patients originally in `category`.
///
/// With `recover` set, failed results carrying raw text get one control-character-stripping
/// recovery attempt.
pub(crate) fn eligible_reviews(
    results: &[AdjudicationResult],
    index: &PatientIndex<'_>,
    category: MatchCategory,
    recover: bool,
    exclusions: &mut ReconciliationExclusions,
) -> Vec<EligibleReview> {
    let mut eligible = Vec::with_capacity(results.len());

    for result in results {
        let (review, recovered) = match result {
            AdjudicationResult::Reviewed(review) => (review.clone(), false),
            AdjudicationResult::Failed(failed) => {
                let recovered = if recover {
                    failed.raw_response.as_deref().and_then(recover_review)
                } else {
                    None
                };
                match recovered {
                    Some(mut review) => {
                        if review.patient_id.is_none() {
                            review.patient_id = failed.patient_id.clone();
                        }
                        (review, true)
                    }
                    None => {
                        tracing::warn!(
                            patient_id = ?failed.patient_id.as_ref().map(PatientId::as_str),
                            error = %failed.error,
                            "skipping unusable review result"
                        );
                        exclusions.unusable_results += 1;
                        continue;
                    }
                }
            }
        };

        let Some(patient_id) = review.patient_id.clone() else {
            tracing::warn!("skipping review without a patient id");
            exclusions.unknown_patients += 1;
            continue;
        };

        match index.category(&patient_id) {
            None => {
                tracing::warn!(patient_id = %patient_id, "skipping review for unknown patient");
                exclusions.unknown_patients += 1;
            }
            Some(found) if found != category => {
                tracing::warn!(
                    patient_id = %patient_id,
                    category = %found,
                    expected = %category,
                    "skipping review outside its category"
                );
                exclusions.outside_review_category += 1;
            }
            Some(_) => {
                if recovered {
                    tracing::info!(patient_id = %patient_id, "recovered review from raw text");
                    exclusions.recovered_from_raw_text += 1;
                }
                eligible.push(EligibleReview {
                    patient_id,
                    review,
                    recovered,
                });
            }
        }
    }

    eligible
}

/// Compute every metric layer from `input`.
pub fn compute_comprehensive_metrics(input: &ReconciliationInput<'_>) -> ComprehensiveMetrics {
    let comparisons = build_comparisons(input.rows);
    let index = PatientIndex::new(&comparisons);
    let mut exclusions = ReconciliationExclusions::default();

    let partial = eligible_reviews(
        input.partial_reviews,
        &index,
        MatchCategory::Partial,
        true,
        &mut exclusions,
    );
    let no_match = eligible_reviews(
        input.no_match_reviews,
        &index,
        MatchCategory::NoMatch,
        false,
        &mut exclusions,
    );

    let original_accuracy = chart::original_accuracy(&comparisons);
    let pre_review_code_accuracy = codes::pre_review_code_accuracy(&comparisons);
    let reconciled = chart::reconcile_partial_reviews(&comparisons, &index, &partial);
    let post_review_code_accuracy =
        codes::post_review_code_accuracy(&partial, &pre_review_code_accuracy.pre_review_metrics);
    let no_match_analysis =
        no_match::no_match_analysis(input.no_match_reviews.len(), &no_match);
    let unified_post_review_accuracy = no_match::unified_post_review_accuracy(
        &original_accuracy.chart_level,
        &pre_review_code_accuracy.pre_review_metrics,
        &post_review_code_accuracy,
        &no_match,
    );

    if exclusions != ReconciliationExclusions::default() {
        tracing::info!(?exclusions, "reconciliation exclusions");
    }

    ComprehensiveMetrics {
        code_importance_analysis: codes::code_importance_analysis(
            input.classifications,
            original_accuracy.code_level.total_baseline_codes,
        ),
        improvements: ChartImprovements::between(
            &original_accuracy.chart_level,
            &reconciled.post_ai_review,
            reconciled.changes.len(),
        ),
        post_ai_review: reconciled.post_ai_review,
        manual_coding_analysis: reconciled.manual_coding_analysis,
        corrected_code_accuracy: codes::corrected_code_accuracy(&partial),
        detailed_changes: reconciled.changes,
        original_accuracy,
        pre_review_code_accuracy,
        post_review_code_accuracy,
        unified_post_review_accuracy,
        no_match_analysis,
        reconciliation_exclusions: exclusions,
    }
}
