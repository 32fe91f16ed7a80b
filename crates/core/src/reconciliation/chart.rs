//! Chart-level accuracy, partial match reconciliation and promotion.

use super::{EligibleReview, PatientIndex};
use crate::adjudication::{CaseReview, CodeOutcome};
use crate::comparison::PatientCodeComparison;
use crate::constants::{
    AI_SCORE_PROMOTION_THRESHOLD, LOW_BASELINE_ERROR_RATE, SHOULD_CODE, SHOULD_NOT_CODE,
};
use crate::discrepancy::ratio;
use review_types::{MatchCategory, PatientId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Chart counts and rates. Rates are 0 when there are no patients.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChartLevelAccuracy {
    pub complete_match_rate: f64,
    pub partial_match_rate: f64,
    pub no_match_rate: f64,
    /// Includes post-review completions.
    pub complete_matches: usize,
    pub partial_matches: usize,
    pub no_matches: usize,
    pub total_patients: usize,
}

impl ChartLevelAccuracy {
    fn from_comparisons(comparisons: &[PatientCodeComparison]) -> Self {
        let total_patients = comparisons.len();
        let count = |wanted: fn(MatchCategory) -> bool| {
            comparisons
                .iter()
                .filter(|c| wanted(c.match_category))
                .count()
        };
        let complete_matches = count(MatchCategory::is_complete);
        let partial_matches = count(|c| c == MatchCategory::Partial);
        let no_matches = count(|c| c == MatchCategory::NoMatch);

        Self {
            complete_match_rate: ratio(complete_matches, total_patients, 0.0),
            partial_match_rate: ratio(partial_matches, total_patients, 0.0),
            no_match_rate: ratio(no_matches, total_patients, 0.0),
            complete_matches,
            partial_matches,
            no_matches,
            total_patients,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CodeLevelAccuracy {
    /// `(total_ai_codes - total_missed_codes) / total_ai_codes`, 0 when the AI coded nothing.
    pub overall_accuracy: f64,
    pub total_baseline_codes: usize,
    pub total_ai_codes: usize,
    pub total_missed_codes: usize,
    pub total_extra_codes: usize,
    pub miss_rate: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OriginalAccuracy {
    pub chart_level: ChartLevelAccuracy,
    pub code_level: CodeLevelAccuracy,
}

pub(crate) fn original_accuracy(comparisons: &[PatientCodeComparison]) -> OriginalAccuracy {
    let mut total_baseline_codes = 0;
    let mut total_ai_codes = 0;
    let mut total_missed_codes = 0;
    let mut total_extra_codes = 0;
    for c in comparisons {
        total_baseline_codes += c.baseline_codes.len();
        total_ai_codes += c.ai_codes.len();
        total_missed_codes += c.missed.len();
        total_extra_codes += c.extra.len();
    }

    // Denominator is the AI's own output. Missed codes can outnumber it, so this may go negative.
    let overall_accuracy = if total_ai_codes == 0 {
        0.0
    } else {
        (total_ai_codes as f64 - total_missed_codes as f64) / total_ai_codes as f64
    };

    OriginalAccuracy {
        chart_level: ChartLevelAccuracy::from_comparisons(comparisons),
        code_level: CodeLevelAccuracy {
            overall_accuracy,
            total_baseline_codes,
            total_ai_codes,
            total_missed_codes,
            total_extra_codes,
            miss_rate: ratio(total_missed_codes, total_baseline_codes, 0.0),
        },
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChartImprovements {
    pub partial_to_complete_conversions: usize,
    /// Change in complete charts as a share of all patients.
    pub accuracy_improvement: f64,
}

impl ChartImprovements {
    pub(crate) fn between(
        original: &ChartLevelAccuracy,
        reviewed: &ChartLevelAccuracy,
        conversions: usize,
    ) -> Self {
        let gained = reviewed.complete_matches as f64 - original.complete_matches as f64;
        let accuracy_improvement = if original.total_patients == 0 {
            0.0
        } else {
            gained / original.total_patients as f64
        };
        Self {
            partial_to_complete_conversions: conversions,
            accuracy_improvement,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ManualCodingAnalysis {
    pub total_reviewed_codes: usize,
    pub baseline_errors: usize,
    /// `(reviewed - errors) / reviewed`, 1.0 when nothing was reviewed.
    pub manual_coding_accuracy: f64,
    pub ai_corrections: usize,
    pub extra_codes_by_ai: usize,
    /// Code to `should_not_code`, `should_code`, or the replacement code.
    pub corrected_codes: BTreeMap<String, String>,
}

/// Which promotion rule fired.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromotionRule {
    /// AI score above the threshold and above the baseline score.
    AiScoreDominant,
    CorrectionsExceedErrors,
    LowBaselineErrorRate,
}

/// Audit record for one promotion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PromotionRecord {
    pub patient_id: PatientId,
    pub original_match: MatchCategory,
    pub new_match: MatchCategory,
    pub rule: PromotionRule,
    pub reason: String,
    pub baseline_errors: usize,
    pub ai_corrections: usize,
    pub extra_codes: usize,
    pub baseline_score: f64,
    pub ai_score: f64,
}

#[derive(Debug, Default)]
struct PatientTally {
    reviewed: usize,
    baseline_errors: usize,
    ai_corrections: usize,
    extra_codes: usize,
}

impl PatientTally {
    /// First rule that fires, in priority order.
    fn promotion(&self, review: &CaseReview) -> Option<(PromotionRule, String)> {
        let scores = review.scores();
        if scores.ai_score > AI_SCORE_PROMOTION_THRESHOLD
            && scores.ai_score > scores.baseline_score
        {
            return Some((
                PromotionRule::AiScoreDominant,
                format!(
                    "AI coding more accurate (AI: {:.2}, Baseline: {:.2})",
                    scores.ai_score, scores.baseline_score
                ),
            ));
        }
        if self.ai_corrections > self.baseline_errors {
            return Some((
                PromotionRule::CorrectionsExceedErrors,
                format!(
                    "AI corrections ({}) > Baseline errors ({})",
                    self.ai_corrections, self.baseline_errors
                ),
            ));
        }
        if self.reviewed > 0
            && (self.baseline_errors as f64 / self.reviewed as f64) < LOW_BASELINE_ERROR_RATE
        {
            return Some((
                PromotionRule::LowBaselineErrorRate,
                format!(
                    "Low Baseline error rate: {}/{}",
                    self.baseline_errors, self.reviewed
                ),
            ));
        }
        None
    }
}

pub(crate) struct PartialReconciliation {
    pub post_ai_review: ChartLevelAccuracy,
    pub manual_coding_analysis: ManualCodingAnalysis,
    pub changes: Vec<PromotionRecord>,
}

/// Tally every eligible partial review and apply promotions to a copy of `comparisons`.
pub(crate) fn reconcile_partial_reviews(
    comparisons: &[PatientCodeComparison],
    index: &PatientIndex<'_>,
    reviews: &[EligibleReview],
) -> PartialReconciliation {
    let mut reviewed_charts = comparisons.to_vec();
    let mut corrected_codes = BTreeMap::new();
    let mut changes = Vec::new();
    let mut totals = PatientTally::default();

    for eligible in reviews {
        let Some(position) = index.position(&eligible.patient_id) else {
            continue;
        };

        let mut tally = PatientTally::default();
        for entry in &eligible.review.analysis {
            tally.reviewed += 1;
            if entry.is_ai_only() {
                tally.extra_codes += 1;
            }
            match entry.outcome() {
                CodeOutcome::BaselineError => {
                    tally.baseline_errors += 1;
                    if let Some(code) = &entry.baseline_code {
                        corrected_codes.insert(code.clone(), SHOULD_NOT_CODE.to_string());
                    }
                }
                CodeOutcome::AcceptedAiCorrection => {
                    tally.ai_corrections += 1;
                    if let Some(code) = &entry.ai_code {
                        corrected_codes.insert(code.clone(), SHOULD_CODE.to_string());
                    }
                }
                CodeOutcome::Substitution => {
                    tally.baseline_errors += 1;
                    tally.ai_corrections += 1;
                    if let (Some(baseline), Some(ai)) = (&entry.baseline_code, &entry.ai_code) {
                        corrected_codes.insert(baseline.clone(), ai.clone());
                    }
                }
                CodeOutcome::NoChange => {}
            }
        }

        totals.reviewed += tally.reviewed;
        totals.baseline_errors += tally.baseline_errors;
        totals.ai_corrections += tally.ai_corrections;
        totals.extra_codes += tally.extra_codes;

        let Some((rule, reason)) = tally.promotion(&eligible.review) else {
            continue;
        };
        let chart = &mut reviewed_charts[position];
        let original_match = chart.match_category;
        if !chart.promote() {
            continue;
        }

        tracing::info!(patient_id = %eligible.patient_id, %reason, "promoted chart");
        let scores = eligible.review.scores();
        changes.push(PromotionRecord {
            patient_id: eligible.patient_id.clone(),
            original_match,
            new_match: chart.match_category,
            rule,
            reason,
            baseline_errors: tally.baseline_errors,
            ai_corrections: tally.ai_corrections,
            extra_codes: tally.extra_codes,
            baseline_score: scores.baseline_score,
            ai_score: scores.ai_score,
        });
    }

    PartialReconciliation {
        post_ai_review: ChartLevelAccuracy::from_comparisons(&reviewed_charts),
        manual_coding_analysis: ManualCodingAnalysis {
            total_reviewed_codes: totals.reviewed,
            baseline_errors: totals.baseline_errors,
            manual_coding_accuracy: ratio(
                totals.reviewed.saturating_sub(totals.baseline_errors),
                totals.reviewed,
                1.0,
            ),
            ai_corrections: totals.ai_corrections,
            extra_codes_by_ai: totals.extra_codes,
            corrected_codes,
        },
        changes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparison::build_comparisons;
    use crate::reconciliation::tests::{entry, review, row};
    use crate::reconciliation::{eligible_reviews, ReconciliationExclusions};
    use crate::adjudication::AdjudicationResult;

    fn reconcile(
        comparisons: &[PatientCodeComparison],
        results: &[AdjudicationResult],
    ) -> PartialReconciliation {
        let index = PatientIndex::new(comparisons);
        let mut exclusions = ReconciliationExclusions::default();
        let eligible =
            eligible_reviews(results, &index, MatchCategory::Partial, true, &mut exclusions);
        reconcile_partial_reviews(comparisons, &index, &eligible)
    }

    #[test]
    fn code_level_accuracy_is_zero_without_ai_codes() {
        let comparisons = build_comparisons(&[row("1", "A, B", "", MatchCategory::NoMatch)]);
        let original = original_accuracy(&comparisons);
        assert_eq!(original.code_level.total_baseline_codes, 2);
        assert_eq!(original.code_level.overall_accuracy, 0.0);
        assert_eq!(original.code_level.miss_rate, 1.0);
    }

    #[test]
    fn code_level_accuracy_uses_ai_denominator() {
        let comparisons = build_comparisons(&[
            row("1", "A, B, C", "A, B", MatchCategory::Partial),
            row("2", "D", "D, E", MatchCategory::Partial),
        ]);
        let original = original_accuracy(&comparisons);
        // (4 ai codes - 1 missed) / 4
        assert!((original.code_level.overall_accuracy - 0.75).abs() < 1e-12);
        assert_eq!(original.code_level.total_extra_codes, 1);
    }

    #[test]
    fn rules_fire_in_priority_order() {
        let comparisons = build_comparisons(&[
            row("1", "A, B", "A", MatchCategory::Partial),
            row("2", "A, B", "A", MatchCategory::Partial),
            row("3", "A, B", "A", MatchCategory::Partial),
            row("4", "A, B", "A", MatchCategory::Partial),
        ]);
        // Corrections outnumber errors.
        let corrections = vec![
            entry(None, Some("X"), true, true),
            entry(None, Some("Y"), true, true),
            entry(Some("B"), None, false, false),
        ];
        // Error rate 1/6 is below 0.2.
        let low_error_rate = vec![
            entry(Some("B"), None, false, false),
            entry(Some("C"), None, true, false),
            entry(Some("D"), None, true, false),
            entry(Some("E"), None, true, false),
            entry(Some("F"), None, true, false),
            entry(Some("G"), None, true, false),
        ];
        let results = vec![
            review("1", 0.5, 0.5, corrections),
            review("2", 0.5, 0.5, low_error_rate),
            // High AI score but not above baseline, and every code is a baseline error.
            review("3", 0.95, 0.9, vec![entry(Some("B"), None, false, false)]),
            // An empty analysis fires nothing without a dominant AI score.
            review("4", 0.5, 0.5, vec![]),
        ];

        let reconciled = reconcile(&comparisons, &results);
        let rules: Vec<(&str, PromotionRule)> = reconciled
            .changes
            .iter()
            .map(|c| (c.patient_id.as_str(), c.rule))
            .collect();

        assert_eq!(
            rules,
            vec![
                ("1", PromotionRule::CorrectionsExceedErrors),
                ("2", PromotionRule::LowBaselineErrorRate),
            ]
        );
        assert_eq!(reconciled.changes[0].reason, "AI corrections (2) > Baseline errors (1)");
        assert_eq!(reconciled.changes[1].reason, "Low Baseline error rate: 1/6");
        assert_eq!(reconciled.post_ai_review.partial_matches, 2);
    }

    #[test]
    fn repeated_reviews_promote_once() {
        let comparisons = build_comparisons(&[row("1", "A, B", "A", MatchCategory::Partial)]);
        let result = review("1", 0.1, 0.9, vec![entry(None, Some("Z"), false, true)]);

        let reconciled = reconcile(&comparisons, &[result.clone(), result]);

        assert_eq!(reconciled.changes.len(), 1);
        assert_eq!(reconciled.post_ai_review.complete_matches, 1);
        // Both reviews still count towards the code tallies.
        assert_eq!(reconciled.manual_coding_analysis.ai_corrections, 2);
        // The input comparisons are untouched.
        assert_eq!(comparisons[0].match_category, MatchCategory::Partial);
    }

    #[test]
    fn corrected_codes_record_each_outcome() {
        let comparisons = build_comparisons(&[row("1", "A, B", "A, C", MatchCategory::Partial)]);
        let analysis = vec![
            entry(Some("B"), None, false, false),
            entry(None, Some("C"), false, true),
            entry(Some("R91.8"), Some("J44.1"), false, true),
            entry(Some("K"), None, true, false),
        ];
        let result = review("1", 0.5, 0.5, analysis);

        let manual = reconcile(&comparisons, &[result]).manual_coding_analysis;

        assert_eq!(manual.corrected_codes["B"], "should_not_code");
        assert_eq!(manual.corrected_codes["C"], "should_code");
        assert_eq!(manual.corrected_codes["R91.8"], "J44.1");
        assert!(!manual.corrected_codes.contains_key("K"));
        assert_eq!(manual.baseline_errors, 2);
        assert_eq!(manual.ai_corrections, 2);
        assert_eq!(manual.extra_codes_by_ai, 1);
        assert!((manual.manual_coding_accuracy - 0.5).abs() < 1e-12);
    }
}
