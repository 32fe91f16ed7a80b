//! Code-level accuracy layers: importance, pre-review, post-review and corrected.

use super::EligibleReview;
use crate::adjudication::{Classification, CodeClassification};
use crate::comparison::PatientCodeComparison;
use crate::discrepancy::ratio;
use review_types::PatientId;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImportantCodes {
    pub total_important_codes: usize,
    pub missed_important_codes: usize,
    pub important_code_accuracy: f64,
    pub important_miss_rate: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnimportantCodes {
    pub total_unimportant_codes: usize,
    pub missed_unimportant_codes: usize,
    pub unimportant_code_accuracy: f64,
    pub unimportant_miss_rate: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CodeImportanceAnalysis {
    pub important_codes: ImportantCodes,
    pub unimportant_codes: UnimportantCodes,
}

/// Importance split of the missed codes.
///
/// Only missed codes are classified, so the number of important codes in the dataset is
/// approximated by the number of important classifications; every other baseline code counts
/// as unimportant.
pub(crate) fn code_importance_analysis(
    classifications: &[CodeClassification],
    total_baseline_codes: usize,
) -> CodeImportanceAnalysis {
    let count = |wanted: Classification| {
        classifications
            .iter()
            .filter(|c| c.classification == wanted)
            .count()
    };
    let important_missed = count(Classification::Important);
    let unimportant_missed = count(Classification::Unimportant);

    let total_important = important_missed;
    let total_unimportant = total_baseline_codes.saturating_sub(total_important);

    CodeImportanceAnalysis {
        important_codes: ImportantCodes {
            total_important_codes: total_important,
            missed_important_codes: important_missed,
            important_code_accuracy: ratio(
                total_important.saturating_sub(important_missed),
                total_important,
                1.0,
            ),
            important_miss_rate: ratio(important_missed, total_important, 0.0),
        },
        unimportant_codes: UnimportantCodes {
            total_unimportant_codes: total_unimportant,
            missed_unimportant_codes: unimportant_missed,
            unimportant_code_accuracy: ratio(
                total_unimportant.saturating_sub(unimportant_missed),
                total_unimportant,
                1.0,
            ),
            unimportant_miss_rate: ratio(unimportant_missed, total_unimportant, 0.0),
        },
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PreReviewMetrics {
    pub total_baseline_codes: usize,
    pub total_ai_codes: usize,
    pub correctly_coded_by_ai: usize,
    pub missed_by_ai: usize,
    pub extra_by_ai: usize,
    /// `correct / total_baseline_codes`
    pub overall_accuracy: f64,
    pub miss_rate: f64,
    pub extra_rate: f64,
    pub precision: f64,
    pub recall: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatientCodeAccuracy {
    pub patient_id: PatientId,
    pub baseline_codes: usize,
    pub ai_codes: usize,
    pub correct_codes: usize,
    pub missed_codes: usize,
    pub extra_codes: usize,
    /// 1.0 for a patient with no baseline codes.
    pub accuracy_rate: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PreReviewCodeAccuracy {
    pub pre_review_metrics: PreReviewMetrics,
    pub patient_level_data: Vec<PatientCodeAccuracy>,
}

pub(crate) fn pre_review_code_accuracy(
    comparisons: &[PatientCodeComparison],
) -> PreReviewCodeAccuracy {
    let mut total_baseline_codes = 0;
    let mut total_ai_codes = 0;
    let mut correctly_coded_by_ai = 0;
    let mut missed_by_ai = 0;
    let mut extra_by_ai = 0;
    let mut patient_level_data = Vec::with_capacity(comparisons.len());

    for c in comparisons {
        let correct = c.correct().len();
        total_baseline_codes += c.baseline_codes.len();
        total_ai_codes += c.ai_codes.len();
        correctly_coded_by_ai += correct;
        missed_by_ai += c.missed.len();
        extra_by_ai += c.extra.len();

        patient_level_data.push(PatientCodeAccuracy {
            patient_id: c.patient_id.clone(),
            baseline_codes: c.baseline_codes.len(),
            ai_codes: c.ai_codes.len(),
            correct_codes: correct,
            missed_codes: c.missed.len(),
            extra_codes: c.extra.len(),
            accuracy_rate: ratio(correct, c.baseline_codes.len(), 1.0),
        });
    }

    PreReviewCodeAccuracy {
        pre_review_metrics: PreReviewMetrics {
            total_baseline_codes,
            total_ai_codes,
            correctly_coded_by_ai,
            missed_by_ai,
            extra_by_ai,
            overall_accuracy: ratio(correctly_coded_by_ai, total_baseline_codes, 0.0),
            miss_rate: ratio(missed_by_ai, total_baseline_codes, 0.0),
            extra_rate: ratio(extra_by_ai, total_ai_codes, 0.0),
            precision: ratio(correctly_coded_by_ai, total_ai_codes, 0.0),
            recall: ratio(correctly_coded_by_ai, total_baseline_codes, 0.0),
        },
        patient_level_data,
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PostReviewMetrics {
    pub codes_reviewed_by_ai: usize,
    pub ai_correct_decisions: usize,
    /// Every reviewed code where the baseline was judged wrong.
    pub baseline_errors_found: usize,
    /// AI right and baseline wrong.
    pub ai_corrections_accepted: usize,
    pub corrected_accuracy: f64,
    /// `ai_corrections_accepted / total_baseline_codes`
    pub improvement_in_accuracy: f64,
    pub error_reduction_rate: f64,
    pub ai_decision_accuracy: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComparisonMetrics {
    pub original_accuracy: f64,
    pub post_review_accuracy: f64,
    pub net_improvement: f64,
    pub relative_improvement: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatientCorrection {
    pub patient_id: PatientId,
    pub codes_reviewed: usize,
    pub ai_correct: usize,
    pub baseline_errors: usize,
    pub improvement_rate: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PostReviewCodeAccuracy {
    pub post_review_metrics: PostReviewMetrics,
    pub comparison_metrics: ComparisonMetrics,
    pub patient_corrections: Vec<PatientCorrection>,
}

pub(crate) fn post_review_code_accuracy(
    reviews: &[EligibleReview],
    pre_review: &PreReviewMetrics,
) -> PostReviewCodeAccuracy {
    let mut codes_reviewed = 0;
    let mut ai_correct_decisions = 0;
    let mut baseline_errors_found = 0;
    let mut ai_corrections_accepted = 0;
    let mut patient_corrections = Vec::new();

    for eligible in reviews {
        let mut reviewed = 0;
        let mut ai_correct = 0;
        let mut baseline_errors = 0;

        for entry in &eligible.review.analysis {
            reviewed += 1;
            if entry.ai_is_correct {
                ai_correct += 1;
            }
            if !entry.baseline_is_correct {
                baseline_errors += 1;
                if entry.ai_is_correct {
                    ai_corrections_accepted += 1;
                }
            }
        }

        codes_reviewed += reviewed;
        ai_correct_decisions += ai_correct;
        baseline_errors_found += baseline_errors;

        if reviewed > 0 {
            patient_corrections.push(PatientCorrection {
                patient_id: eligible.patient_id.clone(),
                codes_reviewed: reviewed,
                ai_correct,
                baseline_errors,
                improvement_rate: ratio(ai_correct, reviewed, 0.0),
            });
        }
    }

    let improvement = ratio(ai_corrections_accepted, pre_review.total_baseline_codes, 0.0);
    let corrected_accuracy = ratio(
        codes_reviewed - baseline_errors_found + ai_corrections_accepted,
        codes_reviewed,
        0.0,
    );
    let relative_improvement = if pre_review.overall_accuracy > 0.0 {
        improvement / pre_review.overall_accuracy
    } else {
        0.0
    };

    PostReviewCodeAccuracy {
        post_review_metrics: PostReviewMetrics {
            codes_reviewed_by_ai: codes_reviewed,
            ai_correct_decisions,
            baseline_errors_found,
            ai_corrections_accepted,
            corrected_accuracy,
            improvement_in_accuracy: improvement,
            error_reduction_rate: ratio(baseline_errors_found, codes_reviewed, 0.0),
            ai_decision_accuracy: ratio(ai_correct_decisions, codes_reviewed, 0.0),
        },
        comparison_metrics: ComparisonMetrics {
            original_accuracy: pre_review.overall_accuracy,
            post_review_accuracy: pre_review.overall_accuracy + improvement,
            net_improvement: improvement,
            relative_improvement,
        },
        patient_corrections,
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CorrectedCodeAccuracy {
    pub total_codes_reviewed: usize,
    pub ai_correct_codes: usize,
    /// Baseline right where the AI was not.
    pub baseline_correct_codes: usize,
    pub corrected_accuracy: f64,
}

/// Accuracy over codes from successful reviews only; recovered reviews are not counted.
pub(crate) fn corrected_code_accuracy(reviews: &[EligibleReview]) -> CorrectedCodeAccuracy {
    let mut total = 0;
    let mut ai_correct = 0;
    let mut baseline_correct = 0;

    for entry in reviews
        .iter()
        .filter(|r| !r.recovered)
        .flat_map(|r| &r.review.analysis)
    {
        total += 1;
        if entry.ai_is_correct {
            ai_correct += 1;
        } else if entry.baseline_is_correct {
            baseline_correct += 1;
        }
    }

    CorrectedCodeAccuracy {
        total_codes_reviewed: total,
        ai_correct_codes: ai_correct,
        baseline_correct_codes: baseline_correct,
        corrected_accuracy: ratio(ai_correct + baseline_correct, total, 0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparison::build_comparisons;
    use crate::reconciliation::tests::{entry, review, row};
    use crate::adjudication::AdjudicationResult;
    use review_types::MatchCategory;

    fn eligible(result: AdjudicationResult, recovered: bool) -> EligibleReview {
        let AdjudicationResult::Reviewed(review) = result else {
            panic!("expected a reviewed result");
        };
        EligibleReview {
            patient_id: review.patient_id.clone().unwrap(),
            review,
            recovered,
        }
    }

    #[test]
    fn pre_review_counts_intersection_and_guards_empty_patients() {
        let comparisons = build_comparisons(&[
            row("1", "A, B, C", "A, B", MatchCategory::Partial),
            row("2", "", "Z", MatchCategory::NoMatch),
        ]);

        let pre = pre_review_code_accuracy(&comparisons);
        let metrics = &pre.pre_review_metrics;

        assert_eq!(metrics.correctly_coded_by_ai, 2);
        assert_eq!(metrics.missed_by_ai, 1);
        assert_eq!(metrics.extra_by_ai, 1);
        assert!((metrics.overall_accuracy - 2.0 / 3.0).abs() < 1e-12);
        assert!((metrics.precision - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(pre.patient_level_data[1].accuracy_rate, 1.0);
    }

    #[test]
    fn post_review_improvement_uses_baseline_total() {
        let comparisons =
            build_comparisons(&[row("1", "A, B, C, D", "A", MatchCategory::Partial)]);
        let pre = pre_review_code_accuracy(&comparisons);
        let analysis = vec![
            entry(Some("B"), Some("X"), false, true),
            entry(Some("C"), None, true, false),
        ];
        let reviews = vec![eligible(review("1", 0.5, 0.5, analysis), false)];

        let post = post_review_code_accuracy(&reviews, &pre.pre_review_metrics);
        let metrics = &post.post_review_metrics;

        assert_eq!(metrics.codes_reviewed_by_ai, 2);
        assert_eq!(metrics.baseline_errors_found, 1);
        assert_eq!(metrics.ai_corrections_accepted, 1);
        assert!((metrics.corrected_accuracy - 1.0).abs() < 1e-12);
        assert!((metrics.improvement_in_accuracy - 0.25).abs() < 1e-12);
        assert!((post.comparison_metrics.post_review_accuracy - 0.5).abs() < 1e-12);
        assert!((post.comparison_metrics.relative_improvement - 1.0).abs() < 1e-12);
        assert_eq!(post.patient_corrections.len(), 1);
    }

    #[test]
    fn corrected_accuracy_skips_recovered_reviews() {
        let successful = vec![
            entry(Some("A"), None, true, false),
            entry(Some("B"), None, false, false),
        ];
        let recovered = vec![entry(None, Some("C"), false, true)];
        let reviews = vec![
            eligible(review("1", 0.5, 0.5, successful), false),
            eligible(review("2", 0.5, 0.5, recovered), true),
        ];

        let corrected = corrected_code_accuracy(&reviews);

        assert_eq!(corrected.total_codes_reviewed, 2);
        assert_eq!(corrected.baseline_correct_codes, 1);
        assert_eq!(corrected.ai_correct_codes, 0);
        assert!((corrected.corrected_accuracy - 0.5).abs() < 1e-12);
    }
}
