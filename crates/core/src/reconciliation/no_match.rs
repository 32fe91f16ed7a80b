//! No match analysis and the unified post-review projection.

use super::codes::{PostReviewCodeAccuracy, PreReviewMetrics};
use super::{ChartLevelAccuracy, EligibleReview};
use crate::discrepancy::ratio;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradePotential {
    pub to_partial_match: usize,
    pub to_complete_match: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoMatchAnalysis {
    pub total_no_match_cases: usize,
    pub successful_reviews: usize,
    /// Sum of both upgrade flags. A case flagging both counts twice.
    pub potential_upgrades: usize,
    pub upgrade_potential: UpgradePotential,
    pub ai_better_cases: usize,
    pub baseline_better_cases: usize,
    /// `successful_reviews / total_no_match_cases`, 0 when there were none.
    pub review_success_rate: f64,
}

fn upgrade_potential(reviews: &[EligibleReview]) -> UpgradePotential {
    let mut potential = UpgradePotential::default();
    for eligible in reviews {
        let flags = eligible.review.match_potential();
        if flags.could_be_partial_match {
            potential.to_partial_match += 1;
        }
        if flags.could_be_complete_match {
            potential.to_complete_match += 1;
        }
    }
    potential
}

pub(crate) fn no_match_analysis(total_cases: usize, reviews: &[EligibleReview]) -> NoMatchAnalysis {
    let upgrade_potential = upgrade_potential(reviews);
    let mut ai_better_cases = 0;
    let mut baseline_better_cases = 0;

    for eligible in reviews {
        let scores = eligible.review.scores();
        if scores.ai_score > scores.baseline_score {
            ai_better_cases += 1;
        } else if scores.baseline_score > scores.ai_score {
            baseline_better_cases += 1;
        }
    }

    NoMatchAnalysis {
        total_no_match_cases: total_cases,
        successful_reviews: reviews.len(),
        potential_upgrades: upgrade_potential.to_partial_match
            + upgrade_potential.to_complete_match,
        upgrade_potential,
        ai_better_cases,
        baseline_better_cases,
        review_success_rate: ratio(reviews.len(), total_cases, 0.0),
    }
}

/// Chart rates plus code-level accuracy at one point in the projection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RateSnapshot {
    pub complete_match_rate: f64,
    pub partial_match_rate: f64,
    pub no_match_rate: f64,
    pub code_level_accuracy: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TotalImprovements {
    pub chart_level_improvement: f64,
    pub code_level_improvement: f64,
    pub complete_match_improvement: f64,
    pub partial_match_improvement: f64,
    pub combined_accuracy_improvement: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartialMatchImprovements {
    pub code_level_improvement: f64,
    pub codes_corrected: usize,
    pub codes_reviewed: usize,
    pub ai_accuracy_on_reviews: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoMatchConversions {
    pub chart_level_improvement: f64,
    pub cases_reviewed: usize,
    pub potential_complete_conversions: usize,
    pub potential_partial_conversions: usize,
    pub total_conversions: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImprovementBreakdown {
    pub partial_match_improvements: PartialMatchImprovements,
    pub no_match_conversions: NoMatchConversions,
}

/// Shows whether the projected rates count every upgraded case once.
///
/// A no match case flagging both upgrades raises both the complete and partial rates and is
/// removed from the no match rate twice. Such cases are reported here, not corrected.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectionCheck {
    /// Sum of the three projected chart rates.
    pub rate_sum: f64,
    pub normalised: bool,
    pub double_counted_cases: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnifiedPostReviewAccuracy {
    pub original_accuracy: RateSnapshot,
    pub unified_post_review_accuracy: RateSnapshot,
    pub total_improvements: TotalImprovements,
    pub improvement_breakdown: ImprovementBreakdown,
    pub projection: ProjectionCheck,
}

/// Project chart rates forward from the no match upgrade flags, and code accuracy forward
/// from the accepted partial match corrections. Chart categories themselves are not changed.
pub(crate) fn unified_post_review_accuracy(
    chart: &ChartLevelAccuracy,
    pre_review: &PreReviewMetrics,
    post_review: &PostReviewCodeAccuracy,
    no_match: &[EligibleReview],
) -> UnifiedPostReviewAccuracy {
    let potential = upgrade_potential(no_match);
    let total_conversions = potential.to_complete_match + potential.to_partial_match;
    let double_counted_cases = no_match
        .iter()
        .map(|r| r.review.match_potential())
        .filter(|p| p.could_be_partial_match && p.could_be_complete_match)
        .count();

    let patients = chart.total_patients;
    let complete_match_improvement = ratio(potential.to_complete_match, patients, 0.0);
    let partial_match_improvement = ratio(potential.to_partial_match, patients, 0.0);
    let chart_level_improvement = ratio(total_conversions, patients, 0.0);
    let code_level_improvement = post_review.comparison_metrics.net_improvement;

    let unified = RateSnapshot {
        complete_match_rate: chart.complete_match_rate + complete_match_improvement,
        partial_match_rate: chart.partial_match_rate + partial_match_improvement,
        no_match_rate: chart.no_match_rate - chart_level_improvement,
        code_level_accuracy: pre_review.overall_accuracy + code_level_improvement,
    };
    let rate_sum = unified.complete_match_rate + unified.partial_match_rate + unified.no_match_rate;
    if double_counted_cases > 0 {
        tracing::warn!(
            double_counted_cases,
            "no match cases flag both upgrades; unified projection counts them twice"
        );
    }

    let post_metrics = &post_review.post_review_metrics;
    UnifiedPostReviewAccuracy {
        original_accuracy: RateSnapshot {
            complete_match_rate: chart.complete_match_rate,
            partial_match_rate: chart.partial_match_rate,
            no_match_rate: chart.no_match_rate,
            code_level_accuracy: pre_review.overall_accuracy,
        },
        unified_post_review_accuracy: unified,
        total_improvements: TotalImprovements {
            chart_level_improvement,
            code_level_improvement,
            complete_match_improvement,
            partial_match_improvement,
            combined_accuracy_improvement: chart_level_improvement + code_level_improvement,
        },
        improvement_breakdown: ImprovementBreakdown {
            partial_match_improvements: PartialMatchImprovements {
                code_level_improvement,
                codes_corrected: post_metrics.ai_corrections_accepted,
                codes_reviewed: post_metrics.codes_reviewed_by_ai,
                ai_accuracy_on_reviews: post_metrics.ai_decision_accuracy,
            },
            no_match_conversions: NoMatchConversions {
                chart_level_improvement,
                cases_reviewed: no_match.len(),
                potential_complete_conversions: potential.to_complete_match,
                potential_partial_conversions: potential.to_partial_match,
                total_conversions,
            },
        },
        projection: ProjectionCheck {
            rate_sum,
            normalised: double_counted_cases == 0,
            double_counted_cases,
        },
    }
}

#[cfg(test)]
mod tests {
    use crate::reconciliation::tests::{no_match_review, row};
    use crate::reconciliation::{compute_comprehensive_metrics, ReconciliationInput};
    use review_types::MatchCategory;

    fn rows() -> Vec<crate::dataset::PatientRow> {
        vec![
            row("1", "A", "A", MatchCategory::Complete),
            row("2", "B", "C", MatchCategory::NoMatch),
            row("3", "D", "E", MatchCategory::NoMatch),
            row("4", "F", "G", MatchCategory::NoMatch),
        ]
    }

    #[test]
    fn both_flags_count_independently() {
        let rows = rows();
        let no_match = vec![
            no_match_review("2", true, true),
            no_match_review("3", true, false),
            no_match_review("4", false, false),
        ];

        let metrics = compute_comprehensive_metrics(&ReconciliationInput {
            rows: &rows,
            classifications: &[],
            partial_reviews: &[],
            no_match_reviews: &no_match,
        });

        let analysis = &metrics.no_match_analysis;
        assert_eq!(analysis.upgrade_potential.to_partial_match, 2);
        assert_eq!(analysis.upgrade_potential.to_complete_match, 1);
        assert_eq!(analysis.potential_upgrades, 3);
        assert_eq!(analysis.ai_better_cases, 3);
        assert_eq!(analysis.review_success_rate, 1.0);

        let unified = &metrics.unified_post_review_accuracy;
        let rates = &unified.unified_post_review_accuracy;
        assert!((rates.complete_match_rate - 0.5).abs() < 1e-12);
        assert!((rates.partial_match_rate - 0.5).abs() < 1e-12);
        assert!((rates.no_match_rate - 0.0).abs() < 1e-12);
        assert!(!unified.projection.normalised);
        assert_eq!(unified.projection.double_counted_cases, 1);
        assert_eq!(unified.improvement_breakdown.no_match_conversions.total_conversions, 3);
    }

    #[test]
    fn projection_without_overlap_is_normalised() {
        let rows = rows();
        let no_match = vec![no_match_review("2", false, true)];

        let metrics = compute_comprehensive_metrics(&ReconciliationInput {
            rows: &rows,
            classifications: &[],
            partial_reviews: &[],
            no_match_reviews: &no_match,
        });

        let unified = &metrics.unified_post_review_accuracy;
        assert!(unified.projection.normalised);
        assert!((unified.projection.rate_sum - 1.0).abs() < 1e-12);
        assert!((unified.total_improvements.complete_match_improvement - 0.25).abs() < 1e-12);
        assert!((metrics.no_match_analysis.review_success_rate - 1.0).abs() < 1e-12);
    }
}
