//! Discrepancy analysis over the raw dataset: which baseline codes the AI missed, how often, and
//! for which patients.

use crate::dataset::PatientRow;
use review_types::{CodeSet, MatchCategory, PatientId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatientDiscrepancy {
    pub patient_id: PatientId,
    pub baseline_codes: CodeSet,
    pub ai_codes: CodeSet,
    pub missed_by_ai: CodeSet,
    pub extra_by_ai: CodeSet,
    pub match_result: MatchCategory,
    pub missed_count: usize,
    pub extra_count: usize,
    pub clinical_text: String,
}

/// One row per (patient, missed code).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MissedCodeEntry {
    pub patient_id: PatientId,
    pub missed_code: String,
    pub all_baseline_codes: CodeSet,
    pub all_ai_codes: CodeSet,
    pub match_result: MatchCategory,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeFrequency {
    pub code: String,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub total_patients: usize,
    pub total_baseline_codes: usize,
    pub total_missed_codes: usize,
    pub miss_rate: f64,
    pub unique_missed_codes: usize,
    pub avg_missed_per_patient: f64,
    pub match_distribution: BTreeMap<String, usize>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiscrepancyAnalysis {
    pub missed_code_analysis: Vec<MissedCodeEntry>,
    /// Most frequently missed first; ties by code.
    pub code_frequency: Vec<CodeFrequency>,
    pub patient_level_analysis: Vec<PatientDiscrepancy>,
    pub summary_stats: SummaryStats,
}

impl DiscrepancyAnalysis {
    /// Distinct missed codes in frequency order. These are the classification inputs.
    pub fn unique_missed_codes(&self) -> Vec<String> {
        self.code_frequency.iter().map(|f| f.code.clone()).collect()
    }
}

pub(crate) fn ratio(numerator: usize, denominator: usize, fallback: f64) -> f64 {
    if denominator == 0 {
        fallback
    } else {
        numerator as f64 / denominator as f64
    }
}

pub fn analyse_discrepancies(rows: &[PatientRow]) -> DiscrepancyAnalysis {
    let mut missed_code_analysis = Vec::new();
    let mut patient_level_analysis = Vec::with_capacity(rows.len());
    let mut frequency: HashMap<&str, usize> = HashMap::new();
    let mut match_distribution: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_baseline_codes = 0;
    let mut total_missed_codes = 0;

    for row in rows {
        let missed = row.baseline_codes.difference(&row.ai_codes);
        let extra = row.ai_codes.difference(&row.baseline_codes);

        total_baseline_codes += row.baseline_codes.len();
        total_missed_codes += missed.len();
        *match_distribution
            .entry(row.match_category.label().to_string())
            .or_default() += 1;

        for code in row.baseline_codes.iter().filter(|c| missed.contains(c)) {
            *frequency.entry(code).or_default() += 1;
            missed_code_analysis.push(MissedCodeEntry {
                patient_id: row.patient_id.clone(),
                missed_code: code.to_string(),
                all_baseline_codes: row.baseline_codes.clone(),
                all_ai_codes: row.ai_codes.clone(),
                match_result: row.match_category,
            });
        }

        patient_level_analysis.push(PatientDiscrepancy {
            patient_id: row.patient_id.clone(),
            baseline_codes: row.baseline_codes.clone(),
            ai_codes: row.ai_codes.clone(),
            missed_count: missed.len(),
            extra_count: extra.len(),
            missed_by_ai: missed,
            extra_by_ai: extra,
            match_result: row.match_category,
            clinical_text: row.clinical_text.clone(),
        });
    }

    let mut code_frequency: Vec<CodeFrequency> = frequency
        .into_iter()
        .map(|(code, count)| CodeFrequency {
            code: code.to_string(),
            count,
        })
        .collect();
    code_frequency.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.code.cmp(&b.code)));

    let summary_stats = SummaryStats {
        total_patients: rows.len(),
        total_baseline_codes,
        total_missed_codes,
        miss_rate: ratio(total_missed_codes, total_baseline_codes, 0.0),
        unique_missed_codes: code_frequency.len(),
        avg_missed_per_patient: ratio(total_missed_codes, rows.len(), 0.0),
        match_distribution,
    };

    DiscrepancyAnalysis {
        missed_code_analysis,
        code_frequency,
        patient_level_analysis,
        summary_stats,
    }
}

pub fn partial_match_cases(rows: &[PatientRow]) -> Vec<&PatientRow> {
    rows_in_category(rows, MatchCategory::Partial)
}

pub fn no_match_cases(rows: &[PatientRow]) -> Vec<&PatientRow> {
    rows_in_category(rows, MatchCategory::NoMatch)
}

fn rows_in_category(rows: &[PatientRow], category: MatchCategory) -> Vec<&PatientRow> {
    rows.iter().filter(|r| r.match_category == category).collect()
}
