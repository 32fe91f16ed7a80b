use crate::dataset::PatientRow;
use review_types::{CodeSet, MatchCategory, PatientId};
use serde::{Deserialize, Serialize};

/// Baseline and AI code sets for one patient, with the derived differences.
///
/// Everything but `match_category` is fixed at construction. The category only changes through
/// [`PatientCodeComparison::promote`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientCodeComparison {
    pub patient_id: PatientId,
    pub baseline_codes: CodeSet,
    pub ai_codes: CodeSet,
    /// baseline − ai
    pub missed: CodeSet,
    /// ai − baseline
    pub extra: CodeSet,
    pub match_category: MatchCategory,
}

impl PatientCodeComparison {
    pub fn new(
        patient_id: PatientId,
        baseline_codes: CodeSet,
        ai_codes: CodeSet,
        match_category: MatchCategory,
    ) -> Self {
        Self {
            missed: baseline_codes.difference(&ai_codes),
            extra: ai_codes.difference(&baseline_codes),
            patient_id,
            baseline_codes,
            ai_codes,
            match_category,
        }
    }

    pub fn from_row(row: &PatientRow) -> Self {
        Self::new(
            row.patient_id.clone(),
            row.baseline_codes.clone(),
            row.ai_codes.clone(),
            row.match_category,
        )
    }

    /// Codes both sources agree on.
    pub fn correct(&self) -> CodeSet {
        self.baseline_codes.intersection(&self.ai_codes)
    }

    /// Promote the chart to "Complete Match (Post-Review)". Returns whether the category changed.
    pub fn promote(&mut self) -> bool {
        let promoted = self.match_category.promoted();
        let changed = promoted != self.match_category;
        self.match_category = promoted;
        changed
    }
}

pub fn build_comparisons(rows: &[PatientRow]) -> Vec<PatientCodeComparison> {
    rows.iter().map(PatientCodeComparison::from_row).collect()
}
