//! Loading the per-patient code pair dataset.
//!
//! The dataset is a CSV file with one row per patient. Code cells hold comma-separated code lists
//! and may be empty. The match label cell must name a known category.

use crate::config::DatasetColumns;
use crate::{ReviewError, ReviewResult};
use review_types::{CodeSet, MatchCategory, PatientId};
use std::io::Read;
use std::path::Path;

/// One patient row from the dataset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatientRow {
    pub patient_id: PatientId,
    pub baseline_codes: CodeSet,
    pub ai_codes: CodeSet,
    pub match_category: MatchCategory,
    pub clinical_text: String,
}

struct ColumnIndices {
    patient_id: usize,
    baseline_codes: usize,
    ai_codes: usize,
    match_result: usize,
    clinical_text: usize,
}

impl ColumnIndices {
    fn locate(headers: &csv::StringRecord, columns: &DatasetColumns) -> ReviewResult<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| {
                    ReviewError::InvalidInput(format!("dataset is missing column '{name}'"))
                })
        };

        Ok(Self {
            patient_id: find(&columns.patient_id)?,
            baseline_codes: find(&columns.baseline_codes)?,
            ai_codes: find(&columns.ai_codes)?,
            match_result: find(&columns.match_result)?,
            clinical_text: find(&columns.clinical_text)?,
        })
    }
}

/// Load the dataset at `path`.
pub fn load_dataset(path: &Path, columns: &DatasetColumns) -> ReviewResult<Vec<PatientRow>> {
    let file = std::fs::File::open(path).map_err(ReviewError::FileRead)?;
    let rows = read_dataset(file, columns)?;
    tracing::info!(path = %path.display(), rows = rows.len(), "loaded dataset");
    Ok(rows)
}

/// Read dataset rows from any reader.
///
/// # Errors
///
/// - `Csv` for malformed CSV
/// - `InvalidInput` for a missing column
/// - `InvalidRow` for a blank patient id or unknown match label, with the 1-based line number
///   (the header is line 1)
pub fn read_dataset<R: Read>(reader: R, columns: &DatasetColumns) -> ReviewResult<Vec<PatientRow>> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let indices = ColumnIndices::locate(csv_reader.headers()?, columns)?;

    let mut rows = Vec::new();
    for (offset, record) in csv_reader.records().enumerate() {
        let record = record?;
        let line = offset + 2;
        let cell = |index: usize| record.get(index).unwrap_or("");

        let invalid_row = |source| ReviewError::InvalidRow { line, source };
        let patient_id = PatientId::new(cell(indices.patient_id)).map_err(invalid_row)?;
        let match_category = cell(indices.match_result)
            .parse::<MatchCategory>()
            .map_err(invalid_row)?;

        rows.push(PatientRow {
            patient_id,
            baseline_codes: CodeSet::parse(Some(cell(indices.baseline_codes))),
            ai_codes: CodeSet::parse(Some(cell(indices.ai_codes))),
            match_category,
            clinical_text: cell(indices.clinical_text).to_string(),
        });
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use review_types::TextError;
    use std::io::Write;

    const SAMPLE: &str = "\
Patient ID,SMC Coded,Rapidclaims Codes,Match Result,clinical text
101,\"R91.8, J44.1\",R91.8,Partial Match,\"Chest CT: COPD, nodule\"
102,,Z87.891,No Match,Screening CT
103,C78.7,C78.7,Complete Match,Liver metastasis
";

    #[test]
    fn rows_are_parsed_with_default_columns() {
        let rows = read_dataset(SAMPLE.as_bytes(), &DatasetColumns::default()).unwrap();
        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0].patient_id.as_str(), "101");
        assert_eq!(rows[0].baseline_codes, CodeSet::from_codes(["R91.8", "J44.1"]));
        assert_eq!(rows[0].match_category, MatchCategory::Partial);
        assert_eq!(rows[0].clinical_text, "Chest CT: COPD, nodule");

        assert!(rows[1].baseline_codes.is_empty());
        assert_eq!(rows[2].match_category, MatchCategory::Complete);
    }

    #[test]
    fn unknown_match_label_names_the_line() {
        let text = "Patient ID,SMC Coded,Rapidclaims Codes,Match Result,clinical text\n1,A,A,Sort Of,x\n";
        let err = read_dataset(text.as_bytes(), &DatasetColumns::default()).expect_err("bad label");
        let message = err.to_string();
        assert!(matches!(
            err,
            ReviewError::InvalidRow {
                line: 2,
                source: TextError::UnknownMatchCategory(_)
            }
        ));
        assert!(message.contains("line 2"), "{message}");
        assert!(message.contains("Sort Of"), "{message}");
    }

    #[test]
    fn blank_patient_id_is_an_invalid_row() {
        let text = "Patient ID,SMC Coded,Rapidclaims Codes,Match Result,clinical text\n1,A,A,Complete Match,x\n ,B,B,No Match,y\n";
        let err = read_dataset(text.as_bytes(), &DatasetColumns::default()).expect_err("blank id");
        assert!(matches!(
            err,
            ReviewError::InvalidRow {
                line: 3,
                source: TextError::Empty
            }
        ));
    }

    #[test]
    fn missing_column_is_reported() {
        let text = "Patient ID,SMC Coded,Match Result,clinical text\n1,A,Complete Match,x\n";
        let err =
            read_dataset(text.as_bytes(), &DatasetColumns::default()).expect_err("no AI column");
        assert!(err.to_string().contains("Rapidclaims Codes"));
    }

    #[test]
    fn custom_column_names_are_honoured() {
        let columns = DatasetColumns {
            patient_id: "id".into(),
            baseline_codes: "baseline".into(),
            ai_codes: "ai".into(),
            match_result: "match".into(),
            clinical_text: "note".into(),
        };
        let text = "id,baseline,ai,match,note\n7,A,B,No Match,text\n";
        let rows = read_dataset(text.as_bytes(), &columns).unwrap();
        assert_eq!(rows[0].ai_codes, CodeSet::from_codes(["B"]));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let rows = load_dataset(file.path(), &DatasetColumns::default()).unwrap();
        assert_eq!(rows.len(), 3);
    }
}
