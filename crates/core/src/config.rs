//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services in an
//! `Arc`. Nothing in this crate reads process-wide environment variables while a review batch is
//! running; binaries read the environment and hand the raw values to the `*_from_env_value`
//! helpers below.

use crate::constants::{
    DEFAULT_AI_CODES_COLUMN, DEFAULT_BASELINE_CODES_COLUMN, DEFAULT_CLINICAL_TEXT_COLUMN,
    DEFAULT_MATCH_RESULT_COLUMN, DEFAULT_MAX_JSON_RETRIES, DEFAULT_MAX_WORKERS,
    DEFAULT_OUTPUT_DIR, DEFAULT_PATIENT_ID_COLUMN,
};
use crate::{ReviewError, ReviewResult};
use std::path::{Path, PathBuf};

/// Header names of the dataset columns the pipeline reads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatasetColumns {
    pub patient_id: String,
    pub baseline_codes: String,
    pub ai_codes: String,
    pub match_result: String,
    pub clinical_text: String,
}

impl Default for DatasetColumns {
    fn default() -> Self {
        Self {
            patient_id: DEFAULT_PATIENT_ID_COLUMN.into(),
            baseline_codes: DEFAULT_BASELINE_CODES_COLUMN.into(),
            ai_codes: DEFAULT_AI_CODES_COLUMN.into(),
            match_result: DEFAULT_MATCH_RESULT_COLUMN.into(),
            clinical_text: DEFAULT_CLINICAL_TEXT_COLUMN.into(),
        }
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    dataset_path: PathBuf,
    output_dir: PathBuf,
    max_workers: usize,
    max_json_retries: usize,
    columns: DatasetColumns,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `max_workers` is zero.
    pub fn new(
        dataset_path: PathBuf,
        output_dir: PathBuf,
        max_workers: usize,
        max_json_retries: usize,
    ) -> ReviewResult<Self> {
        if max_workers == 0 {
            return Err(ReviewError::InvalidInput(
                "max_workers must be at least 1".into(),
            ));
        }

        Ok(Self {
            dataset_path,
            output_dir,
            max_workers,
            max_json_retries,
            columns: DatasetColumns::default(),
        })
    }

    pub fn with_columns(mut self, columns: DatasetColumns) -> Self {
        self.columns = columns;
        self
    }

    pub fn dataset_path(&self) -> &Path {
        &self.dataset_path
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn output_file(&self, filename: &str) -> PathBuf {
        self.output_dir.join(filename)
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn max_json_retries(&self) -> usize {
        self.max_json_retries
    }

    pub fn columns(&self) -> &DatasetColumns {
        &self.columns
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_count(name: &str, value: Option<String>, default: usize) -> ReviewResult<usize> {
    match non_blank(value) {
        None => Ok(default),
        Some(v) => v.parse::<usize>().map_err(|_| {
            ReviewError::InvalidInput(format!("{name} must be a whole number, got '{v}'"))
        }),
    }
}

/// Parse the worker limit from an optional environment value. Blank means the default (3).
pub fn max_workers_from_env_value(value: Option<String>) -> ReviewResult<usize> {
    parse_count("CODING_REVIEW_MAX_WORKERS", value, DEFAULT_MAX_WORKERS)
}

/// Parse the JSON retry count from an optional environment value. Blank means the default (2).
pub fn max_json_retries_from_env_value(value: Option<String>) -> ReviewResult<usize> {
    parse_count("CODING_REVIEW_JSON_RETRIES", value, DEFAULT_MAX_JSON_RETRIES)
}

/// Resolve the output directory. Blank means `review_output/` under the working directory.
pub fn output_dir_from_env_value(value: Option<String>) -> PathBuf {
    non_blank(value)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_workers_is_rejected() {
        let err = CoreConfig::new("data.csv".into(), "out".into(), 0, 2).expect_err("zero");
        assert!(matches!(err, ReviewError::InvalidInput(_)));
    }

    #[test]
    fn env_values_fall_back_to_defaults() {
        assert_eq!(max_workers_from_env_value(None).unwrap(), 3);
        assert_eq!(max_workers_from_env_value(Some("  ".into())).unwrap(), 3);
        assert_eq!(max_json_retries_from_env_value(None).unwrap(), 2);
        assert_eq!(max_json_retries_from_env_value(Some(" 0 ".into())).unwrap(), 0);
        assert_eq!(output_dir_from_env_value(None), PathBuf::from("review_output"));
    }

    #[test]
    fn non_numeric_env_value_is_rejected() {
        let err = max_workers_from_env_value(Some("many".into())).expect_err("not a number");
        assert!(err.to_string().contains("CODING_REVIEW_MAX_WORKERS"));
    }

    #[test]
    fn output_file_joins_output_dir() {
        let config = CoreConfig::new("data.csv".into(), "/tmp/out".into(), 2, 1).unwrap();
        assert_eq!(
            config.output_file("a.json"),
            PathBuf::from("/tmp/out/a.json")
        );
        assert_eq!(config.columns(), &DatasetColumns::default());
    }
}
