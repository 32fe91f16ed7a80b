use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coding_review_core::config::{
    DatasetColumns, max_json_retries_from_env_value, max_workers_from_env_value,
    output_dir_from_env_value,
};
use coding_review_core::constants::{
    DEFAULT_AI_CODES_COLUMN, DEFAULT_BASELINE_CODES_COLUMN, DEFAULT_CLINICAL_TEXT_COLUMN,
    DEFAULT_MATCH_RESULT_COLUMN, DEFAULT_PATIENT_ID_COLUMN,
};
use coding_review_core::report::render_report;
use coding_review_core::{CaseReviewer, CoreConfig, PipelineOptions, ReviewPipeline};
use llm_client::{InvocationManager, load_endpoints_file};

/// Run the full coding review pipeline.
#[derive(Parser)]
#[command(name = "coding-review-run")]
struct Args {
    /// Dataset CSV (overrides `CODING_REVIEW_DATASET`)
    dataset: Option<PathBuf>,
    /// Reuse previously exported code classifications
    #[arg(long)]
    skip_classification: bool,
    /// Reuse previously exported partial match reviews
    #[arg(long)]
    skip_partial_review: bool,
    /// Reuse previously exported no match reviews
    #[arg(long)]
    skip_no_match_review: bool,
    #[command(flatten)]
    columns: ColumnArgs,
}

/// Dataset header names.
#[derive(clap::Args)]
struct ColumnArgs {
    #[arg(long, default_value = DEFAULT_PATIENT_ID_COLUMN)]
    patient_id_column: String,
    #[arg(long, default_value = DEFAULT_BASELINE_CODES_COLUMN)]
    baseline_codes_column: String,
    #[arg(long, default_value = DEFAULT_AI_CODES_COLUMN)]
    ai_codes_column: String,
    #[arg(long, default_value = DEFAULT_MATCH_RESULT_COLUMN)]
    match_result_column: String,
    #[arg(long, default_value = DEFAULT_CLINICAL_TEXT_COLUMN)]
    clinical_text_column: String,
}

impl From<ColumnArgs> for DatasetColumns {
    fn from(args: ColumnArgs) -> Self {
        Self {
            patient_id: args.patient_id_column,
            baseline_codes: args.baseline_codes_column,
            ai_codes: args.ai_codes_column,
            match_result: args.match_result_column,
            clinical_text: args.clinical_text_column,
        }
    }
}

/// Main entry point for the review pipeline
///
/// # Environment Variables
/// - `CODING_REVIEW_DATASET`: dataset CSV when no path argument is given
/// - `CODING_REVIEW_OUTPUT_DIR`: export directory (default: "review_output")
/// - `CODING_REVIEW_ENDPOINTS`: YAML endpoint descriptors, required unless every review step is
///   skipped
/// - `CODING_REVIEW_MAX_WORKERS`: concurrent LLM calls (default: 3)
/// - `CODING_REVIEW_JSON_RETRIES`: re-asks for pure JSON per case (default: 2)
///
/// Endpoint API keys are read from the variables named by each descriptor's `api_key_env`.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("coding_review=info".parse()?)
                .add_directive("coding_review_core=info".parse()?)
                .add_directive("llm_client=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let dataset = match args.dataset {
        Some(path) => path,
        None => std::env::var("CODING_REVIEW_DATASET")
            .map(PathBuf::from)
            .map_err(|_| anyhow::anyhow!("no dataset given and CODING_REVIEW_DATASET is not set"))?,
    };

    let config = Arc::new(
        CoreConfig::new(
            dataset,
            output_dir_from_env_value(std::env::var("CODING_REVIEW_OUTPUT_DIR").ok()),
            max_workers_from_env_value(std::env::var("CODING_REVIEW_MAX_WORKERS").ok())?,
            max_json_retries_from_env_value(std::env::var("CODING_REVIEW_JSON_RETRIES").ok())?,
        )?
        .with_columns(args.columns.into()),
    );

    let options = PipelineOptions {
        skip_classification: args.skip_classification,
        skip_partial_review: args.skip_partial_review,
        skip_no_match_review: args.skip_no_match_review,
    };

    let reviewer = match std::env::var("CODING_REVIEW_ENDPOINTS").ok() {
        Some(path) => {
            let endpoints = load_endpoints_file(PathBuf::from(path).as_path())?;
            tracing::info!("++ Configured {} LLM endpoints", endpoints.endpoints.len());
            let manager =
                InvocationManager::from_config(&endpoints, |name| std::env::var(name).ok())?;
            Some(CaseReviewer::new(Arc::new(manager), config.clone()))
        }
        None => None,
    };

    let outcome = ReviewPipeline::new(config.clone(), reviewer).run(options).await?;

    print!("{}", render_report(&outcome.metrics));
    tracing::info!(
        "++ Run {} finished in {:.2} minutes, results in {}",
        outcome.summary.run_id,
        outcome.summary.total_runtime_minutes,
        config.output_dir().display()
    );
    if let Some(stats) = outcome.summary.invocation_stats {
        tracing::info!("++ LLM usage: {}", serde_json::to_string(&stats)?);
    }

    Ok(())
}
