use clap::{Parser, Subcommand};
use coding_review_core::adjudication::{AdjudicationResult, CodeClassification};
use coding_review_core::config::DatasetColumns;
use coding_review_core::constants::{
    CODE_CLASSIFICATIONS_FILENAME, COMPREHENSIVE_METRICS_FILENAME, NO_MATCH_REVIEWS_FILENAME,
    PARTIAL_MATCH_REVIEWS_FILENAME,
};
use coding_review_core::dataset::load_dataset;
use coding_review_core::discrepancy::analyse_discrepancies;
use coding_review_core::pipeline::{load_results, write_json};
use coding_review_core::report::render_report;
use coding_review_core::{compute_comprehensive_metrics, ComprehensiveMetrics, ReconciliationInput};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "coding-review")]
#[command(about = "Offline tools for the coding review pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarise code discrepancies in a dataset
    Analyse {
        /// Dataset CSV
        dataset: PathBuf,
        /// Number of most frequently missed codes to list
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Recompute comprehensive metrics from previously exported review results
    Metrics {
        /// Dataset CSV
        dataset: PathBuf,
        /// Directory holding the exported review results
        #[arg(long)]
        results_dir: PathBuf,
    },
    /// Print the accuracy report for an exported metrics file
    Report {
        /// comprehensive_metrics.json
        metrics: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("coding_review_core=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Analyse { dataset, top }) => {
            let rows = load_dataset(&dataset, &DatasetColumns::default())?;
            let analysis = analyse_discrepancies(&rows);
            let stats = &analysis.summary_stats;
            println!("Patients:            {}", stats.total_patients);
            println!("Baseline codes:      {}", stats.total_baseline_codes);
            println!("Missed by AI:        {}", stats.total_missed_codes);
            println!("Miss rate:           {:.1}%", stats.miss_rate * 100.0);
            println!("Unique missed codes: {}", stats.unique_missed_codes);
            println!("Avg missed/patient:  {:.2}", stats.avg_missed_per_patient);
            for (label, count) in &stats.match_distribution {
                println!("  {label}: {count}");
            }
            if !analysis.code_frequency.is_empty() {
                println!("\nMost frequently missed codes:");
                for entry in analysis.code_frequency.iter().take(top) {
                    println!("  {}: {}", entry.code, entry.count);
                }
            }
        }
        Some(Commands::Metrics {
            dataset,
            results_dir,
        }) => {
            let rows = load_dataset(&dataset, &DatasetColumns::default())?;
            let classifications: Vec<CodeClassification> =
                load_results(&results_dir.join(CODE_CLASSIFICATIONS_FILENAME))?;
            let partial_reviews: Vec<AdjudicationResult> =
                load_results(&results_dir.join(PARTIAL_MATCH_REVIEWS_FILENAME))?;
            let no_match_reviews: Vec<AdjudicationResult> =
                load_results(&results_dir.join(NO_MATCH_REVIEWS_FILENAME))?;

            let metrics = compute_comprehensive_metrics(&ReconciliationInput {
                rows: &rows,
                classifications: &classifications,
                partial_reviews: &partial_reviews,
                no_match_reviews: &no_match_reviews,
            });
            let path = results_dir.join(COMPREHENSIVE_METRICS_FILENAME);
            write_json(&path, &metrics)?;
            print!("{}", render_report(&metrics));
            println!("\nWrote {}", path.display());
        }
        Some(Commands::Report { metrics }) => {
            let text = std::fs::read_to_string(&metrics)?;
            let metrics: ComprehensiveMetrics = serde_json::from_str(&text)?;
            print!("{}", render_report(&metrics));
        }
        None => {
            println!("Use 'coding-review --help' for commands");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn metrics_requires_results_dir() {
        assert!(Cli::try_parse_from(["coding-review", "metrics", "data.csv"]).is_err());
        let cli = Cli::try_parse_from([
            "coding-review",
            "metrics",
            "data.csv",
            "--results-dir",
            "review_output",
        ])
        .unwrap();
        assert!(matches!(cli.command, Some(Commands::Metrics { .. })));
    }
}
