// Command-line front end for AML risk scoring. Trains the model, scores single transactions
// and batch files, and lists the categories the model knows.
use std::fs::File;
use std::path::PathBuf;

use aml_risk::csv_reader::{read_reference_dataset, read_transactions, write_predictions};
use aml_risk::encoder::CategoricalField;
use aml_risk::inference::{summarize, PredictionSummary};
use aml_risk::metrics::ClassificationMetrics;
use aml_risk::training::TrainingReport;
use aml_risk::{predict_batch, predict_one, train, AppConfig, RiskContext, TransactionRecord};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "aml-risk", about = "Money-laundering risk scoring for transactions")]
struct Cli {
    /// Configuration file (optional; defaults apply when absent)
    #[arg(long, default_value = aml_risk::config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Overrides artifacts.model_dir
    #[arg(long)]
    model_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train on the reference dataset and save the artifacts
    Train {
        /// Overrides data.reference_path
        #[arg(long)]
        data: Option<PathBuf>,
    },
    /// Score a single transaction
    Predict(PredictArgs),
    /// Score every row of a CSV file and write it back with predictions
    Batch {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value = "hasil_prediksi.csv")]
        output: PathBuf,
    },
    /// List the transaction types and countries the model knows
    Categories,
}

#[derive(Args, Debug)]
struct PredictArgs {
    #[arg(long)]
    transaction_type: String,
    #[arg(long, default_value_t = 100.0)]
    amount: f64,
    #[arg(long)]
    country: String,
}

fn print_metrics(name: &str, metrics: &ClassificationMetrics) {
    let auc = metrics
        .auc_roc
        .map(|v| format!("{:.1}%", v * 100.0))
        .unwrap_or_else(|| "n/a".to_string());
    println!(
        "{:<10} accuracy {:>6.1}%  ROC AUC {:>6}  recall {:>6.1}%  precision {:>6.1}%",
        name,
        metrics.accuracy * 100.0,
        auc,
        metrics.recall * 100.0,
        metrics.precision * 100.0
    );
}

fn print_report(report: &TrainingReport) {
    println!("Trained on {} rows ({} train / {} test)", report.rows, report.train_rows, report.test_rows);
    println!("High-risk share: {:.2}%", report.high_risk_rate * 100.0);
    print_metrics("Train set", &report.train_metrics);
    print_metrics("Test set", &report.test_metrics);
    if let Some(warning) = &report.convergence_warning {
        println!("Warning: {}", warning);
    }
}

fn print_summary(summary: &PredictionSummary) {
    println!("Safe: {}", summary.safe);
    println!("Suspicious: {} ({:.1}%)", summary.suspicious, summary.suspicious_rate() * 100.0);
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load_from_path(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    let model_dir = cli
        .model_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.artifacts.model_dir));

    match cli.command {
        Commands::Train { data } => {
            let data = data.unwrap_or_else(|| PathBuf::from(&config.data.reference_path));
            info!(path = %data.display(), "Training from reference dataset");
            let reference = read_reference_dataset(&data)
                .with_context(|| format!("Failed to read reference dataset {}", data.display()))?;
            let trained = train(&reference, &config)?;
            print_report(&trained.report);
            RiskContext::from(trained).save(&model_dir)?;
            println!("Model saved to {}", model_dir.display());
        }
        Commands::Predict(args) => {
            let ctx = RiskContext::load(&model_dir)?.with_decision_threshold(config.inference.decision_threshold);
            let record = TransactionRecord::new(args.transaction_type, args.amount, args.country);
            let prediction = predict_one(&record, &ctx)?;
            let verdict = if prediction.label == 1 { "High" } else { "Low" };
            println!("Risk: {}", verdict);
            println!("Risk probability: {:.2}", prediction.probability);
        }
        Commands::Batch { input, output } => {
            let ctx = RiskContext::load(&model_dir)?.with_decision_threshold(config.inference.decision_threshold);
            let batch = read_transactions(&input)
                .with_context(|| format!("Failed to read transactions {}", input.display()))?;
            let predictions = predict_batch(&batch.records, &ctx)?;
            let file = File::create(&output).with_context(|| format!("Failed to create {}", output.display()))?;
            write_predictions(file, &batch, &predictions)?;
            print_summary(&summarize(&predictions));
            println!("Predictions written to {}", output.display());
        }
        Commands::Categories => {
            let ctx = RiskContext::load(&model_dir)?;
            for field in [CategoricalField::TransactionType, CategoricalField::Country] {
                println!("{}:", field.column());
                for value in ctx.schema.categories(field) {
                    println!("  {}", value);
                }
            }
        }
    }

    Ok(())
}
