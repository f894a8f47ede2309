//! Insurance Risk Pipeline
//!
//! Command-line entry point for ingesting customer text, training and
//! activating risk models, scoring text and reporting results.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::Config;
use database::{SourceType, create_pool, run_migrations};
use ml_model::TrainingConfig;
use risk_pipeline::commands::infer::{DEFAULT_BATCH_SIZE, InferOptions};
use risk_pipeline::commands::pipeline::PipelineOptions;
use risk_pipeline::commands::retrain::DEFAULT_RETRAIN_THRESHOLD;
use risk_pipeline::commands::top::DEFAULT_TOP_N;
use risk_pipeline::commands::train::TrainRequest;
use risk_pipeline::commands::{
    activate, dashboard, infer, ingest, pipeline, retrain, show_model, top, train,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Insurance Risk Pipeline
#[derive(Parser)]
#[command(name = "risk-pipeline")]
#[command(about = "Scores customer text for insurance risk and suggests premium adjustments")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show active models, or one model's history
    ShowModel {
        /// Restrict to one model name
        #[arg(short, long)]
        name: Option<String>,

        /// List versions and activation history (requires --name)
        #[arg(long, requires = "name")]
        history: bool,
    },

    /// Store a piece of customer text for scoring
    Ingest {
        #[arg(short, long)]
        customer_id: i64,

        /// CLAIM_DESCRIPTION, CUSTOMER_REVIEW, SUPPORT_CHAT or OTHER
        #[arg(short, long, default_value = "SUPPORT_CHAT")]
        source_type: SourceType,

        #[arg(short, long)]
        text: String,
    },

    /// Train a model from a labeled CSV (columns: `raw_text,label`)
    Train {
        #[arg(long)]
        train_csv: PathBuf,

        /// Model name (defaults to `MODEL_NAME`)
        #[arg(short, long)]
        name: Option<String>,

        /// Make the new model active
        #[arg(long)]
        activate: bool,

        /// Number of training epochs
        #[arg(short, long, default_value = "200")]
        epochs: usize,

        /// Learning rate
        #[arg(short, long, default_value = "0.05")]
        learning_rate: f64,
    },

    /// Activate a registered model version
    Activate {
        #[arg(long)]
        version: String,

        /// Model name (defaults to `MODEL_NAME`)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Score texts with the active model
    Infer {
        #[arg(short, long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: i64,

        /// Model name (defaults to `MODEL_NAME`)
        #[arg(short, long)]
        name: Option<String>,

        /// Load this artifact instead of the active model's
        #[arg(long)]
        artifact_override: Option<PathBuf>,

        /// Rescore texts ingested within the last N days
        #[arg(long, default_value = "0")]
        rescore_recent_days: i64,
    },

    /// Show the risk dashboard for a customer
    Dashboard {
        #[arg(short, long)]
        customer_id: i64,
    },

    /// List the highest-risk customers
    Top {
        #[arg(short = 'n', long, default_value_t = DEFAULT_TOP_N)]
        top_n: i64,
    },

    /// Retrain if enough text is waiting to be scored
    Retrain {
        #[arg(long)]
        train_csv: PathBuf,

        #[arg(long, default_value_t = DEFAULT_RETRAIN_THRESHOLD)]
        threshold_new_texts: i64,

        /// Make the new model active
        #[arg(long)]
        activate: bool,
    },

    /// Retrain (optional), infer, then rescore (optional)
    Pipeline {
        /// Labeled CSV; enables the retrain step
        #[arg(long)]
        train_csv: Option<PathBuf>,

        #[arg(long, default_value_t = DEFAULT_RETRAIN_THRESHOLD)]
        threshold_new_texts: i64,

        #[arg(short, long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: i64,

        /// Rescore texts ingested within the last N days after inference
        #[arg(long, default_value = "0")]
        rescore_recent_days: i64,
    },

    /// Run database migrations
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env()?;
    let pool = create_pool(&config.database_url).await?;

    match cli.command {
        Commands::ShowModel { name, history } => {
            println!("{}", show_model::run(&pool, name.as_deref(), history).await?);
        }
        Commands::Ingest {
            customer_id,
            source_type,
            text,
        } => {
            ingest::run(&pool, customer_id, source_type, &text).await?;
            println!("Ingested unstructured text into DB.");
        }
        Commands::Train {
            train_csv,
            name,
            activate,
            epochs,
            learning_rate,
        } => {
            let request = TrainRequest {
                train_csv,
                model_name: name.unwrap_or_else(|| config.model_name.clone()),
                artifacts_dir: config.artifacts_dir.clone(),
                activate,
                training: TrainingConfig::default()
                    .with_epochs(epochs)
                    .with_learning_rate(learning_rate),
            };
            let report = train::run(&pool, &request).await?;
            println!("{}", train::render_report(&report));
        }
        Commands::Activate { version, name } => {
            let name = name.unwrap_or_else(|| config.model_name.clone());
            let model = activate::run(&pool, &name, &version).await?;
            println!(
                "Activated model {} {} (model_id={})",
                model.model_name, model.model_version, model.model_id
            );
        }
        Commands::Infer {
            batch_size,
            name,
            artifact_override,
            rescore_recent_days,
        } => {
            let options = InferOptions::new(name.unwrap_or_else(|| config.model_name.clone()))
                .with_batch_size(batch_size)
                .with_artifact_override(artifact_override)
                .with_rescore_recent_days(rescore_recent_days);
            let report = infer::run(&pool, &options).await?;
            println!("{}", infer::render_report(&report));
        }
        Commands::Dashboard { customer_id } => {
            println!("{}", dashboard::run(&pool, customer_id).await?);
        }
        Commands::Top { top_n } => {
            println!("{}", top::run(&pool, top_n).await?);
        }
        Commands::Retrain {
            train_csv,
            threshold_new_texts,
            activate,
        } => {
            let request = train_request(&config, train_csv, activate);
            let outcome = retrain::run(&pool, threshold_new_texts, &request).await?;
            println!("{}", retrain::render_outcome(&outcome));
        }
        Commands::Pipeline {
            train_csv,
            threshold_new_texts,
            batch_size,
            rescore_recent_days,
        } => {
            let options = PipelineOptions {
                retrain: train_csv.map(|path| train_request(&config, path, true)),
                retrain_threshold: threshold_new_texts,
                infer: InferOptions::new(config.model_name.clone()).with_batch_size(batch_size),
                rescore_recent_days,
            };
            let report = pipeline::run(&pool, &options).await?;
            println!("{}", pipeline::render_report(&report));
        }
        Commands::Migrate => {
            run_migrations(&pool).await?;
            info!("Migrations completed successfully");
        }
    }

    Ok(())
}

fn train_request(config: &Config, train_csv: PathBuf, activate: bool) -> TrainRequest {
    TrainRequest {
        train_csv,
        model_name: config.model_name.clone(),
        artifacts_dir: config.artifacts_dir.clone(),
        activate,
        training: TrainingConfig::default(),
    }
}
