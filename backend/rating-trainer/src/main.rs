use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use rating_trainer::{prepare, train, TrainingOptions, TrainingRun};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "rating-trainer")]
#[command(about = "Train the book rating network and prepare its artifacts")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit label encoders on a raw ratings CSV and write the encoded dataset
    Prepare {
        /// Raw ratings CSV with string categories and age in years
        #[arg(long)]
        raw: PathBuf,

        /// Encoded dataset output
        #[arg(long, default_value = "model/data.csv")]
        dataset: PathBuf,

        /// Encoder bundle output
        #[arg(long, default_value = "model/encoders.json")]
        encoders: PathBuf,
    },

    /// Train, evaluate and save the rating network
    Train(TrainArgs),
}

#[derive(Args)]
struct TrainArgs {
    /// Encoded dataset
    #[arg(long, default_value = "model/data.csv")]
    dataset: PathBuf,

    /// Encoder bundle; widens embedding tables to every known category
    #[arg(long)]
    encoders: Option<PathBuf>,

    /// Artifact directory
    #[arg(short, long, default_value = "model/native")]
    output: PathBuf,

    #[arg(long, default_value_t = 50)]
    epochs: usize,

    #[arg(long, default_value_t = 128)]
    batch_size: usize,

    /// Epochs without validation improvement before stopping
    #[arg(long, default_value_t = 3)]
    patience: usize,

    #[arg(long, default_value_t = 1e-3)]
    learning_rate: f64,

    /// Seed for the split and batch shuffling
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Prepare {
            raw,
            dataset,
            encoders,
        } => {
            let prepared = prepare(&raw, &dataset, &encoders)?;
            println!("Prepared {} rows -> {}", prepared.len(), dataset.display());
        }
        Commands::Train(args) => {
            let run = TrainingRun {
                dataset: args.dataset,
                encoders: args.encoders,
                output: args.output,
                options: TrainingOptions {
                    epochs: args.epochs,
                    batch_size: args.batch_size,
                    patience: args.patience,
                    learning_rate: args.learning_rate,
                    seed: args.seed,
                },
            };
            let report = train(&run)?;
            info!(best_epoch = report.best_epoch, "Training finished");

            println!("Validation Metrics:");
            println!("  R²:  {:.4}", report.validation.r2);
            println!("  MSE: {:.4}", report.validation.mse);
            println!("  MAE: {:.4}", report.validation.mae);
            println!("Test Metrics:");
            println!("  RMSE: {:.4}", report.test.rmse);
            println!("  MAE:  {:.4}", report.test.mae);
            println!("  R²:   {:.4}", report.test.r2);
            println!("Artifact written to {}", run.output.display());
        }
    }

    Ok(())
}
