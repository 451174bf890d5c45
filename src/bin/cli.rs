//! Tyrewear CLI - builds the F1 lap-time degradation training dataset

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use tyrewear::config::PipelineConfig;
use tyrewear::source::{LiveTimingSource, SourceConfig};
use tyrewear::{features, ingest};

const DEFAULT_RAW_DIR: &str = "data/raw";
const DEFAULT_PROCESSED_DIR: &str = "data/processed";

#[derive(Parser)]
#[command(name = "tyrewear")]
#[command(author, version, about = "F1 lap-time degradation dataset pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch and clean per-season race data
    Ingest {
        /// Season years to ingest
        #[arg(short, long, num_args = 1.., default_values_t = vec![2022, 2023, 2024])]
        years: Vec<i32>,

        /// Base URL of the timing archive API
        #[arg(long)]
        base_url: String,

        /// Output directory for season tables
        #[arg(long, default_value = DEFAULT_RAW_DIR)]
        raw_dir: PathBuf,

        /// Delay between provider requests in milliseconds
        #[arg(long, default_value = "1000")]
        delay: u64,
    },

    /// Build the training table from ingested seasons
    Features {
        /// Directory holding the season tables
        #[arg(long, default_value = DEFAULT_RAW_DIR)]
        raw_dir: PathBuf,

        /// Output directory for the training table
        #[arg(long, default_value = DEFAULT_PROCESSED_DIR)]
        processed_dir: PathBuf,
    },

    /// Run both stages back to back
    Run {
        /// Season years to ingest
        #[arg(short, long, num_args = 1.., default_values_t = vec![2022, 2023, 2024])]
        years: Vec<i32>,

        /// Base URL of the timing archive API
        #[arg(long)]
        base_url: String,

        /// Output directory for season tables
        #[arg(long, default_value = DEFAULT_RAW_DIR)]
        raw_dir: PathBuf,

        /// Output directory for the training table
        #[arg(long, default_value = DEFAULT_PROCESSED_DIR)]
        processed_dir: PathBuf,

        /// Delay between provider requests in milliseconds
        #[arg(long, default_value = "1000")]
        delay: u64,
    },
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");

    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest {
            years,
            base_url,
            raw_dir,
            delay,
        } => {
            let config = PipelineConfig {
                years,
                raw_dir,
                ..Default::default()
            };
            run_ingest(&config, base_url, delay)?;
        }
        Commands::Features {
            raw_dir,
            processed_dir,
        } => {
            let config = PipelineConfig {
                years: Vec::new(),
                raw_dir,
                processed_dir,
            };
            run_features(&config)?;
        }
        Commands::Run {
            years,
            base_url,
            raw_dir,
            processed_dir,
            delay,
        } => {
            let config = PipelineConfig {
                years,
                raw_dir,
                processed_dir,
            };
            run_ingest(&config, base_url, delay)?;
            run_features(&config)?;
        }
    }

    Ok(())
}

fn run_ingest(config: &PipelineConfig, base_url: String, delay: u64) -> Result<()> {
    println!(
        "{}: seasons {:?} -> {}",
        "Ingesting".green().bold(),
        config.years,
        config.raw_dir.display()
    );

    let mut source_config = SourceConfig::new(base_url);
    source_config.delay_ms = delay;
    let source = LiveTimingSource::new(source_config);

    let pb = spinner("Fetching and cleaning race data...");
    let written = ingest::run(&source, config).context("Ingestion failed")?;
    pb.finish_and_clear();

    if written.is_empty() {
        println!("{}", "No season produced any usable data.".yellow());
        return Ok(());
    }

    for (year, path) in &written {
        println!("  {} {} -> {}", "Saved".green(), year, path.display());
    }
    println!(
        "{}: {}/{} seasons saved",
        "Complete".green(),
        written.len(),
        config.years.len()
    );

    Ok(())
}

fn run_features(config: &PipelineConfig) -> Result<()> {
    println!(
        "{}: {} -> {}",
        "Engineering features".green().bold(),
        config.raw_dir.display(),
        config.processed_dir.display()
    );

    let pb = spinner("Building training table...");
    let (path, rows) = features::run(config).context("Feature engineering failed")?;
    pb.finish_and_clear();

    println!(
        "{}: {} ({} rows)",
        "Saved".green(),
        path.display(),
        rows
    );

    Ok(())
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(message.to_string());
    pb
}
