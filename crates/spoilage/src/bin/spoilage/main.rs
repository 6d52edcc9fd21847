//! Command line front end: train a bundle, score CSV batches, classify a
//! single reading.
//!
//! Examples:
//! - `spoilage train --data food.csv --out model/`
//! - `spoilage predict --model-dir model/ --input batch.csv --output scored.csv`
//! - `spoilage classify --model-dir model/ --moisture 50 --ph 7 --temperature 20 --humidity 50 --bacterial-growth 9`

mod config;

use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use spoilage::dataset::{read_csv, write_csv, write_csv_to};
use spoilage::persist::format_run_id;
use spoilage::training::Verbosity;
use spoilage::{ArtifactBundle, FeatureVector, PipelineState, RandomForest, TrainingPipeline};

use crate::config::RunConfig;

#[derive(Parser, Debug)]
#[command(name = "spoilage", version, about = "Food spoilage classification from sensor readings")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train a classifier and save its artifact bundle
    Train {
        /// Labeled CSV with the five feature columns and Spoilage_Status
        #[arg(short, long)]
        data: PathBuf,
        /// Directory for the artifact bundle
        #[arg(short, long)]
        out: PathBuf,
        /// TOML file with [training] and [forest] sections
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Overrides the split seed and the forest seed
        #[arg(long)]
        seed: Option<u64>,
        /// Overrides the number of trees
        #[arg(long)]
        trees: Option<usize>,
        /// silent, warning, info or debug
        #[arg(short, long)]
        verbosity: Option<Verbosity>,
        /// Also write the evaluation report as JSON
        #[arg(long)]
        report_json: Option<PathBuf>,
    },

    /// Score every row of a CSV batch
    Predict {
        #[arg(short, long)]
        model_dir: PathBuf,
        /// CSV with at least the five feature columns
        #[arg(short, long)]
        input: PathBuf,
        /// Output CSV; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Classify one reading
    Classify {
        #[arg(short, long)]
        model_dir: PathBuf,
        #[arg(long)]
        moisture: f64,
        #[arg(long)]
        ph: f64,
        #[arg(long)]
        temperature: f64,
        #[arg(long)]
        humidity: f64,
        #[arg(long)]
        bacterial_growth: f64,
    },

    /// Print a summary of a saved bundle
    Inspect {
        #[arg(short, long)]
        model_dir: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    match Cli::parse().command {
        Commands::Train {
            data,
            out,
            config,
            seed,
            trees,
            verbosity,
            report_json,
        } => {
            let mut run = match config {
                Some(path) => RunConfig::load(&path)?,
                None => RunConfig::default(),
            };
            run.apply_overrides(seed, trees, verbosity);
            run.validate()?;

            let table = read_csv(&data).with_context(|| format!("reading {}", data.display()))?;
            let pipeline = TrainingPipeline::with_forest(run.training, run.forest);
            let outcome = pipeline
                .run_and_save(&table, &out)
                .with_context(|| format!("training on {}", data.display()))?;

            print!("{}", outcome.report);
            println!(
                "saved run {} to {}",
                format_run_id(outcome.bundle.run_id()),
                out.display()
            );
            if let Some(path) = report_json {
                let json = serde_json::to_string_pretty(&outcome.report)?;
                fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
            }
        }

        Commands::Predict {
            model_dir,
            input,
            output,
        } => {
            let state = ready_state(model_dir)?;
            let table = read_csv(&input).with_context(|| format!("reading {}", input.display()))?;
            let scored = state.annotate(&table)?;
            match output {
                Some(path) => write_csv(&path, &scored)
                    .with_context(|| format!("writing {}", path.display()))?,
                None => write_csv_to(io::stdout().lock(), &scored)?,
            }
        }

        Commands::Classify {
            model_dir,
            moisture,
            ph,
            temperature,
            humidity,
            bacterial_growth,
        } => {
            let state = ready_state(model_dir)?;
            let reading = FeatureVector::new(moisture, ph, temperature, humidity, bacterial_growth);
            println!("{}", state.predict_one(&reading)?);
        }

        Commands::Inspect { model_dir } => {
            let bundle = ArtifactBundle::<RandomForest>::load(&model_dir)?;
            println!("run:     {}", format_run_id(bundle.run_id()));
            println!("classes: {}", bundle.codec().classes().join(", "));
            println!("trees:   {}", bundle.classifier().n_trees());
            println!("rows:    {} (scaler fit)", bundle.scaler().n_samples_seen());
            for ((column, mean), scale) in bundle
                .scaler()
                .columns()
                .iter()
                .zip(bundle.scaler().means())
                .zip(bundle.scaler().scales())
            {
                println!("  {column:<18} mean {mean:>10.4}  scale {scale:>10.4}");
            }
        }
    }

    Ok(())
}

fn ready_state(model_dir: PathBuf) -> anyhow::Result<PipelineState> {
    let state: PipelineState = PipelineState::from_dir(&model_dir);
    if let Some(err) = state.error() {
        bail!("cannot load bundle from {}: {err}", model_dir.display());
    }
    Ok(state)
}
