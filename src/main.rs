//! PHC risk engine command line.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use phc_risk::config::{self, Settings};
use phc_risk::core::data::FeatureExtractor;
use phc_risk::models::IntakeRecord;
use phc_risk::utils::telemetry;
use phc_risk::EnsembleAggregator;

#[derive(Parser)]
#[command(name = "phc-risk", about = "Hybrid deterioration risk engine for primary health centres")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Extra configuration file layered over config/default
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Assess an intake record and print the final assessment
    Assess {
        intake: PathBuf,
        #[arg(long)]
        case_id: Option<String>,
        #[arg(long)]
        pretty: bool,
    },
    /// Print the labeled feature vector for an intake record
    Features { intake: PathBuf },
    /// Print the effective configuration
    Config,
}

fn read_intake(path: &Path) -> Result<IntakeRecord> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let intake: IntakeRecord =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    intake.check().context("intake record failed validation")?;
    Ok(intake)
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", out);
    Ok(())
}

async fn assess(settings: &Settings, path: &Path, case_id: Option<String>, pretty: bool) -> Result<()> {
    let intake = read_intake(path)?;
    let engine = EnsembleAggregator::from_settings(settings).context("starting risk engine")?;
    let assessment = engine.assess(&intake).await.context("assessment failed")?;

    print_json(&assessment, pretty)?;
    let case_id = case_id.unwrap_or_else(|| assessment.assessment_id.to_string());
    if let Some(notice) = assessment.escalation_notice(&case_id) {
        print_json(&notice, pretty)?;
    }
    Ok(())
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let settings = config::load_settings_from(cli.config.as_deref()).context("loading configuration")?;
    telemetry::init(&settings.logging);

    match cli.command {
        Commands::Assess {
            intake,
            case_id,
            pretty,
        } => assess(&settings, &intake, case_id, pretty).await?,
        Commands::Features { intake } => {
            let record = read_intake(&intake)?;
            let features = FeatureExtractor::from_intake(&record);
            let labeled: Vec<_> = features
                .labeled()
                .map(|(feature, value)| serde_json::json!({
                    "feature": feature.name(),
                    "label": feature.label(),
                    "value": value,
                }))
                .collect();
            print_json(&labeled, true)?;
        }
        Commands::Config => print_json(&settings, true)?,
    }
    Ok(())
}
