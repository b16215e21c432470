//! The command line interface for the tool.
use crate::analyzer::ImpactAnalyzer;
use crate::artifact::TrainedArtifact;
use crate::dataset::Dataset;
use crate::event::EventType;
use crate::features::assemble_training;
use crate::log;
use crate::output;
use crate::predictor::Predictor;
use crate::settings::Settings;
use crate::simulator::{ScenarioParams, ScenarioSimulator};
use crate::trainer::{TrainerOptions, train};
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use itertools::Itertools;
use std::borrow::Borrow;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use strum::IntoEnumIterator;

/// The command line interface for the tool.
#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// The available commands.
    #[command(subcommand)]
    pub command: Commands,
}

/// The available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Train the impact model on a dataset.
    Train {
        /// Path to the dataset directory.
        data_dir: PathBuf,
        /// Where to write the trained model artifact.
        #[arg(long, default_value = "impact_model.json")]
        artifact: PathBuf,
    },
    /// Predict the impact of a planned event.
    Predict {
        /// Path to the dataset directory.
        data_dir: PathBuf,
        /// Path to a trained model artifact.
        #[arg(long, default_value = "impact_model.json")]
        artifact: PathBuf,
        /// The planned event's type (e.g. music, sports).
        #[arg(long)]
        event_type: String,
        /// The host city.
        #[arg(long)]
        city: String,
        /// Planned duration in days.
        #[arg(long)]
        duration: u32,
        /// Expected attendance, if known.
        #[arg(long)]
        attendance: Option<f64>,
    },
    /// Analyze the observed impact of historical events.
    Analyze {
        /// Path to the dataset directory.
        data_dir: PathBuf,
        /// Analyze only this event (all catalog events by default).
        #[arg(long)]
        event: Option<String>,
    },
    /// Simulate a what-if attendance scenario for an event.
    Simulate {
        /// Path to the dataset directory.
        data_dir: PathBuf,
        /// The event to simulate.
        #[arg(long)]
        event: String,
        /// Attendance change in percent (may be negative).
        #[arg(long, allow_hyphen_values = true)]
        attendance_change: f64,
        /// How strongly prices respond to demand, 0 to 1.
        #[arg(long, default_value_t = 0.3)]
        price_elasticity: f64,
        /// Multiplier on per-visitor spending.
        #[arg(long, default_value_t = 1.0)]
        spending_multiplier: f64,
    },
}

/// Load settings and initialise logging for a dataset directory
fn init_for_dataset(data_dir: &Path) -> Result<Settings> {
    let settings = Settings::from_path(data_dir)?;
    log::init(Some(&settings.log_level)).context("Failed to initialize logging.")?;

    Ok(settings)
}

/// Parse an event type, failing with the list of valid types
fn parse_event_type(s: &str) -> Result<EventType> {
    match EventType::from_str(s) {
        Ok(event_type) => Ok(event_type),
        Err(_) => bail!(
            "Unknown event type '{}'. Valid types: {}",
            s,
            EventType::iter().map(|t| t.to_string()).join(", ")
        ),
    }
}

/// Handle the `train` command.
pub fn handle_train_command(data_dir: &Path, artifact_path: &Path) -> Result<()> {
    let settings = init_for_dataset(data_dir)?;
    let dataset = Dataset::from_path(data_dir).context("Failed to load dataset.")?;

    let (table, encoder) = assemble_training(&dataset, &settings.comparator)?;
    let (artifact, summary) = train(&table, encoder, &TrainerOptions::default())?;
    summary.log();
    artifact.save(artifact_path)?;

    Ok(())
}

/// Handle the `predict` command.
pub fn handle_predict_command(
    data_dir: &Path,
    artifact_path: &Path,
    event_type: &str,
    city: &str,
    duration: u32,
    attendance: Option<f64>,
) -> Result<()> {
    let _settings = init_for_dataset(data_dir)?;
    let event_type = parse_event_type(event_type)?;
    let dataset = Dataset::from_path(data_dir).context("Failed to load dataset.")?;
    let artifact = TrainedArtifact::load(artifact_path)?;

    let predictor = Predictor::new(artifact, dataset);
    let report = predictor.predict_simple(event_type, city, duration as f64, attendance)?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

/// Handle the `analyze` command.
pub fn handle_analyze_command(data_dir: &Path, event: Option<&str>) -> Result<()> {
    let settings = init_for_dataset(data_dir)?;
    let dataset = Dataset::from_path(data_dir).context("Failed to load dataset.")?;
    let analyzer = ImpactAnalyzer::new(&dataset).with_options(settings.comparator);

    let impacts = match event {
        Some(name) => vec![analyzer.analyze_event(name)?],
        None => dataset
            .events
            .keys()
            .map(|name| analyzer.analyze_event(name.borrow()))
            .collect::<Result<Vec<_>>>()?,
    };

    let output_dir = output::get_output_dir(data_dir)?;
    output::create_output_directory(&output_dir, settings.overwrite)?;
    output::write_impacts_to_csv(&output_dir, &impacts)?;
    output::write_city_summaries_to_csv(&output_dir, &analyzer.summarize_cities())?;
    println!(
        "Analyzed {} event(s); results written to {}",
        impacts.len(),
        output_dir.display()
    );

    Ok(())
}

/// Handle the `simulate` command.
pub fn handle_simulate_command(
    data_dir: &Path,
    event: &str,
    attendance_change: f64,
    price_elasticity: f64,
    spending_multiplier: f64,
) -> Result<()> {
    let _settings = init_for_dataset(data_dir)?;
    let dataset = Dataset::from_path(data_dir).context("Failed to load dataset.")?;
    let simulator = ScenarioSimulator::new(&dataset);

    let comparison = simulator.simulate_attendance_change(
        event,
        &ScenarioParams {
            attendance_change_pct: attendance_change,
            price_elasticity,
            spending_multiplier,
        },
    )?;
    println!("{}", serde_json::to_string_pretty(&comparison)?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_event_type() {
        assert_eq!(parse_event_type("music").unwrap(), EventType::Music);
        let error = parse_event_type("circus").unwrap_err().to_string();
        assert!(error.contains("Valid types:"));
        assert!(error.contains("sports"));
    }
}
