//! The module responsible for writing output data to disk.
use crate::analyzer::CityImpactSummary;
use crate::impact::EventImpact;
use crate::predictor::PredictionReport;
use anyhow::{Context, Result, ensure};
use std::fs;
use std::path::{Path, PathBuf};

/// The root folder in which dataset-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "evimpact_results";

/// The output file name for per-event impact records
const IMPACTS_FILE_NAME: &str = "event_impacts.csv";

/// The output file name for per-city summaries
const CITY_SUMMARY_FILE_NAME: &str = "city_summaries.csv";

/// The output file name for a prediction report
const PREDICTION_FILE_NAME: &str = "prediction.json";

/// Get the output directory for the dataset at the specified path
pub fn get_output_dir(data_dir: &Path) -> Result<PathBuf> {
    // Canonicalise in case the user has specified "."
    let data_dir = data_dir
        .canonicalize()
        .context("Could not resolve path to dataset")?;

    let dataset_name = data_dir
        .file_name()
        .context("Dataset cannot be in root folder")?
        .to_str()
        .context("Invalid chars in dataset dir name")?;

    Ok([OUTPUT_DIRECTORY_ROOT, dataset_name].iter().collect())
}

/// Create the output directory, if it does not exist already
pub fn create_output_directory(output_dir: &Path, overwrite: bool) -> Result<()> {
    if output_dir.is_dir() {
        ensure!(
            overwrite,
            "Output directory {} already exists (set overwrite = true in settings.toml to reuse it)",
            output_dir.display()
        );
        return Ok(());
    }

    fs::create_dir_all(output_dir)?;

    Ok(())
}

/// Write per-event impact records to the output CSV file
pub fn write_impacts_to_csv(output_dir: &Path, impacts: &[EventImpact]) -> Result<()> {
    let file_path = output_dir.join(IMPACTS_FILE_NAME);
    let mut writer = csv::Writer::from_path(&file_path)
        .with_context(|| format!("Could not create {}", file_path.display()))?;
    for impact in impacts {
        writer.serialize(impact)?;
    }
    writer.flush()?;

    Ok(())
}

/// Write per-city summaries to the output CSV file
pub fn write_city_summaries_to_csv(
    output_dir: &Path,
    summaries: &[CityImpactSummary],
) -> Result<()> {
    let file_path = output_dir.join(CITY_SUMMARY_FILE_NAME);
    let mut writer = csv::Writer::from_path(&file_path)
        .with_context(|| format!("Could not create {}", file_path.display()))?;
    for summary in summaries {
        writer.serialize(summary)?;
    }
    writer.flush()?;

    Ok(())
}

/// Write a prediction report to the output directory as pretty-printed JSON
pub fn write_prediction_to_json(output_dir: &Path, report: &PredictionReport) -> Result<()> {
    let file_path = output_dir.join(PREDICTION_FILE_NAME);
    let contents = serde_json::to_string_pretty(report)?;
    fs::write(&file_path, contents)
        .with_context(|| format!("Could not write {}", file_path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impact::EventImpact;
    use tempfile::tempdir;

    #[test]
    fn test_create_output_directory() {
        let dir = tempdir().unwrap();
        let output_dir = dir.path().join("results");
        create_output_directory(&output_dir, false).unwrap();
        assert!(output_dir.is_dir());

        // Existing directory requires overwrite
        assert!(create_output_directory(&output_dir, false).is_err());
        assert!(create_output_directory(&output_dir, true).is_ok());
    }

    #[test]
    fn test_write_impacts_to_csv() {
        let dir = tempdir().unwrap();
        let mut impact = EventImpact::new("event1".into(), "Lisbon".into());
        impact.total_economic_impact_usd = Some(1_000_000.0);
        write_impacts_to_csv(dir.path(), &[impact]).unwrap();

        let contents = fs::read_to_string(dir.path().join(IMPACTS_FILE_NAME)).unwrap();
        assert!(contents.starts_with("event,city,"));
        assert!(contents.contains("event1,Lisbon"));
    }
}
