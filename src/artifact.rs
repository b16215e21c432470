//! The persisted model artifact: everything inference needs, saved and
//! loaded as one unit.
//!
//! Partial loads are not supported: a missing or corrupt artifact is a hard
//! failure for the predictor, never a degrade-gracefully case.
use crate::features::LabelEncoder;
use crate::regression::{Algorithm, Regressor, StandardScaler};
use crate::trainer::ModelMetrics;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use log::info;
use std::fs;
use std::io::Write;
use std::path::Path;

/// A fitted, immutable model artifact.
///
/// Created by the trainer, serialized to disk, reconstructed read-only by
/// the predictor. Retraining always produces a new artifact rather than
/// mutating one in place.
#[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrainedArtifact {
    /// The canonical algorithm selected at training time
    pub best: Algorithm,
    /// The full fitted roster, kept for inspection and debugging
    pub models: IndexMap<Algorithm, Regressor>,
    /// Feature scaler fitted on the training split
    pub scaler: StandardScaler,
    /// The event-type encoder fitted at training time
    pub event_type_encoder: LabelEncoder,
    /// The canonical feature columns, in training order. Every inference
    /// vector must follow this list exactly.
    pub feature_columns: Vec<String>,
    /// Per-algorithm evaluation results
    pub metrics: IndexMap<Algorithm, ModelMetrics>,
    /// When the artifact was trained (RFC 3339)
    pub trained_at: String,
}

impl TrainedArtifact {
    /// Assemble an artifact from a finished training run, stamped with the
    /// current time
    pub fn new(
        best: Algorithm,
        models: IndexMap<Algorithm, Regressor>,
        scaler: StandardScaler,
        event_type_encoder: LabelEncoder,
        feature_columns: Vec<String>,
        metrics: IndexMap<Algorithm, ModelMetrics>,
    ) -> Self {
        Self {
            best,
            models,
            scaler,
            event_type_encoder,
            feature_columns,
            metrics,
            trained_at: chrono::Local::now().to_rfc3339(),
        }
    }

    /// The canonical fitted model
    pub fn best_model(&self) -> &Regressor {
        &self.models[&self.best]
    }

    /// Evaluation results for the canonical model
    pub fn best_metrics(&self) -> &ModelMetrics {
        &self.metrics[&self.best]
    }

    /// Write the artifact to `file_path` as one JSON blob.
    ///
    /// The write goes through a temporary file in the same directory and a
    /// final rename, so concurrent writers cannot interleave partial
    /// artifacts (last writer wins).
    pub fn save(&self, file_path: &Path) -> Result<()> {
        let dir = file_path.parent().filter(|p| !p.as_os_str().is_empty());
        if let Some(dir) = dir {
            fs::create_dir_all(dir)
                .with_context(|| format!("Could not create {}", dir.display()))?;
        }

        let mut file = tempfile::NamedTempFile::new_in(dir.unwrap_or(Path::new(".")))
            .context("Could not create temporary artifact file")?;
        serde_json::to_writer(&mut file, self).context("Could not serialize artifact")?;
        file.flush()?;
        file.persist(file_path)
            .with_context(|| format!("Could not write {}", file_path.display()))?;

        info!("Model artifact saved to {}", file_path.display());

        Ok(())
    }

    /// Reconstruct an artifact from `file_path`
    pub fn load(file_path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(file_path)
            .with_context(|| format!("Could not read model artifact {}", file_path.display()))?;
        let artifact: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Corrupt model artifact {}", file_path.display()))?;

        info!(
            "Model artifact loaded from {} (best: {}, trained at {})",
            file_path.display(),
            artifact.best,
            artifact.trained_at
        );

        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparator::ComparatorOptions;
    use crate::dataset::Dataset;
    use crate::features::assemble_training;
    use crate::fixture::dataset;
    use crate::trainer::{TrainerOptions, train};
    use rstest::rstest;
    use std::io::Write as _;
    use tempfile::tempdir;

    #[rstest]
    fn test_save_load_round_trip(dataset: Dataset) {
        let (table, encoder) = assemble_training(&dataset, &ComparatorOptions::default()).unwrap();
        let (artifact, _) = train(&table, encoder, &TrainerOptions::default()).unwrap();

        let dir = tempdir().unwrap();
        let path = dir.path().join("impact_model.json");
        artifact.save(&path).unwrap();

        let reloaded = TrainedArtifact::load(&path).unwrap();
        assert_eq!(artifact, reloaded);
        assert_eq!(reloaded.feature_columns, table.columns);
    }

    #[test]
    fn test_load_missing_artifact_fails() {
        let dir = tempdir().unwrap();
        assert!(TrainedArtifact::load(&dir.path().join("nope.json")).is_err());
    }

    #[test]
    fn test_load_corrupt_artifact_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("impact_model.json");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "{{\"best\": \"linear_regression\"").unwrap(); // truncated
        assert!(TrainedArtifact::load(&path).is_err());
    }

    #[rstest]
    fn test_save_overwrites_previous(dataset: Dataset) {
        let (table, encoder) = assemble_training(&dataset, &ComparatorOptions::default()).unwrap();
        let (artifact, _) = train(&table, encoder, &TrainerOptions::default()).unwrap();

        let dir = tempdir().unwrap();
        let path = dir.path().join("impact_model.json");
        artifact.save(&path).unwrap();
        artifact.save(&path).unwrap(); // last writer wins, no error
        assert!(TrainedArtifact::load(&path).is_ok());
    }
}
