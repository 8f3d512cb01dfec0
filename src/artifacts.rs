// Persisted artifacts: `fraud_model`, `scaler` and `schema`, one JSON file
// each inside the model directory.
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use crate::encoder::Schema;
use crate::error::{Result, RiskError};
use crate::model::RiskModel;
use crate::scaler::StandardScaler;

pub const MODEL_ARTIFACT: &str = "fraud_model";
pub const SCALER_ARTIFACT: &str = "scaler";
pub const SCHEMA_ARTIFACT: &str = "schema";

pub fn artifact_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.json", name))
}

fn write_artifact<T: Serialize>(dir: &Path, name: &str, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(artifact_path(dir, name), json)?;
    Ok(())
}

fn read_artifact<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<T> {
    let path = artifact_path(dir, name);
    let raw = fs::read_to_string(&path)
        .map_err(|e| RiskError::ArtifactLoad(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&raw).map_err(|e| RiskError::ArtifactLoad(format!("{}: {}", path.display(), e)))
}

pub fn save(dir: &Path, schema: &Schema, scaler: &StandardScaler, model: &RiskModel) -> Result<()> {
    fs::create_dir_all(dir)?;
    write_artifact(dir, SCHEMA_ARTIFACT, schema)?;
    write_artifact(dir, SCALER_ARTIFACT, scaler)?;
    write_artifact(dir, MODEL_ARTIFACT, model)?;
    info!(dir = %dir.display(), columns = schema.width(), "Saved model artifacts");
    Ok(())
}

/// Load all three artifacts and check they agree on the column layout.
pub fn load(dir: &Path) -> Result<(Schema, StandardScaler, RiskModel)> {
    let schema: Schema = read_artifact(dir, SCHEMA_ARTIFACT)?;
    let scaler: StandardScaler = read_artifact(dir, SCALER_ARTIFACT)?;
    let model: RiskModel = read_artifact(dir, MODEL_ARTIFACT)?;

    schema.validate()?;
    if scaler.scales.len() != scaler.means.len() {
        return Err(RiskError::ArtifactLoad(format!(
            "scaler has {} means but {} scales",
            scaler.means.len(),
            scaler.scales.len()
        )));
    }
    if scaler.n_features() != schema.width() || model.n_features() != schema.width() {
        return Err(RiskError::ArtifactLoad(format!(
            "column mismatch: schema {}, scaler {}, model {}",
            schema.width(),
            scaler.n_features(),
            model.n_features()
        )));
    }

    info!(dir = %dir.display(), columns = schema.width(), "Loaded model artifacts");
    Ok((schema, scaler, model))
}
