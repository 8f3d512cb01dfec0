// Configuration for training and scoring.
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// CSV file with the historical transactions and their risk score
    pub reference_path: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            reference_path: "data/Big_Black_Money_Dataset.csv".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    /// Directory holding fraud_model.json, scaler.json and schema.json
    pub model_dir: String,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            model_dir: "model".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Risk scores at or above this value are labelled high risk
    pub high_risk_score: f64,
    pub test_fraction: f64,
    pub seed: u64,
    /// Inverse of the regularization strength C
    pub l2_penalty: f64,
    pub max_iterations: u64,
    pub gradient_tolerance: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            high_risk_score: 7.0,
            test_fraction: 0.2,
            seed: 42,
            l2_penalty: 1.0,
            max_iterations: 100,
            gradient_tolerance: 1e-4,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Probability at or above which a transaction is labelled high risk
    pub decision_threshold: f64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            decision_threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path, falling back to defaults
    pub fn load() -> Result<Self> {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific path. The file is optional and
    /// `AML_`-prefixed environment variables override it, e.g.
    /// `AML_TRAINING__SEED=7`.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(Environment::with_prefix("AML").prefix_separator("_").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let fraction = self.training.test_fraction;
        if !(fraction > 0.0 && fraction < 1.0) {
            anyhow::bail!("training.test_fraction must be in (0, 1), got {}", fraction);
        }
        let threshold = self.inference.decision_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            anyhow::bail!("inference.decision_threshold must be in [0, 1], got {}", threshold);
        }
        if self.training.l2_penalty < 0.0 {
            anyhow::bail!("training.l2_penalty must not be negative");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.training.seed, 42);
        assert_eq!(config.training.test_fraction, 0.2);
        assert_eq!(config.training.high_risk_score, 7.0);
        assert_eq!(config.inference.decision_threshold, 0.5);
        assert_eq!(config.artifacts.model_dir, "model");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from_path(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.training.max_iterations, 100);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_file_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[training]\nhigh_risk_score = 5.0\n\n[inference]\ndecision_threshold = 0.7").unwrap();

        let config = AppConfig::load_from_path(&path).unwrap();
        assert_eq!(config.training.high_risk_score, 5.0);
        assert_eq!(config.training.seed, 42);
        assert_eq!(config.inference.decision_threshold, 0.7);
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[inference]\ndecision_threshold = 1.5\n").unwrap();
        assert!(AppConfig::load_from_path(&path).is_err());
    }

    #[test]
    fn test_environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[artifacts]\nmodel_dir = \"from_file\"\n").unwrap();

        // only this test touches artifacts.model_dir through the environment
        std::env::set_var("AML_ARTIFACTS__MODEL_DIR", "from_env");
        let config = AppConfig::load_from_path(&path);
        std::env::remove_var("AML_ARTIFACTS__MODEL_DIR");

        assert_eq!(config.unwrap().artifacts.model_dir, "from_env");
    }
}
