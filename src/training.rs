// Offline training: encode the reference dataset, standardize, split, fit and evaluate.
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::info;

use crate::config::AppConfig;
use crate::csv_reader::ReferenceDataset;
use crate::encoder::Schema;
use crate::error::{ConvergenceWarning, Result, RiskError};
use crate::metrics::ClassificationMetrics;
use crate::model::{self, RiskModel, HIGH_RISK, LOW_RISK};
use crate::scaler::StandardScaler;

#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub high_risk_rate: f64,
    pub train_metrics: ClassificationMetrics,
    pub test_metrics: ClassificationMetrics,
    /// Set when the solver stopped before reaching the gradient tolerance
    pub convergence_warning: Option<ConvergenceWarning>,
}

/// Everything training produces: the artifacts inference needs plus the evaluation report.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub schema: Schema,
    pub scaler: StandardScaler,
    pub model: RiskModel,
    pub report: TrainingReport,
}

// Risk scores at or above the threshold count as high risk
pub fn binarize_scores(scores: &[f64], high_risk_score: f64) -> Array1<usize> {
    scores
        .iter()
        .map(|&s| if s >= high_risk_score { HIGH_RISK } else { LOW_RISK })
        .collect()
}

// Shuffle row indices with a seeded RNG and cut off ceil(n * test_fraction) rows for testing.
// Returns (train, test) indices.
pub fn split_indices(n_rows: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n_rows).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = ((n_rows as f64) * test_fraction).ceil() as usize;
    let n_test = n_test.min(n_rows);
    let train = indices.split_off(n_test);
    (train, indices)
}

fn evaluate(model: &RiskModel, features: &Array2<f64>, labels: &Array1<usize>) -> Result<ClassificationMetrics> {
    let probabilities = model.predict_proba(features)?;
    let predicted = probabilities.mapv(|p| model.label_for(p));
    Ok(ClassificationMetrics::compute(
        &labels.to_vec(),
        &predicted.to_vec(),
        &probabilities.to_vec(),
    ))
}

/// Train a model, scaler and schema from the reference dataset.
pub fn train(reference: &ReferenceDataset, config: &AppConfig) -> Result<TrainedModel> {
    let training = &config.training;
    if reference.len() < 2 {
        return Err(RiskError::Data(format!(
            "need at least 2 reference rows to train, got {}",
            reference.len()
        )));
    }

    let schema = Schema::from_reference(reference);
    let encoded = schema.encode(reference.records());
    let labels = binarize_scores(reference.risk_scores(), training.high_risk_score);
    let high_risk = labels.iter().filter(|&&l| l == HIGH_RISK).count();
    info!(
        rows = reference.len(),
        columns = schema.width(),
        high_risk,
        threshold = training.high_risk_score,
        "Encoded reference dataset"
    );

    // scaler sees the whole matrix, before the split
    let scaler = StandardScaler::fit(&encoded.features)?;
    let scaled = scaler.transform(&encoded.features)?;

    let (train_idx, test_idx) = split_indices(reference.len(), training.test_fraction, training.seed);
    if train_idx.is_empty() {
        return Err(RiskError::Data("training partition is empty".to_string()));
    }
    let x_train = scaled.select(Axis(0), &train_idx);
    let y_train = labels.select(Axis(0), &train_idx);
    let x_test = scaled.select(Axis(0), &test_idx);
    let y_test = labels.select(Axis(0), &test_idx);

    let (model, convergence_warning) =
        model::fit(&x_train, &y_train, training, config.inference.decision_threshold)?;

    let train_metrics = evaluate(&model, &x_train, &y_train)?;
    let test_metrics = evaluate(&model, &x_test, &y_test)?;
    info!(
        train_accuracy = train_metrics.accuracy,
        test_accuracy = test_metrics.accuracy,
        converged = convergence_warning.is_none(),
        "Training finished"
    );

    let report = TrainingReport {
        rows: reference.len(),
        train_rows: train_idx.len(),
        test_rows: test_idx.len(),
        high_risk_rate: high_risk as f64 / reference.len() as f64,
        train_metrics,
        test_metrics,
        convergence_warning,
    };

    Ok(TrainedModel { schema, scaler, model, report })
}
