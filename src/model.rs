// Logistic-regression risk model: fitting through linfa, scoring with the extracted coefficients.
use linfa::traits::Fit;
use linfa::Dataset;
use linfa_logistic::LogisticRegression;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::TrainingConfig;
use crate::error::{ConvergenceWarning, Result, RiskError};

pub const HIGH_RISK: usize = 1;
pub const LOW_RISK: usize = 0;

/// Fitted coefficients oriented so that `sigmoid(w·x + b)` is the probability
/// of the high-risk class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskModel {
    pub weights: Vec<f64>,
    pub intercept: f64,
    pub decision_threshold: f64,
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl RiskModel {
    pub fn n_features(&self) -> usize {
        self.weights.len()
    }

    fn decision(&self, row: ArrayView1<f64>) -> f64 {
        row.iter().zip(&self.weights).map(|(x, w)| x * w).sum::<f64>() + self.intercept
    }

    /// Probability of the high-risk class for every row of scaled features.
    pub fn predict_proba(&self, features: &Array2<f64>) -> Result<Array1<f64>> {
        if features.ncols() != self.n_features() {
            return Err(RiskError::Schema(format!(
                "model expects {} columns, got {}",
                self.n_features(),
                features.ncols()
            )));
        }
        Ok(features.rows().into_iter().map(|row| sigmoid(self.decision(row))).collect())
    }

    /// Class labels: high risk iff probability >= decision threshold.
    pub fn predict(&self, features: &Array2<f64>) -> Result<Array1<usize>> {
        Ok(self.predict_proba(features)?.mapv(|p| self.label_for(p)))
    }

    pub fn label_for(&self, probability: f64) -> usize {
        if probability >= self.decision_threshold {
            HIGH_RISK
        } else {
            LOW_RISK
        }
    }
}

// Gradient norm of the penalized log-loss
//   sum_i log(1 + exp(-y_i (w·x_i + b))) + alpha/2 |w|^2,  y_i in {-1, +1}
// at the fitted parameters. The intercept is not penalized.
fn gradient_norm(model: &RiskModel, x: ArrayView2<f64>, y: ArrayView1<usize>, alpha: f64) -> f64 {
    let mut grad_w = Array1::from(model.weights.clone()) * alpha;
    let mut grad_b = 0.0;
    for (row, &label) in x.rows().into_iter().zip(y.iter()) {
        let sign = if label == HIGH_RISK { 1.0 } else { -1.0 };
        let coeff = -sign * sigmoid(-sign * model.decision(row));
        grad_w.scaled_add(coeff, &row);
        grad_b += coeff;
    }
    (grad_w.dot(&grad_w) + grad_b * grad_b).sqrt()
}

/// Fit a model on scaled features and binary labels.
///
/// Returns the model plus a convergence warning when the solver stopped with
/// the gradient still above tolerance.
pub fn fit(
    features: &Array2<f64>,
    labels: &Array1<usize>,
    config: &TrainingConfig,
    decision_threshold: f64,
) -> Result<(RiskModel, Option<ConvergenceWarning>)> {
    let positives = labels.iter().filter(|&&l| l == HIGH_RISK).count();
    if positives == 0 || positives == labels.len() {
        return Err(RiskError::Data(format!(
            "training labels contain a single class ({} of {} high risk)",
            positives,
            labels.len()
        )));
    }

    let dataset = Dataset::new(features.clone(), labels.clone());
    let fitted = LogisticRegression::default()
        .alpha(config.l2_penalty)
        .max_iterations(config.max_iterations)
        .gradient_tolerance(config.gradient_tolerance)
        .fit(&dataset)
        .map_err(|e| RiskError::Training(e.to_string()))?;

    // linfa picks its own positive class; flip the coefficients if it is not the high-risk one
    let orientation = if fitted.labels().pos.class == HIGH_RISK { 1.0 } else { -1.0 };
    let model = RiskModel {
        weights: fitted.params().iter().map(|w| w * orientation).collect(),
        intercept: fitted.intercept() * orientation,
        decision_threshold,
    };

    let norm = gradient_norm(&model, features.view(), labels.view(), config.l2_penalty);
    debug!(gradient_norm = norm, tolerance = config.gradient_tolerance, "Logistic regression fitted");
    let warning = (norm > config.gradient_tolerance).then(|| ConvergenceWarning {
        gradient_norm: norm,
        tolerance: config.gradient_tolerance,
        max_iterations: config.max_iterations,
    });
    if let Some(w) = &warning {
        warn!("{}", w);
    }

    Ok((model, warning))
}
