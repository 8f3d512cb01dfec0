// Per-column standardization: zero mean, unit (population) variance.
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub means: Vec<f64>,
    pub scales: Vec<f64>,
}

impl StandardScaler {
    // Fit mean and standard deviation of every column of `features`.
    // Constant columns keep a scale of 1.0 so they map to zero rather than NaN.
    pub fn fit(features: &Array2<f64>) -> Result<Self> {
        if features.nrows() == 0 {
            return Err(RiskError::Data("cannot fit a scaler on an empty matrix".to_string()));
        }

        let n = features.nrows() as f64;
        let mut means = Vec::with_capacity(features.ncols());
        let mut scales = Vec::with_capacity(features.ncols());
        for column in features.axis_iter(Axis(1)) {
            let mean = column.sum() / n;
            let variance = column.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
            let std_dev = variance.sqrt();
            means.push(mean);
            scales.push(if std_dev > 0.0 { std_dev } else { 1.0 });
        }

        Ok(Self { means, scales })
    }

    pub fn n_features(&self) -> usize {
        self.means.len()
    }

    pub fn transform(&self, features: &Array2<f64>) -> Result<Array2<f64>> {
        if features.ncols() != self.n_features() {
            return Err(RiskError::Schema(format!(
                "scaler expects {} columns, got {}",
                self.n_features(),
                features.ncols()
            )));
        }

        let means = Array1::from(self.means.clone());
        let scales = Array1::from(self.scales.clone());
        Ok((features - &means) / &scales)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fit_population_statistics() {
        let x = array![[1.0, 10.0], [3.0, 10.0]];
        let scaler = StandardScaler::fit(&x).unwrap();
        assert_eq!(scaler.means, vec![2.0, 10.0]);
        assert_eq!(scaler.scales, vec![1.0, 1.0]);
    }

    #[test]
    fn test_transform_standardizes_columns() {
        let x = array![[0.0, 1.0], [4.0, 1.0], [8.0, 1.0]];
        let scaler = StandardScaler::fit(&x).unwrap();
        let scaled = scaler.transform(&x).unwrap();

        for column in scaled.axis_iter(Axis(1)) {
            let mean = column.sum() / 3.0;
            assert!(mean.abs() < 1e-12, "Scaled column should be centered");
        }
        let first = scaled.column(0);
        let variance = first.iter().map(|v| v * v).sum::<f64>() / 3.0;
        assert!((variance - 1.0).abs() < 1e-12, "Scaled column should have unit variance");
        assert!(scaled.column(1).iter().all(|v| *v == 0.0), "Constant column should map to zero");
    }

    #[test]
    fn test_transform_rejects_wrong_width() {
        let scaler = StandardScaler::fit(&array![[1.0, 2.0]]).unwrap();
        let result = scaler.transform(&array![[1.0, 2.0, 3.0]]);
        assert!(matches!(result, Err(RiskError::Schema(_))));
    }

    #[test]
    fn test_empty_matrix_rejected() {
        let x = Array2::<f64>::zeros((0, 3));
        assert!(StandardScaler::fit(&x).is_err());
    }
}
