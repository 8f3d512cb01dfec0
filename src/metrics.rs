// Classification metrics for the high-risk class.
use serde::{Deserialize, Serialize};

use crate::model::HIGH_RISK;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    /// None when only one class is present, where ROC AUC is undefined
    pub auc_roc: Option<f64>,
}

impl ClassificationMetrics {
    pub fn compute(labels: &[usize], predicted: &[usize], probabilities: &[f64]) -> Self {
        let mut tp = 0usize;
        let mut fp = 0usize;
        let mut fn_ = 0usize;
        let mut correct = 0usize;
        for (&actual, &guess) in labels.iter().zip(predicted) {
            if actual == guess {
                correct += 1;
            }
            match (actual == HIGH_RISK, guess == HIGH_RISK) {
                (true, true) => tp += 1,
                (false, true) => fp += 1,
                (true, false) => fn_ += 1,
                (false, false) => {}
            }
        }

        Self {
            accuracy: ratio(correct, labels.len()),
            precision: ratio(tp, tp + fp),
            recall: ratio(tp, tp + fn_),
            auc_roc: auc_roc(labels, probabilities),
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

// Mann-Whitney formulation: probability that a random positive outranks a random negative,
// ties counted as half, using average ranks.
fn auc_roc(labels: &[usize], scores: &[f64]) -> Option<f64> {
    let positives = labels.iter().filter(|&&l| l == HIGH_RISK).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut positive_rank_sum = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // ranks are 1-based; tied block i..=j shares the average rank
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            if labels[idx] == HIGH_RISK {
                positive_rank_sum += avg_rank;
            }
        }
        i = j + 1;
    }

    let p = positives as f64;
    let n = negatives as f64;
    Some((positive_rank_sum - p * (p + 1.0) / 2.0) / (p * n))
}
