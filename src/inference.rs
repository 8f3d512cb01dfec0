// Scoring single transactions and batches against loaded artifacts.
use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};

use crate::artifacts;
use crate::csv_reader::TransactionRecord;
use crate::encoder::Schema;
use crate::error::Result;
use crate::model::{RiskModel, HIGH_RISK};
use crate::scaler::StandardScaler;
use crate::training::TrainedModel;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    /// 1 = high risk (suspicious), 0 = low risk (safe)
    pub label: usize,
    /// Probability of the high-risk class
    pub probability: f64,
}

/// Read-only scoring state, built once per process.
#[derive(Debug, Clone)]
pub struct RiskContext {
    pub schema: Schema,
    pub scaler: StandardScaler,
    pub model: RiskModel,
}

impl RiskContext {
    pub fn new(schema: Schema, scaler: StandardScaler, model: RiskModel) -> Self {
        Self { schema, scaler, model }
    }

    /// Load the persisted artifacts or fail with an artifact error.
    pub fn load(dir: &Path) -> Result<Self> {
        let (schema, scaler, model) = artifacts::load(dir)?;
        Ok(Self::new(schema, scaler, model))
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        artifacts::save(dir, &self.schema, &self.scaler, &self.model)
    }

    pub fn with_decision_threshold(mut self, threshold: f64) -> Self {
        self.model.decision_threshold = threshold;
        self
    }
}

impl From<TrainedModel> for RiskContext {
    fn from(trained: TrainedModel) -> Self {
        Self::new(trained.schema, trained.scaler, trained.model)
    }
}

pub fn predict_one(record: &TransactionRecord, ctx: &RiskContext) -> Result<Prediction> {
    let mut results = predict_batch(std::slice::from_ref(record), ctx)?;
    // predict_batch returns exactly one result per record
    Ok(results.remove(0))
}

/// Score every record, returning one prediction per record in input order.
pub fn predict_batch(records: &[TransactionRecord], ctx: &RiskContext) -> Result<Vec<Prediction>> {
    for (i, record) in records.iter().enumerate() {
        record.validate(i + 1)?;
    }
    if records.is_empty() {
        return Ok(Vec::new());
    }

    let encoded = ctx.schema.encode(records);
    if encoded.unseen_categories > 0 {
        warn!(
            records = records.len(),
            unseen = encoded.unseen_categories,
            "Some category values are unknown to the model and were dropped"
        );
    }
    let scaled = ctx.scaler.transform(&encoded.features)?;
    let probabilities = ctx.model.predict_proba(&scaled)?;
    debug!(records = records.len(), "Scored batch");

    Ok(probabilities
        .iter()
        .map(|&probability| Prediction {
            label: ctx.model.label_for(probability),
            probability,
        })
        .collect())
}

/// Counts of safe and suspicious predictions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PredictionSummary {
    pub safe: usize,
    pub suspicious: usize,
}

impl PredictionSummary {
    pub fn total(&self) -> usize {
        self.safe + self.suspicious
    }

    pub fn suspicious_rate(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            self.suspicious as f64 / self.total() as f64
        }
    }
}

pub fn summarize(predictions: &[Prediction]) -> PredictionSummary {
    predictions.iter().fold(PredictionSummary::default(), |mut acc, p| {
        if p.label == HIGH_RISK {
            acc.suspicious += 1;
        } else {
            acc.safe += 1;
        }
        acc
    })
}
