// Reading and writing the transaction CSV files: the labelled reference dataset used for training,
// and the unlabelled batches submitted for scoring.
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use csv::{StringRecord, Writer};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, RiskError};
use crate::inference::Prediction;

pub const TRANSACTION_TYPE_COLUMN: &str = "Transaction Type";
pub const AMOUNT_COLUMN: &str = "Amount (USD)";
pub const COUNTRY_COLUMN: &str = "Country";
pub const RISK_SCORE_COLUMN: &str = "Money Laundering Risk Score";

const FEATURE_COLUMNS: [&str; 3] = [TRANSACTION_TYPE_COLUMN, AMOUNT_COLUMN, COUNTRY_COLUMN];

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TransactionRecord {
    #[serde(rename = "Transaction Type")]
    pub transaction_type: String,
    #[serde(rename = "Amount (USD)")]
    pub amount_usd: f64,
    #[serde(rename = "Country")]
    pub country: String,
}

impl TransactionRecord {
    pub fn new(transaction_type: impl Into<String>, amount_usd: f64, country: impl Into<String>) -> Self {
        Self {
            transaction_type: transaction_type.into(),
            amount_usd,
            country: country.into(),
        }
    }

    // Amounts must be finite and non-negative; `row` is only used for the message
    pub(crate) fn validate(&self, row: usize) -> Result<()> {
        if !self.amount_usd.is_finite() || self.amount_usd < 0.0 {
            return Err(RiskError::Data(format!(
                "row {}: {} must be a non-negative number, got {}",
                row, AMOUNT_COLUMN, self.amount_usd
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ReferenceRow {
    #[serde(rename = "Transaction Type")]
    transaction_type: String,
    #[serde(rename = "Amount (USD)")]
    amount_usd: f64,
    #[serde(rename = "Country")]
    country: String,
    #[serde(rename = "Money Laundering Risk Score")]
    risk_score: f64,
}

/// Historical transactions with their money-laundering risk score, in file order.
/// Only built through `new`, so records and scores always line up.
#[derive(Debug, Clone, Default)]
pub struct ReferenceDataset {
    records: Vec<TransactionRecord>,
    risk_scores: Vec<f64>,
}

impl ReferenceDataset {
    pub fn new(records: Vec<TransactionRecord>, risk_scores: Vec<f64>) -> Result<Self> {
        if records.len() != risk_scores.len() {
            return Err(RiskError::Data(format!(
                "{} records but {} risk scores",
                records.len(),
                risk_scores.len()
            )));
        }
        for (i, record) in records.iter().enumerate() {
            record.validate(i + 1)?;
        }
        if let Some(i) = risk_scores.iter().position(|s| !s.is_finite()) {
            return Err(RiskError::Data(format!("row {}: {} is not a finite number", i + 1, RISK_SCORE_COLUMN)));
        }
        Ok(Self { records, risk_scores })
    }

    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    pub fn risk_scores(&self) -> &[f64] {
        &self.risk_scores
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A scoring batch as uploaded: the parsed records plus the raw rows, so the
/// export can reproduce every original column.
#[derive(Debug, Clone)]
pub struct TransactionBatch {
    pub headers: StringRecord,
    pub rows: Vec<StringRecord>,
    pub records: Vec<TransactionRecord>,
}

fn require_columns(headers: &StringRecord, required: &[&str]) -> Result<()> {
    for column in required {
        if !headers.iter().any(|h| h.trim() == *column) {
            return Err(RiskError::Schema(format!("missing required column '{}'", column)));
        }
    }
    Ok(())
}

// csv reports bad cells as deserialize errors; those are data problems, not IO
fn row_error(err: csv::Error) -> RiskError {
    match err.kind() {
        csv::ErrorKind::Deserialize { .. } | csv::ErrorKind::UnequalLengths { .. } => {
            RiskError::Data(err.to_string())
        }
        _ => RiskError::Csv(err),
    }
}

fn trimmed_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader)
}

pub fn read_reference_dataset<P: AsRef<Path>>(path: P) -> Result<ReferenceDataset> {
    let file = File::open(path.as_ref())?;
    let dataset = reference_from_reader(file)?;
    debug!(path = %path.as_ref().display(), rows = dataset.len(), "Loaded reference dataset");
    Ok(dataset)
}

pub fn reference_from_reader<R: Read>(reader: R) -> Result<ReferenceDataset> {
    let mut rdr = trimmed_reader(reader);
    let headers = rdr.headers()?.clone();
    require_columns(&headers, &FEATURE_COLUMNS)?;
    require_columns(&headers, &[RISK_SCORE_COLUMN])?;

    let mut records = Vec::new();
    let mut risk_scores = Vec::new();
    for row in rdr.deserialize::<ReferenceRow>() {
        let row = row.map_err(row_error)?;
        records.push(TransactionRecord {
            transaction_type: row.transaction_type,
            amount_usd: row.amount_usd,
            country: row.country,
        });
        risk_scores.push(row.risk_score);
    }

    ReferenceDataset::new(records, risk_scores)
}

pub fn read_transactions<P: AsRef<Path>>(path: P) -> Result<TransactionBatch> {
    let file = File::open(path.as_ref())?;
    transactions_from_reader(file)
}

pub fn transactions_from_reader<R: Read>(reader: R) -> Result<TransactionBatch> {
    let mut rdr = trimmed_reader(reader);
    let headers = rdr.headers()?.clone();
    require_columns(&headers, &FEATURE_COLUMNS)?;

    let mut rows = Vec::new();
    let mut records = Vec::new();
    for (i, row) in rdr.records().enumerate() {
        let row = row.map_err(row_error)?;
        let record: TransactionRecord = row.deserialize(Some(&headers)).map_err(row_error)?;
        record.validate(i + 1)?;
        records.push(record);
        rows.push(row);
    }

    Ok(TransactionBatch { headers, rows, records })
}

// Writes the uploaded rows back out with two extra columns: the predicted label and its probability
pub fn write_predictions<W: Write>(writer: W, batch: &TransactionBatch, predictions: &[Prediction]) -> Result<()> {
    if batch.rows.len() != predictions.len() {
        return Err(RiskError::Data(format!(
            "{} rows but {} predictions",
            batch.rows.len(),
            predictions.len()
        )));
    }

    let mut wtr = Writer::from_writer(writer);
    let mut headers = batch.headers.clone();
    headers.push_field("Prediction");
    headers.push_field("Probability");
    wtr.write_record(&headers)?;

    for (row, prediction) in batch.rows.iter().zip(predictions) {
        let mut out = row.clone();
        out.push_field(&prediction.label.to_string());
        out.push_field(&format!("{:.6}", prediction.probability));
        wtr.write_record(&out)?;
    }
    wtr.flush()?;
    Ok(())
}
