// One-hot feature encoding against a fixed column schema.
// Column order follows the usual "dummies" layout: numeric columns first,
// then one indicator block per categorical field (transaction type, then
// country), each block sorted by category value. Category values never seen
// in the reference data have no column, so they encode as an all-zero block.
use std::collections::BTreeSet;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::csv_reader::{
    ReferenceDataset, TransactionRecord, AMOUNT_COLUMN, COUNTRY_COLUMN, TRANSACTION_TYPE_COLUMN,
};
use crate::error::{Result, RiskError};

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoricalField {
    TransactionType,
    Country,
}

impl CategoricalField {
    pub fn column(self) -> &'static str {
        match self {
            CategoricalField::TransactionType => TRANSACTION_TYPE_COLUMN,
            CategoricalField::Country => COUNTRY_COLUMN,
        }
    }

    fn value(self, record: &TransactionRecord) -> &str {
        match self {
            CategoricalField::TransactionType => record.transaction_type.trim(),
            CategoricalField::Country => record.country.trim(),
        }
    }
}

/// Canonical feature layout derived once from the reference dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub version: u32,
    pub transaction_types: Vec<String>,
    pub countries: Vec<String>,
}

/// Encoded matrix plus how many categorical values had no known column.
#[derive(Debug, Clone)]
pub struct Encoded {
    pub features: Array2<f64>,
    pub unseen_categories: usize,
}

fn distinct_sorted<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(String::from)
        .collect()
}

impl Schema {
    pub fn from_reference(reference: &ReferenceDataset) -> Self {
        Self {
            version: SCHEMA_VERSION,
            transaction_types: distinct_sorted(reference.records().iter().map(|r| r.transaction_type.as_str())),
            countries: distinct_sorted(reference.records().iter().map(|r| r.country.as_str())),
        }
    }

    pub fn categories(&self, field: CategoricalField) -> &[String] {
        match field {
            CategoricalField::TransactionType => &self.transaction_types,
            CategoricalField::Country => &self.countries,
        }
    }

    /// Number of encoded columns.
    pub fn width(&self) -> usize {
        1 + self.transaction_types.len() + self.countries.len()
    }

    /// Column names in encoded order, e.g. `Amount (USD)`, `Transaction Type_Transfer`, `Country_USA`.
    pub fn column_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.width());
        names.push(AMOUNT_COLUMN.to_string());
        for field in [CategoricalField::TransactionType, CategoricalField::Country] {
            for value in self.categories(field) {
                names.push(format!("{}_{}", field.column(), value));
            }
        }
        names
    }

    // Position of the indicator column for `value`, if the value is known
    fn indicator_index(&self, field: CategoricalField, value: &str) -> Option<usize> {
        let offset = match field {
            CategoricalField::TransactionType => 1,
            CategoricalField::Country => 1 + self.transaction_types.len(),
        };
        self.categories(field)
            .binary_search_by(|known| known.as_str().cmp(value))
            .ok()
            .map(|i| offset + i)
    }

    /// Encode records into a `records.len() x self.width()` matrix.
    pub fn encode(&self, records: &[TransactionRecord]) -> Encoded {
        let mut features = Array2::zeros((records.len(), self.width()));
        let mut unseen_categories = 0;

        for (row, record) in records.iter().enumerate() {
            features[[row, 0]] = record.amount_usd;
            for field in [CategoricalField::TransactionType, CategoricalField::Country] {
                let value = field.value(record);
                if value.is_empty() {
                    continue;
                }
                match self.indicator_index(field, value) {
                    Some(col) => features[[row, col]] = 1.0,
                    None => {
                        unseen_categories += 1;
                        debug!(row, column = field.column(), value, "Unseen category encoded as all-zero indicators");
                    }
                }
            }
        }

        Encoded { features, unseen_categories }
    }

    // A loaded schema must have a known version and strictly ascending category lists,
    // since indicator lookup is a binary search over them.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.version != SCHEMA_VERSION {
            return Err(RiskError::ArtifactLoad(format!(
                "schema version {} is not supported (expected {})",
                self.version, SCHEMA_VERSION
            )));
        }
        for field in [CategoricalField::TransactionType, CategoricalField::Country] {
            let values = self.categories(field);
            if let Some(pair) = values.windows(2).find(|w| w[0] >= w[1]) {
                return Err(RiskError::ArtifactLoad(format!(
                    "schema categories for '{}' are not sorted and unique at '{}', '{}'",
                    field.column(),
                    pair[0],
                    pair[1]
                )));
            }
            if values.iter().any(|v| v.is_empty() || v.trim() != v) {
                return Err(RiskError::ArtifactLoad(format!(
                    "schema categories for '{}' contain an empty or untrimmed value",
                    field.column()
                )));
            }
        }
        Ok(())
    }
}

/// Encode `records` against the columns present in `reference`.
pub fn encode(records: &[TransactionRecord], reference: &ReferenceDataset) -> Encoded {
    Schema::from_reference(reference).encode(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> ReferenceDataset {
        ReferenceDataset::new(
            vec![
                TransactionRecord::new("Transfer", 100.0, "USA"),
                TransactionRecord::new("Cash Withdrawal", 2500.0, "UK"),
                TransactionRecord::new("Transfer", 40.0, "China"),
                TransactionRecord::new("Offshore Transfer", 9000.0, "USA"),
            ],
            vec![2.0, 5.0, 8.0, 9.0],
        )
        .unwrap()
    }

    #[test]
    fn test_schema_columns_sorted_per_block() {
        let schema = Schema::from_reference(&reference());
        assert_eq!(
            schema.column_names(),
            vec![
                "Amount (USD)",
                "Transaction Type_Cash Withdrawal",
                "Transaction Type_Offshore Transfer",
                "Transaction Type_Transfer",
                "Country_China",
                "Country_UK",
                "Country_USA",
            ]
        );
        assert_eq!(schema.width(), 7);
    }

    #[test]
    fn test_encode_single_record() {
        let encoded = encode(&[TransactionRecord::new("Transfer", 100.0, "USA")], &reference());
        assert_eq!(encoded.features.shape(), &[1, 7]);
        assert_eq!(encoded.features.row(0).to_vec(), vec![100.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
        assert_eq!(encoded.unseen_categories, 0);
    }

    #[test]
    fn test_unseen_category_is_all_zero_block() {
        let schema = Schema::from_reference(&reference());
        let encoded = schema.encode(&[TransactionRecord::new("Crypto", 10.0, "UK")]);
        assert_eq!(encoded.features.row(0).to_vec(), vec![10.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        assert_eq!(encoded.unseen_categories, 1);
    }

    #[test]
    fn test_width_matches_schema_for_any_input() {
        let schema = Schema::from_reference(&reference());
        let records = vec![
            TransactionRecord::new("Transfer", 1.0, "Mars"),
            TransactionRecord::new("", 0.0, ""),
            TransactionRecord::new("Cash Withdrawal", 3.5, "China"),
        ];
        let encoded = schema.encode(&records);
        assert_eq!(encoded.features.nrows(), 3);
        assert_eq!(encoded.features.ncols(), schema.width());
        assert_eq!(encoded.unseen_categories, 1);
    }

    #[test]
    fn test_encode_empty_batch() {
        let encoded = encode(&[], &reference());
        assert_eq!(encoded.features.shape(), &[0, 7]);
    }

    #[test]
    fn test_validate_accepts_derived_schema() {
        let schema = Schema::from_reference(&reference());
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unsorted_categories() {
        let mut schema = Schema::from_reference(&reference());
        schema.countries.swap(0, 2);
        assert!(matches!(schema.validate(), Err(RiskError::ArtifactLoad(_))));
    }

    #[test]
    fn test_validate_rejects_duplicate_categories() {
        let mut schema = Schema::from_reference(&reference());
        schema.transaction_types.push("Transfer".to_string());
        assert!(matches!(schema.validate(), Err(RiskError::ArtifactLoad(_))));
    }

    #[test]
    fn test_validate_rejects_unknown_version() {
        let mut schema = Schema::from_reference(&reference());
        schema.version = SCHEMA_VERSION + 1;
        assert!(matches!(schema.validate(), Err(RiskError::ArtifactLoad(_))));
    }

    #[test]
    fn test_categories_trimmed_and_deduplicated() {
        let dataset = ReferenceDataset::new(
            vec![
                TransactionRecord::new(" Transfer ", 1.0, "USA"),
                TransactionRecord::new("Transfer", 2.0, "USA"),
            ],
            vec![1.0, 1.0],
        )
        .unwrap();
        let schema = Schema::from_reference(&dataset);
        assert_eq!(schema.categories(CategoricalField::TransactionType), ["Transfer".to_string()]);
    }
}
