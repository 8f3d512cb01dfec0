// Money-laundering risk scoring for financial transactions.
// A logistic-regression model trained offline on a labelled reference
// dataset scores transactions as high or low risk. The core contract is
// `train`, `predict_one` and `predict_batch`, with `encode` exposing
// the feature layout the model expects.

pub mod artifacts;
pub mod config;
pub mod csv_reader;
pub mod encoder;
pub mod error;
pub mod inference;
pub mod metrics;
pub mod model;
pub mod scaler;
pub mod training;


pub use config::AppConfig;
pub use csv_reader::{ReferenceDataset, TransactionRecord};
pub use encoder::{encode, Schema};
pub use error::{ConvergenceWarning, RiskError};
pub use inference::{predict_batch, predict_one, Prediction, RiskContext};
pub use training::{train, TrainedModel};
