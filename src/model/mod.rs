//! Prediction model module
//!
//! - `columns`: the fixed input columns and single-row assembly
//! - `encoder`: per-column feature encoding
//! - `classifier`: logistic regression and tree classifiers
//! - `pipeline`: the serialized artifact tying them together

mod classifier;
mod columns;
mod encoder;
mod pipeline;

pub use columns::{is_empty_input, FeatureRow};
pub use pipeline::ModelPipeline;

#[cfg(test)]
pub(crate) use columns::{sample_object, EXPECTED_COLUMNS};

use crate::error::PipelineError;

/// Anything that can turn one feature row into a class label
pub trait Predictor: Send + Sync {
    fn predict(&self, row: &FeatureRow) -> Result<i64, PipelineError>;
}

/// Human-readable form of a predicted label
pub const fn label_text(prediction: i64) -> &'static str {
    if prediction == 1 {
        "Yes"
    } else {
        "No"
    }
}
