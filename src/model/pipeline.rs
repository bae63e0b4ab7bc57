//! Serialized prediction pipeline
//!
//! An artifact holds one encoder per expected column and a final classifier.
//! It is read once at startup; `ModelPipeline::load` rejects artifacts that
//! do not line up with [`EXPECTED_COLUMNS`] or whose classifier does not fit
//! the encoded width.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::classifier::Classifier;
use super::columns::{FeatureRow, EXPECTED_COLUMNS};
use super::encoder::ColumnEncoder;
use super::Predictor;
use crate::error::{LoadError, PipelineError};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub encoder: ColumnEncoder,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ModelPipeline {
    #[serde(default)]
    pub name: Option<String>,
    /// Labels returned for each class index
    #[serde(default = "default_classes")]
    pub classes: Vec<i64>,
    pub columns: Vec<ColumnSpec>,
    pub classifier: Classifier,
}

fn default_classes() -> Vec<i64> {
    vec![0, 1]
}

impl ModelPipeline {
    /// Read and validate an artifact. `.toml` files are parsed as TOML,
    /// anything else as JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: display.clone(),
            source,
        })?;

        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        let pipeline: Self = if is_toml {
            toml::from_str(&text).map_err(|source| LoadError::Toml {
                path: display,
                source,
            })?
        } else {
            serde_json::from_str(&text).map_err(|source| LoadError::Json {
                path: display,
                source,
            })?
        };

        pipeline.validate()?;
        Ok(pipeline)
    }

    pub fn validate(&self) -> Result<(), LoadError> {
        let names: Vec<&str> = self.columns.iter().map(|c| c.name.as_str()).collect();
        if names != EXPECTED_COLUMNS {
            return Err(LoadError::Invalid(format!(
                "columns {names:?} do not match expected {EXPECTED_COLUMNS:?}"
            )));
        }
        if self.classes.is_empty() {
            return Err(LoadError::Invalid("no classes listed".to_string()));
        }
        for spec in &self.columns {
            spec.encoder.validate(&spec.name).map_err(LoadError::Invalid)?;
        }
        self.classifier
            .validate(self.feature_width(), self.classes.len())
            .map_err(LoadError::Invalid)
    }

    /// Total encoded feature count
    pub fn feature_width(&self) -> usize {
        self.columns.iter().map(|c| c.encoder.width()).sum()
    }

    /// Encode a row into the classifier's feature vector
    pub fn encode(&self, row: &FeatureRow) -> Result<Vec<f64>, PipelineError> {
        let mut features = Vec::with_capacity(self.feature_width());
        for (spec, (column, value)) in self.columns.iter().zip(row.iter()) {
            spec.encoder.encode(column, value, &mut features)?;
        }
        Ok(features)
    }
}

impl Predictor for ModelPipeline {
    fn predict(&self, row: &FeatureRow) -> Result<i64, PipelineError> {
        let features = self.encode(row)?;
        let index = self.classifier.predict_index(&features)?;
        self.classes
            .get(index)
            .copied()
            .ok_or(PipelineError::UnknownClass {
                index,
                classes: self.classes.len(),
            })
    }
}
