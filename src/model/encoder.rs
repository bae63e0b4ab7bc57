//! Per-column feature encoders
//!
//! Each encoder turns one JSON cell into one or more `f64` features.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PipelineError;

/// Column encoder as stored in the artifact
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColumnEncoder {
    /// `(x - mean) / scale`
    Numeric {
        #[serde(default)]
        mean: f64,
        #[serde(default = "default_scale")]
        scale: f64,
    },
    /// Index of the value in `categories`
    Ordinal {
        categories: Vec<String>,
        #[serde(default)]
        unknown_value: Option<f64>,
    },
    /// One indicator per category, unknown values encode as all zeros
    OneHot { categories: Vec<String> },
}

#[allow(clippy::missing_const_for_fn)]
fn default_scale() -> f64 {
    1.0
}

impl ColumnEncoder {
    /// Number of features this encoder emits
    pub fn width(&self) -> usize {
        match self {
            Self::Numeric { .. } | Self::Ordinal { .. } => 1,
            Self::OneHot { categories } => categories.len(),
        }
    }

    /// Append the encoded features for `value` to `out`
    pub fn encode(&self, column: &str, value: &Value, out: &mut Vec<f64>) -> Result<(), PipelineError> {
        match self {
            Self::Numeric { mean, scale } => {
                let x = numeric_value(column, value)?;
                out.push((x - mean) / scale);
            }
            Self::Ordinal {
                categories,
                unknown_value,
            } => {
                let label = category_label(column, value)?;
                #[allow(clippy::cast_precision_loss)]
                let encoded = match categories.iter().position(|c| *c == label) {
                    Some(index) => index as f64,
                    None => unknown_value.ok_or_else(|| PipelineError::UnknownCategory {
                        column: column.to_string(),
                        value: label.clone(),
                    })?,
                };
                out.push(encoded);
            }
            Self::OneHot { categories } => {
                let label = category_label(column, value)?;
                out.extend(
                    categories
                        .iter()
                        .map(|c| if *c == label { 1.0 } else { 0.0 }),
                );
            }
        }
        Ok(())
    }

    pub(crate) fn validate(&self, column: &str) -> Result<(), String> {
        match self {
            Self::Numeric { scale, .. } if *scale == 0.0 || !scale.is_finite() => {
                Err(format!("column '{column}' has invalid scale {scale}"))
            }
            Self::Ordinal { categories, .. } | Self::OneHot { categories }
                if categories.is_empty() =>
            {
                Err(format!("column '{column}' has no categories"))
            }
            _ => Ok(()),
        }
    }
}

fn numeric_value(column: &str, value: &Value) -> Result<f64, PipelineError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    };

    parsed
        .filter(|x| x.is_finite())
        .ok_or_else(|| PipelineError::InvalidType {
            column: column.to_string(),
            expected: "a number",
            found: describe(value),
        })
}

fn category_label(column: &str, value: &Value) -> Result<String, PipelineError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => Err(PipelineError::InvalidType {
            column: column.to_string(),
            expected: "a category",
            found: describe(value),
        }),
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "boolean".to_string(),
        Value::Number(_) => "number".to_string(),
        Value::String(s) => format!("string '{s}'"),
        Value::Array(_) => "array".to_string(),
        Value::Object(_) => "object".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn encode(encoder: &ColumnEncoder, value: &Value) -> Result<Vec<f64>, PipelineError> {
        let mut out = Vec::new();
        encoder.encode("col", value, &mut out)?;
        Ok(out)
    }

    #[test]
    fn test_numeric_accepts_numbers_bools_and_strings() {
        let enc = ColumnEncoder::Numeric { mean: 10.0, scale: 2.0 };
        assert_eq!(encode(&enc, &json!(14)).unwrap(), vec![2.0]);
        assert_eq!(encode(&enc, &json!("12.0")).unwrap(), vec![1.0]);
        assert_eq!(encode(&enc, &json!(true)).unwrap(), vec![-4.5]);
    }

    #[test]
    fn test_numeric_rejects_non_numeric() {
        let enc = ColumnEncoder::Numeric { mean: 0.0, scale: 1.0 };
        let err = encode(&enc, &json!("abc")).unwrap_err();
        assert_eq!(err.to_string(), "column 'col' expects a number, got string 'abc'");
        assert!(encode(&enc, &Value::Null).is_err());
    }

    #[test]
    fn test_ordinal_known_and_unknown() {
        let enc = ColumnEncoder::Ordinal {
            categories: vec!["no".to_string(), "yes".to_string()],
            unknown_value: None,
        };
        assert_eq!(encode(&enc, &json!("yes")).unwrap(), vec![1.0]);
        assert!(matches!(
            encode(&enc, &json!("maybe")),
            Err(PipelineError::UnknownCategory { .. })
        ));

        let lenient = ColumnEncoder::Ordinal {
            categories: vec!["no".to_string(), "yes".to_string()],
            unknown_value: Some(-1.0),
        };
        assert_eq!(encode(&lenient, &json!("maybe")).unwrap(), vec![-1.0]);
    }

    #[test]
    fn test_one_hot_width_and_unknown() {
        let enc = ColumnEncoder::OneHot {
            categories: vec!["Self".to_string(), "Parent".to_string(), "Others".to_string()],
        };
        assert_eq!(enc.width(), 3);
        assert_eq!(encode(&enc, &json!("Parent")).unwrap(), vec![0.0, 1.0, 0.0]);
        assert_eq!(encode(&enc, &json!("Nurse")).unwrap(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_categorical_matches_number_text() {
        let enc = ColumnEncoder::Ordinal {
            categories: vec!["0".to_string(), "1".to_string()],
            unknown_value: None,
        };
        assert_eq!(encode(&enc, &json!(1)).unwrap(), vec![1.0]);
    }

    #[test]
    fn test_deserialize_tagged() {
        let enc: ColumnEncoder = serde_json::from_value(json!({"type": "numeric"})).unwrap();
        assert_eq!(enc, ColumnEncoder::Numeric { mean: 0.0, scale: 1.0 });
    }
}
