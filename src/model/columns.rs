//! Expected input columns and single-row assembly
//!
//! The pipeline is order-sensitive, so request fields are always reordered
//! into [`EXPECTED_COLUMNS`] before prediction.

use serde_json::{Map, Value};

/// Columns the pipeline was trained on, in training order
pub const EXPECTED_COLUMNS: [&str; 19] = [
    "A1_Score",
    "A2_Score",
    "A3_Score",
    "A4_Score",
    "A5_Score",
    "A6_Score",
    "A7_Score",
    "A8_Score",
    "A9_Score",
    "A10_Score",
    "age",
    "gender",
    "ethnicity",
    "jaundice",
    "autism",
    "contry_of_res",
    "used_app_before",
    "result",
    "relation",
];

/// One input row with values in `EXPECTED_COLUMNS` order
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    values: Vec<Value>,
}

impl FeatureRow {
    /// Build a row from a JSON object. Extra keys are dropped.
    ///
    /// Returns the missing column names (in expected order) if any are absent.
    pub fn from_object(object: &Map<String, Value>) -> Result<Self, Vec<String>> {
        let missing = missing_columns(object);
        if !missing.is_empty() {
            return Err(missing);
        }

        let values = EXPECTED_COLUMNS
            .iter()
            .map(|col| object.get(*col).cloned().unwrap_or(Value::Null))
            .collect();
        Ok(Self { values })
    }

    /// Iterate `(column, value)` pairs in expected order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        EXPECTED_COLUMNS.iter().copied().zip(self.values.iter())
    }

    #[cfg(test)]
    pub fn get(&self, column: &str) -> Option<&Value> {
        EXPECTED_COLUMNS
            .iter()
            .position(|c| *c == column)
            .and_then(|i| self.values.get(i))
    }
}

/// Expected columns absent from `object`, in expected order
pub fn missing_columns(object: &Map<String, Value>) -> Vec<String> {
    EXPECTED_COLUMNS
        .iter()
        .filter(|col| !object.contains_key(**col))
        .map(|col| (*col).to_string())
        .collect()
}

/// Whether a parsed body counts as "no input"
///
/// Empty containers, null, false, zero and the empty string all do.
pub fn is_empty_input(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

#[cfg(test)]
pub(crate) fn sample_object() -> Map<String, Value> {
    let value = serde_json::json!({
        "A1_Score": 1, "A2_Score": 1, "A3_Score": 1, "A4_Score": 1, "A5_Score": 1,
        "A6_Score": 1, "A7_Score": 1, "A8_Score": 1, "A9_Score": 1, "A10_Score": 1,
        "age": 25,
        "gender": "m",
        "ethnicity": "White-European",
        "jaundice": "no",
        "autism": "no",
        "contry_of_res": "United States",
        "used_app_before": "no",
        "result": 10,
        "relation": "Self"
    });
    match value {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}
