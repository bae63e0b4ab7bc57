//! Error types
//!
//! `RequestError` is what a `/predict` call can fail with and knows its HTTP
//! status. `PipelineError` is raised while encoding or classifying a row;
//! `LoadError` while reading the pipeline artifact at startup.

use hyper::StatusCode;

/// Failures while evaluating the pipeline on a row
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("column '{column}' expects {expected}, got {found}")]
    InvalidType {
        column: String,
        expected: &'static str,
        found: String,
    },

    #[error("column '{column}' contains unknown category '{value}'")]
    UnknownCategory { column: String, value: String },

    #[error("row has {found} features, classifier expects {expected}")]
    FeatureCount { expected: usize, found: usize },

    #[error("classifier produced class index {index} but only {classes} classes are known")]
    UnknownClass { index: usize, classes: usize },
}

/// Failures while loading the pipeline artifact
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read model artifact {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse model artifact {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse model artifact {path}: {source}")]
    Toml {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid model artifact: {0}")]
    Invalid(String),
}

/// Failures of a single prediction request
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("No input data provided")]
    NoInput,

    #[error("Missing columns: [{}]", quoted_list(.0))]
    MissingColumns(Vec<String>),

    #[error("Payload too large")]
    PayloadTooLarge,

    #[error("Failed to read request body: {0}")]
    BodyRead(String),

    #[error("Request body not received within {0}s")]
    BodyTimeout(u64),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl RequestError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NoInput | Self::MissingColumns(_) | Self::BodyRead(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::BodyTimeout(_) => StatusCode::REQUEST_TIMEOUT,
            Self::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Render names as `'a', 'b'`
fn quoted_list(names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("'{n}'"))
        .collect::<Vec<_>>()
        .join(", ")
}
