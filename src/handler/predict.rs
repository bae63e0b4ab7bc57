//! `POST /predict`
//!
//! Reads the JSON body, checks the expected columns are present, reorders
//! them, runs the shared pipeline and maps the label to `"Yes"`/`"No"`.

use std::time::Duration;

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::{Request, Response, StatusCode};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::AppState;
use crate::error::RequestError;
use crate::http;
use crate::logger;
use crate::model::{is_empty_input, label_text, FeatureRow};

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct PredictionResponse {
    pub prediction: i64,
    pub result: &'static str,
}

/// Handle one prediction call; every failure becomes `{"error": ...}`
pub async fn handle_predict<B>(req: Request<B>, state: &AppState) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match predict(req, state).await {
        Ok(prediction) => http::json_response(StatusCode::OK, &prediction),
        Err(err) => {
            let status = err.status();
            let message = err.to_string();
            logger::log_request_failed(status.as_u16(), &message);
            http::error_response(status, &message)
        }
    }
}

async fn predict<B>(req: Request<B>, state: &AppState) -> Result<PredictionResponse, RequestError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let max_body_size = state.config.http.max_body_size;
    check_content_length(&req, max_body_size)?;

    let read_timeout = state.config.performance.read_timeout;
    let body = tokio::time::timeout(
        Duration::from_secs(read_timeout),
        read_body(req.into_body(), max_body_size),
    )
    .await
    .map_err(|_| RequestError::BodyTimeout(read_timeout))??;
    let row = parse_row(&body)?;
    let prediction = state.model.predict(&row)?;

    Ok(PredictionResponse {
        prediction,
        result: label_text(prediction),
    })
}

/// Reject early when `Content-Length` already exceeds the limit
fn check_content_length<B>(req: &Request<B>, max_body_size: u64) -> Result<(), RequestError> {
    let Some(value) = req.headers().get(hyper::header::CONTENT_LENGTH) else {
        return Ok(());
    };
    match value.to_str().ok().and_then(|s| s.parse::<u64>().ok()) {
        Some(size) if size > max_body_size => Err(RequestError::PayloadTooLarge),
        Some(_) => Ok(()),
        None => {
            logger::log_warning("Invalid Content-Length header, skipping size check");
            Ok(())
        }
    }
}

async fn read_body<B>(body: B, max_body_size: u64) -> Result<Bytes, RequestError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(RequestError::PayloadTooLarge),
        Err(e) => Err(RequestError::BodyRead(e.to_string())),
    }
}

/// Parse a request body into a feature row
///
/// An empty or unparsable body, or an "empty" JSON value, is `NoInput`.
/// Any other non-object value is a row missing every column.
pub fn parse_row(body: &[u8]) -> Result<FeatureRow, RequestError> {
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        if !body.is_empty() {
            logger::log_debug(&format!("Rejected body that is not JSON: {e}"));
        }
        RequestError::NoInput
    })?;

    if is_empty_input(&value) {
        return Err(RequestError::NoInput);
    }

    let empty = Map::new();
    let object = value.as_object().unwrap_or(&empty);
    FeatureRow::from_object(object).map_err(RequestError::MissingColumns)
}
