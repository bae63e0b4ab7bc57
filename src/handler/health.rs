//! `GET /health` liveness probe; never touches the model

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::http;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub fn handle_health() -> Response<Full<Bytes>> {
    http::json_response(
        StatusCode::OK,
        &HealthResponse {
            status: "Server is running",
        },
    )
}
