//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: route matching, method checks,
//! and the headers every response carries.

use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::ACCESS_CONTROL_REQUEST_HEADERS;
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::sync::Arc;

use super::{health, predict};
use crate::config::AppState;
use crate::http;
use crate::logger;

/// Paths the server answers on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Predict,
    Health,
}

impl Route {
    fn from_path(path: &str) -> Option<Self> {
        match path {
            "/predict" => Some(Self::Predict),
            "/health" => Some(Self::Health),
            _ => None,
        }
    }

    /// Value of the `Allow` header for this route
    const fn allow(self) -> &'static str {
        match self {
            Self::Predict => "POST, OPTIONS",
            Self::Health => "GET, HEAD, OPTIONS",
        }
    }
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let mut response = route_request(req, &state).await;
    let http_config = &state.config.http;
    http::finalize_response(&mut response, &http_config.server_name, http_config.enable_cors);
    Ok(response)
}

async fn route_request<B>(req: Request<B>, state: &AppState) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let Some(route) = Route::from_path(req.uri().path()) else {
        logger::log_debug(&format!("No route for {}", req.uri().path()));
        return http::build_404_response();
    };

    let method = req.method().clone();
    match (route, &method) {
        (_, &Method::OPTIONS) => http::build_options_response(
            route.allow(),
            state.config.http.enable_cors,
            req.headers().get(ACCESS_CONTROL_REQUEST_HEADERS),
        ),
        (Route::Predict, &Method::POST) => predict::handle_predict(req, state).await,
        (Route::Health, &Method::GET) => health::handle_health(),
        (Route::Health, &Method::HEAD) => http::strip_body(health::handle_health()),
        _ => {
            logger::log_warning(&format!(
                "Method not allowed: {method} {}",
                req.uri().path()
            ));
            http::build_405_response(route.allow())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::error::PipelineError;
    use crate::model::{sample_object, FeatureRow, Predictor};
    use http_body_util::BodyExt;
    use hyper::StatusCode;

    struct PanickingPredictor;

    impl Predictor for PanickingPredictor {
        fn predict(&self, _row: &FeatureRow) -> Result<i64, PipelineError> {
            panic!("model must not be called");
        }
    }

    struct OnePredictor;

    impl Predictor for OnePredictor {
        fn predict(&self, _row: &FeatureRow) -> Result<i64, PipelineError> {
            Ok(1)
        }
    }

    struct RejectingPredictor;

    impl Predictor for RejectingPredictor {
        fn predict(&self, _row: &FeatureRow) -> Result<i64, PipelineError> {
            Err(PipelineError::UnknownCategory {
                column: "ethnicity".to_string(),
                value: "?".to_string(),
            })
        }
    }

    fn state(model: Arc<dyn Predictor>) -> Arc<AppState> {
        Arc::new(AppState::new(&test_config(), model))
    }

    fn request(method: Method, path: &str, body: &str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(method)
            .uri(path)
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap()
    }

    async fn body_bytes(response: Response<Full<Bytes>>) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_health_ignores_model() {
        let state = state(Arc::new(PanickingPredictor));
        for _ in 0..3 {
            let response = handle_request(request(Method::GET, "/health", ""), state.clone())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.headers()["access-control-allow-origin"], "*");
            assert_eq!(
                &body_bytes(response).await[..],
                br#"{"status":"Server is running"}"#
            );
        }
    }

    #[tokio::test]
    async fn test_health_unaffected_by_failed_predictions() {
        let state = state(Arc::new(RejectingPredictor));
        let body = serde_json::Value::Object(sample_object()).to_string();

        let response = handle_request(request(Method::POST, "/predict", ""), state.clone())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = handle_request(request(Method::POST, "/predict", &body), state.clone())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = handle_request(request(Method::GET, "/health", ""), state)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            &body_bytes(response).await[..],
            br#"{"status":"Server is running"}"#
        );
    }

    #[tokio::test]
    async fn test_head_health_has_empty_body() {
        let state = state(Arc::new(PanickingPredictor));
        let response = handle_request(request(Method::HEAD, "/health", ""), state)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_predict_route() {
        let state = state(Arc::new(OnePredictor));
        let body = serde_json::Value::Object(sample_object()).to_string();
        let response = handle_request(request(Method::POST, "/predict", &body), state)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["server"], "screening-server/0.1");
        let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(json, serde_json::json!({"prediction": 1, "result": "Yes"}));
    }

    #[tokio::test]
    async fn test_wrong_method_is_405() {
        let state = state(Arc::new(PanickingPredictor));
        let response = handle_request(request(Method::GET, "/predict", ""), state.clone())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()["allow"], "POST, OPTIONS");

        let response = handle_request(request(Method::POST, "/health", ""), state)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()["allow"], "GET, HEAD, OPTIONS");
    }

    #[tokio::test]
    async fn test_unknown_path_is_404() {
        let state = state(Arc::new(PanickingPredictor));
        let response = handle_request(request(Method::GET, "/predict/extra", ""), state)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(&body_bytes(response).await[..], br#"{"error":"Not Found"}"#);
    }

    #[tokio::test]
    async fn test_preflight() {
        let state = state(Arc::new(PanickingPredictor));
        let response = handle_request(request(Method::OPTIONS, "/predict", ""), state)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        assert_eq!(response.headers()["access-control-allow-methods"], "POST, OPTIONS");
    }

    #[tokio::test]
    async fn test_preflight_allows_requested_headers() {
        let state = state(Arc::new(PanickingPredictor));
        let req = Request::builder()
            .method(Method::OPTIONS)
            .uri("/predict")
            .header("origin", "http://localhost:3000")
            .header("access-control-request-method", "POST")
            .header("access-control-request-headers", "content-type, x-client-version")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let response = handle_request(req, state).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        assert_eq!(
            response.headers()["access-control-allow-headers"],
            "content-type, x-client-version"
        );
    }

    #[tokio::test]
    async fn test_cors_disabled() {
        let mut config = test_config();
        config.http.enable_cors = false;
        let state = Arc::new(AppState::new(&config, Arc::new(PanickingPredictor)));
        let response = handle_request(request(Method::GET, "/health", ""), state)
            .await
            .unwrap();
        assert!(!response.headers().contains_key("access-control-allow-origin"));
    }
}
