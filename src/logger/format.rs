//! Access log format module
//!
//! Supported formats:
//! - `combined` (Apache/Nginx combined format)
//! - `common` (Common Log Format - CLF)
//! - `json` (one JSON object per line)
//! - Custom patterns with `$variable` substitution

use chrono::{DateTime, Local};
use hyper::{HeaderMap, Method, Uri, Version};

const CLF_TIME: &str = "%d/%b/%Y:%H:%M:%S %z";

/// One served request, filled in before and after the handler runs
#[derive(Debug, Clone)]
pub struct AccessLogEntry {
    pub remote_addr: String,
    pub time: DateTime<Local>,
    pub method: String,
    pub path: String,
    /// Query string without the leading `?`
    pub query: Option<String>,
    pub http_version: &'static str,
    pub status: u16,
    pub body_bytes: u64,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    pub request_time_us: u64,
}

impl AccessLogEntry {
    /// Capture request-side fields; status and size are set once the response exists
    pub fn from_request(
        remote_addr: String,
        method: &Method,
        uri: &Uri,
        version: Version,
        headers: &HeaderMap,
    ) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string)
        };

        Self {
            remote_addr,
            time: Local::now(),
            method: method.to_string(),
            path: uri.path().to_string(),
            query: uri.query().map(ToString::to_string),
            http_version: version_text(version),
            status: 200,
            body_bytes: 0,
            referer: header("referer"),
            user_agent: header("user-agent"),
            request_time_us: 0,
        }
    }

    pub fn format(&self, format: &str) -> String {
        match format {
            "combined" => format!(
                "{} \"{}\" \"{}\"",
                self.format_common(),
                self.referer.as_deref().unwrap_or("-"),
                self.user_agent.as_deref().unwrap_or("-"),
            ),
            "common" => self.format_common(),
            "json" => self.format_json(),
            pattern => self.format_custom(pattern),
        }
    }

    fn request_uri(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{q}", self.path),
            None => self.path.clone(),
        }
    }

    fn request_line(&self) -> String {
        format!(
            "{} {} HTTP/{}",
            self.method,
            self.request_uri(),
            self.http_version
        )
    }

    /// `$remote_addr - - [$time_local] "$request" $status $body_bytes_sent`
    fn format_common(&self) -> String {
        format!(
            "{} - - [{}] \"{}\" {} {}",
            self.remote_addr,
            self.time.format(CLF_TIME),
            self.request_line(),
            self.status,
            self.body_bytes,
        )
    }

    fn format_json(&self) -> String {
        serde_json::json!({
            "remote_addr": self.remote_addr,
            "time": self.time.to_rfc3339(),
            "method": self.method,
            "path": self.path,
            "query": self.query,
            "http_version": self.http_version,
            "status": self.status,
            "body_bytes": self.body_bytes,
            "referer": self.referer,
            "user_agent": self.user_agent,
            "request_time_us": self.request_time_us,
        })
        .to_string()
    }

    /// Variables: `$remote_addr`, `$time_local`, `$time_iso8601`, `$request`,
    /// `$request_method`, `$request_uri`, `$request_time` (seconds),
    /// `$status`, `$body_bytes_sent`, `$http_referer`, `$http_user_agent`
    ///
    /// The pattern is scanned once; substituted values are never re-expanded.
    fn format_custom(&self, pattern: &str) -> String {
        let mut out = String::with_capacity(pattern.len() * 2);
        let mut rest = pattern;

        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos + 1..];
            // longest match first so `$request` does not eat `$request_time`
            match CUSTOM_VARIABLES.iter().find(|name| tail.starts_with(**name)) {
                Some(name) => {
                    out.push_str(&self.variable(name));
                    rest = &tail[name.len()..];
                }
                None => {
                    out.push('$');
                    rest = tail;
                }
            }
        }
        out.push_str(rest);
        out
    }

    fn variable(&self, name: &str) -> String {
        match name {
            "remote_addr" => self.remote_addr.clone(),
            "time_local" => self.time.format(CLF_TIME).to_string(),
            "time_iso8601" => self.time.to_rfc3339(),
            "request_time" => {
                #[allow(clippy::cast_precision_loss)]
                let seconds = self.request_time_us as f64 / 1_000_000.0;
                format!("{seconds:.3}")
            }
            "request_method" => self.method.clone(),
            "request_uri" => self.request_uri(),
            "request" => self.request_line(),
            "status" => self.status.to_string(),
            "body_bytes_sent" => self.body_bytes.to_string(),
            "http_referer" => self.referer.clone().unwrap_or_else(|| "-".into()),
            "http_user_agent" => self.user_agent.clone().unwrap_or_else(|| "-".into()),
            _ => String::new(),
        }
    }
}

/// Custom-pattern variable names, longest first among shared prefixes
const CUSTOM_VARIABLES: [&str; 11] = [
    "remote_addr",
    "time_local",
    "time_iso8601",
    "request_time",
    "request_method",
    "request_uri",
    "request",
    "status",
    "body_bytes_sent",
    "http_referer",
    "http_user_agent",
];

fn version_text(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn predict_entry() -> AccessLogEntry {
        let mut headers = HeaderMap::new();
        headers.insert("user-agent", "curl/8.5".parse().unwrap());
        headers.insert("referer", "http://localhost:3000/".parse().unwrap());
        let uri: Uri = "/predict?debug=1".parse().unwrap();
        let mut entry = AccessLogEntry::from_request(
            "10.0.0.7".to_string(),
            &Method::POST,
            &uri,
            Version::HTTP_11,
            &headers,
        );
        entry.status = 200;
        entry.body_bytes = 33;
        entry.request_time_us = 1234;
        entry
    }

    #[test]
    fn test_format_combined() {
        let log = predict_entry().format("combined");
        assert!(log.starts_with("10.0.0.7 - - ["));
        assert!(log.contains("\"POST /predict?debug=1 HTTP/1.1\" 200 33"));
        assert!(log.ends_with("\"http://localhost:3000/\" \"curl/8.5\""));
    }

    #[test]
    fn test_format_common_has_no_agent() {
        let log = predict_entry().format("common");
        assert!(log.contains("\"POST /predict?debug=1 HTTP/1.1\" 200 33"));
        assert!(!log.contains("curl/8.5"));
    }

    #[test]
    fn test_format_json_is_valid() {
        let log = predict_entry().format("json");
        let value: serde_json::Value = serde_json::from_str(&log).unwrap();
        assert_eq!(value["method"], "POST");
        assert_eq!(value["status"], 200);
        assert_eq!(value["query"], "debug=1");
        assert_eq!(value["body_bytes"], 33);
    }

    #[test]
    fn test_format_custom() {
        let log = predict_entry().format("$request_method $request_uri $status $request_time");
        assert_eq!(log, "POST /predict?debug=1 200 0.001");
    }

    #[test]
    fn test_custom_values_are_not_reexpanded() {
        let uri: Uri = "/health$status".parse().unwrap();
        let mut entry = AccessLogEntry::from_request(
            "127.0.0.1".to_string(),
            &Method::GET,
            &uri,
            Version::HTTP_11,
            &HeaderMap::new(),
        );
        entry.status = 404;
        assert_eq!(entry.format("$request_uri"), "/health$status");
        assert_eq!(entry.format("[$request_uri] $status"), "[/health$status] 404");
    }

    #[test]
    fn test_custom_unknown_variable_kept() {
        let log = predict_entry().format("cost $5 $unknown $status$");
        assert_eq!(log, "cost $5 $unknown 200$");
    }

    #[test]
    fn test_missing_headers_render_dash() {
        let uri: Uri = "/health".parse().unwrap();
        let entry = AccessLogEntry::from_request(
            "127.0.0.1".to_string(),
            &Method::GET,
            &uri,
            Version::HTTP_10,
            &HeaderMap::new(),
        );
        assert_eq!(
            entry.format("$request $http_referer $http_user_agent"),
            "GET /health HTTP/1.0 - -"
        );
    }
}
