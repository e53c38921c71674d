//! Request routing
//!
//! Pure mapping from a request to an [`ApiResponse`]; nothing here touches a
//! socket.

use super::response::ApiResponse;
use crate::analyzer::{AnalyseRequest, Analyzer};
use crate::config::Config;
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::json;
use tiny_http::Method;

#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    pub method: &'a Method,
    /// Path plus optional query string
    pub url: &'a str,
    /// Set when the transport flagged the body as base64 text
    pub base64_body: bool,
    pub body: &'a [u8],
    pub request_id: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct AnalyseQuery {
    base64: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Analyse,
    Ping,
}

impl Route {
    fn from_path(path: &str) -> Option<Self> {
        match path.trim_end_matches('/') {
            "/analyse" | "/analyze" => Some(Route::Analyse),
            "/ping" => Some(Route::Ping),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Router {
    config: Config,
    analyzer: Analyzer,
}

impl Router {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            analyzer: Analyzer::new(),
        }
    }

    pub fn with_analyzer(mut self, analyzer: Analyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn handle(&self, request: &Request<'_>) -> ApiResponse {
        let (path, query) = match request.url.split_once('?') {
            Some((path, query)) => (path, query),
            None => (request.url, ""),
        };

        if *request.method == Method::Options {
            return ApiResponse::no_content();
        }

        match (Route::from_path(path), request.method) {
            (Some(Route::Analyse), Method::Post) => self.analyse(request, query),
            (Some(Route::Ping), Method::Get) => ping(&self.config, request.request_id),
            (Some(_), _) => ApiResponse::error(405, "Method not allowed"),
            (None, _) => ApiResponse::error(404, "Not found"),
        }
    }

    fn analyse(&self, request: &Request<'_>, query: &str) -> ApiResponse {
        if request.body.len() > self.config.server.max_body_bytes {
            return ApiResponse::error(413, "Request body too large");
        }

        let query: AnalyseQuery = match serde_urlencoded::from_str(query) {
            Ok(query) => query,
            Err(_) => return ApiResponse::error(400, "Invalid query string"),
        };

        let analysis = self.analyzer.analyse(&AnalyseRequest {
            body: Some(request.body),
            is_base64_encoded: request.base64_body || query.base64.unwrap_or(false),
        });
        ApiResponse::from(&analysis)
    }
}

/// Liveness payload
pub fn ping(config: &Config, request_id: &str) -> ApiResponse {
    ApiResponse::ok(json!({
        "message": "pong",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        "requestId": request_id,
        "environment": config.environment,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
