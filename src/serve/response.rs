//! JSON response shaping

use crate::analyzer::{Analysis, Verdict};
use serde_json::{json, Value};

/// Sent with every response, except `Content-Type` on bodiless ones
pub const HEADERS: &[(&str, &str)] = &[
    ("Access-Control-Allow-Headers", "*"),
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "GET,POST,PUT,DELETE,OPTIONS,PATCH"),
    ("Access-Control-Allow-Credentials", "true"),
    ("Strict-Transport-Security", "max-age=31536000;includeSubDomains"),
    ("X-XSS-Protection", "0"),
    ("X-Content-Type-Options", "nosniff"),
    ("X-Frame-Options", "Deny"),
    ("Cache-Control", "no-store"),
    ("Pragma", "no-cache"),
    ("Content-Security-Policy", "frame-ancestors 'none'; default-src 'self'"),
    ("Referrer-Policy", "no-referrer"),
    ("Feature-Policy", "none"),
    ("Content-Type", "application/json"),
    ("X-Permitted-Cross-Domain-Policies", "none"),
];

pub const MISSING_BODY: &str = "Missing request body";
pub const NOT_AN_MP3: &str = "No MP3 frames found; not a valid MP3 file";
pub const ANALYSIS_FAILED: &str = "Error analysing file";

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Option<Value>,
}

impl ApiResponse {
    pub fn ok(body: Value) -> Self {
        Self {
            status: 200,
            body: Some(body),
        }
    }

    pub fn no_content() -> Self {
        Self {
            status: 204,
            body: None,
        }
    }

    pub fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            body: Some(json!({ "error": message })),
        }
    }

    pub fn server_error(message: &str, details: &str) -> Self {
        Self {
            status: 500,
            body: Some(json!({ "error": message, "details": details })),
        }
    }

    /// Serialized body; empty for 204
    pub fn body_bytes(&self) -> Vec<u8> {
        self.body
            .as_ref()
            .map(|body| body.to_string().into_bytes())
            .unwrap_or_default()
    }

    /// Headers to send; a response without a body gets no `Content-Type`
    pub fn headers(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        HEADERS
            .iter()
            .copied()
            .filter(|&(name, _)| self.body.is_some() || !name.eq_ignore_ascii_case("Content-Type"))
    }
}

impl From<&Analysis> for ApiResponse {
    fn from(analysis: &Analysis) -> Self {
        match analysis.verdict {
            Verdict::Ok => ApiResponse::ok(json!({ "frameCount": analysis.frame_count })),
            Verdict::Empty => ApiResponse::error(400, MISSING_BODY),
            Verdict::NoFrames => ApiResponse::error(400, NOT_AN_MP3),
            Verdict::Error => {
                ApiResponse::server_error(ANALYSIS_FAILED, analysis.error.as_deref().unwrap_or(""))
            }
        }
    }
}
