//! Request/response bodies of the HTTP surface

use serde::{Deserialize, Serialize};

/// `POST /send` body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    pub sender_handle: String,
    /// Accepted for compatibility; delivery always targets followers
    #[serde(default)]
    pub recipient: Option<String>,
    /// "Note" or "Article", defaults to "Note"
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    pub message: String,
}

/// `POST /send` success body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResponse {
    pub status: &'static str,
    pub activity_id: String,
}

/// `GET /health` body
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}
