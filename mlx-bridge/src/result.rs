//! Generation result payload
//!
//! `generate` hands the engine's JSON back verbatim. This type is a
//! convenience for callers that want it typed; the bridge never parses it.

use serde::{Deserialize, Serialize};

/// `{"success":bool,"text":string,"tokenCount":int,"tokensPerSecond":float,"error":string}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub success: bool,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub token_count: u32,
    #[serde(default)]
    pub tokens_per_second: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerationResult {
    /// Parse the string returned by [`crate::Bridge::generate`]
    pub fn parse(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Text on success, the engine's error message otherwise
    pub fn into_text(self) -> std::result::Result<String, String> {
        if self.success {
            Ok(self.text)
        } else {
            Err(self.error.unwrap_or_else(|| "generation failed".to_string()))
        }
    }
}
