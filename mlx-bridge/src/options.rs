//! Generation parameters
//!
//! Hosts pass an optional options object with camelCase keys. Recognized keys
//! are `maxTokens`, `temperature` and `topP`; anything else is ignored and
//! missing keys take the defaults below.

use crate::error::{BridgeError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const DEFAULT_MAX_TOKENS: i32 = 256;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_TOP_P: f32 = 0.9;

/// Parameters forwarded to `node_mlx_generate`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerateOptions {
    /// Maximum tokens to generate
    #[serde(deserialize_with = "int32_from_number")]
    pub max_tokens: i32,

    /// Temperature for sampling (0.0 = greedy, higher = more random)
    pub temperature: f32,

    /// Top-p sampling threshold
    pub top_p: f32,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
        }
    }
}

impl GenerateOptions {
    pub fn with_max_tokens(mut self, max_tokens: i32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = top_p;
        self
    }

    /// Build options from a host value
    ///
    /// Absent, `null` or non-object values yield the defaults. A recognized
    /// key holding a non-number is rejected with
    /// [`BridgeError::InvalidArgument`].
    pub fn from_value(value: Option<&Value>) -> Result<Self> {
        match value {
            Some(obj @ Value::Object(_)) => {
                let options: Self = serde_json::from_value(obj.clone())
                    .map_err(|e| BridgeError::invalid(format!("generate options: {}", e)))?;
                options.validate()?;
                Ok(options)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Reject a non-positive token budget
    ///
    /// `temperature` and `topP` are forwarded unchecked; the engine owns
    /// their ranges.
    pub fn validate(&self) -> Result<()> {
        if self.max_tokens <= 0 {
            return Err(BridgeError::invalid(format!(
                "maxTokens must be positive, got {}",
                self.max_tokens
            )));
        }
        Ok(())
    }
}

// Host numbers are doubles; truncate to int32 like the host binding does
fn int32_from_number<'de, D>(deserializer: D) -> std::result::Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let n = f64::deserialize(deserializer)?;
    Ok(n as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let options = GenerateOptions::from_value(None).unwrap();
        assert_eq!(options.max_tokens, 256);
        assert_eq!(options.temperature, 0.7);
        assert_eq!(options.top_p, 0.9);
    }

    #[test]
    fn test_partial_object_fills_defaults() {
        let options = GenerateOptions::from_value(Some(&json!({ "maxTokens": 10 }))).unwrap();
        assert_eq!(options, GenerateOptions::default().with_max_tokens(10));
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let with_extra =
            GenerateOptions::from_value(Some(&json!({ "foo": 1, "maxTokens": 50 }))).unwrap();
        let plain = GenerateOptions::from_value(Some(&json!({ "maxTokens": 50 }))).unwrap();
        assert_eq!(with_extra, plain);
    }

    #[test]
    fn test_non_object_yields_defaults() {
        for value in [json!(null), json!(12), json!("fast"), json!([1, 2])] {
            let options = GenerateOptions::from_value(Some(&value)).unwrap();
            assert_eq!(options, GenerateOptions::default(), "value: {}", value);
        }
    }

    #[test]
    fn test_all_keys() {
        let options = GenerateOptions::from_value(Some(&json!({
            "maxTokens": 64,
            "temperature": 0.2,
            "topP": 0.5,
        })))
        .unwrap();
        assert_eq!(options.max_tokens, 64);
        assert_eq!(options.temperature, 0.2);
        assert_eq!(options.top_p, 0.5);
    }

    #[test]
    fn test_fractional_max_tokens_truncates() {
        let options = GenerateOptions::from_value(Some(&json!({ "maxTokens": 12.9 }))).unwrap();
        assert_eq!(options.max_tokens, 12);
    }

    #[test]
    fn test_wrong_type_is_invalid_argument() {
        let err = GenerateOptions::from_value(Some(&json!({ "temperature": "hot" }))).unwrap_err();
        assert_eq!(err.kind(), "InvalidArgument");
    }

    #[test]
    fn test_non_positive_max_tokens_rejected() {
        for max_tokens in [0, -5] {
            let err = GenerateOptions::from_value(Some(&json!({ "maxTokens": max_tokens })))
                .unwrap_err();
            assert_eq!(err.kind(), "InvalidArgument");
        }
    }

    #[test]
    fn test_sampling_values_pass_through_unchecked() {
        let options =
            GenerateOptions::from_value(Some(&json!({ "temperature": -1.0, "topP": 1.5 }))).unwrap();
        assert_eq!(options.temperature, -1.0);
        assert_eq!(options.top_p, 1.5);
        assert!(options.validate().is_ok());
    }
}
