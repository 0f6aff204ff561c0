//! Clients for the external text-generation and text-to-speech services.
//!
//! The rest of the crate only sees the [`TextGenerator`] and
//! [`SpeechSynthesizer`] traits; every failure comes back as a
//! [`GatewayError`] for the caller to recover from.

pub mod elevenlabs;
pub mod gemini;

pub use elevenlabs::{ElevenLabsClient, ElevenLabsSettings};
pub use gemini::{GeminiClient, GeminiSettings};

use crate::error::GatewayError;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GatewayError>;
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<AudioClip, GatewayError>;
}

/// Synthesized speech as returned by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl AudioClip {
    /// File extension matching the content type.
    pub fn extension(&self) -> &'static str {
        let mime = self
            .content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim();
        match mime {
            "audio/mpeg" | "audio/mp3" => "mp3",
            "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
            "audio/ogg" => "ogg",
            "audio/pcm" => "pcm",
            _ => "bin",
        }
    }
}

/// Read an API key from the named environment variable.
pub fn api_key_from_env(var: &str) -> Result<String, GatewayError> {
    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
        _ => Err(GatewayError::MissingApiKey(var.to_string())),
    }
}

pub(crate) fn http_client(timeout_seconds: u64) -> Result<reqwest::Client, GatewayError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .build()
        .map_err(|e| GatewayError::Transport(format!("failed to create HTTP client: {}", e)))
}

/// Turn a non-success response into [`GatewayError::Upstream`], preferring
/// the service's own error message when the body carries one.
pub(crate) async fn upstream_error(response: reqwest::Response) -> GatewayError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    GatewayError::Upstream {
        status,
        message: error_message(&body),
    }
}

fn error_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let message = parsed.as_ref().and_then(|v| {
        v.pointer("/error/message")
            .or_else(|| v.pointer("/detail/message"))
            .or_else(|| v.pointer("/detail"))
            .and_then(Value::as_str)
    });

    match message {
        Some(m) => m.to_string(),
        None => body.trim().to_string(),
    }
}

/// Show only that a key is set, never its value.
pub(crate) fn redact(key: &str) -> &'static str {
    if key.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_extension() {
        let clip = AudioClip {
            content_type: "audio/mpeg".to_string(),
            bytes: vec![],
        };
        assert_eq!(clip.extension(), "mp3");

        let clip = AudioClip {
            content_type: "audio/wav; codec=pcm".to_string(),
            bytes: vec![],
        };
        assert_eq!(clip.extension(), "wav");

        let clip = AudioClip {
            content_type: "application/octet-stream".to_string(),
            bytes: vec![],
        };
        assert_eq!(clip.extension(), "bin");
    }

    #[test]
    fn test_missing_api_key() {
        let err = api_key_from_env("DENTAL_INSIGHTS_TEST_UNSET_KEY").unwrap_err();
        assert_eq!(
            err,
            GatewayError::MissingApiKey("DENTAL_INSIGHTS_TEST_UNSET_KEY".to_string())
        );
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"error":{"code":400,"message":"API key not valid"}}"#),
            "API key not valid"
        );
        assert_eq!(
            error_message(r#"{"detail":{"status":"quota_exceeded","message":"Quota exceeded"}}"#),
            "Quota exceeded"
        );
        assert_eq!(error_message("  Bad Gateway \n"), "Bad Gateway");
    }
}
