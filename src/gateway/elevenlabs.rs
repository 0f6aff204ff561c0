//! ElevenLabs text-to-speech client.

use super::{api_key_from_env, http_client, redact, upstream_error, AudioClip, SpeechSynthesizer};
use crate::error::GatewayError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Rachel: warm, natural female voice.
pub const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";

#[derive(Debug, Clone, PartialEq)]
pub struct ElevenLabsSettings {
    pub base_url: String,
    pub voice_id: String,
    pub model_id: String,
    pub stability: f32,
    pub similarity_boost: f32,
    pub timeout_seconds: u64,
}

impl Default for ElevenLabsSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.elevenlabs.io/v1".to_string(),
            voice_id: DEFAULT_VOICE_ID.to_string(),
            model_id: "eleven_multilingual_v2".to_string(),
            stability: 0.5,
            similarity_boost: 0.75,
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

/// A voice available to the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub voice_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VoicesResponse {
    voices: Vec<Voice>,
}

pub struct ElevenLabsClient {
    settings: ElevenLabsSettings,
    api_key: String,
    http_client: reqwest::Client,
}

impl fmt::Debug for ElevenLabsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElevenLabsClient")
            .field("settings", &self.settings)
            .field("api_key", &redact(&self.api_key))
            .finish()
    }
}

impl ElevenLabsClient {
    pub fn new(settings: ElevenLabsSettings, api_key: String) -> Result<Self, GatewayError> {
        info!("Using ElevenLabs voice {}", settings.voice_id);
        let http_client = http_client(settings.timeout_seconds)?;
        Ok(Self {
            settings,
            api_key,
            http_client,
        })
    }

    pub fn from_env(settings: ElevenLabsSettings, api_key_env: &str) -> Result<Self, GatewayError> {
        let api_key = api_key_from_env(api_key_env)?;
        Self::new(settings, api_key)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    /// Voices available to the configured account.
    pub async fn list_voices(&self) -> Result<Vec<Voice>, GatewayError> {
        let response = self
            .http_client
            .get(self.url("voices"))
            .header("xi-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| {
                GatewayError::from_send(e, "ElevenLabs", self.settings.timeout_seconds)
            })?;

        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }

        let body = response.text().await.map_err(|e| {
            GatewayError::Transport(format!("failed to read ElevenLabs response: {}", e))
        })?;
        let parsed: VoicesResponse = serde_json::from_str(&body).map_err(|e| {
            GatewayError::MalformedResponse(format!("invalid ElevenLabs voices JSON: {}", e))
        })?;

        Ok(parsed.voices)
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    async fn synthesize(&self, text: &str) -> Result<AudioClip, GatewayError> {
        let request = SpeechRequest {
            text,
            model_id: &self.settings.model_id,
            voice_settings: VoiceSettings {
                stability: self.settings.stability,
                similarity_boost: self.settings.similarity_boost,
            },
        };

        debug!("Requesting speech for {} characters", text.chars().count());

        let response = self
            .http_client
            .post(self.url(&format!("text-to-speech/{}", self.settings.voice_id)))
            .header("xi-api-key", &self.api_key)
            .header("accept", "audio/mpeg")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                GatewayError::from_send(e, "ElevenLabs", self.settings.timeout_seconds)
            })?;

        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("audio/mpeg")
            .to_string();

        if !content_type.starts_with("audio/") && content_type != "application/octet-stream" {
            return Err(GatewayError::MalformedResponse(format!(
                "expected audio, got {}",
                content_type
            )));
        }

        let bytes = response.bytes().await.map_err(|e| {
            GatewayError::Transport(format!("failed to read ElevenLabs audio: {}", e))
        })?;
        if bytes.is_empty() {
            return Err(GatewayError::MalformedResponse(
                "empty audio response".to_string(),
            ));
        }

        Ok(AudioClip {
            content_type,
            bytes: bytes.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(base_url: String) -> ElevenLabsClient {
        let settings = ElevenLabsSettings {
            base_url,
            timeout_seconds: 5,
            ..Default::default()
        };
        ElevenLabsClient::new(settings, "xi-test".to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_synthesize_returns_audio() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/text-to-speech/21m00Tcm4TlvDq8ikWAM")
                    .header("xi-api-key", "xi-test")
                    .json_body_partial(
                        r#"{"text":"Hello","model_id":"eleven_multilingual_v2"}"#,
                    );
                then.status(200)
                    .header("content-type", "audio/mpeg")
                    .body(vec![0x49u8, 0x44, 0x33, 0x04]);
            })
            .await;

        let clip = client(server.base_url()).synthesize("Hello").await.unwrap();

        mock.assert_async().await;
        assert_eq!(clip.content_type, "audio/mpeg");
        assert_eq!(clip.bytes, vec![0x49, 0x44, 0x33, 0x04]);
        assert_eq!(clip.extension(), "mp3");
    }

    #[tokio::test]
    async fn test_synthesize_maps_unauthorized() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(401).json_body(json!({
                    "detail": {"status": "invalid_api_key", "message": "Invalid API key"}
                }));
            })
            .await;

        let err = client(server.base_url()).synthesize("Hello").await.unwrap_err();
        assert_eq!(
            err,
            GatewayError::Upstream {
                status: 401,
                message: "Invalid API key".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_synthesize_rejects_json_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).json_body(json!({"ok": true}));
            })
            .await;

        let err = client(server.base_url()).synthesize("Hello").await.unwrap_err();
        assert!(matches!(err, GatewayError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_list_voices() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/voices").header("xi-api-key", "xi-test");
                then.status(200).json_body(json!({
                    "voices": [
                        {"voice_id": "21m00Tcm4TlvDq8ikWAM", "name": "Rachel", "category": "premade"},
                        {"voice_id": "pNInz6obpgDQGcFmaJgB", "name": "Adam", "description": "Clear and professional"}
                    ]
                }));
            })
            .await;

        let voices = client(server.base_url()).list_voices().await.unwrap();
        assert_eq!(voices.len(), 2);
        assert_eq!(voices[0].name, "Rachel");
        assert_eq!(voices[1].description.as_deref(), Some("Clear and professional"));
    }

    #[test]
    fn test_debug_redacts_key() {
        let debug = format!("{:?}", client("http://localhost".to_string()));
        assert!(!debug.contains("xi-test"));
    }
}
