//! Configuration file handling.
//!
//! Settings are read from `.dental-insights.toml` and then overridden by
//! whatever the command line sets explicitly. API keys never live in the
//! file; only the names of the environment variables that hold them do.

use crate::analysis::{AnalysisSettings, SentimentPolicy};
use crate::error::AnalysisError;
use crate::gateway::elevenlabs::DEFAULT_VOICE_ID;
use crate::gateway::{ElevenLabsSettings, GeminiSettings};
use crate::models::MAX_RATING;
use crate::prompt::{Locale, DEFAULT_MAX_WORDS};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = ".dental-insights.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    /// Text-generation settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Text-to-speech settings.
    #[serde(default)]
    pub voice: VoiceConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub prompt: PromptConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Practice data file. The bundled sample is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_file: Option<String>,

    #[serde(default)]
    pub locale: Locale,

    /// Default report path for `--insights`.
    #[serde(default = "default_output")]
    pub output: String,

    /// Where synthesized speech is written.
    #[serde(default = "default_audio_dir")]
    pub audio_dir: String,

    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_file: None,
            locale: Locale::default(),
            output: default_output(),
            audio_dir: default_audio_dir(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "dental_insights_report.md".to_string()
}

fn default_audio_dir() -> String {
    "audio".to_string()
}

/// Gemini settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model")]
    pub name: String,

    #[serde(default = "default_gemini_url")]
    pub base_url: String,

    /// Environment variable holding the Gemini API key.
    #[serde(default = "default_gemini_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_k")]
    pub top_k: u32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            base_url: default_gemini_url(),
            api_key_env: default_gemini_key_env(),
            temperature: default_temperature(),
            top_k: default_top_k(),
            top_p: default_top_p(),
            max_output_tokens: default_max_output_tokens(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_model() -> String {
    GeminiSettings::default().model
}

fn default_gemini_url() -> String {
    GeminiSettings::default().base_url
}

fn default_gemini_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_top_k() -> u32 {
    40
}

fn default_top_p() -> f32 {
    0.95
}

fn default_max_output_tokens() -> u32 {
    1024
}

fn default_timeout() -> u64 {
    60
}

/// ElevenLabs settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// Synthesize speech for every answer.
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_elevenlabs_url")]
    pub base_url: String,

    #[serde(default = "default_elevenlabs_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_voice_id")]
    pub voice_id: String,

    #[serde(default = "default_voice_model")]
    pub model_id: String,

    #[serde(default = "default_stability")]
    pub stability: f32,

    #[serde(default = "default_similarity_boost")]
    pub similarity_boost: f32,

    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_elevenlabs_url(),
            api_key_env: default_elevenlabs_key_env(),
            voice_id: default_voice_id(),
            model_id: default_voice_model(),
            stability: default_stability(),
            similarity_boost: default_similarity_boost(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_elevenlabs_url() -> String {
    ElevenLabsSettings::default().base_url
}

fn default_elevenlabs_key_env() -> String {
    "ELEVENLABS_API_KEY".to_string()
}

fn default_voice_id() -> String {
    DEFAULT_VOICE_ID.to_string()
}

fn default_voice_model() -> String {
    ElevenLabsSettings::default().model_id
}

fn default_stability() -> f32 {
    0.5
}

fn default_similarity_boost() -> f32 {
    0.75
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Agents listed in each top ranking.
    #[serde(default = "default_top_limit")]
    pub top_limit: usize,

    /// Satisfaction below this marks an agent for improvement.
    #[serde(default = "default_improvement_threshold")]
    pub improvement_threshold: f64,

    /// Only send the part of the data a question is about.
    #[serde(default = "default_true")]
    pub scope_by_query: bool,

    #[serde(default)]
    pub sentiment: SentimentPolicy,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            top_limit: default_top_limit(),
            improvement_threshold: default_improvement_threshold(),
            scope_by_query: true,
            sentiment: SentimentPolicy::default(),
        }
    }
}

fn default_top_limit() -> usize {
    3
}

fn default_improvement_threshold() -> f64 {
    4.5
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Word limit the model is asked to respect.
    #[serde(default = "default_max_words")]
    pub max_words: usize,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            max_words: default_max_words(),
        }
    }
}

fn default_max_words() -> usize {
    DEFAULT_MAX_WORDS
}

impl From<&ModelConfig> for GeminiSettings {
    fn from(config: &ModelConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            model: config.name.clone(),
            temperature: config.temperature,
            top_k: config.top_k,
            top_p: config.top_p,
            max_output_tokens: config.max_output_tokens,
            timeout_seconds: config.timeout_seconds,
        }
    }
}

impl From<&VoiceConfig> for ElevenLabsSettings {
    fn from(config: &VoiceConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            voice_id: config.voice_id.clone(),
            model_id: config.model_id.clone(),
            stability: config.stability,
            similarity_boost: config.similarity_boost,
            timeout_seconds: config.timeout_seconds,
        }
    }
}

impl TryFrom<&AnalysisConfig> for AnalysisSettings {
    type Error = AnalysisError;

    /// Applies the same range checks as the command line.
    fn try_from(config: &AnalysisConfig) -> Result<Self, Self::Error> {
        let threshold = config.improvement_threshold;
        if !threshold.is_finite() || !(0.0..=MAX_RATING).contains(&threshold) {
            return Err(AnalysisError::InvalidMetric(format!(
                "improvement_threshold must be between 0.0 and {:.1}, got {}",
                MAX_RATING, threshold
            )));
        }
        if config.top_limit == 0 {
            return Err(AnalysisError::InvalidMetric(
                "top_limit must be at least 1".to_string(),
            ));
        }
        config.sentiment.validate()?;

        Ok(Self {
            top_limit: config.top_limit,
            improvement_threshold: threshold,
            sentiment: config.sentiment,
            scope_by_query: config.scope_by_query,
        })
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only values given explicitly on the command line override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref data) = args.data {
            self.general.data_file = Some(data.display().to_string());
        }
        if let Some(locale) = args.locale {
            self.general.locale = locale;
        }
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
        if let Some(ref audio_dir) = args.audio_dir {
            self.general.audio_dir = audio_dir.display().to_string();
        }

        if let Some(ref model) = args.model {
            self.model.name = model.clone();
        }
        if let Some(ref url) = args.gemini_url {
            self.model.base_url = url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.model.timeout_seconds = timeout;
            self.voice.timeout_seconds = timeout;
        }

        if args.voice {
            self.voice.enabled = true;
        } else if args.no_voice {
            self.voice.enabled = false;
        }

        if let Some(threshold) = args.threshold {
            self.analysis.improvement_threshold = threshold;
        }
        if let Some(top) = args.top {
            // Negative values are rejected by Args::validate.
            self.analysis.top_limit = usize::try_from(top).unwrap_or(self.analysis.top_limit);
        }
        if let Some(max_words) = args.max_words {
            self.prompt.max_words = max_words;
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
