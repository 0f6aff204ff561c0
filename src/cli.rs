//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::analysis::checked_limit;
use crate::models::MAX_RATING;
use crate::prompt::Locale;
use clap::Parser;
use std::path::PathBuf;

/// Dental Insights - analytics assistant for dental practices
///
/// Answers questions about agent performance and patient satisfaction
/// using Gemini, with optional ElevenLabs voice output. Markdown/JSON
/// insight reports. Built in Rust.
///
/// Examples:
///   dental-insights --ask "Who is our top performer?"
///   dental-insights --ask "Hasta memnuniyeti nasıl?" --locale tr --voice
///   dental-insights --interactive --data practice.json
///   dental-insights --insights --format json --output insights.json
///   dental-insights --ask "How are wait times?" --dry-run
///   dental-insights --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Ask a single question and print the answer
    #[arg(short, long, value_name = "TEXT")]
    pub ask: Option<String>,

    /// Start an interactive chat (commands: /insights, /clear, /voice, /quit)
    #[arg(short, long)]
    pub interactive: bool,

    /// Print the prompt for --ask without calling any external service
    #[arg(long, requires = "ask")]
    pub dry_run: bool,

    /// Write the insights and recommendations report
    #[arg(long)]
    pub insights: bool,

    /// Show the profile of one agent by id
    #[arg(long, value_name = "ID")]
    pub agent: Option<String>,

    /// List the voices available to the ElevenLabs account
    #[arg(long)]
    pub list_voices: bool,

    /// Practice data file (JSON). Defaults to the bundled sample data
    #[arg(short, long, value_name = "FILE", env = "DENTAL_INSIGHTS_DATA")]
    pub data: Option<PathBuf>,

    /// Language of prompts and fallback messages
    #[arg(short, long, value_name = "LOCALE")]
    pub locale: Option<Locale>,

    /// Output format for --insights and --agent (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Output file for --insights
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Synthesize speech for answers
    #[arg(long, conflicts_with = "no_voice")]
    pub voice: bool,

    /// Disable speech even if the config file enables it
    #[arg(long, conflicts_with = "voice")]
    pub no_voice: bool,

    /// Directory where synthesized speech is saved
    #[arg(long, value_name = "DIR")]
    pub audio_dir: Option<PathBuf>,

    /// Gemini model to use
    #[arg(short, long, env = "DENTAL_INSIGHTS_MODEL")]
    pub model: Option<String>,

    /// Gemini API base URL
    #[arg(long, value_name = "URL", env = "GEMINI_BASE_URL")]
    pub gemini_url: Option<String>,

    /// Satisfaction below this marks an agent for improvement (0.0 - 5.0)
    #[arg(long, value_name = "RATING")]
    pub threshold: Option<f64>,

    /// Number of agents listed in each top ranking
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub top: Option<i64>,

    /// Word limit the model is asked to respect
    #[arg(long, value_name = "WORDS")]
    pub max_words: Option<usize>,

    /// Request timeout in seconds for external services
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .dental-insights.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .dental-insights.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// What the invocation is asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Ask(String),
    Interactive,
    Insights,
    Agent(String),
    ListVoices,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The selected mode. Call after [`Args::validate`].
    pub fn mode(&self) -> Option<Mode> {
        if let Some(ref question) = self.ask {
            Some(Mode::Ask(question.clone()))
        } else if self.interactive {
            Some(Mode::Interactive)
        } else if self.insights {
            Some(Mode::Insights)
        } else if let Some(ref id) = self.agent {
            Some(Mode::Agent(id.clone()))
        } else if self.list_voices {
            Some(Mode::ListVoices)
        } else {
            None
        }
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        let modes = [
            self.ask.is_some(),
            self.interactive,
            self.insights,
            self.agent.is_some(),
            self.list_voices,
        ]
        .iter()
        .filter(|m| **m)
        .count();

        if modes == 0 {
            return Err(
                "Nothing to do: use --ask, --interactive, --insights, --agent or --list-voices"
                    .to_string(),
            );
        }
        if modes > 1 {
            return Err(
                "Use only one of --ask, --interactive, --insights, --agent and --list-voices"
                    .to_string(),
            );
        }

        if let Some(ref question) = self.ask {
            if question.trim().is_empty() {
                return Err("Question for --ask must not be empty".to_string());
            }
        }

        if let Some(ref url) = self.gemini_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Gemini URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(threshold) = self.threshold {
            if !threshold.is_finite() || !(0.0..=MAX_RATING).contains(&threshold) {
                return Err(format!("Threshold must be between 0.0 and {:.1}", MAX_RATING));
            }
        }

        if let Some(top) = self.top {
            checked_limit(top).map_err(|e| e.to_string())?;
            if top == 0 {
                return Err("Top must be at least 1".to_string());
            }
        }

        if self.max_words == Some(0) {
            return Err("Max words must be at least 1".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        // Validate timeout if provided
        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(ref data) = self.data {
            if !data.is_file() {
                return Err(format!("Data file does not exist: {}", data.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
