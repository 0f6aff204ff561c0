//! Dental Insights - analytics assistant for dental practices
//!
//! A CLI tool that answers natural-language questions about agent
//! performance and patient satisfaction using Gemini, optionally reading
//! the answers aloud through ElevenLabs.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (configuration, data file, missing API key, etc.)
//!   2 - The text-generation service failed and a fallback answer was shown

mod analysis;
mod cli;
mod config;
mod dataset;
mod error;
mod gateway;
mod models;
mod prompt;
mod report;
mod session;

use analysis::{agent_profile, AnalysisSettings, Insight, PracticeAnalysis};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use cli::{Args, Mode, OutputFormat};
use config::{Config, DEFAULT_CONFIG_FILE};
use dataset::Dataset;
use gateway::{AudioClip, ElevenLabsClient, ElevenLabsSettings, GeminiClient, GeminiSettings};
use indicatif::{ProgressBar, ProgressStyle};
use report::InsightReport;
use session::{ChatReply, ChatSession, ReplyOutcome};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("Dental Insights v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .dental-insights.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   API keys are read from the environment variables named in [model] and [voice].");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Dispatch to the selected mode. Returns the process exit code.
async fn run(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let Some(mode) = args.mode() else {
        bail!("No mode selected");
    };

    if mode == Mode::ListVoices {
        return handle_list_voices(&config).await;
    }

    let (dataset, source) = load_dataset(&config)?;
    let settings =
        AnalysisSettings::try_from(&config.analysis).context("Invalid [analysis] configuration")?;

    match mode {
        Mode::Ask(question) if args.dry_run => {
            handle_dry_run(&dataset, &settings, &config, &question)
        }
        Mode::Ask(question) => run_ask(&dataset, settings, &config, &question, args.quiet).await,
        Mode::Interactive => run_interactive(&dataset, settings, &config).await,
        Mode::Insights => handle_insights(&dataset, &settings, &source, &args, &config),
        Mode::Agent(id) => handle_agent(&dataset, &id, args.format),
        Mode::ListVoices => Ok(0),
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}

/// Load the configured data file, or the bundled sample.
fn load_dataset(config: &Config) -> Result<(Dataset, String)> {
    match config.general.data_file {
        Some(ref path) => {
            let dataset = Dataset::load(Path::new(path))?;
            Ok((dataset, path.clone()))
        }
        None => {
            info!("No data file configured, using bundled sample data");
            Ok((Dataset::sample()?, "sample".to_string()))
        }
    }
}

fn build_session<'a>(
    dataset: &'a Dataset,
    settings: AnalysisSettings,
    config: &Config,
) -> Result<ChatSession<'a>> {
    let generator = GeminiClient::from_env(
        GeminiSettings::from(&config.model),
        &config.model.api_key_env,
    )
    .context("Cannot create the Gemini client")?;

    let mut session =
        ChatSession::new(dataset, settings, config.general.locale, Box::new(generator))
            .with_max_words(config.prompt.max_words);

    if config.voice.enabled {
        match ElevenLabsClient::from_env(
            ElevenLabsSettings::from(&config.voice),
            &config.voice.api_key_env,
        ) {
            Ok(client) => session = session.with_synthesizer(Box::new(client)),
            Err(e) => warn!("Voice output disabled: {}", e),
        }
    }

    Ok(session)
}

/// Handle --dry-run: print the prompt without calling any service.
fn handle_dry_run(
    dataset: &Dataset,
    settings: &AnalysisSettings,
    config: &Config,
    question: &str,
) -> Result<i32> {
    let context = prompt::PromptContext::assemble(dataset, question.trim(), settings, &[])?
        .with_max_words(config.prompt.max_words);
    let text = prompt::build(question, &context, config.general.locale);

    println!("{}", text);
    eprintln!("\n✅ Dry run complete. No external calls were made.");
    Ok(0)
}

async fn run_ask(
    dataset: &Dataset,
    settings: AnalysisSettings,
    config: &Config,
    question: &str,
    quiet: bool,
) -> Result<i32> {
    let mut session = build_session(dataset, settings, config)?;

    let spinner = spinner(quiet, "Thinking...");
    let reply = session.ask(question).await;
    spinner.finish_and_clear();

    let reply = reply?;
    print_reply(&reply, Path::new(&config.general.audio_dir));

    match reply.outcome {
        ReplyOutcome::Answered => Ok(0),
        ReplyOutcome::Fallback { error } => {
            eprintln!("\n⚠️  The answer service failed: {}", error);
            Ok(2)
        }
    }
}

async fn run_interactive(
    dataset: &Dataset,
    settings: AnalysisSettings,
    config: &Config,
) -> Result<i32> {
    let mut session = build_session(dataset, settings, config)?;
    let audio_dir = PathBuf::from(&config.general.audio_dir);

    println!(
        "🦷 Dental Insights ({}). Ask a question, or use /insights, /clear, /voice, /quit.",
        session.locale()
    );

    let mut insights: Vec<Insight> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n> ");
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next_line().await.context("Failed to read from stdin")? else {
            break;
        };
        let line = line.trim();

        match line {
            "" => continue,
            "/quit" | "/exit" => break,
            "/insights" => {
                if insights.is_empty() {
                    println!("No insights yet. Ask a question first.");
                }
                for insight in &insights {
                    println!("   • {}: {}", insight.title, insight.summary_text);
                }
            }
            "/clear" => {
                session.clear_history();
                println!("Conversation cleared.");
            }
            "/voice" => {
                let enabled = !session.voice_enabled();
                if session.set_voice_enabled(enabled) {
                    println!("🔊 Voice on.");
                } else if enabled {
                    println!("🔇 Voice is unavailable (enable [voice] and set the API key).");
                } else {
                    println!("🔇 Voice off.");
                }
            }
            question => {
                let spinner = spinner(false, "Thinking...");
                let reply = session.ask(question).await;
                spinner.finish_and_clear();

                let reply = reply?;
                print_reply(&reply, &audio_dir);
                if reply.is_fallback() {
                    debug!("Fallback reply: {:?}", reply.outcome);
                }
                insights = reply.insights;
            }
        }
    }

    Ok(0)
}

fn spinner(hidden: bool, message: &'static str) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn print_reply(reply: &ChatReply, audio_dir: &Path) {
    println!("\n{}", reply.text);

    if let Some(ref clip) = reply.audio {
        match save_audio(clip, audio_dir) {
            Ok(path) => println!("\n🔊 Audio saved to: {}", path.display()),
            Err(e) => warn!("Failed to save audio: {:#}", e),
        }
    }
}

/// Write a clip to `dir` under a timestamped name.
fn save_audio(clip: &AudioClip, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create audio directory {}", dir.display()))?;

    let name = format!(
        "answer-{}.{}",
        Utc::now().format("%Y%m%d-%H%M%S-%3f"),
        clip.extension()
    );
    let path = dir.join(name);
    std::fs::write(&path, &clip.bytes)
        .with_context(|| format!("Failed to write audio to {}", path.display()))?;

    Ok(path)
}

fn handle_insights(
    dataset: &Dataset,
    settings: &AnalysisSettings,
    source: &str,
    args: &Args,
    config: &Config,
) -> Result<i32> {
    let analysis = PracticeAnalysis::run(dataset, settings)?;
    let report = InsightReport::new(&analysis, source);

    let (content, default_ext) = match args.format {
        OutputFormat::Json => (report::generate_json_report(&report)?, "json"),
        OutputFormat::Markdown => (report::generate_markdown_report(&report), "md"),
    };

    let output = match args.output {
        Some(ref path) => path.clone(),
        None => PathBuf::from(&config.general.output).with_extension(default_ext),
    };
    report::write_report(&content, &output)?;

    println!(
        "\n📊 {} insights, {} recommendations",
        report.insights.len(),
        report.recommendations.len()
    );
    for insight in &report.insights {
        println!("   • {}: {}", insight.title, insight.summary_text);
    }
    println!("\n✅ Report saved to: {}", output.display());

    Ok(0)
}

fn handle_agent(dataset: &Dataset, id: &str, format: OutputFormat) -> Result<i32> {
    let Some(record) = dataset.agent(id) else {
        bail!("Unknown agent id: {}", id);
    };
    let Some(profile) = agent_profile(&dataset.agents, record.id()) else {
        bail!("Unknown agent id: {}", id);
    };
    let summary = analysis::summarize(&dataset.agents);

    let output = match format {
        OutputFormat::Json => report::generate_agent_json(&profile, &summary)?,
        OutputFormat::Markdown => report::generate_agent_markdown(&profile, &summary),
    };
    println!("{}", output);

    Ok(0)
}

async fn handle_list_voices(config: &Config) -> Result<i32> {
    let client = ElevenLabsClient::from_env(
        ElevenLabsSettings::from(&config.voice),
        &config.voice.api_key_env,
    )
    .context("Cannot create the ElevenLabs client")?;

    let voices = client.list_voices().await?;

    println!("🎙️  {} voices available:\n", voices.len());
    for voice in &voices {
        let marker = if voice.voice_id == config.voice.voice_id { "*" } else { " " };
        match voice.description {
            Some(ref description) => println!(
                " {} {}  {} - {}",
                marker, voice.voice_id, voice.name, description
            ),
            None => println!(" {} {}  {}", marker, voice.voice_id, voice.name),
        }
    }

    Ok(0)
}
