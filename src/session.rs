//! A conversation with the assistant over one dataset.

use crate::analysis::{compose, AnalysisSettings, Insight};
use crate::dataset::Dataset;
use crate::error::{GatewayError, SessionError};
use crate::gateway::{AudioClip, SpeechSynthesizer, TextGenerator};
use crate::models::ChatTurn;
use crate::prompt::{build, Locale, PromptContext, Scaffolding, DEFAULT_MAX_WORDS};
use tracing::{debug, info, warn};

/// How a reply was produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyOutcome {
    Answered,
    /// The text-generation call failed and the locale fallback was returned.
    Fallback { error: GatewayError },
}

#[derive(Debug, Clone)]
pub struct ChatReply {
    pub text: String,
    pub outcome: ReplyOutcome,
    pub audio: Option<AudioClip>,
    /// Insights for the whole dataset, for display next to the answer.
    pub insights: Vec<Insight>,
}

impl ChatReply {
    pub fn is_fallback(&self) -> bool {
        matches!(self.outcome, ReplyOutcome::Fallback { .. })
    }
}

pub struct ChatSession<'a> {
    dataset: &'a Dataset,
    settings: AnalysisSettings,
    locale: Locale,
    max_words: usize,
    voice_enabled: bool,
    history: Vec<ChatTurn>,
    generator: Box<dyn TextGenerator + 'a>,
    synthesizer: Option<Box<dyn SpeechSynthesizer + 'a>>,
}

impl<'a> ChatSession<'a> {
    pub fn new(
        dataset: &'a Dataset,
        settings: AnalysisSettings,
        locale: Locale,
        generator: Box<dyn TextGenerator + 'a>,
    ) -> Self {
        Self {
            dataset,
            settings,
            locale,
            max_words: DEFAULT_MAX_WORDS,
            voice_enabled: false,
            history: Vec::new(),
            generator,
            synthesizer: None,
        }
    }

    /// Attach a speech synthesizer and enable voice output.
    pub fn with_synthesizer(mut self, synthesizer: Box<dyn SpeechSynthesizer + 'a>) -> Self {
        self.synthesizer = Some(synthesizer);
        self.voice_enabled = true;
        self
    }

    pub fn with_max_words(mut self, max_words: usize) -> Self {
        self.max_words = max_words;
        self
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        debug!("Clearing {} history turns", self.history.len());
        self.history.clear();
    }

    pub fn voice_enabled(&self) -> bool {
        self.voice_enabled
    }

    /// Toggle voice output. Returns the resulting state, which stays off
    /// when no synthesizer is attached.
    pub fn set_voice_enabled(&mut self, enabled: bool) -> bool {
        self.voice_enabled = enabled && self.synthesizer.is_some();
        self.voice_enabled
    }

    /// Everything the prompt for `message` is built from.
    fn context_for(&self, message: &str) -> Result<PromptContext<'a>, SessionError> {
        if message.is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        let context = PromptContext::assemble(self.dataset, message, &self.settings, &self.history)?
            .with_max_words(self.max_words);
        Ok(context)
    }

    /// Answer one question.
    ///
    /// Upstream failures never surface as `Err`: they produce the locale
    /// fallback text and leave the history untouched.
    pub async fn ask(&mut self, message: &str) -> Result<ChatReply, SessionError> {
        let message = message.trim();
        let context = self.context_for(message)?;
        let prompt = build(message, &context, self.locale);
        let insights = compose(&context.analysis);

        let text = match self.generator.generate(&prompt).await {
            Ok(text) => text.trim().to_string(),
            Err(error) => {
                warn!("Text generation failed: {}", error);
                return Ok(ChatReply {
                    text: Scaffolding::for_locale(self.locale).fallback_reply.to_string(),
                    outcome: ReplyOutcome::Fallback { error },
                    audio: None,
                    insights,
                });
            }
        };

        self.history.push(ChatTurn::user(message));
        self.history.push(ChatTurn::assistant(text.clone()));
        info!("Answered question ({} history turns)", self.history.len());

        let audio = self.speak(&text).await;

        Ok(ChatReply {
            text,
            outcome: ReplyOutcome::Answered,
            audio,
            insights,
        })
    }

    async fn speak(&self, text: &str) -> Option<AudioClip> {
        if !self.voice_enabled {
            return None;
        }
        let synthesizer = self.synthesizer.as_ref()?;

        match synthesizer.synthesize(text).await {
            Ok(clip) => Some(clip),
            Err(e) => {
                warn!("Speech synthesis failed, continuing with text only: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::PracticeAnalysis;
    use async_trait::async_trait;

    struct ScriptedGenerator(Result<String, GatewayError>);

    impl ScriptedGenerator {
        fn answering(text: &str) -> Self {
            Self(Ok(text.to_string()))
        }

        fn failing(error: GatewayError) -> Self {
            Self(Err(error))
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, GatewayError> {
            assert!(!prompt.is_empty());
            self.0.clone()
        }
    }

    struct FixedSynthesizer(Result<AudioClip, GatewayError>);

    #[async_trait]
    impl SpeechSynthesizer for FixedSynthesizer {
        async fn synthesize(&self, _text: &str) -> Result<AudioClip, GatewayError> {
            self.0.clone()
        }
    }

    fn clip() -> AudioClip {
        AudioClip {
            content_type: "audio/mpeg".to_string(),
            bytes: vec![1, 2, 3],
        }
    }

    fn session<'a>(dataset: &'a Dataset, generator: ScriptedGenerator) -> ChatSession<'a> {
        ChatSession::new(
            dataset,
            AnalysisSettings::default(),
            Locale::En,
            Box::new(generator),
        )
    }

    #[tokio::test]
    async fn test_ask_records_history() {
        let dataset = Dataset::sample().unwrap();
        let mut session = session(&dataset, ScriptedGenerator::answering(" Dr. Sarah Johnson. "));

        let reply = session.ask("Who is the top performer?").await.unwrap();

        assert_eq!(reply.outcome, ReplyOutcome::Answered);
        assert_eq!(reply.text, "Dr. Sarah Johnson.");
        assert!(reply.audio.is_none());
        assert!(!reply.insights.is_empty());
        assert_eq!(
            session.history(),
            &[
                ChatTurn::user("Who is the top performer?"),
                ChatTurn::assistant("Dr. Sarah Johnson."),
            ]
        );

        let context = session.context_for("And the second?").unwrap();
        let prompt = build("And the second?", &context, Locale::En);
        assert!(prompt.contains("user: Who is the top performer?"));
        assert!(prompt.contains("assistant: Dr. Sarah Johnson."));
    }

    #[tokio::test]
    async fn test_reply_insights_cover_whole_dataset() {
        let dataset = Dataset::sample().unwrap();
        let mut session = session(&dataset, ScriptedGenerator::answering("Wait times are 3.6."));

        let reply = session.ask("How are wait times in patient surveys?").await.unwrap();

        let analysis = PracticeAnalysis::run(&dataset, &AnalysisSettings::default()).unwrap();
        assert_eq!(reply.insights, compose(&analysis));
    }

    #[tokio::test]
    async fn test_ask_falls_back_on_upstream_error() {
        let dataset = Dataset::sample().unwrap();
        let error = GatewayError::Upstream {
            status: 503,
            message: "overloaded".to_string(),
        };
        let mut session = session(&dataset, ScriptedGenerator::failing(error.clone()));

        let reply = session.ask("How are we doing?").await.unwrap();

        assert!(reply.is_fallback());
        assert_eq!(reply.outcome, ReplyOutcome::Fallback { error });
        assert_eq!(
            reply.text,
            Scaffolding::for_locale(Locale::En).fallback_reply
        );
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_turkish_fallback_text() {
        let dataset = Dataset::sample().unwrap();
        let generator = ScriptedGenerator::failing(GatewayError::Transport("down".to_string()));
        let mut session = ChatSession::new(
            &dataset,
            AnalysisSettings::default(),
            Locale::Tr,
            Box::new(generator),
        );

        let reply = session.ask("Klinik nasıl?").await.unwrap();
        assert_eq!(reply.text, Scaffolding::for_locale(Locale::Tr).fallback_reply);
    }

    #[tokio::test]
    async fn test_speech_failure_keeps_text() {
        let dataset = Dataset::sample().unwrap();
        let mut session = session(&dataset, ScriptedGenerator::answering("All good."))
            .with_synthesizer(Box::new(FixedSynthesizer(Err(GatewayError::Upstream {
                status: 429,
                message: "quota".to_string(),
            }))));

        let reply = session.ask("Summary please").await.unwrap();

        assert_eq!(reply.outcome, ReplyOutcome::Answered);
        assert_eq!(reply.text, "All good.");
        assert!(reply.audio.is_none());
        assert_eq!(session.history().len(), 2);
    }

    #[tokio::test]
    async fn test_voice_toggle() {
        let dataset = Dataset::sample().unwrap();
        let mut session = session(&dataset, ScriptedGenerator::answering("Fine."))
            .with_synthesizer(Box::new(FixedSynthesizer(Ok(clip()))));

        let reply = session.ask("Summary").await.unwrap();
        assert_eq!(reply.audio, Some(clip()));

        assert!(!session.set_voice_enabled(false));
        let reply = session.ask("Again").await.unwrap();
        assert!(reply.audio.is_none());
    }

    #[test]
    fn test_voice_stays_off_without_synthesizer() {
        let dataset = Dataset::sample().unwrap();
        let mut session = session(&dataset, ScriptedGenerator::answering("x"));
        assert!(!session.set_voice_enabled(true));
        assert!(!session.voice_enabled());
    }

    #[test]
    fn test_empty_message_rejected() {
        let dataset = Dataset::sample().unwrap();
        let mut session = session(&dataset, ScriptedGenerator::answering("x"));

        let result = tokio_test::block_on(session.ask("   "));
        assert!(matches!(result, Err(SessionError::EmptyMessage)));
    }

    #[test]
    fn test_clear_history() {
        let dataset = Dataset::sample().unwrap();
        let mut session = session(&dataset, ScriptedGenerator::answering("Yes."));

        tokio_test::block_on(session.ask("Is wait time a problem?")).unwrap();
        assert_eq!(session.history().len(), 2);

        session.clear_history();
        assert!(session.history().is_empty());
    }
}
