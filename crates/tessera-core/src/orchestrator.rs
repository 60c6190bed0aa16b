//! The feature handlers: each composes collaborator calls with the
//! conversation and the feature logs.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tessera_session::{
    ContextInfo, ContextTracker, Conversation, LogStore, extend_and_generate,
};
use tessera_types::{
    Captioner, ChatRecord, CollaboratorError, Generator, ImageFetcher, ImageRecord, ImageSource,
    InputMode, SpeechRecord, SynthesisRecord, Synthesizer, TextExtractor, Transcriber,
    timestamp_now,
};
use tokio::sync::Mutex;

use crate::images::ImageLoader;
use crate::reply::{
    ChatReply, Degradation, ImageOutcome, ImageReply, OutputType, SpeechOutcome, Stage,
    SynthesisReply, VoiceReply,
};
use crate::HandlerError;

/// The external models the orchestrator delegates to.
pub struct Collaborators {
    pub generator: Arc<dyn Generator>,
    pub transcriber: Arc<dyn Transcriber>,
    pub captioner: Arc<dyn Captioner>,
    pub text_extractor: Arc<dyn TextExtractor>,
    pub synthesizer: Arc<dyn Synthesizer>,
    pub image_fetcher: Arc<dyn ImageFetcher>,
}

/// Runs the chat, voice, image and synthesis features.
///
/// Holds the single process-wide conversation and the log store. Both are
/// safe to share: wrap the orchestrator in an `Arc` and call handlers from
/// any task.
pub struct Orchestrator {
    generator: Arc<dyn Generator>,
    transcriber: Arc<dyn Transcriber>,
    captioner: Arc<dyn Captioner>,
    text_extractor: Arc<dyn TextExtractor>,
    synthesizer: Arc<dyn Synthesizer>,
    images: ImageLoader,
    log: LogStore,
    session: Mutex<Conversation>,
    tracker: ContextTracker,
    outputs_dir: PathBuf,
}

impl Orchestrator {
    /// Logs and synthesized audio go to `outputs_dir`.
    pub fn new(collaborators: Collaborators, outputs_dir: impl Into<PathBuf>, context_window: u64) -> Self {
        let outputs_dir = outputs_dir.into();
        Self {
            generator: collaborators.generator,
            transcriber: collaborators.transcriber,
            captioner: collaborators.captioner,
            text_extractor: collaborators.text_extractor,
            synthesizer: collaborators.synthesizer,
            images: ImageLoader::new(collaborators.image_fetcher),
            log: LogStore::new(outputs_dir.clone()),
            session: Mutex::new(Conversation::new()),
            tracker: ContextTracker::new(context_window),
            outputs_dir,
        }
    }

    pub fn outputs_dir(&self) -> &Path {
        &self.outputs_dir
    }

    pub fn log_store(&self) -> &LogStore {
        &self.log
    }

    pub fn context_tracker(&self) -> &ContextTracker {
        &self.tracker
    }

    /// Estimated context usage of the current conversation.
    pub async fn context_info(&self) -> ContextInfo {
        let session = self.session.lock().await;
        self.tracker.estimate(session.turns(), None)
    }

    /// One chat turn: generate, log, and optionally speak the response.
    pub async fn chat(
        &self,
        text: &str,
        output: OutputType,
        mode: InputMode,
    ) -> Result<ChatReply, HandlerError> {
        let mut degraded = Vec::new();

        // The slot stays locked until the record is written, so the chat log
        // lists turns in conversation order.
        let response = {
            let mut slot = self.session.lock().await;
            let response = self.generate(&mut slot, text, &mut degraded).await;
            self.log
                .record(&ChatRecord {
                    timestamp: timestamp_now(),
                    user_input: text.to_string(),
                    response: response.clone(),
                    mode,
                })
                .await?;
            response
        };

        let audio_file = if output.wants_audio() {
            self.speak(&response, &mut degraded).await?
        } else {
            None
        };

        tracing::info!(mode = ?mode, degraded = degraded.len(), "chat turn complete");
        Ok(ChatReply {
            input: text.to_string(),
            response,
            audio_file,
            degraded,
        })
    }

    /// Recognise speech in an audio file and log it.
    pub async fn transcribe(&self, audio_path: &Path) -> Result<SpeechOutcome, HandlerError> {
        if !tokio::fs::try_exists(audio_path).await.unwrap_or(false) {
            return Err(HandlerError::MissingInput(audio_path.to_path_buf()));
        }

        let mut degraded = Vec::new();
        let recognized_text = match self.transcriber.transcribe(audio_path).await {
            Ok(text) => text,
            Err(e) => degrade(Stage::Transcription, e, &mut degraded),
        };

        let record = SpeechRecord {
            timestamp: timestamp_now(),
            audio_file: audio_path.display().to_string(),
            recognized_text,
        };
        self.log.record(&record).await?;
        Ok(SpeechOutcome { record, degraded })
    }

    /// Transcribe, then chat with the recognised text.
    pub async fn voice(
        &self,
        audio_path: &Path,
        output: OutputType,
    ) -> Result<VoiceReply, HandlerError> {
        let speech = self.transcribe(audio_path).await?;
        let chat = self
            .chat(&speech.record.recognized_text, output, InputMode::Voice)
            .await?;

        let mut degraded = speech.degraded;
        degraded.extend(chat.degraded);
        Ok(VoiceReply {
            input_voice_text: speech.record.recognized_text,
            response: chat.response,
            audio_file: chat.audio_file,
            degraded,
        })
    }

    /// Caption an image and extract its text, then log the analysis.
    pub async fn analyze_image(&self, source: ImageSource) -> Result<ImageOutcome, HandlerError> {
        let image = self.images.load(source).await?;

        let (caption, ocr) = tokio::join!(
            self.captioner.caption(&image),
            self.text_extractor.extract_text(&image)
        );

        let mut degraded = Vec::new();
        let image_description = match caption {
            Ok(text) => text,
            Err(e) => degrade(Stage::Captioning, e, &mut degraded),
        };
        let extracted_text = match ocr {
            Ok(text) => text,
            Err(e) => degrade(Stage::Ocr, e, &mut degraded),
        };

        let record = ImageRecord {
            timestamp: timestamp_now(),
            image_name: image.name,
            image_description,
            extracted_text,
        };
        self.log.record(&record).await?;
        Ok(ImageOutcome { record, degraded })
    }

    /// Analyse an image, then chat about its description and text.
    pub async fn image(
        &self,
        source: ImageSource,
        output: OutputType,
    ) -> Result<ImageReply, HandlerError> {
        let analysis = self.analyze_image(source).await?;
        let prompt = format!(
            "{} {}",
            analysis.record.image_description, analysis.record.extracted_text
        );
        let chat = self.chat(&prompt, output, InputMode::Image).await?;

        let mut degraded = analysis.degraded;
        degraded.extend(chat.degraded);
        Ok(ImageReply {
            image_analysis: analysis.record,
            response: chat.response,
            audio_file: chat.audio_file,
            degraded,
        })
    }

    /// Speak `text` into `tts_<timestamp>.wav` under the outputs directory.
    pub async fn synthesize(&self, text: &str) -> Result<SynthesisReply, HandlerError> {
        let mut degraded = Vec::new();
        let audio_file = self.speak(text, &mut degraded).await?;
        Ok(SynthesisReply {
            text: text.to_string(),
            audio_file,
            degraded,
        })
    }

    /// Generate a response, keeping the conversation in its slot on failure.
    async fn generate(
        &self,
        slot: &mut Conversation,
        text: &str,
        degraded: &mut Vec<Degradation>,
    ) -> String {
        let info = self.tracker.estimate(slot.turns(), Some(text));
        if info.is_over_limit() {
            tracing::warn!(
                "Conversation exceeds the context window: {}",
                self.tracker.format_brief(&info)
            );
        }

        // Work on a copy so a dropped request leaves the slot untouched.
        match extend_and_generate(slot.clone(), self.generator.as_ref(), text).await {
            Ok((session, response)) => {
                *slot = session;
                response
            }
            Err(err) => {
                let (_, source) = err.into_parts();
                degrade(Stage::Generation, source, degraded)
            }
        }
    }

    /// Synthesize speech and log it. A failed synthesis yields `None`.
    async fn speak(
        &self,
        text: &str,
        degraded: &mut Vec<Degradation>,
    ) -> Result<Option<String>, HandlerError> {
        let timestamp = timestamp_now();
        let path = self.outputs_dir.join(format!("tts_{timestamp}.wav"));

        if let Err(e) = self.synthesizer.synthesize(text, &path).await {
            degrade(Stage::Synthesis, e, degraded);
            return Ok(None);
        }

        let audio_file = path.display().to_string();
        self.log
            .record(&SynthesisRecord {
                timestamp,
                text: text.to_string(),
                audio_file: audio_file.clone(),
            })
            .await?;
        Ok(Some(audio_file))
    }
}

/// Record a collaborator failure and return its placeholder text.
fn degrade(stage: Stage, error: CollaboratorError, degraded: &mut Vec<Degradation>) -> String {
    tracing::warn!(stage = ?stage, "collaborator failed: {error}");
    let degradation = Degradation {
        stage,
        message: error.to_string(),
    };
    let placeholder = degradation.placeholder();
    degraded.push(degradation);
    placeholder
}
