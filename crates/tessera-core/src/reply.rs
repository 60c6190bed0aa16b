//! What handlers hand back to the front ends.

use serde::Serialize;
use tessera_types::{ImageRecord, SpeechRecord};

/// Which outputs a chat-producing handler should return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputType {
    #[default]
    Text,
    Audio,
    Both,
}

impl OutputType {
    /// Parse leniently: anything unrecognised is `Text`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "audio" => OutputType::Audio,
            "both" => OutputType::Both,
            _ => OutputType::Text,
        }
    }

    pub fn wants_audio(self) -> bool {
        matches!(self, OutputType::Audio | OutputType::Both)
    }
}

/// Pipeline step whose collaborator failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Generation,
    Transcription,
    Captioning,
    Ocr,
    Synthesis,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Generation => "generation",
            Stage::Transcription => "transcription",
            Stage::Captioning => "captioning",
            Stage::Ocr => "ocr",
            Stage::Synthesis => "synthesis",
        }
    }

    /// Prefix used for the placeholder text stored in place of the output.
    pub(crate) fn placeholder_prefix(self) -> &'static str {
        match self {
            Stage::Generation => "Generation failed",
            Stage::Transcription => "Transcription failed",
            Stage::Captioning => "Caption generation failed",
            Stage::Ocr => "OCR failed",
            Stage::Synthesis => "Synthesis failed",
        }
    }
}

/// A collaborator failure that was replaced by a placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Degradation {
    pub stage: Stage,
    pub message: String,
}

impl Degradation {
    pub fn placeholder(&self) -> String {
        format!("{}: {}", self.stage.placeholder_prefix(), self.message)
    }
}

/// A logged record plus whatever degraded while producing it.
#[derive(Debug, Clone)]
pub struct Outcome<R> {
    pub record: R,
    pub degraded: Vec<Degradation>,
}

pub type SpeechOutcome = Outcome<SpeechRecord>;
pub type ImageOutcome = Outcome<ImageRecord>;

#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub input: String,
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_file: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<Degradation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VoiceReply {
    pub input_voice_text: String,
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_file: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<Degradation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageReply {
    pub image_analysis: ImageRecord,
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_file: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<Degradation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SynthesisReply {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_file: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<Degradation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_type_is_lenient() {
        assert_eq!(OutputType::parse("audio"), OutputType::Audio);
        assert_eq!(OutputType::parse(" BOTH "), OutputType::Both);
        assert_eq!(OutputType::parse("text"), OutputType::Text);
        assert_eq!(OutputType::parse("video"), OutputType::Text);
        assert_eq!(OutputType::parse(""), OutputType::Text);
        assert!(OutputType::Both.wants_audio());
        assert!(!OutputType::Text.wants_audio());
    }

    #[test]
    fn placeholders_match_stage() {
        let d = Degradation {
            stage: Stage::Captioning,
            message: "timeout".into(),
        };
        assert_eq!(d.placeholder(), "Caption generation failed: timeout");
        let d = Degradation {
            stage: Stage::Ocr,
            message: "no binary".into(),
        };
        assert_eq!(d.placeholder(), "OCR failed: no binary");
    }

    #[test]
    fn optional_fields_are_omitted() {
        let reply = ChatReply {
            input: "hi".into(),
            response: "hello".into(),
            audio_file: None,
            degraded: Vec::new(),
        };
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json, serde_json::json!({ "input": "hi", "response": "hello" }));

        let reply = ChatReply {
            audio_file: Some("outputs/tts_1.wav".into()),
            degraded: vec![Degradation {
                stage: Stage::Generation,
                message: "down".into(),
            }],
            ..reply
        };
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["audio_file"], "outputs/tts_1.wav");
        assert_eq!(json["degraded"][0]["stage"], "generation");
    }
}
