//! Log record types, one per feature.
//!
//! Each feature owns a JSON array file. The field names here are the on-disk
//! schema and must not change.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A feature that owns its own log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Chat,
    Speech,
    Image,
    Synthesis,
}

impl Feature {
    pub const ALL: [Feature; 4] = [
        Feature::Chat,
        Feature::Speech,
        Feature::Image,
        Feature::Synthesis,
    ];

    /// File name of this feature's log inside the outputs directory.
    pub fn log_file_name(self) -> &'static str {
        match self {
            Feature::Chat => "llm_log.json",
            Feature::Speech => "speech_log.json",
            Feature::Image => "image_log.json",
            Feature::Synthesis => "tts_log.json",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Feature::Chat => "chat",
            Feature::Speech => "speech",
            Feature::Image => "image",
            Feature::Synthesis => "synthesis",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Feature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chat" | "llm" => Ok(Feature::Chat),
            "speech" | "stt" => Ok(Feature::Speech),
            "image" => Ok(Feature::Image),
            "synthesis" | "tts" => Ok(Feature::Synthesis),
            other => Err(format!(
                "unknown feature '{other}' (expected chat, speech, image or synthesis)"
            )),
        }
    }
}

/// A record that belongs to exactly one feature log.
pub trait LogRecord: Serialize {
    const FEATURE: Feature;
}

/// Input modality that produced a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    Text,
    Voice,
    Image,
}

/// One generation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub timestamp: String,
    pub user_input: String,
    pub response: String,
    pub mode: InputMode,
}

impl LogRecord for ChatRecord {
    const FEATURE: Feature = Feature::Chat;
}

/// One speech recognition call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechRecord {
    pub timestamp: String,
    pub audio_file: String,
    pub recognized_text: String,
}

impl LogRecord for SpeechRecord {
    const FEATURE: Feature = Feature::Speech;
}

/// One image analysis (caption + OCR).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub timestamp: String,
    pub image_name: String,
    pub image_description: String,
    pub extracted_text: String,
}

impl LogRecord for ImageRecord {
    const FEATURE: Feature = Feature::Image;
}

/// One speech synthesis call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisRecord {
    pub timestamp: String,
    pub text: String,
    pub audio_file: String,
}

impl LogRecord for SynthesisRecord {
    const FEATURE: Feature = Feature::Synthesis;
}
