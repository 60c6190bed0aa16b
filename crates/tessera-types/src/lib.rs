//! Shared record types, collaborator traits and error hierarchy for Tessera.

pub mod collaborator;
pub mod error;
pub mod media;
pub mod message;
pub mod record;
pub mod util;

pub use collaborator::{
    Captioner, CollaboratorFuture, Generator, ImageFetcher, Synthesizer, TextExtractor,
    Transcriber,
};
pub use error::{CollaboratorError, ConfigError};
pub use media::{ImageData, ImageSource, sniff_media_type};
pub use message::{Role, Turn};
pub use record::{
    ChatRecord, Feature, ImageRecord, InputMode, LogRecord, SpeechRecord, SynthesisRecord,
};
pub use util::{timestamp_now, truncate_str};
