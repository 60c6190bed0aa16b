//! Feature handlers for Tessera: chat, voice, image and speech synthesis.

mod error;
mod images;
mod orchestrator;
mod reply;

pub use error::HandlerError;
pub use images::ImageLoader;
pub use orchestrator::{Collaborators, Orchestrator};
pub use reply::{
    ChatReply, Degradation, ImageOutcome, ImageReply, Outcome, OutputType, SpeechOutcome, Stage,
    SynthesisReply, VoiceReply,
};
