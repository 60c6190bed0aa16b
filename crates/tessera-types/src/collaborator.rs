//! Traits for the external model collaborators.
//!
//! Every capability Tessera orchestrates (generation, speech recognition,
//! captioning, OCR, synthesis) sits behind one of these traits. They are
//! dyn-compatible so the orchestrator can hold `Arc<dyn Generator>` and friends,
//! and tests can swap in mocks.

use crate::{CollaboratorError, ImageData, Turn};
use bytes::Bytes;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;

/// A boxed future returned by every collaborator call.
pub type CollaboratorFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, CollaboratorError>> + Send + 'a>>;

/// Text generation over an accumulated conversation.
pub trait Generator: Send + Sync {
    /// Generate a reply to `input` given every prior turn in `context`.
    fn generate<'a>(&'a self, context: &'a [Turn], input: &'a str)
    -> CollaboratorFuture<'a, String>;

    /// Collaborator name for logging (e.g. "chat-completions").
    fn name(&self) -> &str;
}

/// Speech-to-text over an audio file on disk.
pub trait Transcriber: Send + Sync {
    fn transcribe<'a>(&'a self, audio_path: &'a Path) -> CollaboratorFuture<'a, String>;

    fn name(&self) -> &str;
}

/// One-line natural-language description of an image.
pub trait Captioner: Send + Sync {
    fn caption<'a>(&'a self, image: &'a ImageData) -> CollaboratorFuture<'a, String>;

    fn name(&self) -> &str;
}

/// Optical character recognition.
pub trait TextExtractor: Send + Sync {
    fn extract_text<'a>(&'a self, image: &'a ImageData) -> CollaboratorFuture<'a, String>;

    fn name(&self) -> &str;
}

/// Text-to-speech. The implementation writes the audio to `output_path`.
pub trait Synthesizer: Send + Sync {
    fn synthesize<'a>(&'a self, text: &'a str, output_path: &'a Path)
    -> CollaboratorFuture<'a, ()>;

    fn name(&self) -> &str;
}

/// Downloads a remote image by URL.
pub trait ImageFetcher: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a str) -> CollaboratorFuture<'a, Bytes>;
}
