//! Adapters that connect Tessera's collaborator traits to real model servers.
//!
//! Generation, transcription, captioning and synthesis speak the
//! OpenAI-compatible HTTP API. OCR shells out to the `tesseract` binary.

mod backoff;
mod captioner;
mod client;
mod fetcher;
mod generator;
mod ocr;
mod synthesizer;
mod transcriber;

pub use backoff::RetryConfig;
pub use captioner::HttpCaptioner;
pub use client::HttpClient;
pub use fetcher::HttpImageFetcher;
pub use generator::{ChatCompletionsGenerator, SamplingParams};
pub use ocr::TesseractOcr;
pub use synthesizer::HttpSynthesizer;
pub use transcriber::HttpTranscriber;
