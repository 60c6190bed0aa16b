//! Speech-to-text over `/audio/transcriptions`.

use std::path::Path;

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tessera_types::{CollaboratorFuture, Transcriber};

use crate::client::HttpClient;

pub struct HttpTranscriber {
    client: HttpClient,
    model: String,
}

#[derive(Debug, Deserialize)]
struct Transcription {
    text: String,
}

impl HttpTranscriber {
    pub fn new(client: HttpClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

impl Transcriber for HttpTranscriber {
    fn transcribe<'a>(&'a self, audio_path: &'a Path) -> CollaboratorFuture<'a, String> {
        Box::pin(async move {
            let audio = tokio::fs::read(audio_path).await?;
            let file_name = audio_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "audio.wav".to_string());
            tracing::debug!(file = %file_name, bytes = audio.len(), "transcribing");

            let response: Transcription = self
                .client
                .post_multipart("audio/transcriptions", || {
                    Form::new()
                        .text("model", self.model.clone())
                        .part("file", Part::bytes(audio.clone()).file_name(file_name.clone()))
                })
                .await?;
            Ok(response.text.trim().to_string())
        })
    }

    fn name(&self) -> &str {
        "transcriber"
    }
}
