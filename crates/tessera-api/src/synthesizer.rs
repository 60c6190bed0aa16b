//! Text-to-speech over `/audio/speech`.

use std::path::Path;

use serde_json::json;
use tessera_types::{CollaboratorError, CollaboratorFuture, Synthesizer};

use crate::client::HttpClient;

/// Synthesizer that asks the server for WAV audio and writes it to disk.
pub struct HttpSynthesizer {
    client: HttpClient,
    model: String,
    voice: Option<String>,
}

impl HttpSynthesizer {
    pub fn new(client: HttpClient, model: impl Into<String>, voice: Option<String>) -> Self {
        Self {
            client,
            model: model.into(),
            voice,
        }
    }

    fn request_body(&self, text: &str) -> serde_json::Value {
        let mut body = json!({
            "model": self.model,
            "input": text,
            "response_format": "wav",
        });
        if let Some(voice) = &self.voice {
            body["voice"] = json!(voice);
        }
        body
    }
}

impl Synthesizer for HttpSynthesizer {
    fn synthesize<'a>(&'a self, text: &'a str, output_path: &'a Path) -> CollaboratorFuture<'a, ()> {
        Box::pin(async move {
            let audio = self
                .client
                .post_json_bytes("audio/speech", &self.request_body(text))
                .await?;
            if audio.is_empty() {
                return Err(CollaboratorError::InvalidResponse("empty audio body".into()));
            }
            if let Some(parent) = output_path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(output_path, &audio).await?;
            tracing::debug!(path = %output_path.display(), bytes = audio.len(), "wrote speech");
            Ok(())
        })
    }

    fn name(&self) -> &str {
        "synthesizer"
    }
}
