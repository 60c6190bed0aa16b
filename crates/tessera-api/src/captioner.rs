//! Image captioning through a vision-capable chat completions endpoint.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::json;
use tessera_types::{Captioner, CollaboratorFuture, ImageData};

use crate::client::HttpClient;
use crate::generator::ChatCompletion;

/// Captions are one sentence; this bounds runaway output.
const CAPTION_MAX_TOKENS: u32 = 60;

pub struct HttpCaptioner {
    client: HttpClient,
    model: String,
    prompt: String,
}

impl HttpCaptioner {
    pub fn new(client: HttpClient, model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            prompt: prompt.into(),
        }
    }

    fn request_body(&self, image: &ImageData) -> serde_json::Value {
        let data_url = format!(
            "data:{};base64,{}",
            image.media_type,
            STANDARD.encode(&image.bytes)
        );
        json!({
            "model": self.model,
            "max_tokens": CAPTION_MAX_TOKENS,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": self.prompt },
                    { "type": "image_url", "image_url": { "url": data_url } },
                ],
            }],
        })
    }
}

impl Captioner for HttpCaptioner {
    fn caption<'a>(&'a self, image: &'a ImageData) -> CollaboratorFuture<'a, String> {
        Box::pin(async move {
            let body = self.request_body(image);
            let response: ChatCompletion = self.client.post_json("chat/completions", &body).await?;
            response.first_text()
        })
    }

    fn name(&self) -> &str {
        "captioner"
    }
}
