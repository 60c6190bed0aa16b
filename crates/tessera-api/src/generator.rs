//! Text generation over `/chat/completions`.

use serde::Deserialize;
use serde_json::json;
use tessera_types::{CollaboratorError, CollaboratorFuture, Generator, Turn};

use crate::client::HttpClient;

/// Sampling parameters sent with every generation request.
#[derive(Debug, Clone, Copy)]
pub struct SamplingParams {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.95,
            max_tokens: 1000,
        }
    }
}

/// Generator backed by an OpenAI-compatible chat completions endpoint.
///
/// The whole conversation is resent on every call; the server sees prior
/// turns as `user`/`assistant` messages followed by the new input.
pub struct ChatCompletionsGenerator {
    client: HttpClient,
    model: String,
    params: SamplingParams,
}

impl ChatCompletionsGenerator {
    pub fn new(client: HttpClient, model: impl Into<String>, params: SamplingParams) -> Self {
        Self {
            client,
            model: model.into(),
            params,
        }
    }

    fn request_body(&self, context: &[Turn], input: &str) -> serde_json::Value {
        let mut messages: Vec<serde_json::Value> = context
            .iter()
            .map(|turn| json!({ "role": turn.role.as_str(), "content": turn.text }))
            .collect();
        messages.push(json!({ "role": "user", "content": input }));

        json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.params.temperature,
            "top_p": self.params.top_p,
            "max_tokens": self.params.max_tokens,
        })
    }
}

impl Generator for ChatCompletionsGenerator {
    fn generate<'a>(
        &'a self,
        context: &'a [Turn],
        input: &'a str,
    ) -> CollaboratorFuture<'a, String> {
        Box::pin(async move {
            let body = self.request_body(context, input);
            let response: ChatCompletion = self.client.post_json("chat/completions", &body).await?;
            let text = response.first_text()?;
            tracing::debug!(model = %self.model, chars = text.len(), "generation complete");
            Ok(text)
        })
    }

    fn name(&self) -> &str {
        "chat-completions"
    }
}

/// The subset of a chat completion response Tessera reads.
#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletion {
    /// Text of the first choice, trimmed.
    pub(crate) fn first_text(self) -> Result<String, CollaboratorError> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .ok_or_else(|| CollaboratorError::InvalidResponse("no choices in completion".into()))
    }
}
