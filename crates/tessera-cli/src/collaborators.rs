//! Wiring the configured collaborator adapters into an orchestrator.

use std::sync::Arc;

use anyhow::{Context, Result};
use tessera_api::{
    ChatCompletionsGenerator, HttpCaptioner, HttpClient, HttpImageFetcher, HttpSynthesizer,
    HttpTranscriber, RetryConfig, SamplingParams, TesseractOcr,
};
use tessera_config::{Endpoint, TesseraConfig};
use tessera_core::{Collaborators, Orchestrator};

pub fn build_orchestrator(config: &TesseraConfig) -> Result<Orchestrator> {
    let generation = &config.generation;
    let generator = ChatCompletionsGenerator::new(
        http_client(&generation.endpoint, config.max_retries)?,
        &generation.endpoint.model,
        SamplingParams {
            temperature: generation.temperature,
            top_p: generation.top_p,
            max_tokens: generation.max_tokens,
        },
    );
    let transcriber = HttpTranscriber::new(
        http_client(&config.transcription, config.max_retries)?,
        &config.transcription.model,
    );
    let captioner = HttpCaptioner::new(
        http_client(&config.captioning.endpoint, config.max_retries)?,
        &config.captioning.endpoint.model,
        &config.captioning.prompt,
    );
    let synthesizer = HttpSynthesizer::new(
        http_client(&config.synthesis.endpoint, config.max_retries)?,
        &config.synthesis.endpoint.model,
        config.synthesis.voice.clone(),
    );
    let ocr = TesseractOcr::new(&config.ocr.command, config.ocr.language.clone());

    // Image URLs are absolute; the fetcher never sends the API key.
    let fetch_client = HttpClient::new(&generation.endpoint.base_url, None)
        .context("Failed to create image fetch client")?;

    tracing::debug!(
        generation = %generation.endpoint.base_url,
        transcription = %config.transcription.base_url,
        captioning = %config.captioning.endpoint.base_url,
        synthesis = %config.synthesis.endpoint.base_url,
        "collaborator endpoints"
    );

    Ok(Orchestrator::new(
        Collaborators {
            generator: Arc::new(generator),
            transcriber: Arc::new(transcriber),
            captioner: Arc::new(captioner),
            text_extractor: Arc::new(ocr),
            synthesizer: Arc::new(synthesizer),
            image_fetcher: Arc::new(HttpImageFetcher::new(fetch_client)),
        },
        config.outputs_dir.clone(),
        generation.context_window,
    ))
}

fn http_client(endpoint: &Endpoint, max_retries: u32) -> Result<HttpClient> {
    let client = HttpClient::new(&endpoint.base_url, endpoint.api_key.clone())
        .with_context(|| format!("Failed to create HTTP client for {}", endpoint.base_url))?;
    Ok(client.with_retry_config(RetryConfig {
        max_retries,
        ..RetryConfig::default()
    }))
}
