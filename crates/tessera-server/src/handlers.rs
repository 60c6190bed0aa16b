//! Route handlers. Each one parses the request, calls the orchestrator and
//! returns its reply as JSON.

use std::path::{Path, PathBuf};

use axum::{
    Form, Json,
    extract::{Multipart, Path as UrlPath, State},
    http::header,
    response::IntoResponse,
};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{Value, json};
use tessera_core::{ChatReply, ImageReply, OutputType, SynthesisReply, VoiceReply};
use tessera_types::{ImageSource, InputMode, timestamp_now};
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

/// Subdirectory of the outputs directory that holds client uploads, kept
/// apart from the feature logs.
const UPLOADS_DIR: &str = "uploads";

pub async fn home() -> Json<Value> {
    Json(json!({ "message": "Multimodal Intelligent API running" }))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
pub struct ChatForm {
    text: Option<String>,
    output_type: Option<String>,
}

pub async fn chat(
    State(state): State<AppState>,
    Form(form): Form<ChatForm>,
) -> Result<Json<ChatReply>, ApiError> {
    let text = form
        .text
        .ok_or_else(|| ApiError::bad_request("Missing `text` field"))?;
    let output = OutputType::parse(form.output_type.as_deref().unwrap_or_default());
    info!("Chat request: {} chars", text.len());

    let reply = state.orchestrator.chat(&text, output, InputMode::Text).await?;
    Ok(Json(reply))
}

#[derive(Debug, Deserialize)]
pub struct SynthesizeForm {
    text: Option<String>,
}

pub async fn synthesize(
    State(state): State<AppState>,
    Form(form): Form<SynthesizeForm>,
) -> Result<Json<SynthesisReply>, ApiError> {
    let text = form
        .text
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing `text` field"))?;
    info!("Synthesis request: {} chars", text.len());

    let reply = state.orchestrator.synthesize(&text).await?;
    Ok(Json(reply))
}

pub async fn voice(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<VoiceReply>, ApiError> {
    let form = read_upload_form(multipart).await?;
    let upload = form
        .file
        .ok_or_else(|| ApiError::bad_request("Missing `file` field"))?;
    info!("Voice request: {} bytes", upload.bytes.len());

    let name = upload
        .name
        .unwrap_or_else(|| format!("recording_{}.wav", timestamp_now()));
    let path = save_upload(state.orchestrator.outputs_dir(), &name, &upload.bytes).await?;

    let reply = state.orchestrator.voice(&path, form.output).await?;
    Ok(Json(reply))
}

pub async fn image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ImageReply>, ApiError> {
    let form = read_upload_form(multipart).await?;

    let source = match (form.file, form.url) {
        (Some(upload), _) => {
            info!("Image request: {} bytes", upload.bytes.len());
            if let Some(name) = &upload.name {
                save_upload(state.orchestrator.outputs_dir(), name, &upload.bytes).await?;
            }
            ImageSource::Upload {
                name: upload.name,
                bytes: upload.bytes,
            }
        }
        (None, Some(url)) => {
            let url = url.trim();
            if !is_http_url(url) {
                return Err(ApiError::bad_request(
                    "`url` must be an http:// or https:// URL",
                ));
            }
            info!("Image request: {url}");
            ImageSource::Url(url.to_string())
        }
        (None, None) => return Err(ApiError::bad_request("Missing `file` or `url` field")),
    };

    let reply = state.orchestrator.image(source, form.output).await?;
    Ok(Json(reply))
}

pub async fn audio(
    State(state): State<AppState>,
    UrlPath(filename): UrlPath<String>,
) -> Result<impl IntoResponse, ApiError> {
    let name = sanitize_file_name(&filename)
        .filter(|name| *name == filename)
        .ok_or_else(|| ApiError::not_found("Audio file not found"))?;
    let path = state.orchestrator.outputs_dir().join(name);

    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok(([(header::CONTENT_TYPE, "audio/wav")], bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ApiError::not_found("Audio file not found"))
        }
        Err(e) => Err(ApiError::internal(format!(
            "Failed to read {}: {e}",
            path.display()
        ))),
    }
}

struct UploadedFile {
    /// Client-supplied file name, already stripped of directories.
    name: Option<String>,
    bytes: Bytes,
}

#[derive(Default)]
struct UploadForm {
    file: Option<UploadedFile>,
    url: Option<String>,
    output: OutputType,
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed reading multipart field: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().and_then(sanitize_file_name);
                let bytes = field.bytes().await.map_err(|e| {
                    ApiError::bad_request(format!("Failed reading multipart 'file' field: {e}"))
                })?;
                if !bytes.is_empty() {
                    form.file = Some(UploadedFile {
                        name: file_name,
                        bytes,
                    });
                }
            }
            "url" | "output_type" => {
                let text = field.text().await.map_err(|e| {
                    ApiError::bad_request(format!("Failed reading multipart '{name}' field: {e}"))
                })?;
                if name == "url" {
                    form.url = Some(text).filter(|t| !t.trim().is_empty());
                } else {
                    form.output = OutputType::parse(&text);
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

fn is_http_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    ["http://", "https://"]
        .iter()
        .any(|scheme| lower.len() > scheme.len() && lower.starts_with(scheme))
}

/// Keep only the final path component of a client-supplied name.
fn sanitize_file_name(name: &str) -> Option<String> {
    let last = name.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    match Path::new(last).file_name() {
        Some(file_name) if !last.is_empty() && last != "." && last != ".." => {
            Some(file_name.to_string_lossy().into_owned())
        }
        _ => None,
    }
}

/// Write an upload to `<outputs>/uploads/<name>`.
async fn save_upload(outputs_dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf, ApiError> {
    let dir = outputs_dir.join(UPLOADS_DIR);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create {}: {e}", dir.display())))?;
    let path = dir.join(name);
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to save {}: {e}", path.display())))?;
    Ok(path)
}
