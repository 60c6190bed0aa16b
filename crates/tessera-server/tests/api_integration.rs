//! Drives the HTTP API over a real socket with mock collaborators behind it.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tessera_core::{Collaborators, Orchestrator};
use tessera_server::{AppState, create_router};
use tessera_types::{
    Captioner, CollaboratorError, CollaboratorFuture, Generator, ImageData, ImageFetcher,
    Synthesizer, TextExtractor, Transcriber, Turn,
};

const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

struct Echo;

impl Generator for Echo {
    fn generate<'a>(&'a self, context: &'a [Turn], input: &'a str) -> CollaboratorFuture<'a, String> {
        let reply = format!("[{}] {input}", context.len());
        Box::pin(async move { Ok(reply) })
    }

    fn name(&self) -> &str {
        "echo"
    }
}

struct Stt;

impl Transcriber for Stt {
    fn transcribe<'a>(&'a self, audio_path: &'a Path) -> CollaboratorFuture<'a, String> {
        Box::pin(async move {
            let bytes = tokio::fs::read(audio_path).await?;
            Ok(format!("heard {} bytes", bytes.len()))
        })
    }

    fn name(&self) -> &str {
        "stt"
    }
}

struct Caption;

impl Captioner for Caption {
    fn caption<'a>(&'a self, image: &'a ImageData) -> CollaboratorFuture<'a, String> {
        let caption = format!("a picture called {}", image.name);
        Box::pin(async move { Ok(caption) })
    }

    fn name(&self) -> &str {
        "caption"
    }
}

struct NoOcr;

impl TextExtractor for NoOcr {
    fn extract_text<'a>(&'a self, _image: &'a ImageData) -> CollaboratorFuture<'a, String> {
        Box::pin(async {
            Err(CollaboratorError::Unavailable {
                name: "tesseract".into(),
                message: "command not found on PATH".into(),
            })
        })
    }

    fn name(&self) -> &str {
        "no-ocr"
    }
}

struct Tts;

impl Synthesizer for Tts {
    fn synthesize<'a>(&'a self, _text: &'a str, output_path: &'a Path) -> CollaboratorFuture<'a, ()> {
        Box::pin(async move {
            tokio::fs::write(output_path, b"RIFF\0\0\0\0WAVE").await?;
            Ok(())
        })
    }

    fn name(&self) -> &str {
        "tts"
    }
}

struct NoFetch;

impl ImageFetcher for NoFetch {
    fn fetch<'a>(&'a self, url: &'a str) -> CollaboratorFuture<'a, Bytes> {
        Box::pin(async move {
            Err(CollaboratorError::Server {
                status: 404,
                message: format!("{url} not found"),
            })
        })
    }
}

/// Serve the router on an ephemeral port; returns its base URL.
async fn start_server(outputs: &Path) -> String {
    let orchestrator = Orchestrator::new(
        Collaborators {
            generator: Arc::new(Echo),
            transcriber: Arc::new(Stt),
            captioner: Arc::new(Caption),
            text_extractor: Arc::new(NoOcr),
            synthesizer: Arc::new(Tts),
            image_fetcher: Arc::new(NoFetch),
        },
        outputs,
        1000,
    );
    let app = create_router(AppState::new(Arc::new(orchestrator)));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn home_and_health() {
    let tmp = tempfile::tempdir().unwrap();
    let base = start_server(tmp.path()).await;

    let home: Value = reqwest::get(&base).await.unwrap().json().await.unwrap();
    assert_eq!(home["message"], "Multimodal Intelligent API running");

    let health: Value = reqwest::get(format!("{base}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
}

#[tokio::test]
async fn chat_text_then_audio() {
    let tmp = tempfile::tempdir().unwrap();
    let base = start_server(tmp.path()).await;
    let client = reqwest::Client::new();

    let first: Value = client
        .post(format!("{base}/chat"))
        .form(&[("text", "hello")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(first["input"], "hello");
    assert_eq!(first["response"], "[0] hello");
    assert!(first.get("audio_file").is_none());
    assert!(first.get("degraded").is_none());

    let second: Value = client
        .post(format!("{base}/chat"))
        .form(&[("text", "again"), ("output_type", "both")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(second["response"], "[2] again");
    let audio_file = second["audio_file"].as_str().unwrap();
    let file_name = Path::new(audio_file).file_name().unwrap().to_str().unwrap();

    let audio = client
        .get(format!("{base}/audio/{file_name}"))
        .send()
        .await
        .unwrap();
    assert_eq!(audio.status(), 200);
    assert_eq!(audio.headers()["content-type"], "audio/wav");
    assert_eq!(&audio.bytes().await.unwrap()[..], &b"RIFF\0\0\0\0WAVE"[..]);
}

#[tokio::test]
async fn chat_without_text_is_bad_request() {
    let tmp = tempfile::tempdir().unwrap();
    let base = start_server(tmp.path()).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/chat"))
        .form(&[("output_type", "text")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["type"], "invalid_request_error");
}

#[tokio::test]
async fn voice_upload_is_saved_and_transcribed() {
    let tmp = tempfile::tempdir().unwrap();
    let base = start_server(tmp.path()).await;

    let form = Form::new()
        .part(
            "file",
            Part::bytes(b"RIFF1234".to_vec()).file_name("question.wav"),
        )
        .text("output_type", "text");
    let reply: Value = reqwest::Client::new()
        .post(format!("{base}/voice"))
        .multipart(form)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(reply["input_voice_text"], "heard 8 bytes");
    assert_eq!(reply["response"], "[0] heard 8 bytes");
    assert!(tmp.path().join("uploads").join("question.wav").exists());

    let speech: Value =
        serde_json::from_str(&std::fs::read_to_string(tmp.path().join("speech_log.json")).unwrap())
            .unwrap();
    assert_eq!(speech.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn upload_named_like_a_log_keeps_the_log() {
    let tmp = tempfile::tempdir().unwrap();
    let base = start_server(tmp.path()).await;
    let client = reqwest::Client::new();

    for text in ["hello", "again"] {
        let response = client
            .post(format!("{base}/chat"))
            .form(&[("text", text)])
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    let form = Form::new()
        .part("file", Part::bytes(b"RIFF1234".to_vec()).file_name("llm_log.json"))
        .text("output_type", "text");
    let response = client
        .post(format!("{base}/voice"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let chat: Value =
        serde_json::from_str(&std::fs::read_to_string(tmp.path().join("llm_log.json")).unwrap())
            .unwrap();
    let entries = chat.as_array().unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["user_input"], "hello");
    assert_eq!(entries[1]["user_input"], "again");
    assert_eq!(entries[2]["user_input"], "heard 8 bytes");
    assert_eq!(
        std::fs::read(tmp.path().join("uploads").join("llm_log.json")).unwrap(),
        b"RIFF1234"
    );
}

#[tokio::test]
async fn image_upload_reports_degraded_ocr() {
    let tmp = tempfile::tempdir().unwrap();
    let base = start_server(tmp.path()).await;

    let form = Form::new().part("file", Part::bytes(PNG.to_vec()).file_name("chart.png"));
    let reply: Value = reqwest::Client::new()
        .post(format!("{base}/image"))
        .multipart(form)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let analysis = &reply["image_analysis"];
    assert_eq!(analysis["image_name"], "chart.png");
    assert_eq!(analysis["image_description"], "a picture called chart.png");
    assert!(analysis["extracted_text"].as_str().unwrap().starts_with("OCR failed: "));
    assert_eq!(reply["degraded"][0]["stage"], "ocr");
    assert!(tmp.path().join("uploads").join("chart.png").exists());
}

#[tokio::test]
async fn image_url_fetch_failure_is_bad_request() {
    let tmp = tempfile::tempdir().unwrap();
    let base = start_server(tmp.path()).await;

    let form = Form::new().text("url", "https://example.com/missing.png");
    let response = reqwest::Client::new()
        .post(format!("{base}/image"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(
        body["error"]["message"]
            .as_str()
            .unwrap()
            .starts_with("Failed to load image: ")
    );
}

#[tokio::test]
async fn image_url_must_be_http() {
    let tmp = tempfile::tempdir().unwrap();
    let base = start_server(tmp.path().join("outputs").as_path()).await;
    let secret = tmp.path().join("private.png");
    std::fs::write(&secret, PNG).unwrap();

    for url in [secret.display().to_string(), format!("file://{}", secret.display())] {
        let form = Form::new().text("url", url);
        let response = reqwest::Client::new()
            .post(format!("{base}/image"))
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"]["type"], "invalid_request_error");
    }
    assert!(!tmp.path().join("outputs").join("image_log.json").exists());
}

#[tokio::test]
async fn synthesize_returns_record() {
    let tmp = tempfile::tempdir().unwrap();
    let base = start_server(tmp.path()).await;

    let reply: Value = reqwest::Client::new()
        .post(format!("{base}/synthesize"))
        .form(&[("text", "good night")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(reply["text"], "good night");
    assert!(reply["audio_file"].as_str().unwrap().ends_with(".wav"));
    assert!(tmp.path().join("tts_log.json").exists());
}

#[tokio::test]
async fn unknown_audio_is_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    let base = start_server(tmp.path()).await;

    let response = reqwest::get(format!("{base}/audio/nothing.wav")).await.unwrap();
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["message"], "Audio file not found");
}
