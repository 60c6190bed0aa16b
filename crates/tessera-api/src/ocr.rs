//! OCR by piping the image through the `tesseract` command-line tool.

use std::process::Stdio;

use tessera_types::{CollaboratorError, CollaboratorFuture, ImageData, TextExtractor};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Runs `<command> stdin stdout [-l <language>]` with the image on stdin.
pub struct TesseractOcr {
    command: String,
    language: Option<String>,
}

impl TesseractOcr {
    pub fn new(command: impl Into<String>, language: Option<String>) -> Self {
        Self {
            command: command.into(),
            language,
        }
    }

    fn args(&self) -> Vec<String> {
        let mut args = vec!["stdin".to_string(), "stdout".to_string()];
        if let Some(lang) = &self.language {
            args.push("-l".to_string());
            args.push(lang.clone());
        }
        args
    }
}

impl TextExtractor for TesseractOcr {
    fn extract_text<'a>(&'a self, image: &'a ImageData) -> CollaboratorFuture<'a, String> {
        Box::pin(async move {
            let mut child = Command::new(&self.command)
                .args(self.args())
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn()
                .map_err(|e| match e.kind() {
                    std::io::ErrorKind::NotFound => CollaboratorError::Unavailable {
                        name: self.command.clone(),
                        message: "command not found on PATH".into(),
                    },
                    _ => CollaboratorError::Io(e),
                })?;

            if let Some(mut stdin) = child.stdin.take() {
                // The process may exit before reading everything; its status tells us why.
                if let Err(e) = stdin.write_all(&image.bytes).await {
                    tracing::debug!("{} closed stdin early: {e}", self.command);
                }
            }

            let output = child.wait_with_output().await?;
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                return Err(CollaboratorError::Failed {
                    name: self.command.clone(),
                    message: if stderr.is_empty() {
                        format!("exited with {}", output.status)
                    } else {
                        stderr
                    },
                });
            }

            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        })
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}
