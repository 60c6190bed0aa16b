use std::path::PathBuf;
use tessera_session::LogError;
use thiserror::Error;

/// Errors that stop a feature handler.
///
/// Collaborator failures are not here: handlers degrade them to placeholders.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Audio file not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("Failed to load image: {0}")]
    ImageLoad(String),

    #[error(transparent)]
    Log(#[from] LogError),
}
