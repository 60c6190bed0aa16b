//! Resolving an [`ImageSource`] to bytes the collaborators can read.

use std::sync::Arc;

use bytes::Bytes;
use tessera_types::{ImageData, ImageFetcher, ImageSource, timestamp_now};

use crate::HandlerError;

/// Loads images from disk, from uploads, or over HTTP through an [`ImageFetcher`].
pub struct ImageLoader {
    fetcher: Arc<dyn ImageFetcher>,
}

impl ImageLoader {
    pub fn new(fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self { fetcher }
    }

    /// Load the image and check that the bytes are a recognised image format.
    ///
    /// The display name is the URL's last path segment, the file name of a
    /// path, or the client's upload name; nameless uploads get
    /// `uploaded_<timestamp>.jpg`.
    pub async fn load(&self, source: ImageSource) -> Result<ImageData, HandlerError> {
        let (name, bytes) = match source {
            ImageSource::Path(path) => {
                let bytes = tokio::fs::read(&path)
                    .await
                    .map_err(|e| HandlerError::ImageLoad(format!("{}: {e}", path.display())))?;
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(uploaded_name);
                (name, Bytes::from(bytes))
            }
            ImageSource::Url(url) => {
                let bytes = self
                    .fetcher
                    .fetch(&url)
                    .await
                    .map_err(|e| HandlerError::ImageLoad(format!("{url}: {e}")))?;
                (name_from_url(&url), bytes)
            }
            ImageSource::Upload { name, bytes } => {
                let name = name
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(uploaded_name);
                (name, bytes)
            }
        };

        let image = ImageData::from_bytes(name.as_str(), bytes).ok_or_else(|| {
            HandlerError::ImageLoad(format!("{name}: not a recognised image format"))
        })?;
        tracing::debug!(
            image = %image.name,
            media_type = %image.media_type,
            bytes = image.bytes.len(),
            "loaded image"
        );
        Ok(image)
    }
}

fn uploaded_name() -> String {
    format!("uploaded_{}.jpg", timestamp_now())
}

/// Last path segment of a URL, ignoring query and fragment.
fn name_from_url(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let after_scheme = without_query
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(without_query);
    match after_scheme.split_once('/') {
        Some((_, path)) => match path.rsplit('/').next() {
            Some(segment) if !segment.is_empty() => segment.to_string(),
            _ => uploaded_name(),
        },
        None => uploaded_name(),
    }
}
