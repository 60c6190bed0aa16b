//! Image inputs handed to the captioning and OCR collaborators.

use bytes::Bytes;
use std::path::PathBuf;

/// Where an image comes from before it is loaded.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// A file on the local filesystem.
    Path(PathBuf),
    /// A remote image fetched over HTTP(S).
    Url(String),
    /// Bytes received directly from a client, with the client's file name if any.
    Upload { name: Option<String>, bytes: Bytes },
}

impl ImageSource {
    /// Interpret a user-supplied string as a URL or a local path.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim().trim_matches(|c| c == '"' || c == '\'');
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            ImageSource::Url(trimmed.to_string())
        } else {
            ImageSource::Path(PathBuf::from(trimmed))
        }
    }
}

/// A loaded image ready for the collaborators.
#[derive(Debug, Clone)]
pub struct ImageData {
    /// Display name recorded in the image log.
    pub name: String,
    pub media_type: String,
    pub bytes: Bytes,
}

impl ImageData {
    /// Wrap bytes whose leading magic identifies an image format.
    ///
    /// Returns `None` for anything that is not a recognised image.
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Bytes>) -> Option<Self> {
        let bytes = bytes.into();
        let media_type = sniff_media_type(&bytes)?;
        Some(Self {
            name: name.into(),
            media_type: media_type.to_string(),
            bytes,
        })
    }
}

/// Identify an image format from its leading magic bytes.
pub fn sniff_media_type(bytes: &[u8]) -> Option<&'static str> {
    const SIGNATURES: &[(&[u8], &str)] = &[
        (b"\x89PNG\r\n\x1a\n", "image/png"),
        (b"\xFF\xD8\xFF", "image/jpeg"),
        (b"GIF87a", "image/gif"),
        (b"GIF89a", "image/gif"),
        (b"BM", "image/bmp"),
        (b"II*\0", "image/tiff"),
        (b"MM\0*", "image/tiff"),
    ];
    if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    SIGNATURES
        .iter()
        .find(|(magic, _)| bytes.starts_with(magic))
        .map(|(_, media_type)| *media_type)
}
