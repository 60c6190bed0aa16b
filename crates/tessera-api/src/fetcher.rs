use bytes::Bytes;
use tessera_types::{CollaboratorError, CollaboratorFuture, ImageFetcher};

use crate::client::HttpClient;

/// Fetches remote images with a plain GET.
pub struct HttpImageFetcher {
    client: HttpClient,
}

impl HttpImageFetcher {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

impl ImageFetcher for HttpImageFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> CollaboratorFuture<'a, Bytes> {
        Box::pin(async move {
            let bytes = self.client.get_bytes(url).await?;
            if bytes.is_empty() {
                return Err(CollaboratorError::InvalidResponse(format!(
                    "empty body from {url}"
                )));
            }
            Ok(bytes)
        })
    }
}
