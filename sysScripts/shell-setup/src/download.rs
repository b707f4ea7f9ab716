use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Fetches `url` into `dest`. Returns the number of bytes written once the
/// whole body is on disk.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, url: &str, dest: &Path) -> Result<u64>;
}

pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?
            .error_for_status()
            .with_context(|| format!("Server rejected {}", url))?;

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let mut file = fs::File::create(dest)
            .await
            .with_context(|| format!("Failed to create file: {}", dest.display()))?;

        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await.context("Failed to read response body")? {
            file.write_all(&chunk)
                .await
                .with_context(|| format!("Failed to write to file: {}", dest.display()))?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        debug!(url, dest = %dest.display(), bytes = written, "download complete");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    use super::*;

    #[tokio::test]
    async fn writes_body_to_destination() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3.2.1/CascadiaCode.zip"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK\x03\x04payload".to_vec()))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let dest = dir.path().join("nested/CascadiaCode.zip");
        let url = format!("{}/v3.2.1/CascadiaCode.zip", server.uri());

        let written = HttpDownloader::new().unwrap().download(&url, &dest).await.unwrap();
        assert_eq!(written, 11);
        assert_eq!(std::fs::read(&dest).unwrap(), b"PK\x03\x04payload");
    }

    #[tokio::test]
    async fn http_error_status_fails_without_creating_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let dest = dir.path().join("Missing.zip");
        let url = format!("{}/v0.0.0/Missing.zip", server.uri());

        let err = HttpDownloader::new().unwrap().download(&url, &dest).await.unwrap_err();
        assert!(format!("{:#}", err).contains("404"));
        assert!(!dest.exists());
    }
}
