use crate::utils::error::{ReconError, Result};
use reqwest::Client;

/// Loads raw source bytes from a local path or an http(s) URL.
#[derive(Debug, Clone, Default)]
pub struct SourceReader {
    client: Client,
}

impl SourceReader {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    pub fn is_remote(location: &str) -> bool {
        let lower = location.trim_start().to_ascii_lowercase();
        lower.starts_with("http://") || lower.starts_with("https://")
    }

    pub async fn fetch(&self, location: &str) -> Result<Vec<u8>> {
        if Self::is_remote(location) {
            tracing::debug!("Downloading source: {}", location);
            let response = self.client.get(location).send().await?;
            let status = response.status();
            tracing::debug!("Source response status: {}", status);

            if !status.is_success() {
                return Err(ReconError::SourceFetchError {
                    location: location.to_string(),
                    status: status.as_u16(),
                });
            }
            Ok(response.bytes().await?.to_vec())
        } else {
            tracing::debug!("Reading source file: {}", location);
            Ok(tokio::fs::read(location).await?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_is_remote() {
        assert!(SourceReader::is_remote("https://erp.example.com/stock.csv"));
        assert!(SourceReader::is_remote("HTTP://wms.local/export"));
        assert!(!SourceReader::is_remote("./data/http_export.csv"));
        assert!(!SourceReader::is_remote("/tmp/stock.csv"));
    }

    #[tokio::test]
    async fn test_fetch_local_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"sku,qty\nA,1\n").unwrap();

        let data = SourceReader::new()
            .fetch(file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(data, b"sku,qty\nA,1\n");
    }

    #[tokio::test]
    async fn test_fetch_missing_file() {
        let err = SourceReader::new()
            .fetch("/definitely/not/here.csv")
            .await
            .unwrap_err();
        assert!(matches!(err, ReconError::IoError(_)));
    }

    #[tokio::test]
    async fn test_fetch_http_source() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/exports/wms.csv");
                then.status(200)
                    .header("Content-Type", "text/csv")
                    .body("sku,qty\nA,3\n");
            })
            .await;

        let data = SourceReader::new()
            .fetch(&server.url("/exports/wms.csv"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(data, b"sku,qty\nA,3\n");
    }

    #[tokio::test]
    async fn test_fetch_http_error_status() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/exports/erp.csv");
                then.status(503);
            })
            .await;

        let err = SourceReader::new()
            .fetch(&server.url("/exports/erp.csv"))
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert!(matches!(
            err,
            ReconError::SourceFetchError { status: 503, .. }
        ));
    }
}
