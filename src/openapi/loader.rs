//! Fetch and decode an API description from a local path, a `file://` URI or
//! an `http(s)://` URL. Documents are read with a hard size ceiling.

use std::path::PathBuf;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tracing::{debug, info};

use super::document::ApiDocument;
use crate::config::SpecSizeLimit;

/// Upper bound on fetching a remote document, connect through last byte
pub const SPEC_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("error reading file: {0}")]
    File(String),

    #[error("error getting spec: {0}")]
    Fetch(String),

    #[error("spec file too large (max {max} bytes)")]
    TooLarge { max: u64 },

    #[error("error parsing JSON: {0}")]
    Parse(String),
}

/// Where a spec document comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecSource {
    /// Local path, given directly or via a `file://` URI
    File(PathBuf),
    /// Remote document fetched with a GET request
    Url(String),
}

impl SpecSource {
    /// Classify a location string: `file://` prefix, then any `://`, else a plain path
    pub fn parse(location: &str) -> Self {
        if let Some(path) = location.strip_prefix("file://") {
            SpecSource::File(PathBuf::from(path))
        } else if location.contains("://") {
            SpecSource::Url(location.to_string())
        } else {
            SpecSource::File(PathBuf::from(location))
        }
    }
}

/// Load and decode the document at `location`
pub async fn load_spec(location: &str, limit: SpecSizeLimit) -> Result<ApiDocument, LoadError> {
    load_spec_with_timeout(location, limit, SPEC_FETCH_TIMEOUT).await
}

/// [`load_spec`] with an explicit fetch timeout for remote documents
pub async fn load_spec_with_timeout(
    location: &str,
    limit: SpecSizeLimit,
    timeout: Duration,
) -> Result<ApiDocument, LoadError> {
    let source = SpecSource::parse(location);
    debug!(source = ?source, max_bytes = limit.bytes(), "Loading API description");

    let bytes = match &source {
        SpecSource::File(path) => read_file(path, limit).await?,
        SpecSource::Url(url) => fetch_url(url, limit, timeout).await?,
    };

    let document = parse_document(&bytes)?;
    info!(
        spec = %location,
        bytes = bytes.len(),
        paths = document.paths.len(),
        operations = document.operation_count(),
        "Loaded API description"
    );
    Ok(document)
}

/// Decode raw JSON bytes into a document
pub fn parse_document(bytes: &[u8]) -> Result<ApiDocument, LoadError> {
    serde_json::from_slice(bytes).map_err(|e| LoadError::Parse(e.to_string()))
}

async fn read_file(path: &PathBuf, limit: SpecSizeLimit) -> Result<Vec<u8>, LoadError> {
    let file = tokio::fs::File::open(path).await.map_err(|e| LoadError::File(e.to_string()))?;

    // One byte over the limit is enough to detect an oversized document
    let mut buf = Vec::new();
    file.take(limit.bytes().saturating_add(1))
        .read_to_end(&mut buf)
        .await
        .map_err(|e| LoadError::File(e.to_string()))?;

    check_size(buf, limit)
}

async fn fetch_url(url: &str, limit: SpecSizeLimit, timeout: Duration) -> Result<Vec<u8>, LoadError> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LoadError::Fetch(e.to_string()))?;
    let mut response =
        client.get(url).send().await.map_err(|e| LoadError::Fetch(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(LoadError::Fetch(format!("status {}", status.as_u16())));
    }

    let mut buf = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(|e| LoadError::Fetch(e.to_string()))? {
        buf.extend_from_slice(&chunk);
        if buf.len() as u64 > limit.bytes() {
            return Err(LoadError::TooLarge { max: limit.bytes() });
        }
    }

    Ok(buf)
}

fn check_size(buf: Vec<u8>, limit: SpecSizeLimit) -> Result<Vec<u8>, LoadError> {
    if buf.len() as u64 > limit.bytes() {
        return Err(LoadError::TooLarge { max: limit.bytes() });
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_spec_source_classification() {
        assert_eq!(
            SpecSource::parse("file:///tmp/api.json"),
            SpecSource::File(PathBuf::from("/tmp/api.json"))
        );
        assert_eq!(
            SpecSource::parse("https://example.com/swagger.json"),
            SpecSource::Url("https://example.com/swagger.json".to_string())
        );
        assert_eq!(SpecSource::parse("./api.json"), SpecSource::File(PathBuf::from("./api.json")));
    }

    #[test]
    fn test_parse_document_invalid_json() {
        let err = parse_document(b"{not json").expect_err("should fail");
        assert!(err.to_string().starts_with("error parsing JSON:"));
    }

    #[tokio::test]
    async fn test_load_file_within_limit() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"swagger":"2.0","host":"api.example.com","paths":{{}}}}"#)
            .expect("write spec");

        let doc = load_spec(file.path().to_str().expect("utf8 path"), SpecSizeLimit::default())
            .await
            .expect("spec loads");
        assert_eq!(doc.host, "api.example.com");
    }

    #[tokio::test]
    async fn test_load_file_uri() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"openapi":"3.0.0","paths":{{}}}}"#).expect("write spec");
        let uri = format!("file://{}", file.path().display());

        let doc = load_spec(&uri, SpecSizeLimit::default()).await.expect("spec loads");
        assert!(doc.is_openapi());
    }

    #[tokio::test]
    async fn test_load_file_too_large() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(&[b' '; 200]).expect("write padding");

        let err = load_spec(file.path().to_str().expect("utf8 path"), SpecSizeLimit(150))
            .await
            .expect_err("should exceed limit");
        assert!(matches!(err, LoadError::TooLarge { max: 150 }));
        assert_eq!(err.to_string(), "spec file too large (max 150 bytes)");
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = load_spec("/definitely/not/here.json", SpecSizeLimit::default())
            .await
            .expect_err("missing file");
        assert!(err.to_string().starts_with("error reading file:"));
    }
}
