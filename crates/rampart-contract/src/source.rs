//! Specification fetching.
//!
//! A [`SpecSource`] remembers where a specification document lives (a
//! filesystem path or an http/https URI) so the proxy can re-fetch it on a
//! reload command without re-plumbing configuration.

use crate::spec::Specification;
use anyhow::Context;

#[derive(Debug, Clone)]
pub struct SpecSource {
    uri: String,
    base_uri: Option<String>,
    ignore_x_headers: bool,
}

impl SpecSource {
    pub fn new(
        uri: impl Into<String>,
        base_uri: Option<String>,
        ignore_x_headers: bool,
    ) -> Self {
        Self {
            uri: uri.into(),
            base_uri,
            ignore_x_headers,
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn ignore_x_headers(&self) -> bool {
        self.ignore_x_headers
    }

    /// Fetch and parse the document. A configured base URI overrides the
    /// one declared in the document.
    pub async fn fetch(&self) -> anyhow::Result<Specification> {
        let document = if self.uri.starts_with("http://") || self.uri.starts_with("https://") {
            reqwest::get(&self.uri)
                .await
                .with_context(|| format!("failed to fetch specification from {}", self.uri))?
                .error_for_status()
                .with_context(|| format!("specification fetch from {} failed", self.uri))?
                .text()
                .await
                .context("failed to read specification body")?
        } else {
            std::fs::read_to_string(&self.uri)
                .with_context(|| format!("failed to read specification file {}", self.uri))?
        };

        let mut spec = Specification::parse(&document)?;
        if self.base_uri.is_some() {
            spec.base_uri = self.base_uri.clone();
        }
        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn fetches_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "title: File Spec\nresources: []").unwrap();

        let source = SpecSource::new(file.path().to_string_lossy(), None, false);
        let spec = source.fetch().await.unwrap();
        assert_eq!(spec.title, "File Spec");
    }

    #[tokio::test]
    async fn base_uri_override_wins() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "title: T\nbase_uri: http://doc/v1\nresources: []").unwrap();

        let source = SpecSource::new(
            file.path().to_string_lossy(),
            Some("http://override/v2".into()),
            false,
        );
        let spec = source.fetch().await.unwrap();
        assert_eq!(spec.base_uri.as_deref(), Some("http://override/v2"));
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let source = SpecSource::new("/nonexistent/spec.yaml", None, false);
        assert!(source.fetch().await.is_err());
    }
}
