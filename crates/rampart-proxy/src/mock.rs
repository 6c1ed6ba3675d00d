//! Mock mode: resolve request paths to canned response files.
//!
//! The leading path segment is treated as an API version prefix and
//! dropped; the remainder names a file under the mock root. Candidates are
//! probed method-first (`GET_data.json` before `data.json`) so one path
//! can carry different canned answers per HTTP method.

use std::path::{Path, PathBuf};

const EXTENSIONS: [&str; 4] = ["json", "xml", "txt", "html"];

#[derive(Debug, thiserror::Error)]
pub enum MockError {
    #[error("no mock file for {method} {path}")]
    NotFound { method: String, path: String },
    #[error("failed to read mock file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug)]
pub struct MockResponse {
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

pub struct MockResolver {
    root: PathBuf,
}

impl MockResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn resolve(&self, method: &str, path: &str) -> Result<MockResponse, MockError> {
        let not_found = || MockError::NotFound {
            method: method.to_string(),
            path: path.to_string(),
        };

        let segments: Vec<&str> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        // refuse traversal out of the mock root
        if segments.iter().any(|s| *s == "..") {
            return Err(not_found());
        }
        // first segment is the version prefix; a bare "/v1" has no file part
        let (name, parents) = match segments.split_last() {
            Some((name, rest)) if !rest.is_empty() => (*name, &rest[1..]),
            _ => return Err(not_found()),
        };

        let mut dir = self.root.clone();
        for parent in parents {
            dir.push(parent);
        }

        for file in candidates(method, name) {
            let candidate = dir.join(&file);
            if candidate.is_file() {
                let body = std::fs::read(&candidate).map_err(|source| MockError::Io {
                    path: candidate.clone(),
                    source,
                })?;
                return Ok(MockResponse {
                    content_type: content_type_for(&candidate),
                    body,
                });
            }
        }
        Err(not_found())
    }
}

/// Probe order: method-qualified names win over plain ones, exact names
/// over extension guesses.
fn candidates(method: &str, name: &str) -> Vec<String> {
    let method = method.to_ascii_uppercase();
    let mut files = vec![format!("{method}_{name}")];
    files.extend(EXTENSIONS.iter().map(|ext| format!("{method}_{name}.{ext}")));
    files.push(name.to_string());
    files.extend(EXTENSIONS.iter().map(|ext| format!("{name}.{ext}")));
    files
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => "application/json",
        Some("xml") => "application/xml",
        Some("txt") => "text/plain",
        Some("html") => "text/html",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn mock_root() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("data.json"), "\"42\"").unwrap();
        fs::write(dir.path().join("POST_data.json"), "{\"created\": true}").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("leaf.txt"), "leaf").unwrap();
        dir
    }

    #[test]
    fn resolves_after_dropping_the_version_segment() {
        let root = mock_root();
        let resolver = MockResolver::new(root.path());
        let response = resolver.resolve("GET", "/v1/data").unwrap();
        assert_eq!(response.content_type, "application/json");
        assert_eq!(response.body, b"\"42\"");
    }

    #[test]
    fn method_qualified_file_wins() {
        let root = mock_root();
        let resolver = MockResolver::new(root.path());
        let response = resolver.resolve("POST", "/v1/data").unwrap();
        assert_eq!(response.body, b"{\"created\": true}");
        // GET falls back to the unqualified file
        let response = resolver.resolve("GET", "/v1/data").unwrap();
        assert_eq!(response.body, b"\"42\"");
    }

    #[test]
    fn nested_paths_map_to_subdirectories() {
        let root = mock_root();
        let resolver = MockResolver::new(root.path());
        let response = resolver.resolve("GET", "/v1/nested/leaf").unwrap();
        assert_eq!(response.content_type, "text/plain");
        assert_eq!(response.body, b"leaf");
    }

    #[test]
    fn missing_file_is_not_found() {
        let root = mock_root();
        let resolver = MockResolver::new(root.path());
        assert!(matches!(
            resolver.resolve("GET", "/v1/absent"),
            Err(MockError::NotFound { .. })
        ));
    }

    #[test]
    fn traversal_is_refused() {
        let root = mock_root();
        let resolver = MockResolver::new(root.path());
        assert!(matches!(
            resolver.resolve("GET", "/v1/../data"),
            Err(MockError::NotFound { .. })
        ));
    }

    #[test]
    fn bare_version_prefix_has_no_file() {
        let root = mock_root();
        let resolver = MockResolver::new(root.path());
        assert!(resolver.resolve("GET", "/v1").is_err());
        assert!(resolver.resolve("GET", "/").is_err());
    }
}
