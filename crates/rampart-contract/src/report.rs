//! Violation reports and captured exchange snapshots.

use crate::spec::Specification;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Buffered copy of a request, taken at exchange completion time. The live
/// request is not safe to read once the exchange has been served.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    /// The request line as it appears in command-protocol output, e.g.
    /// `GET /v1/data?q=1`.
    pub fn request_line(&self) -> String {
        match &self.query {
            Some(q) => format!("{} {}?{}", self.method, self.path, q),
            None => format!("{} {}", self.method, self.path),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Buffered copy of a response, taken at exchange completion time.
#[derive(Debug, Clone)]
pub struct CapturedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CapturedResponse {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// The specification elements one exchange touched (or, for the declared
/// side of usage accounting, the elements a specification admits).
///
/// Element descriptions are plain strings so the seven sets serialize
/// directly into the usage document.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Coverage {
    pub resources: BTreeSet<String>,
    pub actions: BTreeSet<String>,
    pub request_headers: BTreeSet<String>,
    pub query_parameters: BTreeSet<String>,
    pub form_parameters: BTreeSet<String>,
    pub response_headers: BTreeSet<String>,
    pub response_codes: BTreeSet<String>,
}

impl Coverage {
    pub fn add_resource(&mut self, path: &str) {
        self.resources.insert(path.to_string());
    }

    pub fn add_action(&mut self, method: &str, path: &str) {
        self.actions.insert(format!("{method} {path}"));
    }

    pub fn add_query_parameter(&mut self, name: &str, method: &str, path: &str) {
        self.query_parameters
            .insert(format!("{name} in {method} {path}"));
    }

    pub fn add_request_header(&mut self, name: &str, method: &str, path: &str) {
        self.request_headers
            .insert(format!("{name} in {method} {path}"));
    }

    pub fn add_form_parameter(&mut self, name: &str, method: &str, path: &str) {
        self.form_parameters
            .insert(format!("{name} in {method} {path}"));
    }

    pub fn add_response_code(&mut self, status: u16, method: &str, path: &str) {
        self.response_codes
            .insert(format!("{status} in {method} {path}"));
    }

    pub fn add_response_header(&mut self, name: &str, status: u16, method: &str, path: &str) {
        self.response_headers
            .insert(format!("{name} in {status} {method} {path}"));
    }

    /// Monotonic union: everything in `other` is added to `self`.
    pub fn union_with(&mut self, other: &Coverage) {
        self.resources.extend(other.resources.iter().cloned());
        self.actions.extend(other.actions.iter().cloned());
        self.request_headers
            .extend(other.request_headers.iter().cloned());
        self.query_parameters
            .extend(other.query_parameters.iter().cloned());
        self.form_parameters
            .extend(other.form_parameters.iter().cloned());
        self.response_headers
            .extend(other.response_headers.iter().cloned());
        self.response_codes
            .extend(other.response_codes.iter().cloned());
    }

    /// Set difference per element kind: `self` minus `other`.
    pub fn difference(&self, other: &Coverage) -> Coverage {
        fn diff(a: &BTreeSet<String>, b: &BTreeSet<String>) -> BTreeSet<String> {
            a.difference(b).cloned().collect()
        }
        Coverage {
            resources: diff(&self.resources, &other.resources),
            actions: diff(&self.actions, &other.actions),
            request_headers: diff(&self.request_headers, &other.request_headers),
            query_parameters: diff(&self.query_parameters, &other.query_parameters),
            form_parameters: diff(&self.form_parameters, &other.form_parameters),
            response_headers: diff(&self.response_headers, &other.response_headers),
            response_codes: diff(&self.response_codes, &other.response_codes),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
            && self.actions.is_empty()
            && self.request_headers.is_empty()
            && self.query_parameters.is_empty()
            && self.form_parameters.is_empty()
            && self.response_headers.is_empty()
            && self.response_codes.is_empty()
    }
}

/// The outcome of validating one exchange. Immutable once produced.
#[derive(Debug, Clone)]
pub struct Report {
    /// The specification the exchange was checked against.
    pub specification: Arc<Specification>,
    pub request_violations: Vec<String>,
    pub response_violations: Vec<String>,
    pub coverage: Coverage,
}

impl Report {
    pub fn title(&self) -> &str {
        &self.specification.title
    }

    /// True when the exchange conformed: no violations on either side.
    pub fn is_empty(&self) -> bool {
        self.request_violations.is_empty() && self.response_violations.is_empty()
    }
}
