//! Specification document model.
//!
//! A specification is the declared surface of an API: its resources, the
//! actions on each resource, and the parameters, headers and response codes
//! each action admits. Documents are YAML (JSON parses as a YAML subset).

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// An API specification, identified by its human-readable title.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Specification {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_uri: Option<String>,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

/// A resource: a path template with the actions declared on it.
///
/// Path segments wrapped in braces (`/orders/{id}`) match any single
/// concrete segment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Resource {
    pub path: String,
    #[serde(default)]
    pub actions: Vec<Action>,
}

/// One HTTP method on a resource together with its declared inputs and
/// responses.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Action {
    pub method: String,
    #[serde(default)]
    pub query_parameters: Vec<String>,
    #[serde(default)]
    pub headers: Vec<String>,
    #[serde(default)]
    pub form_parameters: Vec<String>,
    #[serde(default)]
    pub responses: Vec<ResponseDecl>,
}

/// A declared response: status code plus the headers it may carry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResponseDecl {
    pub status: u16,
    #[serde(default)]
    pub headers: Vec<String>,
}

impl Specification {
    /// Parse a specification document, normalizing method names to upper
    /// case. Fails on an empty title.
    pub fn parse(document: &str) -> anyhow::Result<Self> {
        let mut spec: Specification =
            serde_yaml::from_str(document).context("failed to parse specification document")?;
        if spec.title.trim().is_empty() {
            anyhow::bail!("specification has no title");
        }
        for resource in &mut spec.resources {
            for action in &mut resource.actions {
                action.method = action.method.to_ascii_uppercase();
            }
        }
        Ok(spec)
    }

    /// Find the resource whose path template matches `path`.
    pub fn resource(&self, path: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.matches(path))
    }
}

impl Resource {
    /// Segment-wise template match; `{placeholder}` segments match any
    /// single concrete segment.
    pub fn matches(&self, path: &str) -> bool {
        let declared: Vec<&str> = self.path.split('/').filter(|s| !s.is_empty()).collect();
        let actual: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        declared.len() == actual.len()
            && declared.iter().zip(&actual).all(|(d, a)| {
                (d.starts_with('{') && d.ends_with('}')) || d == a
            })
    }

    /// Find the action declared for `method` (upper-cased at parse time).
    pub fn action(&self, method: &str) -> Option<&Action> {
        self.actions
            .iter()
            .find(|a| a.method.eq_ignore_ascii_case(method))
    }
}
