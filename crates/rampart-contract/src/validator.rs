//! The validator interface and the baseline specification validator.

use crate::report::{CapturedRequest, CapturedResponse, Coverage, Report};
use crate::spec::{Action, Specification};
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::sync::Arc;

/// Contract checker consumed by the proxy. Implementations are opaque to
/// the request pipeline: it hands over the captured exchange and records
/// whatever report comes back.
pub trait ContractValidator: Send + Sync {
    /// The specification currently validated against. Used to attribute
    /// synthesized reports when `test_against` itself fails.
    fn specification(&self) -> Arc<Specification>;

    fn test_against(
        &self,
        request: &CapturedRequest,
        response: &CapturedResponse,
    ) -> anyhow::Result<Report>;
}

/// Request headers every client or proxy hop adds; their presence says
/// nothing about the contract.
static STANDARD_REQUEST_HEADERS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "accept",
        "accept-encoding",
        "accept-language",
        "authorization",
        "cache-control",
        "connection",
        "content-length",
        "content-type",
        "cookie",
        "host",
        "origin",
        "referer",
        "transfer-encoding",
        "user-agent",
    ])
});

static STANDARD_RESPONSE_HEADERS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "access-control-allow-origin",
        "cache-control",
        "connection",
        "content-encoding",
        "content-length",
        "content-type",
        "date",
        "server",
        "set-cookie",
        "transfer-encoding",
        "vary",
    ])
});

/// Baseline validator: checks the captured exchange against the declared
/// surface of one specification snapshot. Cheap to construct per exchange.
pub struct SpecValidator {
    spec: Arc<Specification>,
    ignore_x_headers: bool,
}

impl SpecValidator {
    pub fn new(spec: Arc<Specification>) -> Self {
        Self {
            spec,
            ignore_x_headers: false,
        }
    }

    /// Exempt `X-`-prefixed headers from validation and usage tracking.
    pub fn ignore_x_headers(mut self, ignore: bool) -> Self {
        self.ignore_x_headers = ignore;
        self
    }

    fn check_request(
        &self,
        request: &CapturedRequest,
        action: &Action,
        path: &str,
        coverage: &mut Coverage,
        violations: &mut Vec<String>,
    ) {
        let method = &request.method;

        for name in parameter_names(request.query.as_deref().unwrap_or("")) {
            if action.query_parameters.iter().any(|p| p == &name) {
                coverage.add_query_parameter(&name, method, path);
            } else {
                violations.push(format!(
                    "Query parameter '{name}' is not defined for {method} {path}"
                ));
            }
        }

        for (name, _) in &request.headers {
            if self.skip_header(name) {
                continue;
            }
            if let Some(declared) = action
                .headers
                .iter()
                .find(|h| h.eq_ignore_ascii_case(name))
            {
                coverage.add_request_header(declared, method, path);
            } else {
                violations.push(format!(
                    "Header '{name}' is not defined for {method} {path}"
                ));
            }
        }

        let is_form = request
            .header("content-type")
            .map(|ct| ct.starts_with("application/x-www-form-urlencoded"))
            .unwrap_or(false);
        if is_form {
            let body = String::from_utf8_lossy(&request.body);
            for name in parameter_names(&body) {
                if action.form_parameters.iter().any(|p| p == &name) {
                    coverage.add_form_parameter(&name, method, path);
                } else {
                    violations.push(format!(
                        "Form parameter '{name}' is not defined for {method} {path}"
                    ));
                }
            }
        }
    }

    fn check_response(
        &self,
        response: &CapturedResponse,
        action: &Action,
        method: &str,
        path: &str,
        coverage: &mut Coverage,
        violations: &mut Vec<String>,
    ) {
        let declared = action.responses.iter().find(|r| r.status == response.status);
        match declared {
            Some(decl) => {
                coverage.add_response_code(decl.status, method, path);
                for (name, _) in &response.headers {
                    if STANDARD_RESPONSE_HEADERS.contains(name.to_ascii_lowercase().as_str()) {
                        continue;
                    }
                    if self.ignore_x_headers && name.to_ascii_lowercase().starts_with("x-") {
                        continue;
                    }
                    if let Some(h) = decl.headers.iter().find(|h| h.eq_ignore_ascii_case(name)) {
                        coverage.add_response_header(h, decl.status, method, path);
                    } else {
                        violations.push(format!(
                            "Response header '{name}' is not defined for {} in {method} {path}",
                            decl.status
                        ));
                    }
                }
            }
            None => violations.push(format!(
                "Response code {} is not defined for {method} {path}",
                response.status
            )),
        }
    }

    fn skip_header(&self, name: &str) -> bool {
        let lower = name.to_ascii_lowercase();
        STANDARD_REQUEST_HEADERS.contains(lower.as_str())
            || (self.ignore_x_headers && lower.starts_with("x-"))
    }
}

impl ContractValidator for SpecValidator {
    fn specification(&self) -> Arc<Specification> {
        Arc::clone(&self.spec)
    }

    fn test_against(
        &self,
        request: &CapturedRequest,
        response: &CapturedResponse,
    ) -> anyhow::Result<Report> {
        let mut coverage = Coverage::default();
        let mut request_violations = Vec::new();
        let mut response_violations = Vec::new();

        match self.spec.resource(&request.path) {
            None => request_violations.push(format!(
                "Resource '{}' is not defined in specification '{}'",
                request.path, self.spec.title
            )),
            Some(resource) => {
                coverage.add_resource(&resource.path);
                match resource.action(&request.method) {
                    None => request_violations.push(format!(
                        "Action {} is not defined on resource '{}'",
                        request.method, resource.path
                    )),
                    Some(action) => {
                        coverage.add_action(&action.method, &resource.path);
                        self.check_request(
                            request,
                            action,
                            &resource.path,
                            &mut coverage,
                            &mut request_violations,
                        );
                        self.check_response(
                            response,
                            action,
                            &action.method,
                            &resource.path,
                            &mut coverage,
                            &mut response_violations,
                        );
                    }
                }
            }
        }

        Ok(Report {
            specification: Arc::clone(&self.spec),
            request_violations,
            response_violations,
            coverage,
        })
    }
}

/// Names from an `application/x-www-form-urlencoded` style parameter
/// string, percent-decoded, in order of appearance.
fn parameter_names(raw: &str) -> Vec<String> {
    raw.split('&')
        .filter(|p| !p.is_empty())
        .map(|pair| pair.split_once('=').map(|(n, _)| n).unwrap_or(pair))
        .map(|name| {
            urlencoding::decode(name)
                .map(|d| d.into_owned())
                .unwrap_or_else(|_| name.to_string())
        })
        .collect()
}
