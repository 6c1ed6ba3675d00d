//! Report entries and their command-protocol document form.

use rampart_contract::{CapturedRequest, CapturedResponse, Report};
use serde::Serialize;
use std::collections::BTreeMap;

/// One recorded exchange: the validator's report plus defensive snapshots
/// of the request and response, taken at completion time. Destroyed only
/// by an explicit reports clear.
#[derive(Debug, Clone)]
pub struct ReportEntry {
    /// Monotonically increasing recording-order id, 0-based since the last
    /// reports clear.
    pub seq: u64,
    pub report: Report,
    pub request: CapturedRequest,
    pub response: CapturedResponse,
}

/// Wire form of a report entry, as returned by the `reports` command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEntryDocument {
    pub id: u64,
    pub request: String,
    pub request_headers: BTreeMap<String, Vec<String>>,
    pub request_violations: Vec<String>,
    pub response: String,
    pub response_headers: BTreeMap<String, Vec<String>>,
    pub response_violations: Vec<String>,
}

impl ReportEntry {
    pub fn to_document(&self) -> ReportEntryDocument {
        ReportEntryDocument {
            id: self.seq,
            request: self.request.request_line(),
            request_headers: group_headers(&self.request.headers),
            request_violations: self.report.request_violations.clone(),
            response: self.response.body_text(),
            response_headers: group_headers(&self.response.headers),
            response_violations: self.report.response_violations.clone(),
        }
    }
}

fn group_headers(headers: &[(String, String)]) -> BTreeMap<String, Vec<String>> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in headers {
        grouped.entry(name.clone()).or_default().push(value.clone());
    }
    grouped
}
