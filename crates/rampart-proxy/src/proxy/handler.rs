//! The per-request pipeline.
//!
//! Command-protocol traffic is dispatched and returns immediately - no
//! delay, no forwarding, no validation. Everything else waits out the
//! sampled delay, goes to the backend or the mock resolver, and is then
//! snapshotted, validated and recorded. Contract testing never fails the
//! client-visible exchange.

use super::context::{ProxyState, TargetMode};
use super::forwarding::forward;
use super::response::{apply_cors, RawResponse};
use crate::commands::{dispatch, has_ignore_marker, is_command_path};
use crate::mock::{MockError, MockResolver};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::header::ORIGIN;
use hyper::http::request::Parts;
use hyper::{Request, Response, StatusCode};
use rampart_contract::{
    CapturedRequest, CapturedResponse, ContractValidator, Coverage, Report, Specification,
};
use std::sync::Arc;
use tracing::{debug, error, warn};

pub async fn handle_request<B: Body>(
    state: &ProxyState,
    req: Request<B>,
) -> Response<Full<Bytes>> {
    let origin = req.headers().get(ORIGIN).cloned();

    if is_command_path(req.uri().path()) && !has_ignore_marker(req.headers()) {
        let response = dispatch(state, req.uri()).await;
        return apply_cors(response, origin);
    }

    state.delay.apply().await;

    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => {
            warn!("failed to buffer request body, validating an empty one");
            Bytes::new()
        }
    };
    let captured_request = capture_request(&parts, &body);

    let raw = match &state.mode {
        TargetMode::Proxy { upstream, client } => forward(client, &parts, body, upstream).await,
        TargetMode::Mock { resolver } => serve_mock(resolver, &parts),
    };

    let captured_response = raw.capture();
    record_exchange(state, captured_request, captured_response);

    apply_cors(raw.into_response(), origin)
}

fn capture_request(parts: &Parts, body: &Bytes) -> CapturedRequest {
    CapturedRequest {
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_string),
        headers: parts
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect(),
        body: body.to_vec(),
    }
}

fn serve_mock(resolver: &MockResolver, parts: &Parts) -> RawResponse {
    match resolver.resolve(parts.method.as_str(), parts.uri.path()) {
        Ok(mock) => RawResponse::new(StatusCode::OK, mock.content_type, mock.body),
        Err(e @ MockError::NotFound { .. }) => {
            debug!("{e}");
            RawResponse::new(StatusCode::NOT_FOUND, "text/plain", e.to_string())
        }
        Err(e) => {
            error!("{e}");
            RawResponse::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "text/plain",
                "failed to read mock file".to_string(),
            )
        }
    }
}

/// Validate and record one completed exchange. A validator failure is
/// itself recorded as a violation instead of being lost or surfaced to the
/// client.
fn record_exchange(state: &ProxyState, request: CapturedRequest, response: CapturedResponse) {
    let report = match state.validator.test_against(&request, &response) {
        Ok(report) => report,
        Err(e) => {
            error!("contract validator failed: {e:#}");
            failure_report(state.validator.specification(), &e)
        }
    };
    state.aggregator.add_report(report, request, response);
}

fn failure_report(spec: Arc<Specification>, error: &anyhow::Error) -> Report {
    Report {
        specification: spec,
        request_violations: vec![format!("Validator failed: {error:#}")],
        response_violations: vec![],
        coverage: Coverage::default(),
    }
}
