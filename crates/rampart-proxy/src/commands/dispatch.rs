//! Command execution against the aggregator and the server lifecycle.

use super::{
    command_name, query_flag, Command, CLEAR_REPORTS_PARAM, CLEAR_USAGE_PARAM, CONTENT_TYPE_TEXT,
};
use crate::proxy::context::ProxyState;
use crate::proxy::response::RawResponse;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode, Uri};
use tracing::{info, warn};

/// Execute the command named by the request path and compose the side
/// clears requested through the query string.
///
/// Unknown commands short-circuit with an empty body: the request is never
/// forwarded or validated, so a typo in an operator script cannot reach
/// the real backend.
pub async fn dispatch(state: &ProxyState, uri: &Uri) -> Response<Full<Bytes>> {
    let name = command_name(uri.path());
    let command = Command::parse(name);
    let content_type = command
        .map(|c| c.content_type())
        .unwrap_or(CONTENT_TYPE_TEXT);
    let mut body = String::new();

    match command {
        None => warn!(command = name, "unknown proxy command, answering with empty body"),
        Some(Command::Ping) => body.push_str("Pong"),
        Some(Command::Reload) => match state.validator.reload().await {
            Ok(spec) => {
                info!("reload published specification '{}'", spec.title);
                body.push_str("Reloaded specification");
            }
            Err(e) => {
                warn!("specification reload failed: {e:#}");
                body.push_str(&format!("Reload failed: {e:#}"));
            }
        },
        Some(Command::Stop) => {
            body.push_str("Stopping proxy");
            state.lifecycle.stop_after_grace();
        }
        Some(Command::Usage) => body.push_str(&to_json(&state.aggregator.usage_document())),
        Some(Command::Reports) => body.push_str(&to_json(&state.aggregator.reports_document())),
        Some(Command::ClearReports) => {
            state.aggregator.flush_reports();
            body.push_str("Reports cleared");
        }
        Some(Command::ClearUsage) => {
            state.aggregator.flush_usage();
            body.push_str("Usage cleared");
        }
    }

    // side clears compose with any primary command, each with its own
    // confirmation line
    if query_flag(uri.query(), CLEAR_REPORTS_PARAM) {
        state.aggregator.flush_reports();
        append_line(&mut body, "Reports cleared");
    }
    if query_flag(uri.query(), CLEAR_USAGE_PARAM) {
        state.aggregator.flush_usage();
        append_line(&mut body, "Usage cleared");
    }

    if let Some(command) = command {
        info!(command = command.name(), "served proxy command");
    }
    RawResponse::new(StatusCode::OK, content_type, body).into_response()
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

fn append_line(body: &mut String, line: &str) {
    if !body.is_empty() {
        body.push('\n');
    }
    body.push_str(line);
}
