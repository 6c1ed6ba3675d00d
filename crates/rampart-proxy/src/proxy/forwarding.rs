//! Upstream forwarding for proxy mode.

use super::client::HttpClient;
use super::response::RawResponse;
use crate::commands::IGNORE_COMMANDS_HEADER;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::HOST;
use hyper::http::request::Parts;
use hyper::{Request, StatusCode};
use tracing::{debug, error};

/// Forward a buffered request to the upstream and buffer its response.
/// Upstream failures surface as 502 to the client; the exchange is still
/// validated and recorded by the caller.
pub async fn forward(
    client: &HttpClient,
    parts: &Parts,
    body: Bytes,
    upstream: &str,
) -> RawResponse {
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let uri = format!("{upstream}{path_and_query}");
    debug!("forwarding to {uri}");

    let mut builder = Request::builder().method(parts.method.clone()).uri(&uri);
    for (name, value) in parts.headers.iter() {
        // the host is the upstream's business; the ignore-commands marker
        // must not leak to the backend's own command dispatcher
        if name == HOST || name.as_str() == IGNORE_COMMANDS_HEADER {
            continue;
        }
        builder = builder.header(name, value);
    }

    let request = match builder.body(Full::new(body)) {
        Ok(request) => request,
        Err(e) => {
            error!("failed to build upstream request for {uri}: {e}");
            return gateway_error("Bad Gateway");
        }
    };

    match client.request(request).await {
        Ok(response) => {
            let (parts, body) = response.into_parts();
            match body.collect().await {
                Ok(collected) => RawResponse {
                    status: parts.status,
                    headers: parts.headers,
                    body: collected.to_bytes(),
                },
                Err(e) => {
                    error!("failed to read upstream response body: {e}");
                    gateway_error("Failed to read upstream response")
                }
            }
        }
        Err(e) => {
            error!("failed to forward request to upstream: {e}");
            gateway_error("Bad Gateway")
        }
    }
}

fn gateway_error(message: &str) -> RawResponse {
    RawResponse::new(
        StatusCode::BAD_GATEWAY,
        "text/plain",
        message.to_string(),
    )
}
