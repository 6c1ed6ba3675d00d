//! Response construction helpers shared by the pipeline and the command
//! dispatcher.

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE};
use hyper::{HeaderMap, Response, StatusCode};
use rampart_contract::CapturedResponse;

/// A fully buffered response. Buffering is deliberate: the exchange is
/// snapshotted for validation after it completes, so the body has to be
/// held in memory anyway.
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RawResponse {
    pub fn new(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Defensive snapshot for the validator and the report store.
    pub fn capture(&self) -> CapturedResponse {
        CapturedResponse {
            status: self.status.as_u16(),
            headers: self
                .headers
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|v| (name.as_str().to_string(), v.to_string()))
                })
                .collect(),
            body: self.body.to_vec(),
        }
    }

    pub fn into_response(self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// Echo the request's Origin header back. Applied identically on command
/// responses and on proxied/mocked responses.
pub fn apply_cors(
    mut response: Response<Full<Bytes>>,
    origin: Option<HeaderValue>,
) -> Response<Full<Bytes>> {
    if let Some(origin) = origin {
        response
            .headers_mut()
            .insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    }
    response
}
