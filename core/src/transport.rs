//! The transport seam and the bundled blocking implementation.

use std::time::Duration;

use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes one `HttpRequest` and reports what came back.
///
/// Implementations perform a single round-trip with no retries. Any timeout
/// policy lives here, not in the connector.
pub trait Transport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request)
    }
}

/// Blocking transport backed by a `ureq` agent.
///
/// 4xx/5xx responses are returned as data rather than errors so the
/// classifier sees every status the server produced.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// A transport whose whole request (connect, send, receive) is bounded.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::build(Some(timeout))
    }

    fn build(timeout: Option<Duration>) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let mut response = match method {
            HttpMethod::Get => {
                let mut builder = self.agent.get(&url);
                for (name, value) in &headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.call()?
            }
            HttpMethod::Post => {
                let mut builder = self.agent.post(&url);
                for (name, value) in &headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                match body {
                    Some(body) => builder.send(body.as_bytes())?,
                    None => builder.send_empty()?,
                }
            }
        };

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        // ureq caps `read_to_string` at 10 MiB by default; a received body
        // is delivered whole regardless of size.
        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_string()?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
