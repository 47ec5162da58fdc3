//! Response classification and hibernation detection.
//!
//! # Design
//! A transport reports completion as a `TransportOutcome`, which may carry an
//! error, a response, or both. `classify` turns that into a `RequestResult`
//! with a fixed precedence: hibernation page, then transport error, then
//! success. The status code is only consulted by the hibernation check.

use tracing::warn;

use crate::error::{ConnectorError, TransportError};
use crate::http::HttpResponse;
use crate::response::{RequestResult, TableResponse};

const HIBERNATION_MARKER: &str = "hibernating";
const HTML_MARKER: &str = "<html>";
const HIBERNATION_STATUS: u16 = 200;

/// What a transport observed when a request completed.
#[derive(Debug, Default)]
pub struct TransportOutcome {
    pub error: Option<TransportError>,
    pub response: Option<HttpResponse>,
}

impl TransportOutcome {
    pub fn response(response: HttpResponse) -> Self {
        Self {
            error: None,
            response: Some(response),
        }
    }

    pub fn error(error: TransportError) -> Self {
        Self {
            error: Some(error),
            response: None,
        }
    }
}

impl From<Result<HttpResponse, TransportError>> for TransportOutcome {
    fn from(result: Result<HttpResponse, TransportError>) -> Self {
        match result {
            Ok(response) => Self::response(response),
            Err(error) => Self::error(error),
        }
    }
}

/// True when the response is the instance's hibernation page: status 200
/// with an HTML body mentioning "hibernating".
pub fn is_hibernating(response: &HttpResponse) -> bool {
    response.status == HIBERNATION_STATUS
        && response.body.contains(HIBERNATION_MARKER)
        && response.body.contains(HTML_MARKER)
}

/// Classify a completed request. First match wins.
pub fn classify(outcome: TransportOutcome) -> RequestResult {
    let TransportOutcome { error, response } = outcome;

    if response.as_ref().is_some_and(is_hibernating) {
        warn!("instance is hibernating");
        return Err(ConnectorError::Hibernating);
    }

    if let Some(error) = error {
        warn!(error = %error, "table request failed");
        return Err(ConnectorError::Transport(error));
    }

    match response {
        Some(response) => Ok(TableResponse::new(response)),
        None => {
            warn!("transport completed without a response");
            Err(ConnectorError::Transport(TransportError::NoResponse))
        }
    }
}
