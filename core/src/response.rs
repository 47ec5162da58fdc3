//! Success payload of a table call.

use serde::Deserialize;
use serde_json::Value;

use crate::error::ConnectorError;
use crate::http::HttpResponse;

/// Outcome of one connector call. Exactly one of data or error is present.
pub type RequestResult = Result<TableResponse, ConnectorError>;

/// Raw transport response delivered on success.
///
/// The status code is not validated: a non-2xx answer that is not the
/// hibernation page still arrives here. Use `is_success_status` to check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableResponse {
    pub response: HttpResponse,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    result: Value,
}

impl TableResponse {
    pub fn new(response: HttpResponse) -> Self {
        Self { response }
    }

    pub fn status(&self) -> u16 {
        self.response.status
    }

    /// Whether the status code is in the 2xx range.
    pub fn is_success_status(&self) -> bool {
        (200..300).contains(&self.response.status)
    }

    pub fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.response.body)
    }

    /// The Table API `result` member as a list of records.
    ///
    /// A list is returned as-is, a single object becomes a one-item list and
    /// a missing or null `result` yields an empty list.
    pub fn records(&self) -> Result<Vec<Value>, serde_json::Error> {
        let envelope: Envelope = serde_json::from_str(&self.response.body)?;
        Ok(match envelope.result {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => vec![other],
        })
    }
}
