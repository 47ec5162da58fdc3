//! The table connector: request construction and dispatch.
//!
//! # Design
//! `Connector` holds only its `ConnectionOptions` and never mutates them.
//! Each operation derives a fresh `CallOptions`, turns it into an
//! `HttpRequest`, runs it through a `Transport` once and classifies the
//! outcome. The `build_*` methods and `classify` are exposed separately for
//! callers that execute the round-trip themselves.

use tracing::debug;

use crate::classify::{self, TransportOutcome};
use crate::config::ConnectionOptions;
use crate::http::{basic_auth_header, HttpMethod, HttpRequest};
use crate::response::RequestResult;
use crate::transport::Transport;
use crate::uri::table_uri;

/// Query used by `fetch`: retrieve at most one record.
pub const FETCH_QUERY: &str = "sysparm_limit=1";

/// Per-call options derived from the connection options.
#[derive(Debug, Clone, Copy)]
pub struct CallOptions<'a> {
    pub options: &'a ConnectionOptions,
    pub method: HttpMethod,
    pub query: Option<&'a str>,
}

impl CallOptions<'_> {
    /// Assemble the outbound request: table URL, basic credentials and a
    /// JSON `Accept` header. No body is attached.
    pub fn to_request(&self) -> HttpRequest {
        let uri = table_uri(&self.options.service_now_table, self.query);
        HttpRequest {
            method: self.method,
            url: format!("{}{uri}", self.options.url),
            headers: vec![
                basic_auth_header(&self.options.username, &self.options.password),
                ("accept".to_string(), "application/json".to_string()),
            ],
            body: None,
        }
    }
}

/// Connector bound to one instance, account and table.
#[derive(Debug, Clone)]
pub struct Connector {
    options: ConnectionOptions,
}

impl Connector {
    pub fn new(mut options: ConnectionOptions) -> Self {
        let trimmed = options.url.trim_end_matches('/').len();
        options.url.truncate(trimmed);
        Self { options }
    }

    pub fn options(&self) -> &ConnectionOptions {
        &self.options
    }

    pub fn fetch_options(&self) -> CallOptions<'_> {
        CallOptions {
            options: &self.options,
            method: HttpMethod::Get,
            query: Some(FETCH_QUERY),
        }
    }

    pub fn create_options(&self) -> CallOptions<'_> {
        CallOptions {
            options: &self.options,
            method: HttpMethod::Post,
            query: None,
        }
    }

    pub fn build_fetch(&self) -> HttpRequest {
        self.fetch_options().to_request()
    }

    pub fn build_create(&self) -> HttpRequest {
        self.create_options().to_request()
    }

    /// Classify the outcome of a request built by `build_fetch` or
    /// `build_create`.
    pub fn classify(&self, outcome: impl Into<TransportOutcome>) -> RequestResult {
        classify::classify(outcome.into())
    }

    /// Retrieve a single record from the table.
    pub fn fetch<T: Transport + ?Sized>(&self, transport: &T) -> RequestResult {
        dispatch(self.fetch_options(), transport)
    }

    /// POST to the table with no query and no body.
    pub fn create<T: Transport + ?Sized>(&self, transport: &T) -> RequestResult {
        dispatch(self.create_options(), transport)
    }
}

/// Run one request through the transport and classify what came back.
/// Transport errors are passed to the classifier untouched.
pub fn dispatch<T: Transport + ?Sized>(call: CallOptions<'_>, transport: &T) -> RequestResult {
    let request = call.to_request();
    debug!(
        method = request.method.as_str(),
        url = %request.url,
        "dispatching table request"
    );
    let outcome = TransportOutcome::from(transport.execute(request));
    classify::classify(outcome)
}
