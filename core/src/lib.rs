//! Connector core for the ServiceNow Table API.
//!
//! # Overview
//! Issues exactly one HTTP request per call against
//! `<base>/api/now/table/<table>` and classifies the outcome as success,
//! transport error, or a hibernating instance.
//!
//! # Design
//! - `Connector` holds only immutable `ConnectionOptions`; every call derives
//!   a fresh `CallOptions` value, so nothing leaks between calls.
//! - Requests and responses are plain data (`HttpRequest` / `HttpResponse`).
//!   `build_*` + `classify` let a host run the round-trip itself, while
//!   `fetch` / `create` dispatch through a `Transport`.
//! - The outcome is a `RequestResult`, an ordinary `Result`, so "exactly one
//!   of data or error" holds by construction.

pub mod classify;
pub mod config;
pub mod connector;
pub mod error;
pub mod http;
pub mod response;
pub mod transport;
pub mod uri;

pub use classify::{classify, is_hibernating, TransportOutcome};
pub use config::ConnectionOptions;
pub use connector::{CallOptions, Connector, FETCH_QUERY};
pub use error::{ConfigError, ConnectorError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use response::{RequestResult, TableResponse};
pub use transport::{Transport, UreqTransport};
pub use uri::table_uri;
