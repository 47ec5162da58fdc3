//! HTTP request and response types as plain data.
//!
//! # Design
//! The connector describes the outbound call as an `HttpRequest` and receives
//! the result as an `HttpResponse`. Whoever executes the round-trip (the
//! bundled `UreqTransport`, a test double, or a C host over FFI) only moves
//! these values across. All fields are owned so they cross FFI boundaries
//! without lifetime concerns.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// HTTP method for a table request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    /// Absolute URL: base URL followed by the table path and query.
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Look up a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// `Authorization` header carrying basic credentials.
pub fn basic_auth_header(username: &str, password: &str) -> (String, String) {
    let encoded = STANDARD.encode(format!("{username}:{password}"));
    ("authorization".to_string(), format!("Basic {encoded}"))
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}
