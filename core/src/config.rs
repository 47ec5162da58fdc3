//! Connection options supplied by the caller at construction time.

use std::fmt;

use serde::Deserialize;

use crate::error::ConfigError;

/// Where and as whom to connect, and which table to target.
///
/// Field names on the wire match the caller's configuration object:
/// `url`, `username`, `password`, `serviceNowTable`.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectionOptions {
    pub url: String,
    pub username: String,
    pub password: String,
    #[serde(rename = "serviceNowTable")]
    pub service_now_table: String,
}

impl ConnectionOptions {
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        service_now_table: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            username: username.into(),
            password: password.into(),
            service_now_table: service_now_table.into(),
        }
    }

    /// Parse options from the caller's JSON configuration object.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }
}

impl fmt::Debug for ConnectionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionOptions")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("service_now_table", &self.service_now_table)
            .finish()
    }
}
