pub mod listing;
pub mod logging;

use std::collections::HashMap;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use reqwest_middleware::ClientWithMiddleware;

use crate::errors::Result;

#[derive(Clone, Default)]
pub struct Http {
    headers: Option<HashMap<String, String>>,
    bearer_auth: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
}

impl Http {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let map = self.headers.get_or_insert_with(HashMap::new);
        map.insert(key.into(), value.into());
        self
    }
    pub fn bearer_auth(mut self, token: impl Into<String>) -> Self {
        self.bearer_auth = Some(token.into());
        self
    }
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        if let Some(header_map) = &self.headers {
            for (key, value) in header_map {
                let name = HeaderName::from_bytes(key.as_bytes())?;
                headers.insert(name, HeaderValue::from_str(value)?);
            }
        }
        if let Some(token) = &self.bearer_auth {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Build a client carrying the default headers, wrapped with request logging.
    pub fn build_client(&self) -> Result<ClientWithMiddleware> {
        let mut builder = Client::builder().default_headers(self.default_headers()?);
        if let Some(t) = self.timeout {
            builder = builder.timeout(t);
        }
        if let Some(t) = self.connect_timeout {
            builder = builder.connect_timeout(t);
        }
        let client = builder.build()?;
        Ok(logging::build_client_with_logging(client))
    }
}
