use std::fmt;
use std::time::Duration;

use url::Url;

use crate::errors::{Endpoint, ProbeError, Result};

pub const TOKEN_VAR: &str = "TOKEN";
pub const DEFAULT_API_BASE: &str = "https://api.dropboxapi.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);


#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub api_base: Url,
    pub token_var: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            api_base: Url::parse(DEFAULT_API_BASE).expect("default API base is a valid URL"),
            token_var: TOKEN_VAR.to_string(),
            request_timeout: REQUEST_TIMEOUT,
            connect_timeout: CONNECT_TIMEOUT,
        }
    }
}

impl ProbeConfig {
    pub fn with_api_base(api_base: &str) -> Result<Self> {
        Ok(Self {
            api_base: Url::parse(api_base)?,
            ..Self::default()
        })
    }

    /// Resolve an endpoint against the API base. A base carrying a path
    /// prefix keeps it, with or without a trailing slash.
    pub fn endpoint_url(&self, endpoint: Endpoint) -> Result<Url> {
        let mut base = self.api_base.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(base.join(endpoint.path())?)
    }
}

/// Bearer token read once from the environment.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Look `var` up through `lookup`; unset and empty values are both missing.
    pub fn resolve<F>(var: &str, lookup: F) -> Result<Self>
    where
        F: FnOnce(&str) -> Option<String>,
    {
        match lookup(var) {
            Some(token) if !token.is_empty() => Ok(Self(token)),
            _ => Err(ProbeError::MissingCredential {
                var: var.to_string(),
            }),
        }
    }

    pub fn from_env(var: &str) -> Result<Self> {
        Self::resolve(var, |k| std::env::var(k).ok())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}
