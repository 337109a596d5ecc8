use std::fmt;

use reqwest::header::CONTENT_TYPE;
use reqwest_middleware::ClientWithMiddleware;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::config::{Credential, ProbeConfig};
use crate::errors::{Endpoint, ProbeError, Result};
use crate::http::Http;

pub const LISTING_PATH: &str = "/blog";

// =========================== Wire types ======================================

/// Body of `list_folder/get_latest_cursor`. Field order is the wire order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LatestCursorRequest {
    pub include_deleted: bool,
    pub include_has_explicit_shared_members: bool,
    pub include_media_info: bool,
    pub include_mounted_folders: bool,
    pub include_non_downloadable_files: bool,
    pub path: String,
    pub recursive: bool,
}

impl Default for LatestCursorRequest {
    fn default() -> Self {
        Self {
            include_deleted: false,
            include_has_explicit_shared_members: false,
            include_media_info: false,
            include_mounted_folders: true,
            include_non_downloadable_files: true,
            path: LISTING_PATH.to_string(),
            recursive: false,
        }
    }
}

#[derive(Debug, Serialize)]
struct ContinueRequest<'a> {
    cursor: &'a str,
}

/// Opaque continuation token; never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    /// Pull the top-level `cursor` string out of a listing response.
    pub fn from_response(body: &Value) -> Result<Self> {
        body.get("cursor")
            .and_then(Value::as_str)
            .and_then(Cursor::new)
            .ok_or(ProbeError::MissingCursor)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Dropbox error envelope, e.g. `{"error_summary": "path/not_found/..", "error": {..}}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error_summary: String,
}

fn error_summary(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|e| e.error_summary)
}

// =========================== Page view =======================================

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = ".tag", rename_all = "snake_case")]
pub enum Metadata {
    File {
        name: String,
        #[serde(default)]
        path_display: Option<String>,
        #[serde(default)]
        size: Option<u64>,
        #[serde(default)]
        content_hash: Option<String>,
    },
    Folder {
        name: String,
        #[serde(default)]
        path_display: Option<String>,
    },
    Deleted {
        name: String,
        #[serde(default)]
        path_display: Option<String>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListFolderPage {
    pub entries: Vec<Metadata>,
    #[serde(default)]
    pub cursor: Option<String>,
    pub has_more: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSummary {
    pub files: usize,
    pub folders: usize,
    pub deleted: usize,
    pub has_more: bool,
    pub new_cursor: bool,
}

impl PageSummary {
    /// Summarise a continue response. `None` when the body is not a listing page.
    pub fn from_response(body: &Value, previous: &Cursor) -> Option<Self> {
        let page = ListFolderPage::deserialize(body).ok()?;
        let mut summary = PageSummary {
            has_more: page.has_more,
            new_cursor: page
                .cursor
                .as_deref()
                .is_some_and(|c| !c.is_empty() && c != previous.as_str()),
            ..Default::default()
        };
        for entry in &page.entries {
            match entry {
                Metadata::File { .. } => summary.files += 1,
                Metadata::Folder { .. } => summary.folders += 1,
                Metadata::Deleted { .. } => summary.deleted += 1,
            }
        }
        Some(summary)
    }

    pub fn entries(&self) -> usize {
        self.files + self.folders + self.deleted
    }
}

impl fmt::Display for PageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entries ({} files, {} folders, {} deleted), has_more: {}, new cursor: {}",
            self.entries(),
            self.files,
            self.folders,
            self.deleted,
            self.has_more,
            if self.new_cursor { "yes" } else { "no" }
        )
    }
}

// =========================== Client ==========================================

pub struct ListingClient {
    client: ClientWithMiddleware,
    latest_cursor_url: Url,
    continue_url: Url,
}

impl ListingClient {
    pub fn new(config: &ProbeConfig, credential: &Credential) -> Result<Self> {
        let client = Http::new()
            .bearer_auth(credential.expose())
            .header(CONTENT_TYPE.as_str(), "application/json")
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build_client()?;

        Ok(Self {
            client,
            latest_cursor_url: config.endpoint_url(Endpoint::LatestCursor)?,
            continue_url: config.endpoint_url(Endpoint::Continue)?,
        })
    }

    pub async fn get_latest_cursor(&self, request: &LatestCursorRequest) -> Result<Value> {
        self.post_json(Endpoint::LatestCursor, &self.latest_cursor_url, request)
            .await
    }

    pub async fn list_folder_continue(&self, cursor: &Cursor) -> Result<Value> {
        let body = ContinueRequest {
            cursor: cursor.as_str(),
        };
        self.post_json(Endpoint::Continue, &self.continue_url, &body)
            .await
    }

    #[instrument(level = "debug", name = "http.request", skip_all, fields(method = "POST", %endpoint))]
    async fn post_json<B: Serialize + ?Sized>(
        &self,
        endpoint: Endpoint,
        url: &Url,
        body: &B,
    ) -> Result<Value> {
        let started = std::time::Instant::now();
        let resp = self.client.post(url.clone()).json(body).send().await?;

        let status = resp.status();
        debug!(status = %status, elapsed_ms = started.elapsed().as_millis() as u64, "http response received");

        let text = resp.text().await?;
        if !status.is_success() {
            return Err(ProbeError::Status {
                endpoint,
                status,
                summary: error_summary(&text),
                body: text,
            });
        }

        let v: Value = serde_json::from_str(&text)?;
        Ok(v)
    }
}
