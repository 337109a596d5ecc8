//! The two-call cursor pagination probe.
//!
//! `get_latest_cursor` → print → operator gate → `continue` → print.
//! Any failure short-circuits the remaining steps; nothing here prints
//! diagnostics, that is left to the caller.

use std::io::Write;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader, Stdin};
use tracing::{info, instrument};

use crate::config::{Credential, ProbeConfig};
use crate::errors::{ProbeError, Result};
use crate::http::listing::{Cursor, LatestCursorRequest, ListingClient, PageSummary};

pub const CONTINUE_PROMPT: &str = "Press Enter to continue to the next step...";
pub const SUCCESS_MESSAGE: &str = "Probe completed successfully!";

/// Manual pacing between the two calls.
#[async_trait]
pub trait PacingGate: Send {
    async fn wait(&mut self) -> Result<()>;
}

/// Waits for one line on stdin; its content is discarded.
pub struct StdinGate {
    reader: BufReader<Stdin>,
}

impl StdinGate {
    pub fn new() -> Self {
        Self {
            reader: BufReader::new(tokio::io::stdin()),
        }
    }
}

impl Default for StdinGate {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PacingGate for StdinGate {
    async fn wait(&mut self) -> Result<()> {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line).await?;
        if n == 0 {
            return Err(ProbeError::Unexpected(
                "EOF when reading a line from stdin".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub latest: Value,
    pub cursor: Cursor,
    pub page: Value,
    pub summary: Option<PageSummary>,
}

/// Resolve the credential, then run both calls. No request is built when
/// the credential is missing.
#[instrument(skip_all, fields(api_base = %config.api_base))]
pub async fn execute<F, G, W>(
    config: &ProbeConfig,
    lookup: F,
    gate: &mut G,
    out: &mut W,
) -> Result<ProbeReport>
where
    F: FnOnce(&str) -> Option<String>,
    G: PacingGate + ?Sized,
    W: Write + ?Sized,
{
    let credential = Credential::resolve(&config.token_var, lookup)?;
    let client = ListingClient::new(config, &credential)?;
    run(&client, gate, out).await
}

pub async fn run<G, W>(client: &ListingClient, gate: &mut G, out: &mut W) -> Result<ProbeReport>
where
    G: PacingGate + ?Sized,
    W: Write + ?Sized,
{
    writeln!(out, "Step 1: Getting latest cursor...")?;
    let latest = client
        .get_latest_cursor(&LatestCursorRequest::default())
        .await?;
    writeln!(out, "Response 1: {}", serde_json::to_string_pretty(&latest)?)?;

    let cursor = Cursor::from_response(&latest)?;
    info!(cursor_len = cursor.as_str().len(), "cursor extracted");
    writeln!(out, "Extracted cursor: {cursor}")?;

    write!(out, "{CONTINUE_PROMPT}")?;
    out.flush()?;
    gate.wait().await?;

    writeln!(out, "\nStep 2: Using cursor to continue...")?;
    let page = client.list_folder_continue(&cursor).await?;
    writeln!(out, "Response 2: {}", serde_json::to_string_pretty(&page)?)?;

    let summary = PageSummary::from_response(&page, &cursor);
    if let Some(s) = &summary {
        info!(entries = s.entries(), has_more = s.has_more, "page received");
        writeln!(out, "Page: {s}")?;
    }

    writeln!(out, "\n{SUCCESS_MESSAGE}")?;
    out.flush()?;

    Ok(ProbeReport {
        latest,
        cursor,
        page,
        summary,
    })
}
