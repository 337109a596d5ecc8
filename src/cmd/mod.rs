use std::io::Write;

use clap::Parser;
use tracing::{error, info, instrument};

use crate::config::{ProbeConfig, DEFAULT_API_BASE};
use crate::errors::{FaultKind, ProbeError};
use crate::probe::{self, PacingGate, ProbeReport};

/// CLI
#[derive(Parser, Debug)]
#[command(
    name = "cursor-probe",
    version,
    about = "Probe the Dropbox list_folder cursor flow: get_latest_cursor, pause, continue.",
    long_about = "Probe the Dropbox list_folder cursor flow.\n\n\
Reads a bearer token from $TOKEN, asks list_folder/get_latest_cursor for a cursor on /blog,\n\
waits for Enter, then calls list_folder/continue with that cursor and prints both responses."
)]
pub struct Cli {
    /// Base URL the endpoint paths are joined onto
    #[arg(long = "api-base", value_name = "URL", default_value = DEFAULT_API_BASE)]
    pub api_base: String,
}

/// Run the probe end to end. Every failure is reported on `out` and
/// swallowed, so the caller only ever sees `Some(report)` or `None`.
#[instrument(skip_all, fields(api_base = %cli.api_base))]
pub async fn run_probe<G, W>(cli: &Cli, gate: &mut G, out: &mut W) -> Option<ProbeReport>
where
    G: PacingGate + ?Sized,
    W: Write + ?Sized,
{
    info!("starting cursor probe");

    let result = match ProbeConfig::with_api_base(&cli.api_base) {
        Ok(config) => probe::execute(&config, |k| std::env::var(k).ok(), gate, out).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(report) => {
            info!("cursor probe finished");
            Some(report)
        }
        Err(err) => {
            error!(kind = ?err.kind(), %err, "cursor probe failed");
            for line in render_failure(&err) {
                // stdout going away leaves nowhere to report to
                let _ = writeln!(out, "{line}");
            }
            None
        }
    }
}

/// Operator-facing diagnostic lines for a failed run.
pub fn render_failure(err: &ProbeError) -> Vec<String> {
    let mut lines = Vec::new();
    match err {
        ProbeError::MissingCredential { var } => {
            lines.push(format!("Error: {var} environment variable not set"));
        }
        ProbeError::Status {
            endpoint,
            status,
            body,
            summary,
        } => {
            lines.push(format!("HTTP Error: {status} from {endpoint}"));
            lines.push(format!("Response status: {}", status.as_u16()));
            lines.push(format!("Response body: {body}"));
            if let Some(summary) = summary {
                lines.push(format!("Error summary: {summary}"));
            }
        }
        ProbeError::Transport(e) => {
            lines.push(format!("HTTP Error: {e}"));
            if let Some(status) = e.status() {
                lines.push(format!("Response status: {}", status.as_u16()));
            }
        }
        ProbeError::Decode(e) => lines.push(format!("JSON parsing error: {e}")),
        ProbeError::MissingCursor => lines.push("Error: No cursor found in response".to_string()),
        other => {
            debug_assert_eq!(other.kind(), FaultKind::UnexpectedFailure);
            lines.push(format!("Unexpected error: {other}"));
        }
    }
    lines
}
