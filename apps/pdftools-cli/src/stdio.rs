//! JSON-lines transport
//!
//! One envelope per input line, one response per output line. Failures are
//! written as `{"operation": ..., "error": ...}` so a caller can always pair
//! a line of output with the line it sent.
//!
//! All logging goes to stderr; stdout carries protocol lines only.

use std::io::{BufRead, Write};

use pdftools_worker::PdfToolsClient;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ErrorLine {
    #[serde(skip_serializing_if = "Option::is_none")]
    operation: Option<String>,
    error: String,
}

/// Serve requests from `reader` until EOF
pub async fn run_stdio<R: BufRead, W: Write>(
    client: &PdfToolsClient,
    mut reader: R,
    mut writer: W,
) -> anyhow::Result<()> {
    tracing::info!("Starting stdio transport");

    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            tracing::info!("EOF reached, shutting down");
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let reply = handle_line(client, line).await;
        if let Err(e) = write_line(&mut writer, &reply) {
            tracing::error!("Failed to write response: {}", e);
        }
    }

    Ok(())
}

async fn handle_line(client: &PdfToolsClient, line: &str) -> String {
    let reply = match client.run_json(line).await {
        Ok(response) => serde_json::to_string(&response).map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };

    reply.unwrap_or_else(|error| {
        tracing::debug!("Request failed: {}", error);
        let failure = ErrorLine {
            operation: operation_hint(line),
            error,
        };
        serde_json::to_string(&failure)
            .unwrap_or_else(|_| r#"{"error":"failed to encode error"}"#.to_string())
    })
}

/// Best-effort `data.operation` from a request that may not have decoded
fn operation_hint(line: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(line).ok()?;
    value
        .get("data")?
        .get("operation")?
        .as_str()
        .map(String::from)
}

fn write_line<W: Write>(writer: &mut W, body: &str) -> std::io::Result<()> {
    writer.write_all(body.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()
}
