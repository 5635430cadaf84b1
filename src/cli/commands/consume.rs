//! Consume command implementation
//!
//! Feeds newline-delimited JSON events from a file or stdin into the event
//! consumer. A line is either a full event message (`key`, `payload`) or a
//! bare FHIR bundle.

use crate::cli::pipeline::{exit_code_for, load_or_report, Pipeline, EXIT_OK, EXIT_PARTIAL};
use crate::domain::FhirEventMessage;
use clap::Args;
use serde_json::Value;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};

/// Queue depth between the reader and the consumer
const QUEUE_CAPACITY: usize = 64;

/// Arguments for the consume command
#[derive(Args, Debug)]
pub struct ConsumeArgs {
    /// NDJSON file to read; stdin when omitted
    #[arg(short, long)]
    pub input: Option<PathBuf>,
}

impl ConsumeArgs {
    /// Execute the consume command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        let config = match load_or_report(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };
        let consumer = match Pipeline::build(&config) {
            Ok(pipeline) => pipeline.consumer(&config),
            Err(e) => {
                eprintln!("❌ Failed to initialize: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let feed = async {
            match &self.input {
                Some(path) => {
                    let file = tokio::fs::File::open(path).await?;
                    feed_lines(BufReader::new(file), tx).await
                }
                None => feed_lines(BufReader::new(tokio::io::stdin()), tx).await,
            }
        };

        let (_, fed) = tokio::join!(consumer.run(rx, shutdown_signal), feed);
        let skipped = fed?;

        let counts = consumer.status().await.last_summary.unwrap_or_default();
        println!("📊 Consume Summary:");
        println!("  Delivered: {}", counts.delivered);
        println!("  Dead-lettered: {}", counts.failed);
        println!("  Unparseable lines: {skipped}");

        if counts.failed > 0 || skipped > 0 {
            Ok(EXIT_PARTIAL)
        } else {
            Ok(EXIT_OK)
        }
    }
}

/// Sends each parseable line to the queue; returns the number of skipped lines
async fn feed_lines<R>(reader: R, tx: mpsc::Sender<FhirEventMessage>) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut skipped = 0;
    let mut line_number = 0;

    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }
        match parse_event(&line) {
            Some(message) => {
                if tx.send(message).await.is_err() {
                    break;
                }
            }
            None => {
                tracing::warn!(line = line_number, "Skipping unparseable event line");
                skipped += 1;
            }
        }
    }
    Ok(skipped)
}

fn parse_event(line: &str) -> Option<FhirEventMessage> {
    if let Ok(message) = serde_json::from_str::<FhirEventMessage>(line) {
        return Some(message);
    }
    let value: Value = serde_json::from_str(line).ok()?;
    (value.get("resourceType").and_then(Value::as_str) == Some("Bundle"))
        .then(|| FhirEventMessage::new(None, value))
}
