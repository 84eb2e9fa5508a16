//! Decode CloudWatch Logs subscription payloads.
//!
//! A subscription delivers `{"awslogs": {"data": "<base64>"}}` where the
//! base64 text is a gzip stream of the actual log JSON.

use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine as _};
use flate2::read::GzDecoder;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize)]
struct SubscriptionEvent {
    #[serde(rename = "awslogs")]
    aws_logs: AwsLogs,
}

#[derive(Debug, Deserialize)]
struct AwsLogs {
    data: String,
}

/// Unwrap a raw subscription event into the JSON document it carries.
pub fn decode_payload(raw: &[u8]) -> Result<serde_json::Value> {
    let event: SubscriptionEvent =
        serde_json::from_slice(raw).context("Input is not an awslogs subscription event")?;

    let compressed = general_purpose::STANDARD
        .decode(event.aws_logs.data.trim())
        .context("awslogs.data is not valid base64")?;

    let mut text = String::new();
    GzDecoder::new(compressed.as_slice())
        .read_to_string(&mut text)
        .context("awslogs.data is not gzip-compressed UTF-8 text")?;

    serde_json::from_str(&text).context("Decompressed payload is not JSON")
}

/// Decode and pretty-print with two-space indentation.
pub fn decode_to_pretty(raw: &[u8]) -> Result<String> {
    let value = decode_payload(raw)?;
    Ok(serde_json::to_string_pretty(&value)?)
}
