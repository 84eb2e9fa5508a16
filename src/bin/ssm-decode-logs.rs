//! Decode a CloudWatch Logs subscription event read from stdin.

use anyhow::{Context, Result};
use std::io::Read;

fn main() -> Result<()> {
    let mut raw = Vec::new();
    std::io::stdin()
        .read_to_end(&mut raw)
        .context("Failed to read stdin")?;

    println!("{}", ssm_session::decode::decode_to_pretty(&raw)?);
    Ok(())
}
