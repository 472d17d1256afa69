//! Discover command implementation.

use anyhow::{Context, Result};
use huebl_core::Driver;
use tokio_util::sync::CancellationToken;

use crate::cli::{OutputArgs, OutputFormat};
use crate::config::Config;
use crate::format::{format_lights_text, to_json};

pub async fn cmd_discover(
    config: &Config,
    timeout: Option<u64>,
    output: &OutputArgs,
    quiet: bool,
) -> Result<()> {
    let driver_config = config.driver_config(timeout)?;
    let driver = Driver::bluetooth(&driver_config)
        .await
        .context("Failed to open Bluetooth adapter")?;

    // Ctrl-C stops the scan and keeps the lights found so far.
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    if !quiet && output.format == OutputFormat::Text {
        eprintln!(
            "Scanning for {}s (Ctrl-C to stop)...",
            driver_config.discovery.scan_duration_secs
        );
    }

    let mut lights = Vec::new();
    driver.discover_with_cancel(&mut lights, cancel).await;
    watcher.abort();
    driver.shutdown().await;

    let content = match output.format {
        OutputFormat::Json => to_json(&lights, output.compact)?,
        OutputFormat::Text => format_lights_text(&lights),
    };
    println!("{}", content.trim_end());
    Ok(())
}
