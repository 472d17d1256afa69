//! Set command implementation.

use anyhow::{Context, Result, bail};
use huebl_core::Driver;

use crate::cli::ChangeArgs;
use crate::config::Config;
use crate::format::format_report_text;

pub async fn cmd_set(
    config: &Config,
    light: Option<String>,
    change: &ChangeArgs,
    quiet: bool,
) -> Result<()> {
    let command = change.to_command()?;
    let address = config.resolve_light(light)?;
    let driver = Driver::bluetooth(&config.driver_config(None)?)
        .await
        .context("Failed to open Bluetooth adapter")?;

    let report = driver.try_apply(&address, &command).await;
    driver.shutdown().await;
    let report = report.with_context(|| format!("Failed to update {}", address))?;

    if !quiet {
        print!("{}", format_report_text(&report));
    }
    if !report.failed.is_empty() {
        bail!("Some changes failed: {}", report.failed.join(", "));
    }
    Ok(())
}
