//! State command implementation.

use anyhow::{Context, Result};
use huebl_core::Driver;

use crate::cli::{OutputArgs, OutputFormat};
use crate::config::Config;
use crate::format::{format_state_text, to_json};

pub async fn cmd_state(config: &Config, light: Option<String>, output: &OutputArgs) -> Result<()> {
    let address = config.resolve_light(light)?;
    let driver = Driver::bluetooth(&config.driver_config(None)?)
        .await
        .context("Failed to open Bluetooth adapter")?;

    let state = driver.try_read_state(&address).await;
    driver.shutdown().await;
    let state = state.with_context(|| format!("Failed to read state of {}", address))?;

    let content = match output.format {
        OutputFormat::Json => to_json(&state, output.compact)?,
        OutputFormat::Text => format_state_text(&address, &state),
    };
    println!("{}", content.trim_end());
    Ok(())
}
