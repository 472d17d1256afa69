//! Output formatting for CLI commands.

use std::fmt::Write as _;

use anyhow::{Context, Result};
use huebl_core::ApplyReport;
use huebl_types::{LightDescriptor, LightState};
use serde::Serialize;

/// Serialize `value` as JSON, pretty unless `compact` is set.
pub fn to_json<T: Serialize + ?Sized>(value: &T, compact: bool) -> Result<String> {
    let json = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    };
    json.context("Failed to serialize output")
}

/// Table of discovered lights.
pub fn format_lights_text(lights: &[LightDescriptor]) -> String {
    if lights.is_empty() {
        return "No lights found.\n".to_string();
    }

    let name_width = lights
        .iter()
        .map(|l| l.name.len())
        .max()
        .unwrap_or(0)
        .max("NAME".len());
    let model_width = lights
        .iter()
        .map(|l| l.modelid.len())
        .max()
        .unwrap_or(0)
        .max("MODEL".len());

    let mut out = format!("Found {} light(s):\n\n", lights.len());
    let _ = writeln!(
        out,
        "{:<name_width$}  {:<model_width$}  ADDRESS",
        "NAME", "MODEL"
    );
    for light in lights {
        let _ = writeln!(
            out,
            "{:<name_width$}  {:<model_width$}  {}",
            light.name,
            light.modelid,
            light.address()
        );
    }
    out
}

/// Human-readable light state.
pub fn format_state_text(address: &str, state: &LightState) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Light:      {}", address);
    if !state.reachable {
        let _ = writeln!(out, "Reachable:  no");
        return out;
    }
    let _ = writeln!(out, "Reachable:  yes");
    if let Some(on) = state.on {
        let _ = writeln!(out, "Power:      {}", if on { "on" } else { "off" });
    }
    if let Some(bri) = state.bri {
        let _ = writeln!(out, "Brightness: {:.0}%", bri * 100.0);
    }
    if let Some([x, y]) = state.xy {
        let _ = writeln!(out, "Color:      x={:.4} y={:.4}", x, y);
    }
    if let Some(mode) = state.colormode {
        let _ = writeln!(out, "Color mode: {}", mode);
    }
    out
}

/// Summary of an applied command.
pub fn format_report_text(report: &ApplyReport) -> String {
    let mut out = String::new();
    if !report.applied.is_empty() {
        let _ = writeln!(out, "Applied:     {}", report.applied.join(", "));
    }
    if !report.unsupported.is_empty() {
        let _ = writeln!(out, "Unsupported: {}", report.unsupported.join(", "));
    }
    if !report.failed.is_empty() {
        let _ = writeln!(out, "Failed:      {}", report.failed.join(", "));
    }
    out
}
