//! CLI argument definitions using clap.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum, value_parser};
use huebl_types::LightCommand;

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Reusable output format arguments
#[derive(Debug, Clone, Args)]
pub struct OutputArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Output compact JSON (no pretty-printing)
    #[arg(long)]
    pub compact: bool,
}

/// Light selection, by address or alias
#[derive(Debug, Clone, Args)]
pub struct LightArgs {
    /// Light address (MAC address or UUID) or alias, or use HUEBL_LIGHT env var
    #[arg(env = "HUEBL_LIGHT")]
    pub light: Option<String>,
}

/// Changes for the `set` command.
///
/// Flags are applied in a fixed order: power, brightness, color.
#[derive(Debug, Clone, Default, Args)]
pub struct ChangeArgs {
    /// Turn the light on
    #[arg(long, conflicts_with = "off")]
    pub on: bool,

    /// Turn the light off
    #[arg(long)]
    pub off: bool,

    /// Brightness level (0-254)
    #[arg(short, long, value_parser = value_parser!(u8).range(..=254))]
    pub bri: Option<u8>,

    /// CIE xy color as "x,y" (e.g. 0.3127,0.3290)
    #[arg(long, value_parser = parse_xy)]
    pub xy: Option<(f64, f64)>,

    /// Raw bridge command as JSON (e.g. '{"on": true, "bri": 128}')
    #[arg(long, conflicts_with_all = ["on", "off", "bri", "xy"])]
    pub json: Option<String>,
}

impl ChangeArgs {
    /// Build the command these flags describe.
    pub fn to_command(&self) -> Result<LightCommand> {
        if let Some(json) = &self.json {
            return serde_json::from_str(json).context("Invalid command JSON");
        }

        let mut command = LightCommand::new();
        if self.on || self.off {
            command = command.on(self.on);
        }
        if let Some(level) = self.bri {
            command = command.bri(level);
        }
        if let Some((x, y)) = self.xy {
            command = command.xy(x, y);
        }

        if command.is_empty() {
            bail!("Nothing to set. Use --on, --off, --bri, --xy or --json");
        }
        Ok(command)
    }
}

#[derive(Parser)]
#[command(name = "huebl")]
#[command(author, version, about = "CLI for Hue Bluetooth lights", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan for nearby Hue Bluetooth lights
    Discover {
        /// Scan duration in seconds (overrides the config file)
        #[arg(short, long)]
        timeout: Option<u64>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Read the current state of a light
    State {
        #[command(flatten)]
        light: LightArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Change the state of a light
    Set {
        #[command(flatten)]
        light: LightArgs,

        #[command(flatten)]
        change: ChangeArgs,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,

    /// Show the configuration file path
    Path,

    /// Write a configuration file with default settings
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Parse an "x,y" color pair.
fn parse_xy(s: &str) -> Result<(f64, f64), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("'{}' is not an x,y pair", s))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<f64>()
            .ok()
            .filter(|v| (0.0..=1.0).contains(v))
            .ok_or_else(|| format!("'{}' is not a coordinate between 0 and 1", part.trim()))
    };
    Ok((parse(x)?, parse(y)?))
}
