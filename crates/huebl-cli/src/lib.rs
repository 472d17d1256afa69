//! Command-line interface for Hue Bluetooth lights.
//!
//! The `huebl` binary drives the same entry points the bridge uses, so a
//! light can be discovered, inspected and controlled by hand.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `discover` | Scan for lights and print their descriptors |
//! | `state` | Read the state of one light |
//! | `set` | Apply a command to one light |
//! | `config` | Show, locate or create the configuration file |
//!
//! # Configuration
//!
//! Settings live in `~/.config/huebl/config.toml` (or the platform
//! equivalent), or in the file given with `--config`:
//!
//! ```toml
//! light = "kitchen"
//!
//! [aliases]
//! kitchen = "C4:29:96:12:34:56"
//!
//! [discovery]
//! scan_duration_secs = 10
//!
//! [reconnect]
//! max_retries = 2
//! ```
//!
//! # Environment Variables
//!
//! - `HUEBL_LIGHT`: default light address or alias
//! - `RUST_LOG`: log filter when neither `-v` nor `-q` is given
//!
//! # Examples
//!
//! ```bash
//! huebl discover --timeout 10 --format json
//! huebl set kitchen --on --bri 200 --xy 0.3127,0.3290
//! huebl set kitchen --json '{"on": false}'
//! huebl state kitchen
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod format;

pub use huebl_core;
pub use huebl_types;
