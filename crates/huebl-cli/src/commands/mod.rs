//! Command implementations for the CLI.

mod config;
mod discover;
mod set;
mod state;

pub use config::cmd_config;
pub use discover::cmd_discover;
pub use set::cmd_set;
pub use state::cmd_state;
