//! Launch Monitor command line
//!
//! Configuration loading plus the `sync`, `validate` and `inspect`
//! subcommands behind the `launch-monitor` binary.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod commands;
pub mod config;

pub use commands::App;
pub use config::MonitorConfig;
