//! BeToCQ CLI library
//!
//! Argument parsing, logging setup and the `list`, `show-config`, `run` and
//! `simulate` commands behind the `betocq` binary.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;

pub use cli::{Cli, Commands};
pub use error::{CliError, Result};
