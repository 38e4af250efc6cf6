//! Shared utilities for the Hiroba workspace.
//!
//! Logging setup and clock helpers used by both the presence library and the CLI.

pub mod logger;
pub mod time;
