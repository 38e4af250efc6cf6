//! Interactive room simulator.
//!
//! Drives several presence sessions against one in-process room hub, so cursor
//! moves, messages and leaves can be observed from every participant's side.

pub mod command;
pub mod formatter;
pub mod runner;
pub mod simulator;

pub use runner::{RunConfig, run_simulator};
