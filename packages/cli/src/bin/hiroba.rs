//! Room presence simulator.
//!
//! Joins a few participants to an in-process room and lets you drive their
//! pointers, keys and message fields from a prompt or a script.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin hiroba
//! cargo run --bin hiroba -- --participants 3 --palette "#FF0000,#00FF00"
//! cargo run --bin hiroba -- --script demo.txt
//! ```

use std::path::PathBuf;

use clap::Parser;

use hiroba_cli::{RunConfig, run_simulator};
use hiroba_presence::domain::Palette;
use hiroba_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "hiroba")]
#[command(about = "Room presence simulator with live cursors and ephemeral messages", long_about = None)]
struct Args {
    /// Participants joined at startup
    #[arg(short = 'n', long, default_value_t = 2)]
    participants: usize,

    /// Cursor palette as comma-separated #RRGGBB colors
    #[arg(short = 'p', long)]
    palette: Option<Palette>,

    /// Read commands from a file instead of the interactive prompt
    #[arg(short = 's', long)]
    script: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    let config = RunConfig {
        participants: args.participants,
        palette: args.palette.unwrap_or_default(),
        script: args.script,
    };

    if let Err(e) = run_simulator(config).await {
        tracing::error!("Simulator error: {}", e);
        std::process::exit(1);
    }
}
