//! Simulator execution: interactive prompt or script file.

use std::path::PathBuf;

use hiroba_presence::domain::Palette;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;

use crate::{
    command::{Command, CommandError},
    simulator::{Outcome, RoomSimulator},
};

/// Simulator settings resolved from the command line
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Participants joined at startup
    pub participants: usize,
    pub palette: Palette,
    /// Read commands from this file instead of the prompt
    pub script: Option<PathBuf>,
}

/// Run the simulator until `quit`, end of input or Ctrl+C
pub async fn run_simulator(config: RunConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut simulator = RoomSimulator::new(config.palette);
    tracing::info!("Room {} created", simulator.room_id());

    for _ in 0..config.participants {
        let connection_id = simulator.join().await?;
        tracing::info!("Participant {} joined", connection_id);
    }

    let result = match config.script {
        Some(path) => run_script(&mut simulator, path).await,
        None => run_interactive(&mut simulator).await,
    };

    simulator.shutdown().await;
    result
}

/// Execute one input line. Returns `false` when the simulator should stop.
pub async fn execute_line(simulator: &mut RoomSimulator, line: &str) -> bool {
    let command = match line.parse::<Command>() {
        Ok(command) => command,
        Err(CommandError::Empty) => return true,
        Err(e) => {
            println!("{}", e);
            return true;
        }
    };

    match simulator.execute(command).await {
        Ok(Outcome::Output(output)) => {
            if !output.is_empty() {
                println!("{}", output);
            }
            true
        }
        Ok(Outcome::Quit) => false,
        Err(e) => {
            println!("{}", e);
            true
        }
    }
}

async fn run_script(
    simulator: &mut RoomSimulator,
    path: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let script = tokio::fs::read_to_string(&path).await?;
    tracing::info!("Running script {}", path.display());

    for line in script.lines() {
        // コメント行
        if line.trim_start().starts_with('#') {
            continue;
        }
        if !execute_line(simulator, line).await {
            break;
        }
    }
    Ok(())
}

async fn run_interactive(simulator: &mut RoomSimulator) -> Result<(), Box<dyn std::error::Error>> {
    println!(
        "\nRoom {}. Type 'help' for commands, 'quit' or Ctrl+D to exit.\n",
        simulator.room_id()
    );

    // rustyline は同期 API のため専用スレッドで読み込む
    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();
    // 出力が終わってから次のプロンプトを表示する
    let (ack_tx, ack_rx) = std::sync::mpsc::channel::<()>();

    let readline_handle = std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        loop {
            match rl.readline("hiroba> ") {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str()).ok();
                    }
                    if input_tx.send(line).is_err() || ack_rx.recv().is_err() {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl+C
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    // Ctrl+D
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    while let Some(line) = input_rx.recv().await {
        if !execute_line(simulator, &line).await {
            break;
        }
        if ack_tx.send(()).is_err() {
            break;
        }
    }

    // 読み込みスレッドの応答待ちを解除
    drop(ack_tx);
    if readline_handle.join().is_err() {
        tracing::warn!("Readline thread panicked");
    }

    Ok(())
}
