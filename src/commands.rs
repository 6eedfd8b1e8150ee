//! Player input for the terminal front end
//!
//! Lines typed on stdin become [`InputCommand`]s. Both the engine game and
//! the online session consume the same commands from a channel fed by
//! [`spawn_stdin_reader`], which answers `help` and unknown input itself.

use crate::game::{parse_coordinate_move, PieceKind, Square};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputCommand {
    Move {
        from: Square,
        to: Square,
        promotion: Option<PieceKind>,
    },
    Resign,
    /// Step one move back through history
    Back,
    /// Step one move forward through history
    Forward,
    /// Jump back to the live position
    Live,
    Chat(String),
    Board,
    Help,
    Quit,
    Unknown(String),
}

pub const HELP: &str = "\
commands:
  e2e4 / e7e8q   move (optional promotion letter)
  back, forward  step through history
  live           return to the current position
  board          print the board
  say <text>     chat (online only)
  resign         give up the game
  quit           leave";

pub fn parse_command(line: &str) -> Option<InputCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let command = match word.to_ascii_lowercase().as_str() {
        "resign" => InputCommand::Resign,
        "back" | "b" => InputCommand::Back,
        "forward" | "f" => InputCommand::Forward,
        "live" => InputCommand::Live,
        "board" => InputCommand::Board,
        "help" | "?" => InputCommand::Help,
        "quit" | "exit" => InputCommand::Quit,
        "say" if !rest.trim().is_empty() => InputCommand::Chat(rest.trim().to_string()),
        _ => match parse_coordinate_move(&line.to_ascii_lowercase()) {
            Some((from, to, promotion)) => InputCommand::Move {
                from,
                to,
                promotion,
            },
            None => InputCommand::Unknown(line.to_string()),
        },
    };
    Some(command)
}

/// Forward parsed stdin lines into a channel until stdin closes
pub fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<InputCommand> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match parse_command(&line) {
                    Some(InputCommand::Help) => println!("{HELP}"),
                    Some(InputCommand::Unknown(text)) => {
                        println!("Unknown command {text:?}, type help for the list")
                    }
                    Some(command) => {
                        if tx.send(command).is_err() {
                            break;
                        }
                    }
                    None => {}
                },
                Ok(None) => {
                    let _ = tx.send(InputCommand::Quit);
                    break;
                }
                Err(err) => {
                    debug!("stdin closed: {err}");
                    let _ = tx.send(InputCommand::Quit);
                    break;
                }
            }
        }
    });
    rx
}
