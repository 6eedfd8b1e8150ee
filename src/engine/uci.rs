//! UCI engine process (Stockfish or anything speaking the protocol)
//!
//! One child process per game. Commands go in on stdin, replies are read
//! line by line from stdout; every wait is bounded by a timeout.

use super::{Difficulty, EngineError, EngineResult, MoveProvider};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
/// Slack on top of `movetime` before a search counts as hung
const SEARCH_SLACK: Duration = Duration::from_secs(5);

pub struct UciEngine {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    name: Option<String>,
    skill: Option<u8>,
}

impl UciEngine {
    /// Start `path` and complete the `uci` / `isready` handshake
    pub async fn spawn(path: &str) -> EngineResult<Self> {
        let mut child = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EngineError::Spawn {
                path: path.to_string(),
                source,
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::Protocol("engine stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Protocol("engine stdout unavailable".into()))?;

        let mut engine = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            name: None,
            skill: None,
        };

        engine.send("uci").await?;
        let name = engine
            .read_until(HANDSHAKE_TIMEOUT, |line| line == "uciok")
            .await?;
        engine.name = name;
        engine.ready().await?;

        info!(
            "[ENGINE] Started {}",
            engine.name.as_deref().unwrap_or(path)
        );
        Ok(engine)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Ask the engine to exit and reap it
    pub async fn quit(mut self) -> EngineResult<()> {
        self.send("quit").await?;
        match tokio::time::timeout(HANDSHAKE_TIMEOUT, self.child.wait()).await {
            Ok(status) => {
                debug!("[ENGINE] Exited with {}", status?);
            }
            Err(_) => self.child.kill().await?,
        }
        Ok(())
    }

    async fn send(&mut self, command: &str) -> EngineResult<()> {
        debug!("[ENGINE] > {command}");
        self.stdin.write_all(command.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        Ok(())
    }

    async fn ready(&mut self) -> EngineResult<()> {
        self.send("isready").await?;
        self.read_until(HANDSHAKE_TIMEOUT, |line| line == "readyok")
            .await
            .map(|_| ())
    }

    /// Read lines until `done` matches one, returning the `id name` seen on the way
    async fn read_until(
        &mut self,
        limit: Duration,
        done: impl Fn(&str) -> bool,
    ) -> EngineResult<Option<String>> {
        let mut name = None;
        scan_lines(&mut self.stdout, limit, |line| {
            if let Some(rest) = line.strip_prefix("id name ") {
                name = Some(rest.to_string());
            }
            done(line).then(|| Ok(name.clone()))
        })
        .await
    }

    async fn next_bestmove(&mut self, limit: Duration) -> EngineResult<String> {
        scan_lines(&mut self.stdout, limit, |line| {
            line.strip_prefix("bestmove").map(parse_bestmove)
        })
        .await
    }
}

/// Feed trimmed lines to `step` until it produces a result or `limit` passes
async fn scan_lines<T>(
    stdout: &mut Lines<BufReader<ChildStdout>>,
    limit: Duration,
    mut step: impl FnMut(&str) -> Option<EngineResult<T>>,
) -> EngineResult<T> {
    let read = async {
        while let Some(line) = stdout.next_line().await? {
            if let Some(result) = step(line.trim()) {
                return result;
            }
        }
        Err(EngineError::Closed)
    };
    match tokio::time::timeout(limit, read).await {
        Ok(result) => result,
        Err(_) => Err(EngineError::Timeout(limit)),
    }
}

/// The move token after `bestmove`; `(none)` means no legal move
fn parse_bestmove(rest: &str) -> EngineResult<String> {
    match rest.split_whitespace().next() {
        Some("(none)") | None => Err(EngineError::Protocol(format!(
            "engine has no move: bestmove{rest}"
        ))),
        Some(mv) => Ok(mv.to_string()),
    }
}

#[async_trait]
impl MoveProvider for UciEngine {
    async fn best_move(&mut self, fen: &str, difficulty: Difficulty) -> EngineResult<String> {
        let skill = difficulty.skill_level();
        if self.skill != Some(skill) {
            self.send(&format!("setoption name Skill Level value {skill}"))
                .await?;
            self.ready().await?;
            self.skill = Some(skill);
        }

        let movetime = difficulty.movetime();
        self.send(&format!("position fen {fen}")).await?;
        self.send(&format!("go movetime {}", movetime.as_millis()))
            .await?;
        self.next_bestmove(movetime + SEARCH_SLACK).await
    }
}
