use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use neonchess::commands::{spawn_stdin_reader, HELP};
use neonchess::core::settings::settings_path;
use neonchess::core::{load_settings, save_settings, GameSettings};
use neonchess::engine::{Difficulty, UciEngine};
use neonchess::game::resources::format_clock;
use neonchess::game::{AppliedMove, ChessGame, Color, GameObserver, GameOutcome, TimeControl};
use neonchess::local::LocalGame;
use neonchess::networking::{run_online, OnlineSession, RoomRequest, SessionEvent, SessionObserver};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "neonchess", about = "Two-player chess against an engine or online")]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Play against a UCI engine
    Local(LocalArgs),
    /// Play through a room server
    Online(OnlineArgs),
    /// Show or change the saved defaults
    Settings(SettingsArgs),
}

#[derive(Args)]
struct LocalArgs {
    /// Engine executable (defaults to the saved setting)
    #[arg(long)]
    engine: Option<String>,
    /// Engine level, 1-10
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=10))]
    level: Option<u8>,
    #[arg(long, value_enum)]
    color: Option<SideArg>,
    /// Seconds per side, 0 for no clock
    #[arg(long)]
    time: Option<u64>,
}

#[derive(Args)]
struct OnlineArgs {
    /// Room server WebSocket URL
    #[arg(long)]
    server: Option<String>,
    #[arg(long, conflicts_with = "join")]
    create: bool,
    /// Room code to join
    #[arg(long)]
    join: Option<String>,
    /// Seconds per side, 0 for no clock
    #[arg(long)]
    time: Option<u64>,
}

#[derive(Args)]
struct SettingsArgs {
    #[arg(long)]
    server: Option<String>,
    #[arg(long)]
    engine: Option<String>,
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=10))]
    level: Option<u8>,
    #[arg(long, value_enum)]
    color: Option<SideArg>,
    /// Seconds per side, 0 for no clock
    #[arg(long)]
    time: Option<u64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum SideArg {
    White,
    Black,
}

impl From<SideArg> for Color {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::White => Color::White,
            SideArg::Black => Color::Black,
        }
    }
}

fn time_control(secs: Option<u64>, settings: &GameSettings) -> TimeControl {
    match secs {
        Some(0) => TimeControl::Unlimited,
        Some(base_secs) => TimeControl::Fischer {
            base_secs,
            increment_secs: 0,
        },
        None => settings.time_control,
    }
}

/// Prints the game to stdout
struct TerminalObserver {
    me: Option<Color>,
}

impl TerminalObserver {
    fn print_board(&self, game: &ChessGame) {
        let now = Instant::now();
        println!("{}", game.board());
        println!(
            "White {}  Black {}  {} to move",
            format_clock(game.remaining(Color::White, now)),
            format_clock(game.remaining(Color::Black, now)),
            game.turn().name()
        );
    }
}

impl GameObserver for TerminalObserver {
    fn move_applied(&mut self, game: &ChessGame, applied: &AppliedMove) {
        let who = applied.record.piece.color.name();
        println!("{who} played {}", applied.record.uci());
        self.print_board(game);
    }

    fn check_detected(&mut self, color: Color) {
        println!("{} is in check", color.name());
    }

    fn game_ended(&mut self, outcome: &GameOutcome) {
        println!("{}", outcome.message());
        if let (Some(me), Some(winner)) = (self.me, outcome.winner()) {
            println!("{}", if me == winner { "You win." } else { "You lose." });
        }
        println!("Type quit to leave.");
    }

    fn move_rejected(&mut self, reason: &str) {
        println!("Move refused: {reason}");
    }

    fn show_position(&mut self, game: &ChessGame) {
        if game.is_reviewing() {
            println!(
                "Position {} of {} (type live to return)",
                game.history().cursor(),
                game.history().live_index()
            );
        }
        self.print_board(game);
    }
}

impl SessionObserver for TerminalObserver {
    fn session_event(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::RoomCreated { room_id } => {
                println!("Room created. Share this code: {room_id}")
            }
            SessionEvent::GameStarted { room_id, color } => {
                self.me = Some(*color);
                println!("Game {room_id} started. You play {}.", color.name());
            }
            SessionEvent::OpponentOnline(online) => {
                println!("Opponent {}", if *online { "online" } else { "offline" })
            }
            SessionEvent::Chat(line) => println!("[chat] {}", line.text),
            SessionEvent::ServerError { message, .. } => println!("Server: {message}"),
            SessionEvent::Reconnecting { attempt } => println!("Reconnecting ({attempt})..."),
            SessionEvent::Rejoined(true) => println!("Reconnected."),
            SessionEvent::Rejoined(false) => println!("The room is gone."),
        }
    }
}

async fn play_local(args: LocalArgs, settings: GameSettings) -> anyhow::Result<()> {
    let engine_path = args.engine.unwrap_or(settings.engine_path.clone());
    let engine = UciEngine::spawn(&engine_path)
        .await
        .with_context(|| format!("could not start engine {engine_path:?}"))?;
    let human: Color = args.color.map(Color::from).unwrap_or(settings.color);
    let difficulty = Difficulty::new(args.level.unwrap_or(settings.difficulty));
    let game = ChessGame::new(time_control(args.time, &settings));

    let observer = TerminalObserver { me: Some(human) };
    observer.print_board(&game);
    println!("{HELP}");

    let mut local = LocalGame::new(game, engine, difficulty, human, observer);
    let mut inputs = spawn_stdin_reader();
    local.run(&mut inputs).await?;
    local.engine.quit().await?;
    Ok(())
}

async fn play_online(args: OnlineArgs, settings: GameSettings) -> anyhow::Result<()> {
    let request = match (args.create, args.join) {
        (_, Some(code)) => RoomRequest::Join(code),
        (true, None) => RoomRequest::Create,
        (false, None) => anyhow::bail!("pass --create or --join CODE"),
    };
    let server = args.server.unwrap_or(settings.server_url.clone());
    let observer = TerminalObserver { me: None };
    let mut session = OnlineSession::new(observer, time_control(args.time, &settings));
    let mut inputs = spawn_stdin_reader();
    println!("{HELP}");
    run_online(&server, request, &mut session, &mut inputs).await
}

fn update_settings(args: SettingsArgs, mut settings: GameSettings) -> anyhow::Result<()> {
    let changed = args.server.is_some()
        || args.engine.is_some()
        || args.level.is_some()
        || args.color.is_some()
        || args.time.is_some();

    settings.time_control = time_control(args.time, &settings);
    if let Some(server) = args.server {
        settings.server_url = server;
    }
    if let Some(engine) = args.engine {
        settings.engine_path = engine;
    }
    if let Some(level) = args.level {
        settings.difficulty = level;
    }
    if let Some(color) = args.color {
        settings.color = color.into();
    }

    if changed {
        save_settings(&settings)?;
    }
    println!("{}", settings_path().display());
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = load_settings();

    match cli.mode {
        Mode::Local(args) => play_local(args, settings).await,
        Mode::Online(args) => play_online(args, settings).await,
        Mode::Settings(args) => update_settings(args, settings),
    }
}
