//! Settings persistence
//!
//! Saves and loads [`GameSettings`] to/from a JSON file in the user's
//! configuration directory (e.g. `~/.config/neonchess/settings.json`).
//!
//! # Error Handling
//!
//! - Load failures fall back to default settings and are logged
//! - Save failures are returned to the caller, which decides whether to care

use crate::core::error::{CoreError, CoreResult};
use crate::game::{Color, TimeControl};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Settings filename
const SETTINGS_FILENAME: &str = "settings.json";

pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:8080/ws";
pub const DEFAULT_ENGINE_PATH: &str = "stockfish";

/// User preferences; CLI flags override these per run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    /// WebSocket URL of the room server
    pub server_url: String,
    /// UCI engine executable
    pub engine_path: String,
    /// Engine strength, 1 to 10
    pub difficulty: u8,
    pub time_control: TimeControl,
    /// Side the human plays against the engine
    pub color: Color,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            engine_path: DEFAULT_ENGINE_PATH.to_string(),
            difficulty: 5,
            time_control: TimeControl::default(),
            color: Color::White,
        }
    }
}

impl GameSettings {
    pub fn validate(&self) -> CoreResult<()> {
        if !(1..=10).contains(&self.difficulty) {
            return Err(CoreError::InvalidSetting {
                field: "difficulty",
                message: format!("expected 1-10, got {}", self.difficulty),
            });
        }
        // The client is built without TLS support
        if !self.server_url.starts_with("ws://") {
            return Err(CoreError::InvalidSetting {
                field: "server_url",
                message: format!("expected a ws:// URL, got {:?}", self.server_url),
            });
        }
        Ok(())
    }
}

/// Path to `settings.json` in the user's configuration directory
///
/// Falls back to a local `settings.json` if the system config dir cannot be found.
pub fn settings_path() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("com", "neonchess", "NeonChess") {
        proj_dirs.config_dir().join(SETTINGS_FILENAME)
    } else {
        PathBuf::from(SETTINGS_FILENAME)
    }
}

/// Load settings, using defaults when the file is missing or unusable
pub fn load_settings() -> GameSettings {
    load_settings_from(&settings_path())
}

pub fn load_settings_from(path: &Path) -> GameSettings {
    if !path.exists() {
        info!("[SETTINGS] No settings file found at {:?}. Using defaults.", path);
        return GameSettings::default();
    }

    match read_settings(path) {
        Ok(settings) => {
            info!("[SETTINGS] Loaded settings from {:?}", path);
            settings
        }
        Err(e) => {
            warn!(
                "[SETTINGS] Failed to load settings file at {:?}: {}. Using defaults.",
                path, e
            );
            GameSettings::default()
        }
    }
}

fn read_settings(path: &Path) -> CoreResult<GameSettings> {
    let contents = fs::read_to_string(path)?;
    let settings: GameSettings = serde_json::from_str(&contents)?;
    settings.validate()?;
    Ok(settings)
}

pub fn save_settings(settings: &GameSettings) -> CoreResult<()> {
    save_settings_to(settings, &settings_path())
}

pub fn save_settings_to(settings: &GameSettings, path: &Path) -> CoreResult<()> {
    settings.validate()?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json)?;
    info!("[SETTINGS] Saved settings to {:?}", path);
    Ok(())
}
