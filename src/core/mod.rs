//! Core application module
//!
//! - `error` - `CoreError` and `CoreResult`
//! - `settings` - `GameSettings` and its JSON persistence

pub mod error;
pub mod settings;

pub use error::{CoreError, CoreResult};
pub use settings::{load_settings, save_settings, GameSettings};
