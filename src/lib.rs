pub mod commands;
pub mod core;
pub mod engine;
pub mod game;
pub mod local;
pub mod networking;
