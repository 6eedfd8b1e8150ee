pub mod api;
pub mod broker;
pub mod config;
pub mod error;
pub mod hub;
pub mod ws;
