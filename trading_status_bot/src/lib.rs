//! A small Telegram bot that answers a few commands with simulated
//! market data, and reports its own health over HTTP for the hosting
//! platform to probe.

/// Configuration from environment variables.
pub mod config;

/// Shared status of the bot.
pub mod status;

/// CPU, memory and disk load of the host.
pub mod system;

/// Made up price quotes.
pub mod price;

/// Functions that handle messages from Telegram.
pub mod handlers;

/// Liveness HTTP server.
pub mod web;

/// Entry function that starts everything.
mod entry;
pub use entry::*;
