//! Transport channels — the bot's inbound/outbound edges.

pub mod cli;
pub mod telegram;

pub use cli::CliChannel;
pub use telegram::TelegramChannel;
