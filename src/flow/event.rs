//! Inbound events — the normalized input surface of the flow engine.
//!
//! Transports reduce whatever their wire format carries (messages, button
//! callbacks, shared contacts) to a [`FlowEvent`] before handing it to the
//! engine, so the state machine never sees transport detail.

use serde::{Deserialize, Serialize};

/// Out-of-band commands recognized at any step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Start,
    Cancel,
    Help,
}

/// Payload of a normalized inbound event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventPayload {
    Command(Command),
    /// A button press carrying its callback token.
    Choice(String),
    /// Plain typed text.
    Text(String),
    /// A shared contact card; `text` is any accompanying caption.
    Contact { phone: String, text: Option<String> },
}

impl EventPayload {
    /// The raw token this payload contributes as an answer.
    ///
    /// Commands never answer a step. For contact payloads the structured
    /// phone number wins over caption text.
    pub fn answer_token(&self) -> Option<&str> {
        match self {
            EventPayload::Command(_) => None,
            EventPayload::Choice(token) => Some(token),
            EventPayload::Text(text) => Some(text),
            EventPayload::Contact { phone, text } => {
                if phone.trim().is_empty() {
                    text.as_deref()
                } else {
                    Some(phone)
                }
            }
        }
    }
}

/// One normalized event from a transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowEvent {
    /// Stable per-user key; sessions and serialization hang off this.
    pub user_id: String,
    pub payload: EventPayload,
}

impl FlowEvent {
    pub fn new(user_id: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            user_id: user_id.into(),
            payload,
        }
    }

    pub fn command(user_id: impl Into<String>, command: Command) -> Self {
        Self::new(user_id, EventPayload::Command(command))
    }

    pub fn choice(user_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self::new(user_id, EventPayload::Choice(token.into()))
    }

    pub fn text(user_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(user_id, EventPayload::Text(text.into()))
    }
}

/// Parse a text message into a command, if it is one.
///
/// Accepts `/start`, `/cancel`, and `/help`, case-insensitively, including
/// the `/command@BotName` form Telegram uses in group chats. Trailing
/// arguments are ignored.
pub fn parse_command(text: &str) -> Option<Command> {
    let first = text.trim().split_whitespace().next()?;
    let name = first.strip_prefix('/')?;
    let name = name.split('@').next().unwrap_or(name);
    match name.to_ascii_lowercase().as_str() {
        "start" => Some(Command::Start),
        "cancel" => Some(Command::Cancel),
        "help" => Some(Command::Help),
        _ => None,
    }
}

/// Normalize a typed line into a payload: commands first, otherwise text.
pub fn parse_text(text: &str) -> EventPayload {
    match parse_command(text) {
        Some(command) => EventPayload::Command(command),
        None => EventPayload::Text(text.trim().to_string()),
    }
}
