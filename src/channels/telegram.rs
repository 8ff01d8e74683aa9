//! Telegram channel — long-polls the Bot API and renders directives.
//!
//! Native Bot API integration: getUpdates long-polling for messages and
//! callback queries, inline keyboards for choice steps, Markdown-first
//! sending with plain-text fallback. Every update is reduced to a
//! [`FlowEvent`] before it reaches the engine.

use std::pin::Pin;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::error::{ChannelError, Error};
use crate::flow::{
    parse_command, Command, Directive, EventPayload, FlowEngine, FlowEvent, PromptNote,
};
use crate::lead::LeadRecord;
use crate::registry::{texts, Choice};

/// Maximum message length for Telegram's sendMessage API.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// Long-poll timeout passed to getUpdates, in seconds.
const POLL_TIMEOUT_SECS: u64 = 30;

/// Delay before retrying after a failed poll.
const POLL_RETRY_DELAY: std::time::Duration = std::time::Duration::from_secs(5);

/// Inline keyboard layout: buttons per row.
const BUTTONS_PER_ROW: usize = 2;

/// One normalized update from the Bot API.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct InboundUpdate {
    /// Chat to answer into.
    chat_id: String,
    /// Stable user key for the engine.
    user_id: String,
    first_name: Option<String>,
    payload: EventPayload,
    /// Callback query id to acknowledge, when the update was a button press.
    callback_id: Option<String>,
}

/// Telegram channel — connects to the Bot API via long-polling.
pub struct TelegramChannel {
    bot_token: SecretString,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: SecretString) -> Self {
        Self {
            bot_token,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "https://api.telegram.org/bot{}/{method}",
            self.bot_token.expose_secret()
        )
    }

    /// Poll updates and run the wizard until Ctrl+C.
    pub async fn run(&self, engine: Arc<FlowEngine>) -> Result<(), Error> {
        let mut updates = self.update_stream();
        info!("Telegram channel listening for updates...");

        loop {
            let inbound = tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Ctrl+C received, shutting down...");
                    break;
                }
                update = updates.next() => match update {
                    Some(update) => update,
                    None => {
                        info!("Telegram update stream ended");
                        break;
                    }
                },
            };

            // Updates are applied one at a time, so a user's events reach
            // the engine in the order Telegram delivered them.
            self.handle_inbound(&engine, inbound).await;
        }

        Ok(())
    }

    async fn handle_inbound(&self, engine: &FlowEngine, inbound: InboundUpdate) {
        debug!(
            user_id = %inbound.user_id,
            chat_id = %inbound.chat_id,
            "Handling update"
        );

        // Button presses are acknowledged regardless of what the engine
        // decides, or the client keeps its spinner forever.
        if let Some(ref callback_id) = inbound.callback_id {
            if let Err(e) = self.answer_callback(callback_id).await {
                warn!(error = %e, "Failed to acknowledge callback query");
            }
        }

        // Help is informational; it is answered here and never touches
        // session state.
        if inbound.payload == EventPayload::Command(Command::Help) {
            if let Err(e) = self.send_message(&inbound.chat_id, texts::HELP, None).await {
                warn!(error = %e, "Failed to send help text");
            }
            return;
        }

        let event = FlowEvent::new(inbound.user_id.clone(), inbound.payload.clone());
        match engine.handle_event(event).await {
            Ok(directive) => {
                debug!(
                    user_id = %inbound.user_id,
                    directive = directive.kind(),
                    "Engine produced directive"
                );
                let (text, keyboard) = render_directive(&directive, inbound.first_name.as_deref());
                if let Err(e) = self.send_message(&inbound.chat_id, &text, keyboard).await {
                    warn!(user_id = %inbound.user_id, error = %e, "Failed to send reply");
                }
            }
            Err(e) => {
                error!(user_id = %inbound.user_id, error = %e, "Failed to process update");
                let _ = self
                    .send_message(&inbound.chat_id, texts::PROCESSING_FAILED, None)
                    .await;
            }
        }
    }

    /// Spawn the long-poll loop and expose updates as a stream.
    fn update_stream(&self) -> Pin<Box<dyn Stream<Item = InboundUpdate> + Send>> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let client = self.client.clone();
        let url = self.api_url("getUpdates");

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            loop {
                let body = json!({
                    "offset": offset,
                    "timeout": POLL_TIMEOUT_SECS,
                    "allowed_updates": ["message", "callback_query"],
                });

                let resp = match client.post(&url).json(&body).send().await {
                    Ok(r) => r,
                    Err(e) => {
                        warn!("Telegram poll error: {e}");
                        tokio::time::sleep(POLL_RETRY_DELAY).await;
                        continue;
                    }
                };

                let data: Value = match resp.json().await {
                    Ok(d) => d,
                    Err(e) => {
                        warn!("Telegram parse error: {e}");
                        tokio::time::sleep(POLL_RETRY_DELAY).await;
                        continue;
                    }
                };

                if let Some(results) = data.get("result").and_then(Value::as_array) {
                    for update in results {
                        // Advance offset past this update
                        if let Some(uid) = update.get("update_id").and_then(Value::as_i64) {
                            offset = uid + 1;
                        }

                        let Some(inbound) = normalize_update(update) else {
                            continue;
                        };

                        if tx.send(inbound).is_err() {
                            info!("Telegram listener channel closed");
                            return;
                        }
                    }
                }
            }
        });

        Box::pin(futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|update| (update, rx))
        }))
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<(), ChannelError> {
        let resp = self
            .client
            .post(self.api_url("answerCallbackQuery"))
            .json(&json!({ "callback_query_id": callback_id }))
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::SendFailed {
                name: "telegram".into(),
                reason: format!("answerCallbackQuery returned {}", resp.status()),
            })
        }
    }

    /// Send a text message, trying Markdown first with plain text fallback.
    /// Splits long messages that exceed Telegram's 4096 char limit; the
    /// keyboard, if any, rides on the final chunk so buttons sit under the
    /// question.
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        keyboard: Option<Value>,
    ) -> Result<(), ChannelError> {
        let chunks = split_message(text, TELEGRAM_MAX_MESSAGE_LENGTH);
        let last = chunks.len() - 1;

        for (i, chunk) in chunks.iter().enumerate() {
            let markup = if i == last { keyboard.as_ref() } else { None };
            self.send_message_chunk(chat_id, chunk, markup).await?;
        }
        Ok(())
    }

    /// Send a single message chunk (≤4096 chars), Markdown-first with fallback.
    async fn send_message_chunk(
        &self,
        chat_id: &str,
        text: &str,
        keyboard: Option<&Value>,
    ) -> Result<(), ChannelError> {
        let mut markdown_body = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown",
        });
        if let Some(markup) = keyboard {
            markdown_body["reply_markup"] = markup.clone();
        }

        let markdown_resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&markdown_body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if markdown_resp.status().is_success() {
            return Ok(());
        }

        let markdown_status = markdown_resp.status();
        warn!(
            status = ?markdown_status,
            "Telegram sendMessage with Markdown failed; retrying without parse_mode"
        );

        // Retry without parse_mode
        let mut plain_body = json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(markup) = keyboard {
            plain_body["reply_markup"] = markup.clone();
        }

        let plain_resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&plain_body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if !plain_resp.status().is_success() {
            let plain_err = plain_resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: "telegram".into(),
                reason: format!(
                    "sendMessage failed (markdown: {}, plain: {})",
                    markdown_status, plain_err
                ),
            });
        }

        Ok(())
    }
}

// ── Update normalization ────────────────────────────────────────────

/// Reduce one getUpdates entry to an [`InboundUpdate`].
/// Returns `None` for update types the wizard has no use for.
fn normalize_update(update: &Value) -> Option<InboundUpdate> {
    if let Some(callback) = update.get("callback_query") {
        return normalize_callback(callback);
    }
    if let Some(message) = update.get("message") {
        return normalize_message(message);
    }
    None
}

fn normalize_callback(callback: &Value) -> Option<InboundUpdate> {
    let token = callback.get("data").and_then(Value::as_str)?;
    let from = callback.get("from")?;
    let user_id = from.get("id").and_then(Value::as_i64)?.to_string();

    // Old callbacks can arrive without their originating message; answer
    // into the private chat in that case.
    let chat_id = callback
        .get("message")
        .and_then(|m| m.get("chat"))
        .and_then(|c| c.get("id"))
        .and_then(Value::as_i64)
        .map(|id| id.to_string())
        .unwrap_or_else(|| user_id.clone());

    Some(InboundUpdate {
        chat_id,
        user_id,
        first_name: extract_first_name(from),
        payload: EventPayload::Choice(token.to_string()),
        callback_id: callback.get("id").and_then(Value::as_str).map(String::from),
    })
}

fn normalize_message(message: &Value) -> Option<InboundUpdate> {
    let from = message.get("from")?;
    let user_id = from.get("id").and_then(Value::as_i64)?.to_string();
    let chat_id = message
        .get("chat")
        .and_then(|c| c.get("id"))
        .and_then(Value::as_i64)
        .map(|id| id.to_string())
        .unwrap_or_else(|| user_id.clone());

    let payload = if let Some(contact) = message.get("contact") {
        let phone = contact
            .get("phone_number")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let text = message
            .get("text")
            .and_then(Value::as_str)
            .map(String::from);
        EventPayload::Contact { phone, text }
    } else {
        let text = message.get("text").and_then(Value::as_str)?;
        match parse_command(text) {
            Some(command) => EventPayload::Command(command),
            None => EventPayload::Text(text.trim().to_string()),
        }
    };

    Some(InboundUpdate {
        chat_id,
        user_id,
        first_name: extract_first_name(from),
        payload,
        callback_id: None,
    })
}

fn extract_first_name(from: &Value) -> Option<String> {
    from.get("first_name")
        .and_then(Value::as_str)
        .map(String::from)
}

// ── Directive rendering ─────────────────────────────────────────────

/// Render a directive into message text plus an optional inline keyboard.
fn render_directive(directive: &Directive, first_name: Option<&str>) -> (String, Option<Value>) {
    match directive {
        Directive::Prompt {
            text,
            choices,
            note,
            ..
        } => {
            let body = match note {
                PromptNote::Plain => text.clone(),
                PromptNote::Greeting => format!("{} {}", texts::greeting(first_name), text),
                PromptNote::UnrecognizedChoice => {
                    format!("{}\n\n{}", texts::UNKNOWN_CHOICE_RETRY, text)
                }
                PromptNote::TextRequired => format!("{}\n\n{}", texts::TEXT_REQUIRED, text),
            };
            (body, inline_keyboard(choices))
        }
        Directive::Summary { lead } => (render_summary(lead), None),
        Directive::Cancelled { notice } => (notice.clone(), None),
    }
}

/// Build a reply_markup value for a choice set, two buttons per row.
fn inline_keyboard(choices: &[Choice]) -> Option<Value> {
    if choices.is_empty() {
        return None;
    }
    let rows: Vec<Value> = choices
        .chunks(BUTTONS_PER_ROW)
        .map(|row| {
            Value::Array(
                row.iter()
                    .map(|c| json!({ "text": c.label, "callback_data": c.token }))
                    .collect(),
            )
        })
        .collect();
    Some(json!({ "inline_keyboard": rows }))
}

/// Render the completed-lead summary shared by all transports.
pub(crate) fn render_summary(lead: &LeadRecord) -> String {
    let mut lines = vec![texts::SUMMARY_HEADER.to_string()];
    for (title, value) in lead.summary_fields() {
        lines.push(format!("{title}: {value}"));
    }

    lines.push(String::new());
    if lead.matches.is_empty() {
        lines.push(texts::NO_MATCHES.to_string());
    } else {
        lines.push(texts::MATCHES_HEADER.to_string());
        for m in &lead.matches {
            lines.push(format!("{} ({})\n{}", m.title, m.price, m.link));
        }
    }

    lines.push(String::new());
    lines.push(texts::SUMMARY_FOOTER.to_string());
    lines.join("\n")
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Split a message into chunks that fit Telegram's character limit.
/// Tries to split on newlines, then spaces, then hard-cuts at the nearest
/// char boundary (the texts are Cyrillic, so byte offsets cannot be cut
/// blindly).
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let mut cut = max_len;
        while !remaining.is_char_boundary(cut) {
            cut -= 1;
        }

        // Find a good split point
        let window = &remaining[..cut];
        let split_at = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .filter(|&at| at > 0)
            .unwrap_or(cut);

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    chunks
}

// ── Tests ───────────────────────────────────────────────────────────
