//! CLI channel — stdin/stdout REPL for walking the wizard locally.
//!
//! Choice steps are answered by typing the option's token. Useful for
//! trying flow changes without a bot token.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::error;

use crate::channels::telegram::render_summary;
use crate::error::Error;
use crate::flow::{parse_text, Command, Directive, EventPayload, FlowEngine, FlowEvent, PromptNote};
use crate::registry::texts;

/// User key for the single local conversation.
const LOCAL_USER: &str = "local-user";

/// A simple CLI channel that reads from stdin and writes to stdout.
pub struct CliChannel;

impl CliChannel {
    pub fn new() -> Self {
        Self
    }

    /// Read lines until EOF, feeding each to the engine.
    pub async fn run(&self, engine: Arc<FlowEngine>) -> Result<(), Error> {
        let stdin = tokio::io::stdin();
        let reader = BufReader::new(stdin);
        let mut lines = reader.lines();

        println!("Отправьте /start, чтобы начать. Варианты выбираются вводом токена.");
        eprint!("> ");

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line.trim().to_string(),
                Ok(None) => break, // EOF
                Err(e) => {
                    error!("Error reading stdin: {}", e);
                    break;
                }
            };
            if line.is_empty() {
                eprint!("> ");
                continue;
            }

            let payload = parse_text(&line);
            if payload == EventPayload::Command(Command::Help) {
                println!("\n{}\n", texts::HELP);
                eprint!("> ");
                continue;
            }

            match engine.handle_event(FlowEvent::new(LOCAL_USER, payload)).await {
                Ok(directive) => println!("\n{}\n", render_plain(&directive)),
                Err(e) => {
                    error!(error = %e, "Failed to process input");
                    println!("\n{}\n", texts::PROCESSING_FAILED);
                }
            }
            eprint!("> ");
        }

        Ok(())
    }
}

/// Render a directive as plain text, choices as token/label lines.
fn render_plain(directive: &Directive) -> String {
    match directive {
        Directive::Prompt {
            text,
            choices,
            note,
            ..
        } => {
            let mut out = match note {
                PromptNote::Plain => text.clone(),
                PromptNote::Greeting => format!("{} {}", texts::greeting(None), text),
                PromptNote::UnrecognizedChoice => {
                    format!("{}\n\n{}", texts::UNKNOWN_CHOICE_RETRY, text)
                }
                PromptNote::TextRequired => format!("{}\n\n{}", texts::TEXT_REQUIRED, text),
            };
            for choice in choices {
                out.push_str(&format!("\n  {:24} {}", choice.token, choice.label));
            }
            out
        }
        Directive::Summary { lead } => render_summary(lead),
        Directive::Cancelled { notice } => notice.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Choice, StepId};

    #[test]
    fn render_plain_prompt_lists_tokens() {
        let directive = Directive::Prompt {
            step_id: StepId::Rooms,
            text: "Сколько комнат вас интересует?".to_string(),
            choices: vec![
                Choice::new("1_room", "1 комната"),
                Choice::new("2_rooms", "2 комнаты"),
            ],
            note: PromptNote::Plain,
        };

        let text = render_plain(&directive);
        assert!(text.starts_with("Сколько комнат вас интересует?"));
        assert!(text.contains("1_room"));
        assert!(text.contains("2 комнаты"));
    }

    #[test]
    fn render_plain_cancelled_is_notice_only() {
        let directive = Directive::Cancelled {
            notice: texts::CANCEL_NOTICE.to_string(),
        };
        assert_eq!(render_plain(&directive), texts::CANCEL_NOTICE);
    }
}
