//! Directives — what the engine tells a transport to present.
//!
//! The engine never talks to a wire API. It returns one directive per
//! event and each transport renders it with its own affordances (inline
//! keyboards on Telegram, token lists on the CLI).

use crate::lead::LeadRecord;
use crate::registry::{Choice, StepId};

/// Rendering hint attached to a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptNote {
    /// Nothing special; just ask the question.
    Plain,
    /// Fresh session; transports open with a greeting.
    Greeting,
    /// The previous token matched no choice; explain, then re-ask.
    UnrecognizedChoice,
    /// Empty input where text was required; explain, then re-ask.
    TextRequired,
}

/// The engine's answer to one inbound event.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// Ask (or re-ask) a question.
    Prompt {
        step_id: StepId,
        text: String,
        /// Buttons to offer; empty for text steps.
        choices: Vec<Choice>,
        note: PromptNote,
    },
    /// Present the finished lead.
    Summary { lead: LeadRecord },
    /// The conversation ended without a lead.
    Cancelled { notice: String },
}

impl Directive {
    /// Short tag for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Directive::Prompt { .. } => "prompt",
            Directive::Summary { .. } => "summary",
            Directive::Cancelled { .. } => "cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_kind() {
        let directive = Directive::Cancelled {
            notice: "notice".to_string(),
        };
        assert_eq!(directive.kind(), "cancelled");

        let prompt = Directive::Prompt {
            step_id: StepId::Category,
            text: "?".to_string(),
            choices: vec![],
            note: PromptNote::Plain,
        };
        assert_eq!(prompt.kind(), "prompt");
    }
}
