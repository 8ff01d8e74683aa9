//! Flow engine — the per-user conversation state machine.
//!
//! One inbound [`FlowEvent`] goes in, exactly one [`Directive`] comes out.
//! The engine owns all session mutation: it validates the payload against
//! the awaited step, records accepted answers, decides what to ask next,
//! and hands completed sessions to the finalizer. Transports only render.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::Error;
use crate::flow::directive::{Directive, PromptNote};
use crate::flow::event::{Command, EventPayload, FlowEvent};
use crate::flow::session::Session;
use crate::flow::store::SessionStore;
use crate::lead::LeadFinalizer;
use crate::registry::{texts, AnswerRegistry, StepDefinition, StepId, StepKind};

/// Outcome of validating one payload against the awaited step.
#[derive(Debug)]
enum Advance {
    /// Re-ask the awaited step with the given note.
    Retry(PromptNote),
    /// Answer recorded; ask the next step.
    Ask(StepId),
    /// Answer recorded and the chain is exhausted; finalize.
    Finalize,
    /// Entry-step bail-out: the conversation ends with an apology.
    Abort,
}

pub struct FlowEngine {
    registry: Arc<AnswerRegistry>,
    store: Arc<SessionStore>,
    finalizer: LeadFinalizer,
}

impl FlowEngine {
    pub fn new(
        registry: Arc<AnswerRegistry>,
        store: Arc<SessionStore>,
        finalizer: LeadFinalizer,
    ) -> Self {
        Self {
            registry,
            store,
            finalizer,
        }
    }

    /// Apply one inbound event and produce the directive to present.
    ///
    /// The whole pass runs under the user's store guard, so events for one
    /// user apply strictly in arrival order. Only the finalizer's listings
    /// lookup suspends on anything but that guard.
    pub async fn handle_event(&self, event: FlowEvent) -> Result<Directive, Error> {
        let _guard = self.store.lock_user(&event.user_id).await;

        // Cancel pre-empts everything, including step dispatch.
        if event.payload == EventPayload::Command(Command::Cancel) {
            return Ok(self.cancel(&event.user_id).await);
        }
        if event.payload == EventPayload::Command(Command::Start) {
            return self.start(&event.user_id).await;
        }

        let Some(mut session) = self.store.get(&event.user_id).await else {
            // No active session: any other event begins a fresh one. The
            // payload itself is not applied; the user sees the first prompt.
            debug!(user_id = %event.user_id, "Event without session; starting fresh");
            return self.start(&event.user_id).await;
        };

        let Some(step_id) = session.current_step() else {
            // Terminal sessions are evicted under the same guard that
            // created them, so this is a store inconsistency. Recover by
            // restarting rather than wedging the user.
            warn!(
                user_id = %event.user_id,
                state = %session.state,
                "Terminal session in store; restarting"
            );
            return self.start(&event.user_id).await;
        };
        let step = self.registry.step(step_id)?;

        match self.advance(&mut session, step, &event.payload) {
            Advance::Retry(note) => {
                let directive = self.prompt(step_id, note)?;
                self.store.save(session).await;
                Ok(directive)
            }
            Advance::Ask(next) => {
                debug!(user_id = %event.user_id, from = %step_id, to = %next, "Step advanced");
                let directive = self.prompt(next, PromptNote::Plain)?;
                self.store.save(session).await;
                Ok(directive)
            }
            Advance::Finalize => {
                info!(user_id = %event.user_id, "All steps answered; finalizing lead");
                let lead = self.finalizer.finalize(&session).await;
                self.store.remove(&event.user_id).await;
                Ok(Directive::Summary { lead })
            }
            Advance::Abort => {
                info!(user_id = %event.user_id, "Unrecognized entry choice; conversation ended");
                self.store.remove(&event.user_id).await;
                Ok(Directive::Cancelled {
                    notice: texts::UNKNOWN_CHOICE_APOLOGY.to_string(),
                })
            }
        }
    }

    /// Begin (or restart) a session at the entry step.
    async fn start(&self, user_id: &str) -> Result<Directive, Error> {
        let first = self.registry.first_step().id;
        self.store.save(Session::new(user_id, first)).await;
        info!(user_id, step = %first, "Session started");
        self.prompt(first, PromptNote::Greeting)
    }

    /// Cancel a session if one exists. Idempotent: cancelling with no
    /// session emits the same notice and creates nothing.
    async fn cancel(&self, user_id: &str) -> Directive {
        if let Some(mut session) = self.store.remove(user_id).await {
            session.cancel();
            info!(user_id, "Session cancelled");
        }
        Directive::Cancelled {
            notice: texts::CANCEL_NOTICE.to_string(),
        }
    }

    /// Validate `payload` against the awaited step and update the session.
    /// Synchronous and free of I/O; the caller persists the outcome.
    fn advance(
        &self,
        session: &mut Session,
        step: &StepDefinition,
        payload: &EventPayload,
    ) -> Advance {
        if let EventPayload::Command(command) = payload {
            // Start and Cancel were handled before dispatch. Anything else
            // (help, or commands added later) repeats the question.
            debug!(
                user_id = %session.user_id,
                command = ?command,
                "Command mid-step; re-prompting"
            );
            session.touch();
            return Advance::Retry(PromptNote::Plain);
        }

        let token = payload.answer_token().map(str::trim).unwrap_or_default();

        match step.kind {
            StepKind::Choice => {
                if token.is_empty() {
                    // A blank payload is a malformed event, not a wrong
                    // choice. Re-ask even at the entry step.
                    session.touch();
                    Advance::Retry(PromptNote::Plain)
                } else if step.has_token(token) {
                    self.accept(session, step, token)
                } else if self.is_entry_step(step.id) {
                    // An unknown token at the entry step is read as a stale
                    // button press from an already-ended conversation; end
                    // this one too. Later steps retry instead.
                    session.cancel();
                    Advance::Abort
                } else {
                    debug!(
                        user_id = %session.user_id,
                        step = %step.id,
                        token,
                        "Unrecognized choice; retrying"
                    );
                    session.touch();
                    Advance::Retry(PromptNote::UnrecognizedChoice)
                }
            }
            StepKind::FreeText | StepKind::Contact => {
                if token.is_empty() {
                    session.touch();
                    Advance::Retry(PromptNote::TextRequired)
                } else {
                    self.accept(session, step, token)
                }
            }
        }
    }

    fn accept(&self, session: &mut Session, step: &StepDefinition, token: &str) -> Advance {
        match session.accept_answer(token, step.next) {
            Ok(Some(next)) => Advance::Ask(next),
            Ok(None) => Advance::Finalize,
            Err(reason) => {
                warn!(
                    user_id = %session.user_id,
                    step = %step.id,
                    reason = %reason,
                    "Answer rejected"
                );
                Advance::Retry(PromptNote::Plain)
            }
        }
    }

    fn prompt(&self, step_id: StepId, note: PromptNote) -> Result<Directive, Error> {
        let step = self.registry.step(step_id)?;
        Ok(Directive::Prompt {
            step_id,
            text: step.prompt.clone(),
            choices: step.choices.clone(),
            note,
        })
    }

    fn is_entry_step(&self, step_id: StepId) -> bool {
        self.registry.first_step().id == step_id
    }
}
