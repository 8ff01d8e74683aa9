//! Conversation flow — events, sessions, the store, and the state machine.

pub mod directive;
pub mod engine;
pub mod event;
pub mod session;
pub mod store;

pub use directive::{Directive, PromptNote};
pub use engine::FlowEngine;
pub use event::{parse_command, parse_text, Command, EventPayload, FlowEvent};
pub use session::{FlowState, Session};
pub use store::{spawn_sweep_task, SessionStore};
