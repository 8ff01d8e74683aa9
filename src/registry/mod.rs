//! Answer registry — wizard steps, answer tokens, and user-facing texts.

pub mod step;
pub mod table;
pub mod texts;

pub use step::{tokens, Choice, StepDefinition, StepId, StepKind};
pub use table::AnswerRegistry;
