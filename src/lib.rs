//! Estate Intake — conversational lead-intake bot for a real-estate agency.

pub mod channels;
pub mod config;
pub mod error;
pub mod flow;
pub mod lead;
pub mod registry;
