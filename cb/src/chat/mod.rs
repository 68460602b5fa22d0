//! Chat sessions
//!
//! A [`ChatSession`] owns the durable state the front end renders and runs
//! turns against it: snapshot into a session, run the agent, merge back.

mod autonomous;
mod session;
mod state;

pub use autonomous::{AutonomousOutcome, AutonomousStop, COMPLETED_MARKER, CONTINUE_PROMPT, FAILED_MARKER};
pub use session::{ChatSession, EMPTY_INPUT_PROMPT, TurnOutcome};
pub use state::{AppState, ChatMessage, ChatRole, WELCOME_MESSAGE};

/// First message of the demo conversation
pub const DEMO_PROMPT: &str = "I want to build a connector for the JSONPlaceholder API.";
