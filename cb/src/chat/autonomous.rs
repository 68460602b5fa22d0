//! Autonomous mode: keep taking turns until the agent reports an end state

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info};

use super::session::{ChatSession, TurnOutcome};
use crate::agent::TurnEvent;

pub const CONTINUE_PROMPT: &str = "Continue working on the task.";
pub const COMPLETED_MARKER: &str = "✅ Task completed successfully";
pub const FAILED_MARKER: &str = "❌ Task failed";

/// Why an autonomous run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutonomousStop {
    Completed,
    Failed,
    Paused,
    Error,
    MaxTurns,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutonomousOutcome {
    pub turns: u32,
    pub stop: AutonomousStop,
    pub last: TurnOutcome,
}

fn stop_reason(outcome: &TurnOutcome) -> Option<AutonomousStop> {
    if outcome.failed() {
        return Some(AutonomousStop::Error);
    }
    if outcome.paused {
        return Some(AutonomousStop::Paused);
    }
    let reply = outcome.reply.as_deref().unwrap_or_default();
    if reply.contains(COMPLETED_MARKER) {
        Some(AutonomousStop::Completed)
    } else if reply.contains(FAILED_MARKER) {
        Some(AutonomousStop::Failed)
    } else {
        None
    }
}

impl ChatSession {
    /// Run turns back to back, starting with `first_prompt`
    ///
    /// Stops on pause, on a failed turn, when a reply carries the completion or
    /// failure marker, or after `chat.autonomous-max-turns` turns.
    pub async fn run_autonomous(
        &self,
        first_prompt: &str,
        observer: Option<mpsc::Sender<TurnEvent>>,
    ) -> AutonomousOutcome {
        let max_turns = self.config().chat.autonomous_max_turns.max(1);
        let backoff = Duration::from_millis(self.config().chat.autonomous_backoff_ms);
        info!(max_turns, ?backoff, "ChatSession::run_autonomous: called");

        let mut prompt = first_prompt.to_string();
        let mut turns = 0;
        self.resume();
        loop {
            let outcome = self.run_turn(&prompt, true, observer.clone()).await;
            turns += 1;

            if let Some(stop) = stop_reason(&outcome) {
                info!(turns, ?stop, "ChatSession::run_autonomous: stopping");
                return AutonomousOutcome {
                    turns,
                    stop,
                    last: outcome,
                };
            }
            if turns >= max_turns {
                info!(turns, "ChatSession::run_autonomous: turn limit reached");
                return AutonomousOutcome {
                    turns,
                    stop: AutonomousStop::MaxTurns,
                    last: outcome,
                };
            }

            debug!(turns, "ChatSession::run_autonomous: backing off before next turn");
            tokio::time::sleep(backoff).await;
            if self.is_paused() {
                return AutonomousOutcome {
                    turns,
                    stop: AutonomousStop::Paused,
                    last: outcome,
                };
            }
            prompt = CONTINUE_PROMPT.to_string();
        }
    }
}
