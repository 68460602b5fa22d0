//! ChatSession - turn orchestration over the durable state

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

use super::state::{AppState, ChatMessage, ChatRole};
use crate::agent::{AgentError, AgentFactory, AgentRequest, AgentRunOutput, TurnEvent};
use crate::config::Config;
use crate::domain::{EXAMPLE_MANIFEST, ProgressView, TaskList};
use crate::llm::{LlmError, Message};
use crate::prompts::{PromptContext, PromptLoader};
use crate::session::{ConnectorFields, FormField, SessionDeps};
use crate::tools::ToolContext;

/// Prompt used when the user sends an empty message
pub const EMPTY_INPUT_PROMPT: &str = "`Continue`";

/// Result of one turn, as seen by the front end
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Assistant message appended to the transcript, if any
    pub reply: Option<String>,
    pub paused: bool,
    /// Error message when the turn failed
    pub error: Option<String>,
    /// Durable fields written by the merge
    pub merged: Vec<&'static str>,
    pub tool_calls: usize,
}

impl TurnOutcome {
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// One user's chat session
///
/// Turns are serialized; the state lock is only held for short reads and
/// writes so the front end can render while a turn runs.
pub struct ChatSession {
    state: Arc<Mutex<AppState>>,
    turn_lock: Mutex<()>,
    pause: Arc<AtomicBool>,
    factory: Arc<dyn AgentFactory>,
    prompts: PromptLoader,
    config: Config,
}

impl ChatSession {
    pub fn new(config: Config, factory: Arc<dyn AgentFactory>, prompts: PromptLoader) -> Self {
        debug!("ChatSession::new: called");
        Self {
            state: Arc::new(Mutex::new(AppState::default())),
            turn_lock: Mutex::new(()),
            pause: Arc::new(AtomicBool::new(false)),
            factory,
            prompts,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Send a user message and run a turn
    pub async fn send_message(&self, input: &str, observer: Option<mpsc::Sender<TurnEvent>>) -> TurnOutcome {
        self.resume();
        self.run_turn(input, false, observer).await
    }

    /// Ask the running turn to stop at its next checkpoint
    pub fn pause(&self) {
        info!("ChatSession::pause: pause requested");
        self.pause.store(true, Ordering::SeqCst);
    }

    /// Clear a pause request
    pub fn resume(&self) {
        self.pause.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.pause.load(Ordering::SeqCst)
    }

    /// Shared pause flag, for signal handlers
    pub fn pause_flag(&self) -> Arc<AtomicBool> {
        self.pause.clone()
    }

    pub async fn set_field(&self, field: FormField, value: &str) {
        debug!(%field, "ChatSession::set_field: called");
        self.state.lock().await.fields.set(field, value);
    }

    /// Set or clear the session credential; the agent is rebuilt on the next turn if it changed
    pub async fn set_api_key(&self, key: Option<String>) {
        debug!(has_key = key.is_some(), "ChatSession::set_api_key: called");
        self.state.lock().await.api_key = key.filter(|k| !k.trim().is_empty());
    }

    pub async fn set_manifest(&self, yaml: impl Into<String>) {
        self.state.lock().await.yaml_content = yaml.into();
    }

    /// Replace the manifest with the example connector
    pub async fn reset_manifest(&self) {
        info!("ChatSession::reset_manifest: restoring example manifest");
        self.set_manifest(EXAMPLE_MANIFEST).await;
    }

    pub async fn manifest(&self) -> String {
        self.state.lock().await.yaml_content.clone()
    }

    pub async fn fields(&self) -> ConnectorFields {
        self.state.lock().await.fields.clone()
    }

    pub async fn task_list(&self) -> Option<TaskList> {
        self.state.lock().await.task_list.clone()
    }

    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.state.lock().await.messages.clone()
    }

    pub async fn streaming_message(&self) -> String {
        self.state.lock().await.current_streaming_message.clone()
    }

    pub async fn progress_view(&self) -> ProgressView {
        ProgressView::from_task_list(self.state.lock().await.task_list.as_ref())
    }

    /// Stop the cached agent and its backend
    pub async fn shutdown(&self) {
        debug!("ChatSession::shutdown: called");
        let mut handle = std::mem::take(&mut self.state.lock().await.agent);
        handle.shutdown().await;
    }

    /// Run one turn; never fails, errors become an assistant message
    pub(crate) async fn run_turn(
        &self,
        input: &str,
        autonomous: bool,
        observer: Option<mpsc::Sender<TurnEvent>>,
    ) -> TurnOutcome {
        let _turn = self.turn_lock.lock().await;
        let prompt = if input.trim().is_empty() {
            EMPTY_INPUT_PROMPT.to_string()
        } else {
            input.to_string()
        };
        info!(autonomous, prompt_len = prompt.len(), "ChatSession::run_turn: starting turn");

        let (events_tx, events_rx) = mpsc::channel(256);

        // Snapshot durable state into a fresh session
        let (session, history, credential, mut handle) = {
            let mut state = self.state.lock().await;
            let history = self.history(&state.messages);
            state.messages.push(ChatMessage::user(prompt.clone()));
            state.is_streaming = true;
            state.current_streaming_message.clear();

            let task_list = state.task_list.get_or_insert_with(TaskList::new_connector_build).clone();
            let mut session = SessionDeps::new(state.yaml_content.clone(), Some(task_list), state.fields.clone());
            for field in FormField::ALL {
                let tx = events_tx.clone();
                session = session.with_setter(
                    field,
                    Arc::new(move |value: &str| {
                        let _ = tx.try_send(TurnEvent::FieldUpdated {
                            field,
                            value: value.to_string(),
                        });
                    }),
                );
            }
            let credential = self.config.llm.resolve_api_key(state.api_key.as_deref());
            (session, history, credential, std::mem::take(&mut state.agent))
        };
        let baseline = session.snapshot();
        let ctx = ToolContext::new(session);

        let updater = tokio::spawn(update_streaming(self.state.clone(), events_rx, observer));
        let result = self
            .run_agent(&mut handle, credential, &ctx, history, prompt, autonomous, &events_tx)
            .await;

        // The session's setters hold event senders; drop it so the updater drains and exits
        drop(events_tx);
        let changes = ctx.into_session().await.changes_since(&baseline);
        if let Err(e) = updater.await {
            warn!(error = %e, "ChatSession::run_turn: state updater failed");
        }

        if let Err(e) = &result {
            warn!(error = %e, "ChatSession::run_turn: turn failed, dropping agent");
            handle.shutdown().await;
        }

        let mut state = self.state.lock().await;
        state.agent = handle;
        let merged = {
            let AppState {
                yaml_content,
                task_list,
                fields,
                ..
            } = &mut *state;
            changes.apply(yaml_content, task_list, fields)
        };
        state.current_streaming_message.clear();
        state.is_streaming = false;

        let outcome = match result {
            Ok(output) => {
                let reply = if !output.text.trim().is_empty() {
                    Some(output.text.clone())
                } else if output.tool_calls > 0 {
                    Some(tool_activity_summary(output.tool_calls))
                } else {
                    None
                };
                if let Some(text) = &reply {
                    state.messages.push(ChatMessage::assistant(text.clone()));
                }
                TurnOutcome {
                    reply,
                    paused: output.paused,
                    error: None,
                    merged,
                    tool_calls: output.tool_calls,
                }
            }
            Err(e) => {
                let message = format!("Sorry, I encountered an error: {}", e);
                state.messages.push(ChatMessage::assistant(message.clone()));
                TurnOutcome {
                    reply: Some(message),
                    paused: false,
                    error: Some(e.to_string()),
                    merged,
                    tool_calls: 0,
                }
            }
        };
        info!(
            paused = outcome.paused,
            failed = outcome.failed(),
            merged = ?outcome.merged,
            "ChatSession::run_turn: turn finished"
        );
        outcome
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_agent(
        &self,
        handle: &mut crate::agent::AgentHandle,
        credential: Option<String>,
        ctx: &ToolContext,
        history: Vec<Message>,
        prompt: String,
        autonomous: bool,
        events: &mpsc::Sender<TurnEvent>,
    ) -> Result<AgentRunOutput, AgentError> {
        let credential =
            credential.ok_or_else(|| LlmError::MissingApiKey(self.config.llm.api_key_env.clone()))?;
        let agent = handle.ensure_started(self.factory.as_ref(), &credential).await?;

        let fields = ctx.session().await.fields.clone();
        let context = PromptContext {
            has_backend_tools: agent.remote_tool_count() > 0,
            autonomous,
            ..PromptContext::from_fields(&fields)
        };
        let system_prompt = match self.prompts.system_prompt(&context) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(error = %e, "ChatSession::run_agent: prompt template failed, using embedded default");
                PromptLoader::embedded_only()
                    .system_prompt(&context)
                    .unwrap_or_default()
            }
        };

        let request = AgentRequest {
            system_prompt,
            history,
            prompt,
        };
        agent.run_stream(request, ctx, events, &self.pause).await
    }

    /// The most recent transcript entries as LLM messages
    fn history(&self, messages: &[ChatMessage]) -> Vec<Message> {
        let max = self.config.chat.history_max_messages;
        let start = messages.len().saturating_sub(max);
        messages[start..]
            .iter()
            .map(|m| match m.role {
                ChatRole::User => Message::user(m.content.clone()),
                ChatRole::Assistant => Message::assistant(m.content.clone()),
            })
            .collect()
    }
}

/// Apply streaming text to the durable state and forward events to the observer
async fn update_streaming(
    state: Arc<Mutex<AppState>>,
    mut events: mpsc::Receiver<TurnEvent>,
    observer: Option<mpsc::Sender<TurnEvent>>,
) {
    while let Some(event) = events.recv().await {
        if let TurnEvent::StreamingText(delta) = &event {
            state.lock().await.current_streaming_message.push_str(delta);
        }
        if let Some(observer) = &observer {
            let _ = observer.send(event).await;
        }
    }
}

/// Transcript entry for a turn whose model produced tool calls but no text
fn tool_activity_summary(tool_calls: usize) -> String {
    match tool_calls {
        1 => "Ran 1 tool call without a text reply.".to_string(),
        n => format!("Ran {} tool calls without a text reply.", n),
    }
}
