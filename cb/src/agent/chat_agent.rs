//! ChatAgent - streaming tool loop for one turn

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{AgentError, TurnEvent};
use crate::backend::ToolBackend;
use crate::config::AgentConfig;
use crate::llm::{
    CompletionRequest, CompletionResponse, ContentBlock, LlmClient, Message, StopReason, StreamChunk, TokenUsage,
    ToolDefinition,
};
use crate::tools::{ToolContext, ToolExecutor, ToolResult};

const CONTINUE_TRUNCATED: &str = "Continue from where you left off. Your previous response was truncated.";

/// Inputs of one turn
#[derive(Debug, Clone)]
pub struct AgentRequest {
    pub system_prompt: String,
    /// Prior conversation, oldest first, without the prompt
    pub history: Vec<Message>,
    pub prompt: String,
}

/// What a turn produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentRunOutput {
    /// All assistant text streamed during the turn
    pub text: String,
    /// The turn stopped early because pause was requested
    pub paused: bool,
    /// LLM rounds used
    pub rounds: u32,
    pub tool_calls: usize,
    pub usage: TokenUsage,
}

enum RoundOutcome {
    Done(CompletionResponse),
    Paused,
}

/// A tool-calling agent bound to one LLM client and, optionally, a tool backend
pub struct ChatAgent {
    llm: Arc<dyn LlmClient>,
    backend: Option<Arc<dyn ToolBackend>>,
    tools: ToolExecutor,
    remote_tools: usize,
    config: AgentConfig,
}

impl ChatAgent {
    pub fn new(llm: Arc<dyn LlmClient>, backend: Option<Arc<dyn ToolBackend>>, config: AgentConfig) -> Self {
        debug!(has_backend = backend.is_some(), "ChatAgent::new: called");
        Self {
            llm,
            backend,
            tools: ToolExecutor::builtins(),
            remote_tools: 0,
            config,
        }
    }

    /// Start the backend and register its tools
    pub async fn start(&mut self) -> Result<(), AgentError> {
        debug!("ChatAgent::start: called");
        let Some(backend) = self.backend.clone() else {
            debug!("ChatAgent::start: no backend, built-in tools only");
            return Ok(());
        };

        backend.start().await?;
        let specs = match backend.list_tools().await {
            Ok(specs) => specs,
            Err(e) => {
                backend.shutdown().await;
                return Err(e.into());
            }
        };
        let added = self.tools.add_remote_tools(specs, backend);
        self.remote_tools = added;
        info!(remote_tools = added, total = self.tools.tool_names().len(), "ChatAgent::start: tools ready");
        Ok(())
    }

    /// Stop the backend, if any
    pub async fn shutdown(&self) {
        debug!("ChatAgent::shutdown: called");
        if let Some(backend) = &self.backend {
            backend.shutdown().await;
        }
    }

    /// Number of tools registered from the backend
    pub fn remote_tool_count(&self) -> usize {
        self.remote_tools
    }

    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.definitions()
    }

    /// Run one turn in streaming mode
    ///
    /// Text deltas and tool progress are sent on `events`. `pause` is checked
    /// after every streamed token and before every tool call; once set the turn
    /// ends with whatever the completed tool calls wrote into `ctx`.
    pub async fn run_stream(
        &self,
        request: AgentRequest,
        ctx: &ToolContext,
        events: &mpsc::Sender<TurnEvent>,
        pause: &AtomicBool,
    ) -> Result<AgentRunOutput, AgentError> {
        debug!(history = request.history.len(), "ChatAgent::run_stream: called");
        let tool_defs = self.tools.definitions();
        let mut messages = request.history;
        messages.push(Message::user(request.prompt));
        let mut output = AgentRunOutput::default();

        loop {
            if output.rounds >= self.config.max_tool_rounds {
                warn!(max = self.config.max_tool_rounds, "ChatAgent::run_stream: max tool rounds reached");
                break;
            }
            output.rounds += 1;

            let completion = CompletionRequest {
                system_prompt: request.system_prompt.clone(),
                messages: messages.clone(),
                tools: tool_defs.clone(),
                max_tokens: self.config.max_tokens,
            };

            let response = match self.stream_round(completion, events, pause, &mut output.text).await? {
                RoundOutcome::Done(response) => response,
                RoundOutcome::Paused => {
                    info!(round = output.rounds, "ChatAgent::run_stream: paused while streaming");
                    output.paused = true;
                    break;
                }
            };
            output.usage.add(response.usage);
            messages.push(assistant_message(&response));

            if !response.tool_calls.is_empty() {
                debug!(count = response.tool_calls.len(), "ChatAgent::run_stream: executing tool calls");
                let mut results = Vec::with_capacity(response.tool_calls.len());
                for call in &response.tool_calls {
                    if pause.load(Ordering::SeqCst) {
                        info!(tool = %call.name, "ChatAgent::run_stream: paused before tool call");
                        output.paused = true;
                        return Ok(output);
                    }
                    let _ = events
                        .send(TurnEvent::ToolCallStarted {
                            id: call.id.clone(),
                            name: call.name.clone(),
                        })
                        .await;
                    let result = self.tools.execute(call, ctx).await?;
                    output.tool_calls += 1;
                    let _ = events
                        .send(TurnEvent::ToolCallFinished {
                            id: call.id.clone(),
                            name: call.name.clone(),
                            is_error: result.is_error,
                        })
                        .await;
                    results.push((call.id.clone(), result));
                }
                messages.push(tool_result_message(&results));
                continue;
            }

            match response.stop_reason {
                StopReason::MaxTokens => {
                    debug!("ChatAgent::run_stream: response truncated, asking to continue");
                    messages.push(Message::user(CONTINUE_TRUNCATED));
                }
                StopReason::EndTurn | StopReason::StopSequence | StopReason::ToolUse => break,
            }
        }

        debug!(
            rounds = output.rounds,
            tool_calls = output.tool_calls,
            paused = output.paused,
            "ChatAgent::run_stream: complete"
        );
        Ok(output)
    }

    /// Stream one LLM round, forwarding text as it arrives
    async fn stream_round(
        &self,
        request: CompletionRequest,
        events: &mpsc::Sender<TurnEvent>,
        pause: &AtomicBool,
        transcript: &mut String,
    ) -> Result<RoundOutcome, AgentError> {
        let (chunk_tx, mut chunk_rx) = mpsc::channel(256);
        let stream = self.llm.stream(request, chunk_tx);
        tokio::pin!(stream);

        let mut separated = transcript.is_empty();
        let mut forward = |delta: String, transcript: &mut String| {
            let mut out = String::new();
            if !separated && !delta.is_empty() {
                out.push_str("\n\n");
                separated = true;
            }
            out.push_str(&delta);
            transcript.push_str(&out);
            out
        };

        let mut chunks_open = true;
        loop {
            tokio::select! {
                biased;
                chunk = chunk_rx.recv(), if chunks_open => match chunk {
                    Some(StreamChunk::TextDelta(delta)) => {
                        let text = forward(delta, transcript);
                        let _ = events.send(TurnEvent::StreamingText(text)).await;
                        if pause.load(Ordering::SeqCst) {
                            return Ok(RoundOutcome::Paused);
                        }
                    }
                    Some(StreamChunk::Error(message)) => {
                        warn!(%message, "ChatAgent::stream_round: stream reported error");
                    }
                    Some(_) => {}
                    None => chunks_open = false,
                },
                result = &mut stream => {
                    let response = result?;
                    while let Ok(chunk) = chunk_rx.try_recv() {
                        if let StreamChunk::TextDelta(delta) = chunk {
                            let text = forward(delta, transcript);
                            let _ = events.send(TurnEvent::StreamingText(text)).await;
                            if pause.load(Ordering::SeqCst) {
                                return Ok(RoundOutcome::Paused);
                            }
                        }
                    }
                    return Ok(RoundOutcome::Done(response));
                }
            }
        }
    }
}

fn assistant_message(response: &CompletionResponse) -> Message {
    let mut blocks = Vec::new();
    if let Some(text) = &response.content
        && !text.is_empty()
    {
        blocks.push(ContentBlock::text(text));
    }
    blocks.extend(response.tool_calls.iter().map(ContentBlock::tool_use));
    Message::assistant_blocks(blocks)
}

fn tool_result_message(results: &[(String, ToolResult)]) -> Message {
    let blocks = results
        .iter()
        .map(|(id, result)| ContentBlock::tool_result(id, &result.content, result.is_error))
        .collect();
    Message::user_blocks(blocks)
}
