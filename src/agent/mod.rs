//! Conversation loop and confirmation gate
//!
//! USER INPUT → MODEL → TOOL CALLS? → EXECUTE / SUSPEND → MODEL → REPLY
//!
//! Trade tools never settle inside the loop: a validated trade suspends the
//! thread and the loop resumes only once the human decision arrives.

use crate::error::AgentError;
use crate::llm::ChatModel;
use crate::models::{AgentReply, ChatMessage, PendingTrade, ToolRequest};
use crate::session::{Session, SessionStore};
use crate::tools::{ToolRegistry, ToolReply};
use crate::Result;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Bound on model rounds per user turn, guards against tool loops
const MAX_TOOL_ROUNDS: u32 = 8;

const SYSTEM_PROMPT: &str = "\
You are a stock market trading agent. Your goal is to help users make informed decisions \
about buying and selling stocks. Answer the user queries using the available tools to get \
stock prices, buy stocks, sell stocks, and get the current date and time. \
Be accurate and concise in your responses.";

/// The conversation state machine
pub struct TradingAgent {
    model: Box<dyn ChatModel>,
    tools: ToolRegistry,
    sessions: Arc<dyn SessionStore>,
}

impl TradingAgent {
    pub fn new(
        model: Box<dyn ChatModel>,
        tools: ToolRegistry,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            model,
            tools,
            sessions,
        }
    }

    /// Process one user utterance on a thread.
    ///
    /// Returns the final assistant text, or the confirmation prompt when a
    /// trade tool suspended the turn. A thread holding a suspended trade
    /// rejects new messages until `resume` settles it.
    pub async fn handle_message(&self, thread_id: &str, text: &str) -> Result<AgentReply> {
        let mut session = self.sessions.get_or_create(thread_id).await?;

        if session.has_pending() {
            return Err(AgentError::ConfirmationPending(format!(
                "thread '{}' is waiting for a trade decision",
                thread_id
            )));
        }

        info!(%thread_id, "User message received");
        session.push(ChatMessage::user(text));

        let reply = self.drive(&mut session).await;

        // The transcript survives loop failures so the thread can continue.
        self.sessions.save(&session).await?;
        reply
    }

    /// Settle the suspended trade with the human decision and finish the turn.
    ///
    /// "yes" (trimmed, case-insensitive) confirms; anything else cancels.
    pub async fn resume(&self, thread_id: &str, decision: &str) -> Result<AgentReply> {
        let mut session = self.sessions.get_or_create(thread_id).await?;

        let Some(pending) = session.take_pending() else {
            return Err(AgentError::NoPendingConfirmation(format!(
                "thread '{}' has no trade awaiting a decision",
                thread_id
            )));
        };

        let confirmed = is_confirmation(decision);
        info!(
            %thread_id,
            trade = %pending.tool_name,
            ticker = %pending.proposal.ticker,
            confirmed,
            "Resuming suspended trade"
        );

        session.push(ChatMessage::tool_result(
            &pending.tool_call_id,
            &pending.tool_name,
            pending.proposal.settlement(confirmed),
        ));

        // Calls the model queued behind the gate run first; one of them may
        // suspend the thread again.
        let reply = match self.run_tool_calls(&mut session, pending.queued).await {
            Ok(Some(gate)) => Ok(gate),
            Ok(None) => self.drive(&mut session).await,
            Err(e) => Err(e),
        };

        self.sessions.save(&session).await?;
        reply
    }

    /// Drop a thread entirely ("Clear Chat").
    pub async fn reset(&self, thread_id: &str) -> Result<()> {
        info!(%thread_id, "Clearing thread");
        self.sessions.remove(thread_id).await
    }

    /// The thread transcript, if the thread exists.
    pub async fn history(&self, thread_id: &str) -> Result<Option<Session>> {
        self.sessions.get(thread_id).await
    }

    /// Model loop: invoke, execute requested tools, repeat until the model
    /// answers in plain text or a trade suspends the turn.
    async fn drive(&self, session: &mut Session) -> Result<AgentReply> {
        let definitions = self.tools.definitions();

        for round in 0..MAX_TOOL_ROUNDS {
            let turn = self
                .model
                .complete(SYSTEM_PROMPT, session.messages(), &definitions)
                .await?;

            debug!(
                round,
                tool_calls = turn.tool_calls.len(),
                "Model turn received"
            );

            let calls = turn.tool_calls.clone();
            session.push(ChatMessage::assistant_with_calls(
                turn.content.clone(),
                turn.tool_calls,
            ));

            if calls.is_empty() {
                return Ok(AgentReply::Answer {
                    content: turn.content,
                });
            }

            if let Some(gate) = self.run_tool_calls(session, calls).await? {
                return Ok(gate);
            }
        }

        Err(AgentError::ToolRoundsExceeded(format!(
            "gave up after {} model rounds",
            MAX_TOOL_ROUNDS
        )))
    }

    /// Execute requested tool calls in order.
    ///
    /// Unknown tools and tool failures become error text for the model (the
    /// loop continues). A `NeedsApproval` reply suspends the thread: the
    /// remaining queue is parked on the pending trade.
    async fn run_tool_calls(
        &self,
        session: &mut Session,
        calls: Vec<ToolRequest>,
    ) -> Result<Option<AgentReply>> {
        let mut queue: VecDeque<ToolRequest> = calls.into();

        while let Some(call) = queue.pop_front() {
            let Some(tool) = self.tools.get(&call.name) else {
                warn!(tool_name = %call.name, "Tool not registered");
                session.push(ChatMessage::tool_result(
                    &call.id,
                    &call.name,
                    format!("Error: tool '{}' is not registered", call.name),
                ));
                continue;
            };

            match tool.execute(&call.arguments).await {
                Ok(ToolReply::Output(output)) => {
                    debug!(tool_name = %call.name, "Tool completed");
                    session.push(ChatMessage::tool_result(&call.id, &call.name, output));
                }
                Ok(ToolReply::NeedsApproval(proposal)) => {
                    let prompt = proposal.prompt();
                    let mut pending =
                        PendingTrade::new(call.id.clone(), call.name.clone(), proposal);
                    pending.queued = queue.into_iter().collect();

                    info!(
                        trade = %pending.tool_name,
                        ticker = %pending.proposal.ticker,
                        quantity = pending.proposal.quantity,
                        queued = pending.queued.len(),
                        "Trade awaiting confirmation"
                    );

                    session.set_pending(pending);
                    return Ok(Some(AgentReply::PendingConfirmation { prompt }));
                }
                Err(e) => {
                    warn!(tool_name = %call.name, error = %e, "Tool execution failed");
                    session.push(ChatMessage::tool_result(
                        &call.id,
                        &call.name,
                        format!("Error: {}", e),
                    ));
                }
            }
        }

        Ok(None)
    }
}

fn is_confirmation(decision: &str) -> bool {
    decision.trim().eq_ignore_ascii_case("yes")
}
