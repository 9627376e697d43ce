//! Execution state owned by the conversation loop.
//!
//! The state only ever grows: messages are appended, the iteration counter
//! only goes up. Every mutation checks the pairing rule between an
//! assistant's tool calls and the tool messages that answer them, so a state
//! that exists is always one the loop could legitimately have produced.

use agentflow_core::error::{Error, Result};
use agentflow_core::message::{Conversation, Message, Role};
use agentflow_core::tool::ToolResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopStatus {
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionState {
    messages: Conversation,
    iteration_count: u32,
    status: LoopStatus,
}

impl ExecutionState {
    /// Seed a conversation: the system prompt (if any) then the user's request.
    pub fn seed(system_prompt: &str, user_text: &str, file_urls: &[String]) -> Self {
        let mut messages = Conversation::new();
        if !system_prompt.trim().is_empty() {
            messages.push(Message::system(system_prompt));
        }
        messages.push(Message::user_with_files(user_text, file_urls));
        Self {
            messages,
            iteration_count: 0,
            status: LoopStatus::Running,
        }
    }

    /// Rebuild a state by re-appending `messages` from the start.
    ///
    /// Tool messages are kept exactly as given. Fails if the sequence breaks
    /// the tool-call pairing rule.
    pub fn replay(messages: &[Message]) -> Result<Self> {
        let mut state = Self {
            messages: Conversation::new(),
            iteration_count: 0,
            status: LoopStatus::Running,
        };

        let mut pending: Vec<Message> = Vec::new();
        for message in messages {
            match message.role {
                Role::Assistant => state.append_model_reply(message.clone())?,
                Role::Tool => {
                    if message.tool_call_id.is_none() {
                        return Err(Error::Internal("tool message without a tool_call_id".into()));
                    }
                    pending.push(message.clone());
                    if pending.len() == state.messages.unanswered_tool_calls().len() {
                        state.append_tool_messages(std::mem::take(&mut pending))?;
                    }
                }
                Role::System | Role::User => state.messages.push(message.clone()),
            }
        }

        if !pending.is_empty() {
            return Err(Error::Internal(
                "replayed conversation ends with a partial batch of tool results".into(),
            ));
        }

        if let Some(last) = state.messages.last()
            && last.role == Role::Assistant
            && last.tool_calls.is_empty()
        {
            state.status = LoopStatus::Completed;
        }
        Ok(state)
    }

    pub fn messages(&self) -> &[Message] {
        self.messages.messages()
    }

    pub fn conversation(&self) -> &Conversation {
        &self.messages
    }

    pub fn iteration_count(&self) -> u32 {
        self.iteration_count
    }

    pub fn status(&self) -> LoopStatus {
        self.status
    }

    /// Append the model's reply. No earlier tool call may still be unanswered.
    pub fn append_model_reply(&mut self, reply: Message) -> Result<()> {
        self.ensure_running()?;
        if !self.messages.unanswered_tool_calls().is_empty() {
            return Err(Error::Internal(
                "model reply appended while tool calls are still unanswered".into(),
            ));
        }
        if reply.role != Role::Assistant {
            return Err(Error::Internal(format!(
                "expected an assistant reply, got {:?}",
                reply.role
            )));
        }

        self.messages.push(reply);
        Ok(())
    }

    /// Append one result per pending tool call, in request order, and close the turn.
    pub fn append_tool_results(&mut self, results: Vec<ToolResult>) -> Result<()> {
        self.append_tool_messages(results.iter().map(ToolResult::to_message).collect())
    }

    fn append_tool_messages(&mut self, results: Vec<Message>) -> Result<()> {
        self.ensure_running()?;
        let expected: Vec<String> = self
            .messages
            .unanswered_tool_calls()
            .iter()
            .map(|tc| tc.call_id.clone())
            .collect();

        if expected.is_empty() {
            return Err(Error::Internal("no tool calls are awaiting results".into()));
        }
        let received: Vec<&str> = results
            .iter()
            .map(|m| m.tool_call_id.as_deref().unwrap_or_default())
            .collect();
        if received != expected {
            return Err(Error::Internal(format!(
                "tool results {received:?} do not match pending calls {expected:?}"
            )));
        }

        for message in results {
            self.messages.push(message);
        }
        self.iteration_count += 1;
        Ok(())
    }

    pub fn complete(&mut self) {
        self.status = LoopStatus::Completed;
    }

    pub fn fail(&mut self) {
        self.status = LoopStatus::Failed;
    }

    fn ensure_running(&self) -> Result<()> {
        match self.status {
            LoopStatus::Running => Ok(()),
            other => Err(Error::Internal(format!(
                "execution state is {other:?}; nothing more can be appended"
            ))),
        }
    }
}
