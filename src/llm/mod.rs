//! Chat model trait and implementations
//!
//! The model is invoked as a black box: message history plus tool shapes in,
//! assistant text plus requested tool invocations out.

use crate::models::{ChatMessage, ModelTurn, ToolDefinition};
use crate::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

pub mod groq;
pub use groq::GroqChat;

/// Trait for one model invocation over a conversation thread
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Produce the next turn for the given history and available tools.
    async fn complete(
        &self,
        system_prompt: &str,
        history: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ModelTurn>;
}

/// Scripted model for development & testing
/// Replays canned turns in order, keeping the loop runnable without an API key
pub struct ScriptedModel {
    turns: Mutex<VecDeque<ModelTurn>>,
}

impl ScriptedModel {
    pub fn new(turns: Vec<ModelTurn>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
        }
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(
        &self,
        _system_prompt: &str,
        _history: &[ChatMessage],
        _tools: &[ToolDefinition],
    ) -> Result<ModelTurn> {
        let mut turns = self
            .turns
            .lock()
            .map_err(|_| crate::error::AgentError::LlmError("script lock poisoned".to_string()))?;

        turns.pop_front().ok_or_else(|| {
            crate::error::AgentError::LlmError("scripted model has no turns left".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_model_replays_in_order() {
        let model = ScriptedModel::new(vec![
            ModelTurn {
                content: "first".to_string(),
                tool_calls: vec![],
                finish_reason: Some("stop".to_string()),
            },
            ModelTurn {
                content: "second".to_string(),
                tool_calls: vec![],
                finish_reason: Some("stop".to_string()),
            },
        ]);

        let first = model.complete("", &[], &[]).await.unwrap();
        let second = model.complete("", &[], &[]).await.unwrap();
        assert_eq!(first.content, "first");
        assert_eq!(second.content, "second");

        // Script exhausted
        assert!(model.complete("", &[], &[]).await.is_err());
    }
}
