//! Groq API client for the conversation loop
//!
//! Speaks the OpenAI-compatible chat-completions protocol, advertising the
//! tool set and decoding requested tool invocations from assistant turns.
//! Uses a long-lived reqwest::Client for connection pooling.

use crate::error::AgentError;
use crate::models::{ChatMessage, MessageRole, ModelTurn, ToolDefinition, ToolRequest};
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error, info};

const DEFAULT_MODEL: &str = "openai/gpt-oss-120b";
const TEMPERATURE: f32 = 0.3;

/// Reusable Groq client (connection-pooled)
pub struct GroqChat {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GroqChat {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to build HTTP client");

        let model = std::env::var("GROQ_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        Self {
            client,
            api_key,
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl super::ChatModel for GroqChat {
    async fn complete(
        &self,
        system_prompt: &str,
        history: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ModelTurn> {
        if self.api_key.is_empty() {
            return Err(AgentError::LlmError(
                "GROQ_API_KEY not configured".to_string(),
            ));
        }

        let url = format!("{}/chat/completions", self.base_url);

        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(WireMessage::system(system_prompt));
        messages.extend(history.iter().map(WireMessage::from_chat));

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: TEMPERATURE,
            tools: tools.iter().map(WireTool::from_definition).collect(),
            tool_choice: if tools.is_empty() { None } else { Some("auto") },
        };

        info!(model = %self.model, "Calling Groq API");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Groq API request failed: {}", e);
                AgentError::LlmError(format!("Groq API error: {}", e))
            })?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Groq API error response: {}", error_text);
            return Err(AgentError::LlmError(format!(
                "Groq API error: {}",
                error_text
            )));
        }

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Groq response: {}", e);
            AgentError::LlmError(format!("Groq parse error: {}", e))
        })?;

        if let Some(usage) = &completion.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Groq usage"
            );
        }

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::LlmError("No response from Groq API".to_string()))?;

        let turn = choice.message.into_turn(choice.finish_reason);

        info!(
            tool_calls = turn.tool_calls.len(),
            finish_reason = ?turn.finish_reason,
            "Groq response received"
        );

        Ok(turn)
    }
}

//
// ================= Wire Types =================
//

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    // Assistant turns that only request tools may carry a null content.
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl WireMessage {
    fn system(content: &str) -> Self {
        Self {
            role: "system".to_string(),
            content: Some(content.to_string()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    fn from_chat(msg: &ChatMessage) -> Self {
        let role = match msg.role {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
        };

        Self {
            role: role.to_string(),
            content: Some(msg.content.clone()),
            tool_calls: msg.tool_calls.iter().map(WireToolCall::from_request).collect(),
            tool_call_id: msg.tool_call_id.clone(),
        }
    }

    fn into_turn(self, finish_reason: Option<String>) -> ModelTurn {
        let tool_calls = self
            .tool_calls
            .into_iter()
            .map(|call| ToolRequest {
                id: call.id,
                name: call.function.name,
                // Function arguments arrive as a JSON string on the wire.
                arguments: serde_json::from_str(&call.function.arguments)
                    .unwrap_or_else(|_| json!({})),
            })
            .collect();

        ModelTurn {
            content: self.content.unwrap_or_default(),
            tool_calls,
            finish_reason,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    function: WireFunctionCall,
}

impl WireToolCall {
    fn from_request(request: &ToolRequest) -> Self {
        Self {
            id: request.id.clone(),
            kind: "function".to_string(),
            function: WireFunctionCall {
                name: request.name.clone(),
                arguments: request.arguments.to_string(),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunction,
}

impl WireTool {
    fn from_definition(def: &ToolDefinition) -> Self {
        Self {
            kind: "function",
            function: WireFunction {
                name: def.name.clone(),
                description: def.description.clone(),
                parameters: def.parameters.clone(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: WireMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: i64,
    completion_tokens: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = ChatCompletionRequest {
            model: DEFAULT_MODEL.to_string(),
            messages: vec![
                WireMessage::system("You are a stock market trading agent."),
                WireMessage::from_chat(&ChatMessage::user("What's the price of Tesla?")),
            ],
            temperature: TEMPERATURE,
            tools: vec![WireTool::from_definition(&ToolDefinition {
                name: "get_stock_price".to_string(),
                description: "Fetch the current stock price".to_string(),
                parameters: json!({"type": "object", "properties": {}}),
            })],
            tool_choice: Some("auto"),
        };

        let encoded = serde_json::to_string(&request).unwrap();
        assert!(encoded.contains("What's the price of Tesla?"));
        assert!(encoded.contains("get_stock_price"));
        assert!(encoded.contains("\"tool_choice\":\"auto\""));
    }

    #[test]
    fn test_tool_call_arguments_decoded_from_string() {
        let raw = r#"{
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {
                            "name": "buy_stocks",
                            "arguments": "{\"ticker_symbol\": \"TSLA\", \"quantity\": 5, \"total_price\": 1250.5}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 120, "completion_tokens": 18}
        }"#;

        let completion: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        let choice = completion.choices.into_iter().next().unwrap();
        let turn = choice.message.into_turn(choice.finish_reason);

        assert_eq!(turn.content, "");
        assert_eq!(turn.tool_calls.len(), 1);
        let call = &turn.tool_calls[0];
        assert_eq!(call.name, "buy_stocks");
        assert_eq!(call.arguments["ticker_symbol"], "TSLA");
        assert_eq!(call.arguments["quantity"], 5);
        assert_eq!(turn.finish_reason.as_deref(), Some("tool_calls"));
    }

    #[test]
    fn test_tool_result_round_trip() {
        let msg = ChatMessage::tool_result("call_abc", "get_stock_price", "184.52");
        let wire = WireMessage::from_chat(&msg);
        assert_eq!(wire.role, "tool");
        assert_eq!(wire.tool_call_id.as_deref(), Some("call_abc"));
        assert_eq!(wire.content.as_deref(), Some("184.52"));
    }
}
