//! Core data models for the trading agent

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

//
// ================= Messages =================
//

/// Role of a message in the conversation transcript
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

/// A single message in a conversation thread.
///
/// Assistant messages may carry requested tool invocations; tool messages
/// carry the id and name of the call they answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub message_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl ChatMessage {
    fn base(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            tool_name: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::base(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::base(MessageRole::Assistant, content)
    }

    pub fn assistant_with_calls(content: impl Into<String>, calls: Vec<ToolRequest>) -> Self {
        let mut msg = Self::base(MessageRole::Assistant, content);
        msg.tool_calls = calls;
        msg
    }

    /// Tool result answering the call with the given id.
    pub fn tool_result(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let mut msg = Self::base(MessageRole::Tool, content);
        msg.tool_call_id = Some(call_id.into());
        msg.tool_name = Some(tool_name.into());
        msg
    }
}

//
// ================= Tool Invocation =================
//

/// A tool invocation requested by the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRequest {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// Tool shape advertised to the model (JSON-schema parameters)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Result of one model invocation
#[derive(Debug, Clone)]
pub struct ModelTurn {
    pub content: String,
    pub tool_calls: Vec<ToolRequest>,
    pub finish_reason: Option<String>,
}

//
// ================= Trades =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Buy,
    Sell,
}

impl TradeAction {
    /// Verb for the confirmation prompt ("buy" / "sell")
    pub fn verb(&self) -> &'static str {
        match self {
            TradeAction::Buy => "buy",
            TradeAction::Sell => "sell",
        }
    }

    /// Past tense for the settlement message ("bought" / "sold")
    pub fn past_tense(&self) -> &'static str {
        match self {
            TradeAction::Buy => "bought",
            TradeAction::Sell => "sold",
        }
    }
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.verb())
    }
}

/// A validated trade waiting for the human decision
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeProposal {
    pub action: TradeAction,
    pub ticker: String,
    pub quantity: i64,
    pub total_price: f64,
}

impl TradeProposal {
    /// The yes/no question shown to the human.
    pub fn prompt(&self) -> String {
        format!(
            "Do you want to {} {} shares of {} for ${}? (yes/no)",
            self.action.verb(),
            self.quantity,
            self.ticker,
            self.total_price
        )
    }

    /// Final tool output once the decision is in.
    pub fn settlement(&self, confirmed: bool) -> String {
        if confirmed {
            format!(
                "✅ You {} {} shares of {} for ${}.",
                self.action.past_tense(),
                self.quantity,
                self.ticker,
                self.total_price
            )
        } else {
            "❌ Transaction cancelled.".to_string()
        }
    }
}

/// A suspended trade-tool call.
///
/// Tool calls the model requested after the gated one are queued here and
/// drained once the decision arrives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingTrade {
    pub tool_call_id: String,
    pub tool_name: String,
    pub proposal: TradeProposal,
    #[serde(default)]
    pub queued: Vec<ToolRequest>,
    pub created_at: DateTime<Utc>,
}

impl PendingTrade {
    pub fn new(tool_call_id: String, tool_name: String, proposal: TradeProposal) -> Self {
        Self {
            tool_call_id,
            tool_name,
            proposal,
            queued: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

//
// ================= Agent Output =================
//

/// Outcome of one agent turn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentReply {
    /// Final assistant text for this turn
    Answer { content: String },
    /// The turn is suspended on a trade confirmation
    PendingConfirmation { prompt: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buy_prompt_wording() {
        let proposal = TradeProposal {
            action: TradeAction::Buy,
            ticker: "TSLA".to_string(),
            quantity: 5,
            total_price: 1250.5,
        };

        assert_eq!(
            proposal.prompt(),
            "Do you want to buy 5 shares of TSLA for $1250.5? (yes/no)"
        );
    }

    #[test]
    fn test_settlement_messages() {
        let proposal = TradeProposal {
            action: TradeAction::Sell,
            ticker: "AAPL".to_string(),
            quantity: 3,
            total_price: 540.0,
        };

        assert_eq!(
            proposal.settlement(true),
            "✅ You sold 3 shares of AAPL for $540."
        );
        assert_eq!(proposal.settlement(false), "❌ Transaction cancelled.");
    }

    #[test]
    fn test_tool_result_message() {
        let msg = ChatMessage::tool_result("call_1", "get_stock_price", "184.52");
        assert_eq!(msg.role, MessageRole::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(msg.tool_name.as_deref(), Some("get_stock_price"));
        assert!(msg.tool_calls.is_empty());
    }
}
