//! Tool trait and registry
//!
//! The four callable tools are stateless. Trade tools never execute
//! directly: a validated trade yields `ToolReply::NeedsApproval`, which the
//! agent turns into a suspended conversation awaiting the human decision.

use crate::error::AgentError;
use crate::market::MarketData;
use crate::models::{ToolDefinition, TradeAction, TradeProposal};
use crate::Result;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// What a tool call produced
#[derive(Debug, Clone, PartialEq)]
pub enum ToolReply {
    /// The tool ran to completion; the text goes back to the model.
    Output(String),
    /// A trade validated and now needs the human decision.
    NeedsApproval(TradeProposal),
}

/// Trait for a single tool
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// JSON-schema shape of the arguments, advertised to the model.
    fn parameters(&self) -> Value;
    async fn execute(&self, args: &Value) -> Result<ToolReply>;
}

/// Tool registry for looking up and executing tools
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn list(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Tool shapes for the model request.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters(),
            })
            .collect();

        // Stable ordering keeps prompts reproducible across runs.
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

//
// ================= Argument Helpers =================
//

fn require_str(args: &Value, key: &str) -> Result<String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| {
            AgentError::InvalidToolInput(format!("Expected string '{}' in tool arguments", key))
        })
}

fn optional_str(args: &Value, key: &str, default: &str) -> String {
    args.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default)
        .to_string()
}

fn require_i64(args: &Value, key: &str) -> Result<i64> {
    let value = args.get(key).ok_or_else(|| {
        AgentError::InvalidToolInput(format!("Expected integer '{}' in tool arguments", key))
    })?;

    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
        .ok_or_else(|| {
            AgentError::InvalidToolInput(format!("'{}' must be an integer", key))
        })
}

fn require_f64(args: &Value, key: &str) -> Result<f64> {
    args.get(key).and_then(|v| v.as_f64()).ok_or_else(|| {
        AgentError::InvalidToolInput(format!("Expected number '{}' in tool arguments", key))
    })
}

//
// ================= Price Lookup =================
//

pub struct StockPriceTool {
    market: Arc<dyn MarketData>,
}

impl StockPriceTool {
    pub fn new(market: Arc<dyn MarketData>) -> Self {
        Self { market }
    }
}

#[async_trait::async_trait]
impl Tool for StockPriceTool {
    fn name(&self) -> &'static str {
        "get_stock_price"
    }

    fn description(&self) -> &'static str {
        "Fetch the live stock price for a ticker symbol. Example inputs: 'TSLA' (Tesla), \
         'AAPL' (Apple), 'RELIANCE.NS' (Reliance), 'GOOGL' (Google), 'AMZN' (Amazon)."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "ticker_symbol": {
                    "type": "string",
                    "description": "The ticker symbol to look up, e.g. 'TSLA' or 'AAPL'"
                },
                "period": {
                    "type": "string",
                    "description": "Price history period: '1d', '5d', '1mo', '3mo', '6mo', '1y'. Default '1d'."
                }
            },
            "required": ["ticker_symbol"]
        })
    }

    async fn execute(&self, args: &Value) -> Result<ToolReply> {
        let symbol = require_str(args, "ticker_symbol")?.trim().to_uppercase();
        let period = optional_str(args, "period", "1d");

        // The model recovers from lookup problems, so they come back as
        // output text rather than loop errors.
        let reply = match self.market.price(&symbol, &period).await {
            Ok(Some(price)) => price.to_string(),
            Ok(None) => format!(
                "Error: No data found for symbol '{}'. Check if the ticker is correct.",
                symbol
            ),
            Err(e) => format!("An error occurred: {}", e),
        };

        Ok(ToolReply::Output(reply))
    }
}

//
// ================= Buy / Sell =================
//

pub struct TradeTool {
    action: TradeAction,
}

impl TradeTool {
    pub fn buy() -> Self {
        Self {
            action: TradeAction::Buy,
        }
    }

    pub fn sell() -> Self {
        Self {
            action: TradeAction::Sell,
        }
    }
}

#[async_trait::async_trait]
impl Tool for TradeTool {
    fn name(&self) -> &'static str {
        match self.action {
            TradeAction::Buy => "buy_stocks",
            TradeAction::Sell => "sell_stocks",
        }
    }

    fn description(&self) -> &'static str {
        match self.action {
            TradeAction::Buy => {
                "Buy a specified quantity of stocks for the given ticker symbol. \
                 Requires the quantity and the total price of the purchase."
            }
            TradeAction::Sell => {
                "Sell a specified quantity of stocks for the given ticker symbol. \
                 Requires the quantity and the total price of the sale."
            }
        }
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "ticker_symbol": {
                    "type": "string",
                    "description": "The ticker symbol to trade"
                },
                "quantity": {
                    "type": "integer",
                    "description": "The number of shares to trade"
                },
                "total_price": {
                    "type": "number",
                    "description": "The total price of the trade in dollars"
                }
            },
            "required": ["ticker_symbol", "quantity", "total_price"]
        })
    }

    async fn execute(&self, args: &Value) -> Result<ToolReply> {
        let ticker = require_str(args, "ticker_symbol")?;
        let quantity = require_i64(args, "quantity")?;
        let total_price = require_f64(args, "total_price")?;

        // Validation precedes the approval gate: invalid trades never suspend
        // the conversation.
        if quantity <= 0 {
            return Ok(ToolReply::Output(
                "❌ Error: Quantity must be positive".to_string(),
            ));
        }
        if total_price <= 0.0 {
            return Ok(ToolReply::Output(
                "❌ Error: Total price must be positive".to_string(),
            ));
        }

        Ok(ToolReply::NeedsApproval(TradeProposal {
            action: self.action,
            ticker,
            quantity,
            total_price,
        }))
    }
}

//
// ================= Current Datetime =================
//

pub struct CurrentDatetimeTool;

#[async_trait::async_trait]
impl Tool for CurrentDatetimeTool {
    fn name(&self) -> &'static str {
        "get_current_datetime"
    }

    fn description(&self) -> &'static str {
        "Return the current date and time as a string."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _args: &Value) -> Result<ToolReply> {
        let now = chrono::Local::now();
        Ok(ToolReply::Output(
            now.format("%Y-%m-%d %H:%M:%S").to_string(),
        ))
    }
}

/// Create the default registry with the four trading tools.
pub fn create_default_registry(market: Arc<dyn MarketData>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(Arc::new(StockPriceTool::new(market)));
    registry.register(Arc::new(TradeTool::buy()));
    registry.register(Arc::new(TradeTool::sell()));
    registry.register(Arc::new(CurrentDatetimeTool));

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::StaticQuotes;

    fn registry() -> ToolRegistry {
        create_default_registry(Arc::new(StaticQuotes))
    }

    #[test]
    fn test_default_registry_contents() {
        let registry = registry();
        let mut names = registry.list();
        names.sort();
        assert_eq!(
            names,
            vec![
                "buy_stocks",
                "get_current_datetime",
                "get_stock_price",
                "sell_stocks"
            ]
        );

        let defs = registry.definitions();
        assert_eq!(defs.len(), 4);
        assert!(defs.iter().all(|d| d.parameters.is_object()));
    }

    #[tokio::test]
    async fn test_price_lookup_normalizes_symbol() {
        let tool = StockPriceTool::new(Arc::new(StaticQuotes));
        let reply = tool
            .execute(&json!({"ticker_symbol": " tsla "}))
            .await
            .unwrap();
        assert_eq!(reply, ToolReply::Output("250.1".to_string()));
    }

    #[tokio::test]
    async fn test_price_lookup_unknown_symbol() {
        let tool = StockPriceTool::new(Arc::new(StaticQuotes));
        let reply = tool
            .execute(&json!({"ticker_symbol": "NOPE"}))
            .await
            .unwrap();
        assert_eq!(
            reply,
            ToolReply::Output(
                "Error: No data found for symbol 'NOPE'. Check if the ticker is correct."
                    .to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_buy_requires_positive_quantity() {
        let tool = TradeTool::buy();
        let reply = tool
            .execute(&json!({"ticker_symbol": "TSLA", "quantity": 0, "total_price": 100.0}))
            .await
            .unwrap();
        assert_eq!(
            reply,
            ToolReply::Output("❌ Error: Quantity must be positive".to_string())
        );
    }

    #[tokio::test]
    async fn test_sell_requires_positive_price() {
        let tool = TradeTool::sell();
        let reply = tool
            .execute(&json!({"ticker_symbol": "TSLA", "quantity": 2, "total_price": -10.0}))
            .await
            .unwrap();
        assert_eq!(
            reply,
            ToolReply::Output("❌ Error: Total price must be positive".to_string())
        );
    }

    #[tokio::test]
    async fn test_valid_trade_needs_approval() {
        let tool = TradeTool::buy();
        let reply = tool
            .execute(&json!({"ticker_symbol": "TSLA", "quantity": 5, "total_price": 1250.5}))
            .await
            .unwrap();

        match reply {
            ToolReply::NeedsApproval(proposal) => {
                assert_eq!(proposal.action, TradeAction::Buy);
                assert_eq!(proposal.ticker, "TSLA");
                assert_eq!(proposal.quantity, 5);
                assert_eq!(
                    proposal.prompt(),
                    "Do you want to buy 5 shares of TSLA for $1250.5? (yes/no)"
                );
            }
            other => panic!("expected approval request, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_trade_missing_arguments() {
        let tool = TradeTool::buy();
        let result = tool.execute(&json!({"ticker_symbol": "TSLA"})).await;
        assert!(matches!(result, Err(AgentError::InvalidToolInput(_))));
    }

    #[tokio::test]
    async fn test_datetime_format() {
        let tool = CurrentDatetimeTool;
        let reply = tool.execute(&json!({})).await.unwrap();
        let ToolReply::Output(stamp) = reply else {
            panic!("expected output");
        };

        assert!(chrono::NaiveDateTime::parse_from_str(&stamp, "%Y-%m-%d %H:%M:%S").is_ok());
    }

    #[tokio::test]
    async fn test_quantity_accepts_integral_float() {
        // Some models emit 5.0 for integer parameters.
        let tool = TradeTool::buy();
        let reply = tool
            .execute(&json!({"ticker_symbol": "TSLA", "quantity": 5.0, "total_price": 1250.0}))
            .await
            .unwrap();
        assert!(matches!(reply, ToolReply::NeedsApproval(_)));
    }
}
