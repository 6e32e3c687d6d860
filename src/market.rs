//! Market-data source
//!
//! Returns the latest close price for a ticker/period. The live backend is
//! the Yahoo Finance chart endpoint; a static quote table keeps tests and
//! offline demos runnable.

use crate::error::AgentError;
use crate::Result;
use async_trait::async_trait;
use lazy_static::lazy_static;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use tracing::{debug, warn};

/// Trait for price lookup (ticker + period → latest close)
#[async_trait]
pub trait MarketData: Send + Sync {
    /// `Ok(None)` means the symbol/period produced no data.
    async fn price(&self, symbol: &str, period: &str) -> Result<Option<f64>>;
}

/// Round to 2 decimals, the precision quoted back to the user.
pub fn round_price(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}

//
// ================= Yahoo Finance =================
//

/// HTTP-backed market data via the Yahoo Finance chart endpoint
pub struct YahooQuotes {
    client: Client,
    base_url: String,
}

impl YahooQuotes {
    pub fn new() -> Self {
        let base_url = env::var("QUOTE_API_BASE_URL")
            .unwrap_or_else(|_| "https://query1.finance.yahoo.com".to_string());

        // Yahoo rejects requests without a browser-like user agent.
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (compatible; stock-trading-agent/0.1)")
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn extract_close(envelope: &ChartEnvelope) -> Option<f64> {
        let result = envelope.chart.result.as_ref()?.first()?;

        result
            .indicators
            .quote
            .first()?
            .close
            .iter()
            .rev()
            .find_map(|close| *close)
    }
}

impl Default for YahooQuotes {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketData for YahooQuotes {
    async fn price(&self, symbol: &str, period: &str) -> Result<Option<f64>> {
        let url = format!(
            "{}/v8/finance/chart/{}?range={}&interval=1d",
            self.base_url, symbol, period
        );

        debug!(%symbol, %period, "Fetching quote");

        let response = self.client.get(&url).send().await.map_err(|e| {
            AgentError::MarketDataError(format!("Quote request failed for {}: {}", symbol, e))
        })?;

        // Yahoo answers unknown symbols with a 404 carrying a chart error body.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%symbol, %status, "Quote endpoint returned an error");
            return Err(AgentError::MarketDataError(format!(
                "Quote endpoint returned {} for {}: {}",
                status, symbol, body
            )));
        }

        let envelope: ChartEnvelope = response.json().await.map_err(|e| {
            AgentError::MarketDataError(format!("Invalid quote response for {}: {}", symbol, e))
        })?;

        Ok(Self::extract_close(&envelope).map(round_price))
    }
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteBlock>,
}

#[derive(Debug, Deserialize)]
struct QuoteBlock {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

//
// ================= Static Quotes =================
//

lazy_static! {
    static ref DEMO_QUOTES: HashMap<&'static str, f64> = {
        let mut quotes = HashMap::new();
        quotes.insert("AAPL", 184.52);
        quotes.insert("TSLA", 250.10);
        quotes.insert("GOOGL", 141.33);
        quotes.insert("AMZN", 178.95);
        quotes.insert("MSFT", 411.27);
        quotes.insert("NVDA", 905.60);
        quotes.insert("RELIANCE.NS", 2930.45);
        quotes
    };
}

/// Fixed quote table for tests and offline demos
pub struct StaticQuotes;

#[async_trait]
impl MarketData for StaticQuotes {
    async fn price(&self, symbol: &str, _period: &str) -> Result<Option<f64>> {
        Ok(DEMO_QUOTES.get(symbol).copied().map(round_price))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_price() {
        assert_eq!(round_price(184.5234), 184.52);
        assert_eq!(round_price(184.525), 184.53);
        assert_eq!(round_price(250.0), 250.0);
    }

    #[test]
    fn test_extract_close_takes_last_non_null() {
        let raw = r#"{
            "chart": {
                "result": [{
                    "indicators": {
                        "quote": [{
                            "close": [180.1, 182.4, null, 184.5234, null]
                        }]
                    }
                }]
            }
        }"#;

        let envelope: ChartEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(YahooQuotes::extract_close(&envelope), Some(184.5234));
    }

    #[test]
    fn test_extract_close_empty_series() {
        let raw = r#"{"chart": {"result": [{"indicators": {"quote": [{"close": []}]}}]}}"#;
        let envelope: ChartEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(YahooQuotes::extract_close(&envelope), None);

        let missing = r#"{"chart": {"result": null}}"#;
        let envelope: ChartEnvelope = serde_json::from_str(missing).unwrap();
        assert_eq!(YahooQuotes::extract_close(&envelope), None);
    }

    #[tokio::test]
    async fn test_static_quotes_lookup() {
        let quotes = StaticQuotes;
        assert_eq!(quotes.price("TSLA", "1d").await.unwrap(), Some(250.10));
        assert_eq!(quotes.price("NOPE", "1d").await.unwrap(), None);
    }
}
