use std::sync::Arc;
use stock_trading_agent::{
    agent::TradingAgent,
    api::start_server,
    llm::GroqChat,
    market::YahooQuotes,
    session::InMemorySessionStore,
    tools::create_default_registry,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let api_key = std::env::var("GROQ_API_KEY").unwrap_or_else(|_| {
        eprintln!("⚠️  GROQ_API_KEY not set in .env");
        eprintln!("📌 See .env.example for setup instructions");
        String::new()
    });

    let api_port: u16 = std::env::var("PORT")
        .or_else(|_| std::env::var("API_PORT"))
        .unwrap_or_else(|_| "8080".to_string())
        .parse()?;

    info!("🚀 Stock Trading Agent - API Server");
    info!("📍 Port: {}", api_port);

    // Create components
    let agent = Arc::new(TradingAgent::new(
        Box::new(GroqChat::new(api_key)),
        create_default_registry(Arc::new(YahooQuotes::new())),
        Arc::new(InMemorySessionStore::new()),
    ));

    info!("✅ Agent initialized");
    info!("📡 Starting API server...");

    // Start API server
    start_server(agent, api_port).await?;

    Ok(())
}
