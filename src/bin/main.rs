use std::io::{self, BufRead, Write};
use std::sync::Arc;
use stock_trading_agent::{
    agent::TradingAgent,
    llm::GroqChat,
    market::YahooQuotes,
    models::AgentReply,
    session::InMemorySessionStore,
    tools::create_default_registry,
};

const THREAD_ID: &str = "thread_1";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Keep the REPL quiet by default; RUST_LOG opts into more.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let api_key = std::env::var("GROQ_API_KEY").unwrap_or_else(|_| {
        eprintln!("⚠️  GROQ_API_KEY not set in .env");
        eprintln!("📌 See .env.example for setup instructions");
        String::new()
    });

    let agent = TradingAgent::new(
        Box::new(GroqChat::new(api_key)),
        create_default_registry(Arc::new(YahooQuotes::new())),
        Arc::new(InMemorySessionStore::new()),
    );

    println!("📈 Stock Market Agent");
    println!("Ask me about stock prices, buy/sell stocks, or get current time.");
    println!("Commands: /clear resets the conversation, exit quits.\n");

    let stdin = io::stdin();

    loop {
        print!("you> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "exit" || input == "quit" {
            break;
        }
        if input == "/clear" {
            agent.reset(THREAD_ID).await?;
            println!("(conversation cleared)\n");
            continue;
        }

        let mut outcome = agent.handle_message(THREAD_ID, input).await;

        // A trade decision may be followed by another queued trade, so keep
        // prompting until the turn produces a final answer.
        loop {
            match outcome {
                Ok(AgentReply::Answer { content }) => {
                    println!("agent> {}\n", content);
                    break;
                }
                Ok(AgentReply::PendingConfirmation { prompt }) => {
                    println!("agent> ⚠️  {}", prompt);
                    print!("you> ");
                    io::stdout().flush()?;

                    let mut decision = String::new();
                    if stdin.lock().read_line(&mut decision)? == 0 {
                        // EOF mid-confirmation: treat as a decline.
                        decision = "no".to_string();
                    }

                    outcome = agent.resume(THREAD_ID, decision.trim()).await;
                }
                Err(e) => {
                    eprintln!("error: {}\n", e);
                    break;
                }
            }
        }
    }

    Ok(())
}
