//! Stock Trading Agent
//!
//! A conversational assistant that:
//! - Answers stock-price questions via a small tool set
//! - Simulates buy/sell transactions (string responses, no brokerage)
//! - Suspends execution and waits for explicit human approval before a
//!   trade is considered final
//! - Keeps per-thread conversation state in memory
//!
//! TURN LOOP:
//! USER INPUT → MODEL → TOOL CALLS? → EXECUTE / SUSPEND → MODEL → REPLY

pub mod agent;
pub mod api;
pub mod error;
pub mod llm;
pub mod market;
pub mod models;
pub mod session;
pub mod tools;

pub use error::Result;

// Re-export common types
pub use agent::TradingAgent;
pub use models::*;
