//! Per-thread conversation state
//!
//! A session is the ordered message list for one conversation thread plus
//! the optional suspended trade. State lives in memory for the life of the
//! process; the `SessionStore` trait is the seam a persistent backend would
//! implement.

use crate::models::{ChatMessage, PendingTrade};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Conversation state for one thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub thread_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    messages: Vec<ChatMessage>,
    pending: Option<PendingTrade>,
}

impl Session {
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            messages: Vec::new(),
            pending: None,
        }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
        self.updated_at = Utc::now();
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn pending(&self) -> Option<&PendingTrade> {
        self.pending.as_ref()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn set_pending(&mut self, pending: PendingTrade) {
        self.pending = Some(pending);
        self.updated_at = Utc::now();
    }

    pub fn take_pending(&mut self) -> Option<PendingTrade> {
        let pending = self.pending.take();
        if pending.is_some() {
            self.updated_at = Utc::now();
        }
        pending
    }

    /// Reset the thread ("Clear Chat"): drops the transcript and any
    /// suspended trade.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.pending = None;
        self.updated_at = Utc::now();
    }
}

/// Trait for session persistence
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    async fn get_or_create(&self, thread_id: &str) -> Result<Session>;
    async fn get(&self, thread_id: &str) -> Result<Option<Session>>;
    async fn save(&self, session: &Session) -> Result<()>;
    async fn remove(&self, thread_id: &str) -> Result<()>;
}

/// In-memory session store, keyed by thread id
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_or_create(&self, thread_id: &str) -> Result<Session> {
        {
            let sessions = self.sessions.read().await;
            if let Some(session) = sessions.get(thread_id) {
                return Ok(session.clone());
            }
        }

        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(thread_id.to_string())
            .or_insert_with(|| Session::new(thread_id))
            .clone();

        Ok(session)
    }

    async fn get(&self, thread_id: &str) -> Result<Option<Session>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(thread_id).cloned())
    }

    async fn save(&self, session: &Session) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.thread_id.clone(), session.clone());
        Ok(())
    }

    async fn remove(&self, thread_id: &str) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(thread_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PendingTrade, TradeAction, TradeProposal};

    fn pending_trade() -> PendingTrade {
        PendingTrade::new(
            "call_1".to_string(),
            "buy_stocks".to_string(),
            TradeProposal {
                action: TradeAction::Buy,
                ticker: "TSLA".to_string(),
                quantity: 5,
                total_price: 1250.0,
            },
        )
    }

    #[test]
    fn test_session_pending_lifecycle() {
        let mut session = Session::new("thread_1");
        assert!(!session.has_pending());

        session.set_pending(pending_trade());
        assert!(session.has_pending());

        let pending = session.take_pending().unwrap();
        assert_eq!(pending.tool_name, "buy_stocks");
        assert!(!session.has_pending());
        assert!(session.take_pending().is_none());
    }

    #[test]
    fn test_clear_drops_transcript_and_pending() {
        let mut session = Session::new("thread_1");
        session.push(ChatMessage::user("hi"));
        session.set_pending(pending_trade());

        session.clear();
        assert_eq!(session.message_count(), 0);
        assert!(!session.has_pending());
    }

    #[test]
    fn test_store_round_trip() {
        tokio_test::block_on(async {
            let store = InMemorySessionStore::new();

            let mut session = store.get_or_create("thread_1").await.unwrap();
            session.push(ChatMessage::user("What's the price of Tesla?"));
            store.save(&session).await.unwrap();

            let loaded = store.get("thread_1").await.unwrap().unwrap();
            assert_eq!(loaded.message_count(), 1);

            store.remove("thread_1").await.unwrap();
            assert!(store.get("thread_1").await.unwrap().is_none());
        });
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let store = InMemorySessionStore::new();

        let first = store.get_or_create("thread_1").await.unwrap();
        let second = store.get_or_create("thread_1").await.unwrap();
        assert_eq!(first.thread_id, second.thread_id);
        assert_eq!(first.created_at, second.created_at);
    }
}
