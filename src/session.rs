//! Per-session conversation history.
//!
//! [`SessionStore`] is a trait so a persistent backing store can replace
//! the in-memory map without touching the orchestrator or coordinator.
//! History is bounded: each session keeps at most `max_history`
//! exchanges, oldest evicted first. Nothing survives process exit.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use uuid::Uuid;

use crate::models::Exchange;

/// Bounded per-session exchange history.
pub trait SessionStore: Send + Sync {
    /// Create a new session with an empty history and return its id.
    fn create(&self) -> String;

    /// The session's exchanges, oldest first. Empty for unknown ids.
    fn history(&self, session_id: &str) -> Vec<Exchange>;

    /// Append one exchange, then trim to the most recent `max_history`.
    fn append(&self, session_id: &str, user: &str, assistant: &str);

    /// Drop all history for the id. The id stays valid for future
    /// appends.
    fn clear(&self, session_id: &str);
}

/// In-memory session store.
///
/// Each session's history sits behind its own `Mutex`, so concurrent
/// queries on different sessions never contend; the outer `RwLock` only
/// guards the id map itself.
pub struct InMemorySessionStore {
    max_history: usize,
    sessions: RwLock<HashMap<String, Arc<Mutex<Vec<Exchange>>>>>,
}

impl InMemorySessionStore {
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history: max_history.max(1),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    fn entry(&self, session_id: &str) -> Arc<Mutex<Vec<Exchange>>> {
        if let Some(found) = self.sessions.read().unwrap().get(session_id) {
            return Arc::clone(found);
        }
        let mut sessions = self.sessions.write().unwrap();
        Arc::clone(
            sessions
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(Vec::new()))),
        )
    }
}

impl SessionStore for InMemorySessionStore {
    fn create(&self) -> String {
        let id = Uuid::new_v4().to_string();
        self.sessions
            .write()
            .unwrap()
            .insert(id.clone(), Arc::new(Mutex::new(Vec::new())));
        id
    }

    fn history(&self, session_id: &str) -> Vec<Exchange> {
        match self.sessions.read().unwrap().get(session_id) {
            Some(entry) => entry.lock().unwrap().clone(),
            None => Vec::new(),
        }
    }

    fn append(&self, session_id: &str, user: &str, assistant: &str) {
        let entry = self.entry(session_id);
        let mut history = entry.lock().unwrap();
        history.push(Exchange {
            user: user.to_string(),
            assistant: assistant.to_string(),
        });
        if history.len() > self.max_history {
            let excess = history.len() - self.max_history;
            history.drain(0..excess);
        }
    }

    fn clear(&self, session_id: &str) {
        self.sessions.write().unwrap().remove(session_id);
    }
}
