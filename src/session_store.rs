//! # Conversation State Store
//!
//! In-memory sessions keyed by conversation. Nothing survives a process
//! restart. Sessions that have been idle longer than the configured TTL are
//! treated as absent and dropped by [`SessionStore::purge_expired`].
//!
//! The store also hands out one async mutex per conversation so that a
//! message is handled to completion before the next one from the same
//! conversation starts.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::dialogue::{ConversationId, FlowState, Session, SessionUpdate};

#[derive(Debug)]
struct Entry {
    session: Session,
    touched_at: Instant,
}

impl Entry {
    fn new(session: Session) -> Self {
        Self {
            session,
            touched_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.touched_at.elapsed() >= ttl
    }
}

/// Thread-safe store of conversation sessions
#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<HashMap<ConversationId, Entry>>,
    conversation_locks: Mutex<HashMap<ConversationId, Arc<Mutex<()>>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            conversation_locks: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get a copy of the live session for a conversation
    pub async fn get(&self, conversation: ConversationId) -> Option<Session> {
        let mut sessions = self.sessions.lock().await;
        match sessions.get(&conversation) {
            Some(entry) if entry.is_expired(self.ttl) => {
                debug!(conversation = %conversation, "Session expired");
                sessions.remove(&conversation);
                None
            }
            Some(entry) => Some(entry.session.clone()),
            None => None,
        }
    }

    /// Current flow state, `Idle` when there is no live session
    pub async fn state(&self, conversation: ConversationId) -> FlowState {
        self.get(conversation)
            .await
            .map(|session| session.state)
            .unwrap_or_default()
    }

    /// Apply a partial update, creating the session if needed
    pub async fn update(&self, conversation: ConversationId, update: SessionUpdate) {
        let mut sessions = self.sessions.lock().await;
        let entry = self.live_entry(&mut sessions, conversation);
        update.apply_to(&mut entry.session);
        entry.touched_at = Instant::now();
    }

    /// Move the conversation to a new flow state, creating the session if needed
    pub async fn set_state(&self, conversation: ConversationId, state: FlowState) {
        let mut sessions = self.sessions.lock().await;
        let entry = self.live_entry(&mut sessions, conversation);
        debug!(conversation = %conversation, from = ?entry.session.state, to = ?state, "Flow state change");
        entry.session.state = state;
        entry.touched_at = Instant::now();
    }

    /// Drop the session of a conversation
    pub async fn clear(&self, conversation: ConversationId) {
        self.sessions.lock().await.remove(&conversation);
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    /// Lock serializing the handling of messages from one conversation
    pub async fn conversation_lock(&self, conversation: ConversationId) -> Arc<Mutex<()>> {
        let mut locks = self.conversation_locks.lock().await;
        Arc::clone(locks.entry(conversation).or_default())
    }

    /// Remove expired sessions and unused conversation locks
    ///
    /// Returns the number of sessions removed.
    pub async fn purge_expired(&self) -> usize {
        let removed = {
            let mut sessions = self.sessions.lock().await;
            let before = sessions.len();
            sessions.retain(|_, entry| !entry.is_expired(self.ttl));
            before - sessions.len()
        };

        // Only this map holds a reference to an idle lock
        self.conversation_locks
            .lock()
            .await
            .retain(|_, lock| Arc::strong_count(lock) > 1);

        removed
    }

    /// Periodically purge expired sessions in a background task
    pub fn spawn_sweeper(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let removed = self.purge_expired().await;
                if removed > 0 {
                    info!(removed, "Purged expired conversation sessions");
                }
            }
        })
    }

    fn live_entry<'a>(
        &self,
        sessions: &'a mut HashMap<ConversationId, Entry>,
        conversation: ConversationId,
    ) -> &'a mut Entry {
        let entry = sessions
            .entry(conversation)
            .or_insert_with(|| Entry::new(Session::default()));
        if entry.is_expired(self.ttl) {
            *entry = Entry::new(Session::default());
        }
        entry
    }
}
