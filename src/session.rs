use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::store::HistoryStore;

/// Fixed key under which the serialized transcript is stored.
pub const HISTORY_KEY: &str = "chatHistory";

/// Shown as an assistant message when the backend call fails for any reason.
pub const BACKEND_ERROR_MESSAGE: &str = "⚠️ Error al conectar con la IA.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// One submit cycle: Idle -> Sending -> Streaming -> Idle.
/// A failed backend call goes Sending -> Idle directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Sending,
    Streaming { reply: String, shown: usize },
}

/// Owns the message log and drives one request/reveal cycle at a time.
/// The backend call itself happens elsewhere; its result is fed back in
/// through `resolve`, so the session stays synchronous and testable.
pub struct ChatSession {
    messages: Vec<Message>,
    phase: Phase,
    store: Box<dyn HistoryStore>,
}

impl ChatSession {
    /// Create a session, restoring any persisted transcript.
    /// A missing or unreadable snapshot starts an empty conversation.
    pub fn new(store: Box<dyn HistoryStore>) -> Self {
        let messages = store
            .get(HISTORY_KEY)
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default();

        Self {
            messages,
            phase: Phase::Idle,
            store,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// True while a submit cycle is in flight (waiting or revealing).
    pub fn is_busy(&self) -> bool {
        self.phase != Phase::Idle
    }

    pub fn is_sending(&self) -> bool {
        self.phase == Phase::Sending
    }

    /// Start a new cycle. Returns false (and changes nothing) when the
    /// input is blank or another cycle is already in flight.
    pub fn submit(&mut self, text: &str) -> bool {
        if text.trim().is_empty() || self.is_busy() {
            return false;
        }

        self.messages.push(Message {
            role: Role::User,
            content: text.to_string(),
        });
        self.phase = Phase::Sending;
        self.persist();
        true
    }

    /// Feed the backend result back into the session. On success an empty
    /// assistant message is appended and the reveal begins; on failure the
    /// fixed error message is appended and the cycle ends.
    pub fn resolve(&mut self, result: Result<String>) {
        if self.phase != Phase::Sending {
            return;
        }

        match result {
            Ok(reply) => {
                self.messages.push(Message {
                    role: Role::Assistant,
                    content: String::new(),
                });
                self.phase = Phase::Streaming { reply, shown: 0 };
            }
            Err(_) => {
                self.messages.push(Message {
                    role: Role::Assistant,
                    content: BACKEND_ERROR_MESSAGE.to_string(),
                });
                self.phase = Phase::Idle;
            }
        }
        self.persist();
    }

    /// Reveal one more character of the pending reply. Returns true when
    /// the transcript changed. The final step overwrites the message with
    /// the complete reply so the content always ends up exact.
    pub fn advance_reveal(&mut self) -> bool {
        let (content, done) = match &mut self.phase {
            Phase::Streaming { reply, shown } => {
                *shown += 1;
                let total = reply.chars().count();
                if *shown >= total {
                    (reply.clone(), true)
                } else {
                    (reply.chars().take(*shown).collect(), false)
                }
            }
            _ => return false,
        };

        if let Some(last) = self.messages.last_mut() {
            last.content = content;
        }
        if done {
            self.phase = Phase::Idle;
        }
        self.persist();
        true
    }

    /// Clear the transcript and erase the persisted snapshot.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.phase = Phase::Idle;
        let _ = self.store.remove(HISTORY_KEY);
    }

    fn persist(&self) {
        // Matches the persisted-history contract: every change to the
        // transcript rewrites the snapshot; an empty transcript is not
        // written. Store failures are ignored.
        if self.messages.is_empty() {
            return;
        }
        if let Ok(json) = serde_json::to_string(&self.messages) {
            let _ = self.store.set(HISTORY_KEY, &json);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use anyhow::anyhow;

    fn session_with(store: &MemoryStore) -> ChatSession {
        ChatSession::new(Box::new(store.clone()))
    }

    fn drain_reveal(session: &mut ChatSession) {
        while matches!(session.phase(), Phase::Streaming { .. }) {
            session.advance_reveal();
        }
    }

    #[test]
    fn test_submit_appends_user_message() {
        let store = MemoryStore::new();
        let mut session = session_with(&store);

        assert!(session.submit("Hello"));
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].role, Role::User);
        assert_eq!(session.messages()[0].content, "Hello");
        assert!(session.is_sending());
    }

    #[test]
    fn test_blank_submit_is_a_no_op() {
        let store = MemoryStore::new();
        let mut session = session_with(&store);

        assert!(!session.submit(""));
        assert!(!session.submit("   \t  "));
        assert!(session.messages().is_empty());
        assert!(!session.is_busy());
        assert!(store.get(HISTORY_KEY).is_none());
    }

    #[test]
    fn test_submit_while_busy_is_a_no_op() {
        let store = MemoryStore::new();
        let mut session = session_with(&store);

        assert!(session.submit("first"));
        assert!(!session.submit("second"));
        assert_eq!(session.messages().len(), 1);

        session.resolve(Ok("reply".to_string()));
        assert!(!session.submit("third"));
        assert_eq!(session.messages().len(), 2);
    }

    #[test]
    fn test_success_cycle_matches_scenario() {
        let store = MemoryStore::new();
        let mut session = session_with(&store);

        session.submit("Hello");
        session.resolve(Ok("Hi there".to_string()));
        drain_reveal(&mut session);

        assert_eq!(
            session.messages(),
            &[
                Message {
                    role: Role::User,
                    content: "Hello".to_string()
                },
                Message {
                    role: Role::Assistant,
                    content: "Hi there".to_string()
                },
            ]
        );
        assert!(!session.is_busy());
    }

    #[test]
    fn test_failure_appends_fixed_error_message() {
        let store = MemoryStore::new();
        let mut session = session_with(&store);

        session.submit("Hello");
        session.resolve(Err(anyhow!("connection refused")));

        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[1].role, Role::Assistant);
        assert_eq!(session.messages()[1].content, BACKEND_ERROR_MESSAGE);
        assert!(!session.is_busy());
    }

    #[test]
    fn test_reveal_is_monotonic_by_one_character() {
        let store = MemoryStore::new();
        let mut session = session_with(&store);

        session.submit("q");
        session.resolve(Ok("héllo ✨".to_string()));

        let mut previous = String::new();
        while matches!(session.phase(), Phase::Streaming { .. }) {
            session.advance_reveal();
            let current = session.messages().last().unwrap().content.clone();
            assert!(current.starts_with(&previous));
            assert_eq!(current.chars().count(), previous.chars().count() + 1);
            previous = current;
        }
        assert_eq!(previous, "héllo ✨");
    }

    #[test]
    fn test_empty_reply_finishes_immediately() {
        let store = MemoryStore::new();
        let mut session = session_with(&store);

        session.submit("q");
        session.resolve(Ok(String::new()));
        assert!(session.advance_reveal());

        assert_eq!(session.messages().last().unwrap().content, "");
        assert!(!session.is_busy());
    }

    #[test]
    fn test_advance_reveal_when_idle_does_nothing() {
        let store = MemoryStore::new();
        let mut session = session_with(&store);

        assert!(!session.advance_reveal());
        assert!(session.messages().is_empty());
    }

    #[test]
    fn test_history_round_trips_through_store() {
        let store = MemoryStore::new();
        let mut session = session_with(&store);

        session.submit("Hello");
        session.resolve(Ok("Hi there".to_string()));
        drain_reveal(&mut session);

        session.submit("¿Qué tal?");
        session.resolve(Err(anyhow!("down")));

        let before = session.messages().to_vec();
        drop(session);

        let restored = session_with(&store);
        assert_eq!(restored.messages(), before.as_slice());
        assert!(!restored.is_busy());
    }

    #[test]
    fn test_reset_clears_transcript_and_store() {
        let store = MemoryStore::new();
        let mut session = session_with(&store);

        session.submit("Hello");
        session.resolve(Ok("Hi".to_string()));
        drain_reveal(&mut session);
        assert!(store.get(HISTORY_KEY).is_some());

        session.reset();
        assert!(session.messages().is_empty());
        assert!(store.get(HISTORY_KEY).is_none());

        let restored = session_with(&store);
        assert!(restored.messages().is_empty());
    }

    #[test]
    fn test_corrupt_snapshot_starts_empty() {
        let store = MemoryStore::new();
        store.set(HISTORY_KEY, "not json").unwrap();

        let session = session_with(&store);
        assert!(session.messages().is_empty());
    }

    #[test]
    fn test_resolve_when_not_sending_is_ignored() {
        let store = MemoryStore::new();
        let mut session = session_with(&store);

        session.resolve(Ok("stray".to_string()));
        assert!(session.messages().is_empty());
        assert!(!session.is_busy());
    }
}
