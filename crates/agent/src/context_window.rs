//! Conversation context windows
//!
//! Each conversation keeps only its most recent messages. Windows that sit
//! idle past the TTL read as empty and are dropped by [`ContextWindowStore::sweep_idle`];
//! when the store is full, the least recently used window is evicted.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use neo_config::ContextWindowConfig;
use neo_core::{Message, Role};

struct Window {
    messages: VecDeque<Message>,
    last_activity: Instant,
}

impl Window {
    fn new() -> Self {
        Self {
            messages: VecDeque::new(),
            last_activity: Instant::now(),
        }
    }

    fn is_idle(&self, ttl: Duration) -> bool {
        self.last_activity.elapsed() > ttl
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    fn push(&mut self, message: Message, max_messages: usize) {
        self.messages.push_back(message);
        while self.messages.len() > max_messages {
            self.messages.pop_front();
        }
    }
}

/// Bounded conversation history keyed by conversation id
pub struct ContextWindowStore {
    windows: DashMap<String, Arc<Mutex<Window>>>,
    max_messages: usize,
    idle_ttl: Duration,
    max_conversations: usize,
}

impl Default for ContextWindowStore {
    fn default() -> Self {
        Self::new(&ContextWindowConfig::default())
    }
}

impl ContextWindowStore {
    pub fn new(config: &ContextWindowConfig) -> Self {
        Self::with_limits(
            config.max_messages,
            Duration::from_secs(config.idle_ttl_secs),
            config.max_conversations,
        )
    }

    pub fn with_limits(max_messages: usize, idle_ttl: Duration, max_conversations: usize) -> Self {
        Self {
            windows: DashMap::new(),
            max_messages: max_messages.max(1),
            idle_ttl,
            max_conversations: max_conversations.max(1),
        }
    }

    pub fn max_messages(&self) -> usize {
        self.max_messages
    }

    /// Snapshot of the window, oldest first
    ///
    /// Unknown and idle-expired conversations read as empty.
    pub fn get(&self, conversation_id: &str) -> Vec<Message> {
        let Some(window) = self.window(conversation_id) else {
            return Vec::new();
        };

        {
            let mut guard = window.lock();
            if !guard.is_idle(self.idle_ttl) {
                guard.touch();
                return guard.messages.iter().cloned().collect();
            }
        }

        let ttl = self.idle_ttl;
        self.windows
            .remove_if(conversation_id, |_, window| window.lock().is_idle(ttl));
        Vec::new()
    }

    /// Append one message, dropping the oldest beyond the window size
    pub fn append(&self, conversation_id: &str, role: Role, content: impl Into<String>) {
        self.append_all(conversation_id, [Message::new(role, content)]);
    }

    /// Append a completed user/assistant turn under a single lock
    pub fn append_exchange(
        &self,
        conversation_id: &str,
        user: impl Into<String>,
        assistant: impl Into<String>,
    ) {
        self.append_all(
            conversation_id,
            [Message::user(user), Message::assistant(assistant)],
        );
    }

    /// Forget a conversation
    pub fn clear(&self, conversation_id: &str) {
        self.windows.remove(conversation_id);
    }

    /// Drop every idle window, returning how many were removed
    pub fn sweep_idle(&self) -> usize {
        let before = self.windows.len();
        let ttl = self.idle_ttl;
        self.windows.retain(|_, window| !window.lock().is_idle(ttl));
        let removed = before.saturating_sub(self.windows.len());
        if removed > 0 {
            tracing::debug!(removed, remaining = self.windows.len(), "Swept idle conversations");
        }
        removed
    }

    /// Number of tracked conversations
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    fn window(&self, conversation_id: &str) -> Option<Arc<Mutex<Window>>> {
        self.windows
            .get(conversation_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    fn append_all<I>(&self, conversation_id: &str, messages: I)
    where
        I: IntoIterator<Item = Message>,
    {
        let created = !self.windows.contains_key(conversation_id);
        let window = Arc::clone(
            self.windows
                .entry(conversation_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(Window::new())))
                .value(),
        );

        {
            let mut guard = window.lock();
            if guard.is_idle(self.idle_ttl) {
                guard.messages.clear();
            }
            for message in messages {
                guard.push(message, self.max_messages);
            }
            guard.touch();
        }

        if created {
            self.evict_over_capacity(conversation_id);
        }
    }

    /// Evict least recently used windows until the store fits, sparing `keep`
    fn evict_over_capacity(&self, keep: &str) {
        while self.windows.len() > self.max_conversations {
            let oldest = self
                .windows
                .iter()
                .filter(|entry| entry.key() != keep)
                .map(|entry| (entry.key().clone(), entry.value().lock().last_activity))
                .min_by_key(|(_, last_activity)| *last_activity)
                .map(|(id, _)| id);

            match oldest {
                Some(id) => {
                    self.windows.remove(&id);
                    tracing::debug!(conversation_id = %id, "Evicted least recently used conversation");
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(max_messages: usize) -> ContextWindowStore {
        ContextWindowStore::with_limits(max_messages, Duration::from_secs(3600), 100)
    }

    #[test]
    fn test_unknown_conversation_is_empty() {
        let store = store(8);
        assert!(store.get("nope").is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn test_window_keeps_most_recent() {
        let store = store(8);
        for i in 0..10 {
            store.append("c1", Role::User, format!("m{}", i));
        }

        let messages = store.get("c1");
        assert_eq!(messages.len(), 8);
        assert_eq!(messages[0].content, "m2");
        assert_eq!(messages[7].content, "m9");
    }

    #[test]
    fn test_exchange_order() {
        let store = store(8);
        store.append_exchange("c1", "hi", "hello");

        let messages = store.get("c1");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, "hello");
    }

    #[test]
    fn test_conversations_are_isolated() {
        let store = store(8);
        store.append("a", Role::User, "for a");
        store.append("b", Role::User, "for b");

        assert_eq!(store.get("a")[0].content, "for a");
        assert_eq!(store.get("b").len(), 1);

        store.clear("a");
        assert!(store.get("a").is_empty());
        assert_eq!(store.get("b").len(), 1);
    }

    #[test]
    fn test_idle_window_reads_empty_and_is_dropped() {
        let store = ContextWindowStore::with_limits(8, Duration::from_millis(20), 100);
        store.append("c1", Role::User, "old");
        std::thread::sleep(Duration::from_millis(40));

        assert!(store.get("c1").is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn test_sweep_idle() {
        let store = ContextWindowStore::with_limits(8, Duration::from_millis(20), 100);
        store.append("a", Role::User, "old");
        store.append("b", Role::User, "old");
        std::thread::sleep(Duration::from_millis(40));
        store.append("c", Role::User, "fresh");

        assert_eq!(store.sweep_idle(), 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("c").len(), 1);
    }

    #[test]
    fn test_idle_window_restarts_on_append() {
        let store = ContextWindowStore::with_limits(8, Duration::from_millis(20), 100);
        store.append("c1", Role::User, "old");
        std::thread::sleep(Duration::from_millis(40));
        store.append("c1", Role::User, "new");

        let messages = store.get("c1");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "new");
    }

    #[test]
    fn test_lru_eviction() {
        let store = ContextWindowStore::with_limits(8, Duration::from_secs(3600), 2);
        store.append("a", Role::User, "1");
        std::thread::sleep(Duration::from_millis(2));
        store.append("b", Role::User, "2");
        std::thread::sleep(Duration::from_millis(2));
        // Reading "a" makes "b" the least recently used
        assert_eq!(store.get("a").len(), 1);
        std::thread::sleep(Duration::from_millis(2));
        store.append("c", Role::User, "3");

        assert_eq!(store.len(), 2);
        assert!(store.get("b").is_empty());
        assert_eq!(store.get("a").len(), 1);
        assert_eq!(store.get("c").len(), 1);
    }

    #[test]
    fn test_concurrent_appends() {
        let store = Arc::new(store(8));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        store.append_exchange("shared", format!("u{}-{}", t, i), "a");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let messages = store.get("shared");
        assert_eq!(messages.len(), 8);
        // Exchanges land atomically: roles alternate
        for pair in messages.chunks(2) {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[1].role, Role::Assistant);
        }
    }
}
