//! Bounded cache of live chat engines with per-session serialization.
//!
//! Every session's engine lives behind an async mutex so only one turn
//! runs per session at a time. The cache evicts in LRU order but never
//! evicts an engine that is mid-turn: eviction only claims slots whose
//! lock can be taken without waiting. An evicted engine is rebuilt from
//! persisted metadata on the next message.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use tracing::debug;

use colloquy_types::identity::SessionId;

use crate::engine::BoxChatEngine;

/// A cache slot. `None` means the session is known but its engine has
/// been evicted or not yet materialized.
pub struct EngineSlot {
    pub engine: Option<BoxChatEngine>,
}

/// LRU-bounded engine cache keyed by session id.
pub struct EngineCache {
    // Eviction clears a slot's engine, not the slot itself; slots live
    // until `remove` on session delete, so the map is bounded by the
    // number of stored sessions, not by `capacity`.
    slots: DashMap<SessionId, Arc<tokio::sync::Mutex<EngineSlot>>>,
    // Most recently used at the back.
    order: Mutex<VecDeque<SessionId>>,
    capacity: usize,
}

impl EngineCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: DashMap::new(),
            order: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// Get or create the slot for `id`, marking it most recently used.
    ///
    /// May evict other sessions' engines to stay within capacity. The
    /// returned slot itself is never evicted by this call.
    pub fn slot(&self, id: &SessionId) -> Arc<tokio::sync::Mutex<EngineSlot>> {
        let slot = self
            .slots
            .entry(*id)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(EngineSlot { engine: None })))
            .clone();
        self.touch(id);
        self.evict_excess(id);
        slot
    }

    /// Drop the slot for `id` entirely, waiting for any in-flight turn.
    pub async fn remove(&self, id: &SessionId) {
        if let Some((_, slot)) = self.slots.remove(id) {
            // Wait out a turn that is still holding the engine.
            let mut guard = slot.lock().await;
            guard.engine = None;
        }
        self.order
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|s| s != id);
    }

    /// Number of sessions with a live (materialized) engine.
    pub fn live_engines(&self) -> usize {
        self.slots
            .iter()
            .filter(|entry| entry.value().try_lock().map(|g| g.engine.is_some()).unwrap_or(true))
            .count()
    }

    fn touch(&self, id: &SessionId) {
        let mut order = self.order.lock().unwrap_or_else(|e| e.into_inner());
        order.retain(|s| s != id);
        order.push_back(*id);
    }

    /// Evict least-recently-used engines until at most `capacity` slots
    /// hold one. `keep` is exempt. Busy slots are skipped rather than
    /// awaited.
    fn evict_excess(&self, keep: &SessionId) {
        let order = self
            .order
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let mut live = 0usize;
        for id in order.iter().rev() {
            let Some(slot) = self.slots.get(id).map(|s| s.clone()) else {
                continue;
            };
            let Ok(mut guard) = slot.try_lock() else {
                // A held lock means a turn in flight. Count it as live
                // and leave it alone.
                live += 1;
                continue;
            };
            if guard.engine.is_none() {
                continue;
            }
            if id == keep || live < self.capacity {
                live += 1;
                continue;
            }
            debug!(session = %id.short(), "evicting idle engine");
            guard.engine = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colloquy_types::error::EngineError;
    use colloquy_types::role::RoleDescriptor;

    use crate::engine::{BoxChatEngine, ChatEngine};
    use crate::llm::BoxLlmClient;

    struct NullEngine;

    impl ChatEngine for NullEngine {
        async fn turn(&mut self, _input: &str) -> Result<String, EngineError> {
            Ok(String::new())
        }
        fn set_bot_role(&mut self, _role: RoleDescriptor) {}
        fn set_model(&mut self, _client: BoxLlmClient) {}
    }

    #[tokio::test]
    async fn test_eviction_drops_least_recent() {
        let cache = EngineCache::new(2);
        let a = SessionId::generate();
        let b = SessionId::generate();
        let c = SessionId::generate();

        for id in [&a, &b, &c] {
            let slot = cache.slot(id);
            slot.lock().await.engine = Some(BoxChatEngine::new(NullEngine));
        }
        // Re-touching c triggers eviction of the oldest live engine.
        cache.slot(&c);
        assert!(cache.live_engines() <= 2);
        let slot_a = cache.slot(&a);
        assert!(slot_a.lock().await.engine.is_none());
    }

    #[tokio::test]
    async fn test_busy_slot_survives_eviction() {
        let cache = EngineCache::new(1);
        let a = SessionId::generate();
        let b = SessionId::generate();

        let slot_a = cache.slot(&a);
        {
            let mut guard = slot_a.lock().await;
            guard.engine = Some(BoxChatEngine::new(NullEngine));
            // Lock held across an eviction sweep.
            let slot_b = cache.slot(&b);
            slot_b.lock().await.engine = Some(BoxChatEngine::new(NullEngine));
            cache.slot(&b);
            assert!(guard.engine.is_some());
        }
    }

    #[tokio::test]
    async fn test_remove_clears_slot() {
        let cache = EngineCache::new(4);
        let a = SessionId::generate();
        let slot = cache.slot(&a);
        slot.lock().await.engine = Some(BoxChatEngine::new(NullEngine));
        cache.remove(&a).await;
        let slot = cache.slot(&a);
        assert!(slot.lock().await.engine.is_none());
    }
}
